use crate::session::{Scope, SessionError, SessionResult};
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};

/// Handle to an element of the current page snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element(NodeId);

/// Parsed snapshot of one loaded page
pub struct Document {
    url: String,
    html: Html,
    length: usize,
}

impl Document {
    pub fn parse(url: &str, source: &str) -> Self {
        Self {
            url: url.to_string(),
            html: Html::parse_document(source),
            length: source.len(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_length(&self) -> usize {
        self.length
    }

    pub fn title(&self) -> String {
        let Ok(selector) = Selector::parse("title") else {
            return String::new();
        };
        self.html
            .select(&selector)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default()
    }

    pub fn query(&self, scope: Scope, locator: &str) -> SessionResult<Vec<Element>> {
        let selector = Selector::parse(locator).map_err(|e| SessionError::InvalidLocator {
            locator: locator.to_string(),
            message: e.to_string(),
        })?;

        match scope {
            Scope::Page => Ok(self.html.select(&selector).map(|el| Element(el.id())).collect()),
            Scope::Within(root) => {
                let root = self.element_ref(root).ok_or(SessionError::StaleElement)?;
                // scraper also tests the scope element itself; only descendants count
                Ok(root
                    .select(&selector)
                    .filter(|el| el.id() != root.id())
                    .map(|el| Element(el.id()))
                    .collect())
            }
        }
    }

    pub fn text(&self, element: Element) -> String {
        self.element_ref(element)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default()
    }

    pub fn attribute(&self, element: Element, name: &str) -> Option<String> {
        self.element_ref(element)
            .and_then(|el| el.value().attr(name))
            .map(|value| value.to_string())
    }

    pub fn previous_sibling(&self, element: Element) -> Option<Element> {
        let el = self.element_ref(element)?;
        el.prev_siblings()
            .find_map(ElementRef::wrap)
            .map(|sibling| Element(sibling.id()))
    }

    pub fn next_sibling(&self, element: Element) -> Option<Element> {
        let el = self.element_ref(element)?;
        el.next_siblings()
            .find_map(ElementRef::wrap)
            .map(|sibling| Element(sibling.id()))
    }

    fn element_ref(&self, element: Element) -> Option<ElementRef<'_>> {
        self.html.tree.get(element.0).and_then(ElementRef::wrap)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
