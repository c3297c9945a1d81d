//! In-memory page session
//!
//! Serves HTML from a `url -> source` map. Failures can be scripted per URL,
//! and every navigation, refresh and restart is recorded so callers can assert
//! on retry behavior. Used by the test suite and by `--probe-file`.

use crate::session::{
    Document, Element, PageSession, Scope, SessionError, SessionFactory, SessionResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SiteState {
    /// Successive versions of each page; the last one repeats
    pages: HashMap<String, Vec<String>>,
    served: HashMap<String, usize>,
    failures: HashMap<String, u32>,
    always_fail: HashSet<String>,
    navigations: Vec<String>,
    refreshes: u32,
    restarts: u32,
}

impl SiteState {
    fn resolve_key(&self, url: &str) -> Option<String> {
        if self.pages.contains_key(url) {
            return Some(url.to_string());
        }
        let toggled = match url.strip_suffix('/') {
            Some(stripped) => stripped.to_string(),
            None => format!("{}/", url),
        };
        self.pages.contains_key(&toggled).then_some(toggled)
    }

    fn serve(&mut self, url: &str) -> SessionResult<String> {
        if self.always_fail.contains(url) {
            return Err(SessionError::Scripted {
                url: url.to_string(),
            });
        }
        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SessionError::Scripted {
                    url: url.to_string(),
                });
            }
        }

        let key = self.resolve_key(url).ok_or_else(|| SessionError::NotFound {
            url: url.to_string(),
        })?;
        let served = self.served.entry(key.clone()).or_insert(0);
        let versions = self.pages.get(&key).map(Vec::as_slice).unwrap_or_default();
        let index = (*served).min(versions.len().saturating_sub(1));
        *served += 1;

        versions
            .get(index)
            .cloned()
            .ok_or(SessionError::NotFound { url: key })
    }
}

/// Shared fixture site; sessions created from it share pages and counters
#[derive(Debug, Clone, Default)]
pub struct FixtureSite {
    state: Arc<Mutex<SiteState>>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page and returns the site, for builder-style setup
    pub fn with_page(self, url: &str, source: &str) -> Self {
        self.add_page(url, source);
        self
    }

    pub fn add_page(&self, url: &str, source: &str) {
        self.lock()
            .pages
            .insert(url.to_string(), vec![source.to_string()]);
    }

    /// Serves `versions` one per load of `url`, repeating the last
    pub fn add_page_versions(&self, url: &str, versions: &[&str]) {
        self.lock().pages.insert(
            url.to_string(),
            versions.iter().map(|v| v.to_string()).collect(),
        );
    }

    /// The next `times` loads of `url` fail
    pub fn fail_times(&self, url: &str, times: u32) {
        self.lock().failures.insert(url.to_string(), times);
    }

    /// Every load of `url` fails
    pub fn fail_always(&self, url: &str) {
        self.lock().always_fail.insert(url.to_string());
    }

    /// Every URL passed to `navigate`, in order
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn navigation_count(&self, url: &str) -> usize {
        self.lock()
            .navigations
            .iter()
            .filter(|visited| visited.as_str() == url)
            .count()
    }

    pub fn refresh_count(&self) -> u32 {
        self.lock().refreshes
    }

    pub fn restart_count(&self) -> u32 {
        self.lock().restarts
    }

    pub fn session(&self) -> FixturePageSession {
        FixturePageSession {
            site: self.clone(),
            document: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionFactory for FixtureSite {
    type Session = FixturePageSession;

    fn create(&self) -> SessionResult<FixturePageSession> {
        Ok(self.session())
    }
}

/// Page session backed by a `FixtureSite`
pub struct FixturePageSession {
    site: FixtureSite,
    document: Option<Document>,
}

impl FixturePageSession {
    fn load(&mut self, url: &str) -> SessionResult<()> {
        let source = self.site.lock().serve(url)?;
        self.document = Some(Document::parse(url, &source));
        Ok(())
    }
}

#[async_trait(?Send)]
impl PageSession for FixturePageSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.site.lock().navigations.push(url.to_string());
        self.load(url)
    }

    async fn refresh(&mut self) -> SessionResult<()> {
        let url = self.current_url().ok_or(SessionError::NoPage)?;
        self.site.lock().refreshes += 1;
        self.load(&url)
    }

    async fn restart(&mut self) -> SessionResult<()> {
        self.site.lock().restarts += 1;
        self.document = None;
        Ok(())
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.document = None;
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.document.as_ref().map(|doc| doc.url().to_string())
    }

    fn title(&self) -> String {
        self.document.as_ref().map(Document::title).unwrap_or_default()
    }

    fn content_length(&self) -> usize {
        self.document.as_ref().map_or(0, Document::content_length)
    }

    fn query(&self, scope: Scope, locator: &str) -> SessionResult<Vec<Element>> {
        self.document
            .as_ref()
            .ok_or(SessionError::NoPage)?
            .query(scope, locator)
    }

    fn text(&self, element: Element) -> String {
        self.document
            .as_ref()
            .map(|doc| doc.text(element))
            .unwrap_or_default()
    }

    fn attribute(&self, element: Element, name: &str) -> Option<String> {
        self.document.as_ref()?.attribute(element, name)
    }

    fn previous_sibling(&self, element: Element) -> Option<Element> {
        self.document.as_ref()?.previous_sibling(element)
    }

    fn next_sibling(&self, element: Element) -> Option<Element> {
        self.document.as_ref()?.next_sibling(element)
    }
}
