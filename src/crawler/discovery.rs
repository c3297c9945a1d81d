//! Top-level category discovery from the site menu

use crate::catalog::{CategoryNode, NavLink};
use crate::extract::fields::{first_text, reference_of, text_of};
use crate::extract::navigation::dedupe_links;
use crate::extract::selectors::{
    CATEGORY_LINKS, CATEGORY_NAME, SUBCATEGORY_DROPDOWN_CLASS, SUBCATEGORY_LINKS,
};
use crate::extract::ExtractContext;
use crate::session::{Element, PageSession, Scope};
use crate::url::canonical_key;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Name used for menu entries without a label
pub const UNKNOWN_CATEGORY: &str = "Unknown category";

/// Reads the category menu of the current page
///
/// Each category comes back with its dropdown subcategories as children.
/// Categories without a usable href are skipped.
pub fn discover_categories<S>(session: &S, ctx: &ExtractContext) -> Vec<CategoryNode>
where
    S: PageSession + ?Sized,
{
    let links = match session.query(Scope::Page, CATEGORY_LINKS) {
        Ok(links) => links,
        Err(e) => {
            warn!("Category menu lookup failed: {}", e);
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut categories = Vec::new();

    for link in links {
        let Some(url) = reference_of(session, link, &["href"], ctx) else {
            debug!("Skipping category link without href");
            continue;
        };
        let key = canonical_key(&url).unwrap_or_else(|_| url.clone());
        if !seen.insert(key) {
            continue;
        }

        let name = first_text(session, Scope::Within(link), CATEGORY_NAME)
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
        let mut category = CategoryNode::new(&name, &url);
        category.children = subcategory_links(session, link, ctx)
            .iter()
            .map(CategoryNode::from_link)
            .collect();

        debug!(
            "Category '{}' with {} subcategories",
            category.name,
            category.children.len()
        );
        categories.push(category);
    }

    categories
}

/// Subcategory links inside the dropdown that follows `category_link`
fn subcategory_links<S>(session: &S, category_link: Element, ctx: &ExtractContext) -> Vec<NavLink>
where
    S: PageSession + ?Sized,
{
    let Some(dropdown) = session.next_sibling(category_link) else {
        return Vec::new();
    };
    let is_dropdown = session
        .attribute(dropdown, "class")
        .is_some_and(|class| class.contains(SUBCATEGORY_DROPDOWN_CLASS));
    if !is_dropdown {
        return Vec::new();
    }

    let links = session
        .query(Scope::Within(dropdown), SUBCATEGORY_LINKS)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|link| {
            let name = text_of(session, link)?;
            let url = reference_of(session, link, &["href"], ctx)?;
            Some(NavLink { name, url })
        })
        .collect();

    dedupe_links(links)
}
