//! Child category link extraction

use crate::catalog::{NavLink, PagePayload};
use crate::extract::fields::{first_text, reference_of, text_of};
use crate::extract::locator::{resolve, resolve_all};
use crate::extract::selectors::{
    GRANDCHILD_LINKS, GRANDCHILD_NAME, NESTED_SECTION_LINKS, NESTED_SECTION_NAME,
};
use crate::extract::ExtractContext;
use crate::session::{PageSession, Scope};
use crate::url::{canonical_key, is_catalog_url};
use std::collections::HashSet;
use tracing::debug;

/// Links of a subcategory index page
///
/// Section tiles are tried first, then the nested section list.
pub fn extract_navigation<S>(session: &S, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    let mut links = grandchild_links(session, ctx);
    if links.is_empty() {
        links = nested_section_links(session, ctx);
    }

    if links.is_empty() {
        PagePayload::Empty
    } else {
        PagePayload::Links(links)
    }
}

/// Section tiles: `a.item_block_href` with the name in `span.font_md`
///
/// Tiles without a name or a usable href are skipped.
pub fn grandchild_links<S>(session: &S, ctx: &ExtractContext) -> Vec<NavLink>
where
    S: PageSession + ?Sized,
{
    let links = resolve_all(session, Scope::Page, GRANDCHILD_LINKS)
        .into_iter()
        .filter_map(|link| {
            let name = first_text(session, Scope::Within(link), GRANDCHILD_NAME)?;
            let url = reference_of(session, link, &["href"], ctx)?;
            Some(NavLink { name, url })
        })
        .collect();

    dedupe_links(links)
}

/// Links of the nested section list (one level below section tiles)
///
/// Only links inside the catalog are kept.
pub fn nested_section_links<S>(session: &S, ctx: &ExtractContext) -> Vec<NavLink>
where
    S: PageSession + ?Sized,
{
    let Some(found) = resolve(session, Scope::Page, NESTED_SECTION_LINKS) else {
        return Vec::new();
    };
    debug!(
        "Nested sections via '{}': {}",
        NESTED_SECTION_LINKS[found.candidate],
        found.elements.len()
    );

    let links = found
        .elements
        .into_iter()
        .filter_map(|link| {
            let url = reference_of(session, link, &["href"], ctx)?;
            if !is_catalog_url(&url, &ctx.catalog_path) {
                return None;
            }
            let name = first_text(session, Scope::Within(link), NESTED_SECTION_NAME)
                .or_else(|| text_of(session, link))?;
            Some(NavLink { name, url })
        })
        .collect();

    dedupe_links(links)
}

/// Drops links whose URL was already seen, keeping the first occurrence
pub fn dedupe_links(links: Vec<NavLink>) -> Vec<NavLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| {
            let key = canonical_key(&link.url).unwrap_or_else(|_| link.url.clone());
            seen.insert(key)
        })
        .collect()
}
