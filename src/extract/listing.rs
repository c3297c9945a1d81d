//! Product list (card/tile) extractor

use crate::catalog::{PageKind, PagePayload};
use crate::extract::detail::extract_detail;
use crate::extract::fields::list_item_product;
use crate::extract::locator::{any_matches, resolve};
use crate::extract::selectors::{DETAIL_REDISPATCH_INDICATORS, LIST_ITEMS};
use crate::extract::ExtractContext;
use crate::session::{PageSession, Scope};
use tracing::{debug, warn};

/// Extracts every product card on a list page
///
/// Pages that turn out to be a single product are handed to the detail
/// extractor instead.
pub fn extract_listing<S>(session: &S, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    if any_matches(session, Scope::Page, DETAIL_REDISPATCH_INDICATORS) {
        debug!("List page shows a product detail layout, re-dispatching");
        return extract_detail(session, ctx);
    }

    let Some(items) = resolve(session, Scope::Page, LIST_ITEMS) else {
        warn!(
            "No list items on {}",
            session.current_url().unwrap_or_default()
        );
        return PagePayload::Empty;
    };
    debug!(
        "List items via '{}': {}",
        LIST_ITEMS[items.candidate],
        items.elements.len()
    );

    let products: Vec<_> = items
        .elements
        .iter()
        .map(|item| list_item_product(session, *item, ctx))
        .collect();

    PagePayload::Products {
        kind: PageKind::ProductList,
        headers: Vec::new(),
        products,
    }
}
