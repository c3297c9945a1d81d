//! Page classification
//!
//! Probes run in a fixed priority order and the first hit decides:
//!
//! 1. section tiles → `SubcategoryIndex`
//! 2. gallery / product title / product panels → `SingleProductDetail`
//! 3. card list containers → `ProductList`
//! 4. anything else → block tables, or a flat table when there are no blocks
//!
//! The probes overlap on some templates (a list page may embed a
//! `.product-info` panel); the order above is what decides those pages.

use crate::catalog::{PageKind, PagePayload};
use crate::extract::blocks::extract_blocks;
use crate::extract::detail::extract_detail;
use crate::extract::listing::extract_listing;
use crate::extract::locator::any_matches;
use crate::extract::navigation::extract_navigation;
use crate::extract::selectors::{DETAIL_INDICATORS, PRODUCT_LIST_PROBES, SUBCATEGORY_INDEX};
use crate::extract::table::{extract_table, follow_full_list};
use crate::extract::ExtractContext;
use crate::session::{PageSession, Scope};
use tracing::debug;

/// Decides what the current page contains without extracting anything
pub fn classify<S>(session: &S) -> PageKind
where
    S: PageSession + ?Sized,
{
    if any_matches(session, Scope::Page, SUBCATEGORY_INDEX) {
        PageKind::SubcategoryIndex
    } else if any_matches(session, Scope::Page, DETAIL_INDICATORS) {
        PageKind::SingleProductDetail
    } else if any_matches(session, Scope::Page, PRODUCT_LIST_PROBES) {
        PageKind::ProductList
    } else {
        PageKind::BlockStructuredTable
    }
}

/// Runs the extractor for `kind` against the current page
pub fn extract_kind<S>(session: &S, kind: PageKind, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    match kind {
        PageKind::SubcategoryIndex => extract_navigation(session, ctx),
        PageKind::SingleProductDetail => extract_detail(session, ctx),
        PageKind::ProductList => extract_listing(session, ctx),
        PageKind::ProductTable => extract_table(session, ctx),
        PageKind::BlockStructuredTable => extract_blocks(session, ctx),
    }
}

/// Classifies the current page and extracts its payload
///
/// Table-like pages first follow their "full list" link. The returned kind
/// reflects the extractor that actually produced the payload, so a block
/// page without blocks reports `ProductTable`.
pub async fn classify_and_extract<S>(session: &mut S, ctx: &ExtractContext) -> (PageKind, PagePayload)
where
    S: PageSession,
{
    let probed = classify(&*session);
    debug!(
        "Classified {} as {}",
        session.current_url().unwrap_or_default(),
        probed
    );

    if probed == PageKind::BlockStructuredTable {
        follow_full_list(session, ctx).await;
    }

    let payload = extract_kind(&*session, probed, ctx);
    let kind = match &payload {
        PagePayload::Products { kind, .. } => *kind,
        PagePayload::Blocks(_) => PageKind::BlockStructuredTable,
        PagePayload::Links(_) => PageKind::SubcategoryIndex,
        PagePayload::Empty => probed,
    };

    (kind, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::{context, page};

    #[tokio::test]
    async fn test_priority_order() {
        let cases = [
            (
                r#"<div class="sections_wrapper block"></div><div class="product-main"></div>"#,
                PageKind::SubcategoryIndex,
            ),
            (
                r#"<div class="product-info"></div><div class="list_item_wrapp"></div>"#,
                PageKind::SingleProductDetail,
            ),
            (
                r#"<div class="list_item item_info catalog-adaptive"></div>"#,
                PageKind::ProductList,
            ),
            (r#"<table></table>"#, PageKind::BlockStructuredTable),
        ];

        for (html, expected) in cases {
            let session = page(html).await;
            assert_eq!(classify(&session), expected, "{}", html);
        }
    }

    #[tokio::test]
    async fn test_index_page_never_yields_products() {
        // Section tiles next to product markup: only links come back
        let html = r#"<html><body>
          <div class="sections_wrapper block">
            <a class="item_block_href" href="/catalog/a/"><span class="font_md">A</span></a>
          </div>
          <div class="list_item item_info catalog-adaptive">
            <a class="dark_link js-notice-block__title" href="/catalog/a/p/"><span>P</span></a>
          </div>
          <table><tr class="main_item_wrapper"><td><span class="font_md">Row</span></td></tr></table>
        </body></html>"#;
        let mut session = page(html).await;
        let (kind, payload) = classify_and_extract(&mut session, &context()).await;

        assert_eq!(kind, PageKind::SubcategoryIndex);
        assert!(matches!(payload, PagePayload::Links(ref links) if links.len() == 1));
        assert_eq!(payload.product_count(), 0);
    }

    #[tokio::test]
    async fn test_product_page_never_yields_links() {
        let html = r#"<html><body>
          <div class="catalog_section_list"><a href="/catalog/other/">Other</a></div>
          <table><tr class="main_item_wrapper"><td><span class="font_md">Row</span></td></tr></table>
        </body></html>"#;
        let mut session = page(html).await;
        let (kind, payload) = classify_and_extract(&mut session, &context()).await;

        assert_eq!(kind, PageKind::ProductTable);
        assert!(!matches!(payload, PagePayload::Links(_)));
        assert_eq!(payload.product_count(), 1);
    }
}
