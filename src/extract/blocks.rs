//! Block-structured table extractor
//!
//! Some category pages group products into titled blocks, each with its own
//! picture and column schema.

use crate::catalog::{PagePayload, ProductBlock};
use crate::extract::detail::extract_detail;
use crate::extract::fields::{first_text, reference_of};
use crate::extract::listing::extract_listing;
use crate::extract::locator::{any_matches, resolve, resolve_with};
use crate::extract::selectors::{
    BLOCKLESS_DETAIL_INDICATORS, BLOCKLESS_LIST_ITEMS, BLOCKS, BLOCK_HEADERS, BLOCK_IMAGE,
    BLOCK_IMAGE_LINKS, BLOCK_TITLE_BEFORE, BLOCK_TITLE_INSIDE, SINGLE_PRODUCT_BLOCK_TITLE,
    TABLE_ROWS,
};
use crate::extract::table::{collect_headers, extract_table, table_rows};
use crate::extract::ExtractContext;
use crate::session::{Element, PageSession, Scope};
use tracing::{debug, warn};

/// Extracts product blocks, falling back to other layouts when there are none
pub fn extract_blocks<S>(session: &S, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    let Some(found) = resolve(session, Scope::Page, BLOCKS) else {
        return extract_blockless(session, ctx);
    };
    debug!(
        "Blocks via '{}': {}",
        BLOCKS[found.candidate],
        found.elements.len()
    );

    let blocks: Vec<ProductBlock> = found
        .elements
        .iter()
        .enumerate()
        .filter_map(|(index, block)| extract_block(session, *block, index, ctx))
        .collect();

    if blocks.is_empty() {
        debug!("No usable blocks, falling back to flat table");
        return extract_table(session, ctx);
    }

    PagePayload::Blocks(blocks)
}

/// Title from the previous sibling, then from inside the block
fn block_title<S>(session: &S, block: Element) -> Option<String>
where
    S: PageSession + ?Sized,
{
    session
        .previous_sibling(block)
        .and_then(|prev| first_text(session, Scope::Within(prev), BLOCK_TITLE_BEFORE))
        .or_else(|| first_text(session, Scope::Within(block), BLOCK_TITLE_INSIDE))
}

fn block_image<S>(session: &S, block: Element, ctx: &ExtractContext) -> Option<String>
where
    S: PageSession + ?Sized,
{
    let scope = Scope::Within(block);
    resolve_with(session, scope, BLOCK_IMAGE_LINKS, |el| {
        reference_of(session, el, &["href"], ctx)
    })
    .or_else(|| {
        resolve_with(session, scope, BLOCK_IMAGE, |el| {
            reference_of(session, el, &["src", "data-src"], ctx)
        })
    })
}

/// A block is kept when it holds products or carries a real title
fn extract_block<S>(
    session: &S,
    block: Element,
    index: usize,
    ctx: &ExtractContext,
) -> Option<ProductBlock>
where
    S: PageSession + ?Sized,
{
    let title = block_title(session, block);

    let mut headers = collect_headers(session, Scope::Within(block), &[BLOCK_HEADERS]);
    if headers.is_empty() {
        headers = ctx.block_fallback_headers.clone();
    }

    let products = table_rows(session, Scope::Within(block), &headers, ctx);
    if products.is_empty() && title.is_none() {
        warn!("Skipping block {}: no title and no products", index + 1);
        return None;
    }

    Some(ProductBlock {
        title: title.unwrap_or_else(|| format!("Block {}", index + 1)),
        image_url: block_image(session, block, ctx),
        column_headers: headers,
        products,
    })
}

/// Dispatch for block pages without any block container
fn extract_blockless<S>(session: &S, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    if any_matches(session, Scope::Page, BLOCKLESS_DETAIL_INDICATORS) {
        debug!("Blockless page is a product detail page");
        if let PagePayload::Products { products, .. } = extract_detail(session, ctx) {
            return PagePayload::Blocks(vec![ProductBlock {
                title: SINGLE_PRODUCT_BLOCK_TITLE.to_string(),
                image_url: products.first().and_then(|p| p.image_url.clone()),
                column_headers: Vec::new(),
                products,
            }]);
        }
    }

    if any_matches(session, Scope::Page, BLOCKLESS_LIST_ITEMS) {
        debug!("Blockless page is a product list");
        return extract_listing(session, ctx);
    }

    if any_matches(session, Scope::Page, &[TABLE_ROWS]) {
        debug!("Blockless page is a flat table");
        return extract_table(session, ctx);
    }

    PagePayload::Empty
}
