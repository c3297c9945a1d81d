//! Single product page extractor

use crate::catalog::{PageKind, PagePayload, Product};
use crate::extract::fields::{first_text, has_image_extension, price_or_preorder, reference_of, text_of};
use crate::extract::locator::resolve_with;
use crate::extract::selectors::{
    CHARACTERISTIC_ROWS, DETAIL_GALLERY_IMAGES, DETAIL_GALLERY_LINKS, DETAIL_PREORDER,
    DETAIL_PRICE, DETAIL_TITLE,
};
use crate::extract::ExtractContext;
use crate::session::{PageSession, Scope};
use tracing::debug;

/// Extracts the one product shown on a product detail page
pub fn extract_detail<S>(session: &S, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    let product = detail_product(session, ctx);
    debug!("Detail page product: {}", product.name);

    PagePayload::Products {
        kind: PageKind::SingleProductDetail,
        headers: product.attributes.keys().cloned().collect(),
        products: vec![product],
    }
}

fn detail_product<S>(session: &S, ctx: &ExtractContext) -> Product
where
    S: PageSession + ?Sized,
{
    let name = first_text(session, Scope::Page, DETAIL_TITLE).unwrap_or_default();
    let mut product = Product::named(&name);
    product.url = session.current_url();

    // Full-size gallery links first, then whatever image the gallery renders
    product.image_url = resolve_with(session, Scope::Page, DETAIL_GALLERY_LINKS, |el| {
        reference_of(session, el, &["href"], ctx).filter(|url| has_image_extension(url))
    })
    .or_else(|| {
        resolve_with(session, Scope::Page, DETAIL_GALLERY_IMAGES, |el| {
            reference_of(session, el, &["data-src", "src"], ctx)
        })
    });

    let (price, is_preorder) =
        price_or_preorder(session, Scope::Page, DETAIL_PRICE, DETAIL_PREORDER);
    product.price = price;
    product.is_preorder = is_preorder;

    for row in session.query(Scope::Page, CHARACTERISTIC_ROWS).unwrap_or_default() {
        let cells = session.query(Scope::Within(row), "td").unwrap_or_default();
        if cells.len() < 2 {
            continue;
        }
        if let (Some(key), Some(value)) = (text_of(session, cells[0]), text_of(session, cells[1])) {
            product.set_attribute(&key, &value);
        }
    }

    product
}
