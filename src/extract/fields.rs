//! Typed field lookups shared by the extractors
//!
//! Every lookup degrades to `None` on failure; a missing field never aborts
//! extraction of the surrounding item.

use crate::catalog::Product;
use crate::extract::locator::resolve_with;
use crate::extract::selectors::{
    IMAGE_EXTENSIONS, ITEM_IMAGE, ITEM_IMAGE_LAZY, ITEM_LINK, ITEM_LINK_NAME, ITEM_PREORDER,
    ITEM_PRICE,
};
use crate::extract::ExtractContext;
use crate::session::{Element, PageSession, Scope};

/// Trimmed text of an element, `None` when blank
pub fn text_of<S>(session: &S, element: Element) -> Option<String>
where
    S: PageSession + ?Sized,
{
    let text = session.text(element);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Text of the first candidate whose first match is not blank
pub fn first_text<S>(session: &S, scope: Scope, candidates: &[&str]) -> Option<String>
where
    S: PageSession + ?Sized,
{
    resolve_with(session, scope, candidates, |el| text_of(session, el))
}

/// Absolute URL from the first of `attributes` that normalizes
pub fn reference_of<S>(
    session: &S,
    element: Element,
    attributes: &[&str],
    ctx: &ExtractContext,
) -> Option<String>
where
    S: PageSession + ?Sized,
{
    attributes
        .iter()
        .filter_map(|name| session.attribute(element, name))
        .find_map(|raw| ctx.absolutize(&raw))
}

pub fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

pub fn has_image_extension(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lowered.contains(ext))
}

/// Price text, falling back to a preorder label
///
/// Returns `(price, is_preorder)`. The price must contain a digit; the
/// preorder label only needs to be non-blank.
pub fn price_or_preorder<S>(
    session: &S,
    scope: Scope,
    price_candidates: &[&str],
    preorder_candidates: &[&str],
) -> (Option<String>, bool)
where
    S: PageSession + ?Sized,
{
    let price = resolve_with(session, scope, price_candidates, |el| {
        text_of(session, el).filter(|text| has_digit(text))
    });
    if price.is_some() {
        return (price, false);
    }

    match first_text(session, scope, preorder_candidates) {
        Some(label) => (Some(label), true),
        None => (None, false),
    }
}

/// Lazy `data-src` gallery spans first, then `img` sources
pub fn item_image<S>(session: &S, item: Element, ctx: &ExtractContext) -> Option<String>
where
    S: PageSession + ?Sized,
{
    let scope = Scope::Within(item);
    resolve_with(session, scope, ITEM_IMAGE_LAZY, |el| {
        reference_of(session, el, &["data-src"], ctx)
    })
    .or_else(|| {
        resolve_with(session, scope, ITEM_IMAGE, |el| {
            reference_of(session, el, &["data-src", "src"], ctx)
        })
    })
}

/// Builds a product from one list item
///
/// A list item may itself be the product link (`a.thumb` layouts), so the
/// item's own `href` is used when no nested link matches.
pub fn list_item_product<S>(session: &S, item: Element, ctx: &ExtractContext) -> Product
where
    S: PageSession + ?Sized,
{
    let scope = Scope::Within(item);

    let link = resolve_with(session, scope, ITEM_LINK, |el| {
        reference_of(session, el, &["href"], ctx).map(|url| (el, url))
    });

    let name = link
        .as_ref()
        .and_then(|(el, _)| {
            first_text(session, Scope::Within(*el), ITEM_LINK_NAME).or_else(|| text_of(session, *el))
        })
        .unwrap_or_default();

    let mut product = Product::named(&name);
    product.url = link
        .map(|(_, url)| url)
        .or_else(|| reference_of(session, item, &["href"], ctx));
    product.image_url = item_image(session, item, ctx);

    let (price, is_preorder) = price_or_preorder(session, scope, ITEM_PRICE, ITEM_PREORDER);
    product.price = price;
    product.is_preorder = is_preorder;

    product
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UNNAMED_PRODUCT;
    use crate::extract::testing::{context, page};
    use crate::extract::locator::resolve_all;

    const LIST: &str = r##"<html><body>
      <div class="list_item item_info catalog-adaptive flexbox flexbox--row">
        <div class="section-gallery-wrapper flexbox">
          <span class="section-gallery-wrapper__item" data-src="/upload/iblock/ck6136.jpg"></span>
        </div>
        <a class="dark_link js-notice-block__title" href="/catalog/lathes/ck6136/"><span>CK6136 lathe</span></a>
        <div class="price_matrix_wrapper"><span class="price">1 250 000 RUB</span></div>
      </div>
      <div class="list_item item_info catalog-adaptive flexbox flexbox--row">
        <div class="image_block"><img src="//cdn.shop.test/ck6150.png"></div>
        <a class="dark_link js-notice-block__title" href="/catalog/lathes/ck6150/">  </a>
        <span class="price">on request</span>
        <a class="to-order" href="#">Preorder</a>
      </div>
      <div class="list_item item_info catalog-adaptive flexbox flexbox--row">
        <span class="price">—</span>
      </div>
    </body></html>"##;

    async fn items() -> (crate::session::FixturePageSession, Vec<Element>) {
        let session = page(LIST).await;
        let items = resolve_all(&session, Scope::Page, &["div.list_item"]);
        (session, items)
    }

    #[tokio::test]
    async fn test_full_item() {
        let (session, items) = items().await;
        let product = list_item_product(&session, items[0], &context());

        assert_eq!(product.name, "CK6136 lathe");
        assert_eq!(product.url.as_deref(), Some("https://shop.test/catalog/lathes/ck6136/"));
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://shop.test/upload/iblock/ck6136.jpg")
        );
        assert_eq!(product.price.as_deref(), Some("1 250 000 RUB"));
        assert!(!product.is_preorder);
    }

    #[tokio::test]
    async fn test_preorder_item_without_name() {
        let (session, items) = items().await;
        let product = list_item_product(&session, items[1], &context());

        assert_eq!(product.name, UNNAMED_PRODUCT);
        assert_eq!(product.image_url.as_deref(), Some("https://cdn.shop.test/ck6150.png"));
        assert_eq!(product.price.as_deref(), Some("Preorder"));
        assert!(product.is_preorder);
    }

    #[tokio::test]
    async fn test_bare_item_degrades_to_absent_fields() {
        let (session, items) = items().await;
        let product = list_item_product(&session, items[2], &context());

        assert_eq!(product.name, UNNAMED_PRODUCT);
        assert_eq!(product.url, None);
        assert_eq!(product.image_url, None);
        assert_eq!(product.price, None);
        assert!(!product.is_preorder);
    }

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension("/upload/A.JPG"));
        assert!(has_image_extension("https://x.test/a.jpeg?v=2"));
        assert!(!has_image_extension("/catalog/lathes/"));
    }
}
