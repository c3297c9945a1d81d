//! Flat product table extractor
//!
//! Rows are `tr.main_item_wrapper`. The first two columns hold the article
//! link and the product name; property cells map onto the remaining headers
//! by position.

use crate::catalog::{PageKind, PagePayload, Product};
use crate::extract::fields::{first_text, reference_of, text_of};
use crate::extract::locator::{resolve_first, resolve_with};
use crate::extract::selectors::{
    FULL_LIST_LINK, LEADING_COLUMNS, ROW_ARTICLE_LINK, ROW_ARTICLE_TEXT, ROW_IMAGE, ROW_NAME,
    ROW_PROPS, TABLE_HEADERS, TABLE_ROWS,
};
use crate::extract::ExtractContext;
use crate::session::{Element, PageSession, Scope};
use tracing::{debug, warn};

/// Navigates to the "full list" page when the table is paginated
///
/// Returns true when the session moved. A failed navigation leaves the
/// current page in place and extraction continues on it.
pub async fn follow_full_list<S>(session: &mut S, ctx: &ExtractContext) -> bool
where
    S: PageSession,
{
    let target = resolve_with(&*session, Scope::Page, FULL_LIST_LINK, |el| {
        reference_of(&*session, el, &["href"], ctx)
    });
    let Some(target) = target else {
        return false;
    };
    if session.current_url().as_deref() == Some(target.as_str()) {
        return false;
    }

    debug!("Following full list link: {}", target);
    match session.navigate(&target).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Full list link {} failed, staying on page: {}", target, e);
            false
        }
    }
}

/// Header texts of the first candidate that yields any, without blanks
///
/// Repeated names are kept so each header stays aligned with its column.
pub fn collect_headers<S>(session: &S, scope: Scope, candidates: &[&str]) -> Vec<String>
where
    S: PageSession + ?Sized,
{
    for locator in candidates {
        let Ok(cells) = session.query(scope, locator) else {
            continue;
        };
        let mut headers: Vec<String> = Vec::new();
        for cell in cells {
            if let Some(text) = text_of(session, cell) {
                headers.push(text);
            }
        }
        if !headers.is_empty() {
            return headers;
        }
    }
    Vec::new()
}

/// Column name for property cell `index`
///
/// Property cells start after the article and name columns; cells beyond the
/// known headers become `param_<n>` (1-based).
pub fn column_name(headers: &[String], index: usize) -> String {
    headers
        .get(index + LEADING_COLUMNS)
        .cloned()
        .unwrap_or_else(|| format!("param_{}", index + 1))
}

/// Builds a product from one table row
pub fn row_product<S>(session: &S, row: Element, headers: &[String], ctx: &ExtractContext) -> Product
where
    S: PageSession + ?Sized,
{
    let scope = Scope::Within(row);

    let name = first_text(session, scope, ROW_NAME).unwrap_or_default();
    let mut product = Product::named(&name);

    if let Some(link) = resolve_first(session, scope, ROW_ARTICLE_LINK) {
        product.article = first_text(session, Scope::Within(link), ROW_ARTICLE_TEXT)
            .or_else(|| text_of(session, link));
        product.url = reference_of(session, link, &["href"], ctx);
    }

    product.image_url = resolve_with(session, scope, ROW_IMAGE, |el| {
        reference_of(session, el, &["src", "data-src"], ctx)
    });

    let cells = session.query(scope, ROW_PROPS).unwrap_or_default();
    for (index, cell) in cells.into_iter().enumerate() {
        let value = session.text(cell);
        product.set_attribute(&column_name(headers, index), value.trim());
    }

    product
}

/// Products of every row under `scope`
pub fn table_rows<S>(session: &S, scope: Scope, headers: &[String], ctx: &ExtractContext) -> Vec<Product>
where
    S: PageSession + ?Sized,
{
    session
        .query(scope, TABLE_ROWS)
        .unwrap_or_default()
        .into_iter()
        .map(|row| row_product(session, row, headers, ctx))
        .collect()
}

/// Extracts a flat product table from the current page
pub fn extract_table<S>(session: &S, ctx: &ExtractContext) -> PagePayload
where
    S: PageSession + ?Sized,
{
    let mut headers = collect_headers(session, Scope::Page, TABLE_HEADERS);
    if headers.is_empty() {
        debug!("No table headers found, using configured defaults");
        headers = ctx.default_headers.clone();
    }

    let products = table_rows(session, Scope::Page, &headers, ctx);
    if products.is_empty() {
        return PagePayload::Empty;
    }
    debug!("Table rows: {}", products.len());

    PagePayload::Products {
        kind: PageKind::ProductTable,
        headers,
        products,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UNNAMED_PRODUCT;
    use crate::extract::testing::{context, page, PAGE_URL};
    use crate::session::FixtureSite;
    use pretty_assertions::assert_eq;

    const TABLE: &str = r#"<html><body><table>
      <tr class="table-view__item-wrapper--head">
        <th>Art</th><th>Name</th><th>Power</th><th>Price</th><th> </th>
      </tr>
      <tr class="main_item_wrapper">
        <td><a class="dark_link js-notice-block__title" href="/catalog/lathes/ck1/"><span>CK-1</span></a></td>
        <td><span class="font_md">Bench lathe</span></td>
        <td class="table-view__item-wrapper-prop">5kW</td>
        <td class="table-view__item-wrapper-prop">$100</td>
        <td class="table-view__item-wrapper-prop">in stock</td>
        <td><div class="section_img"><img src="/upload/ck1.jpg"></div></td>
      </tr>
      <tr class="main_item_wrapper">
        <td class="table-view__item-wrapper-prop">7kW</td>
      </tr>
    </table></body></html>"#;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_name_offsets() {
        let h = headers(&["Art", "Name", "Power", "Price"]);
        assert_eq!(column_name(&h, 0), "Power");
        assert_eq!(column_name(&h, 1), "Price");
        assert_eq!(column_name(&h, 2), "param_3");
        assert_eq!(column_name(&[], 0), "param_1");
    }

    #[tokio::test]
    async fn test_extract_table() {
        let session = page(TABLE).await;
        let PagePayload::Products { kind, headers: found, products } = extract_table(&session, &context())
        else {
            panic!("expected products");
        };

        assert_eq!(kind, PageKind::ProductTable);
        assert_eq!(found, headers(&["Art", "Name", "Power", "Price"]));
        assert_eq!(products.len(), 2);

        let first = &products[0];
        assert_eq!(first.name, "Bench lathe");
        assert_eq!(first.article.as_deref(), Some("CK-1"));
        assert_eq!(first.url.as_deref(), Some("https://shop.test/catalog/lathes/ck1/"));
        assert_eq!(first.image_url.as_deref(), Some("https://shop.test/upload/ck1.jpg"));

        let attributes: Vec<(&str, &str)> = first
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(
            attributes,
            vec![("Power", "5kW"), ("Price", "$100"), ("param_3", "in stock")]
        );

        assert_eq!(products[1].name, UNNAMED_PRODUCT);
        assert_eq!(products[1].article, None);
        assert_eq!(products[1].attributes["Power"], "7kW");
    }

    #[tokio::test]
    async fn test_duplicate_headers_keep_positions() {
        let html = r#"<html><body><table>
          <tr class="table-view__item-wrapper--head">
            <th>Art</th><th>Name</th><th>Price</th><th>Price</th><th>Power</th>
          </tr>
          <tr class="main_item_wrapper">
            <td class="table-view__item-wrapper-prop">$1</td>
            <td class="table-view__item-wrapper-prop">$2</td>
            <td class="table-view__item-wrapper-prop">5kW</td>
          </tr>
        </table></body></html>"#;
        let session = page(html).await;
        let PagePayload::Products { headers: found, products, .. } = extract_table(&session, &context())
        else {
            panic!("expected products");
        };

        assert_eq!(found, headers(&["Art", "Name", "Price", "Price", "Power"]));
        let attributes: Vec<(&str, &str)> = products[0]
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(attributes, vec![("Price", "$2"), ("Power", "5kW")]);
    }

    #[tokio::test]
    async fn test_default_headers_when_none_declared() {
        let html = r#"<html><body><table><tr class="main_item_wrapper">
            <td class="table-view__item-wrapper-prop">Fanuc</td>
        </tr></table></body></html>"#;
        let session = page(html).await;
        let PagePayload::Products { headers: found, products, .. } = extract_table(&session, &context())
        else {
            panic!("expected products");
        };

        assert_eq!(found.len(), 9);
        assert_eq!(products[0].attributes["CNC system"], "Fanuc");
    }

    #[tokio::test]
    async fn test_no_rows_is_empty() {
        let session = page("<html><body><table><tr><th>Art</th></tr></table></body></html>").await;
        assert_eq!(extract_table(&session, &context()), PagePayload::Empty);
    }

    #[tokio::test]
    async fn test_follow_full_list() {
        let full = "https://shop.test/catalog/page/?SHOWALL_1=1";
        let site = FixtureSite::new()
            .with_page(
                PAGE_URL,
                r#"<div class="module-pagination"><a class="link" href="/catalog/page/?SHOWALL_1=1">All</a></div>"#,
            )
            .with_page(full, TABLE);
        let mut session = site.session();
        session.navigate(PAGE_URL).await.unwrap();

        assert!(follow_full_list(&mut session, &context()).await);
        assert_eq!(session.current_url().as_deref(), Some(full));
        // Already on the full list: no further navigation
        assert!(!follow_full_list(&mut session, &context()).await);
        assert_eq!(site.navigation_count(full), 1);
    }
}
