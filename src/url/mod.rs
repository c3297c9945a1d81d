//! URL handling module for the catalog crawler
//!
//! Two concerns live here:
//!
//! - `normalize_reference`: absolutizes raw `href`/`src` values found on catalog pages
//! - `canonical_key`: the identity used to deduplicate links and detect revisits

mod canonical;
mod reference;

pub use canonical::canonical_key;
pub use reference::normalize_reference;

use crate::UrlError;
use url::Url;

/// Returns `scheme://host[:port]` for a URL string
pub fn origin_of(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }
    Ok(url.origin().ascii_serialization())
}

/// Returns true when `url_str` contains the catalog path segment
///
/// Nested section links pointing anywhere else (news, brands, cart) are
/// not part of the catalog tree.
pub fn is_catalog_url(url_str: &str, catalog_path: &str) -> bool {
    url_str.contains(catalog_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://shop.test/catalog/lathes/").unwrap(),
            "https://shop.test"
        );
        assert_eq!(
            origin_of("http://127.0.0.1:4321/a").unwrap(),
            "http://127.0.0.1:4321"
        );
        assert!(origin_of("nope").is_err());
    }

    #[test]
    fn test_is_catalog_url() {
        assert!(is_catalog_url("https://shop.test/catalog/lathes/", "/catalog/"));
        assert!(!is_catalog_url("https://shop.test/news/2024/", "/catalog/"));
    }
}
