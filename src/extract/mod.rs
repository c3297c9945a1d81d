//! Page classification and extraction
//!
//! The classifier decides what a rendered page contains; one extractor per
//! page kind turns it into a `PagePayload`. All lookups go through the
//! locator resolver with the candidate lists in `selectors`.

pub mod blocks;
pub mod classifier;
pub mod detail;
pub mod fields;
pub mod listing;
pub mod locator;
pub mod navigation;
pub mod selectors;
pub mod table;

pub use crate::catalog::{PageKind, PagePayload};
pub use classifier::{classify, classify_and_extract};

use crate::config::Config;
use crate::url::normalize_reference;
use crate::UrlError;
use url::Url;

/// Site-specific settings the extractors need
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Origin used to absolutize references
    pub origin: Url,
    /// Segment nested catalog links must contain
    pub catalog_path: String,
    /// Table columns used when a page declares none
    pub default_headers: Vec<String>,
    /// Block columns used when a block declares none
    pub block_fallback_headers: Vec<String>,
}

impl ExtractContext {
    pub fn from_config(config: &Config) -> Result<Self, UrlError> {
        let origin =
            Url::parse(&config.site.base_origin).map_err(|e| UrlError::Parse(e.to_string()))?;
        Ok(Self {
            origin,
            catalog_path: config.site.catalog_path.clone(),
            default_headers: config.extraction.default_headers.clone(),
            block_fallback_headers: config.extraction.block_fallback_headers.clone(),
        })
    }

    /// Absolute form of a raw reference found on a page
    pub fn absolutize(&self, raw: &str) -> Option<String> {
        normalize_reference(raw, &self.origin)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ExtractContext;
    use crate::config::ExtractionConfig;
    use crate::session::{FixturePageSession, FixtureSite, PageSession};
    use url::Url;

    pub const PAGE_URL: &str = "https://shop.test/catalog/page/";

    pub fn context() -> ExtractContext {
        let extraction = ExtractionConfig::default();
        ExtractContext {
            origin: Url::parse("https://shop.test").unwrap(),
            catalog_path: "/catalog/".to_string(),
            default_headers: extraction.default_headers,
            block_fallback_headers: extraction.block_fallback_headers,
        }
    }

    /// A fixture session with `html` loaded at `PAGE_URL`
    pub async fn page(html: &str) -> FixturePageSession {
        let site = FixtureSite::new().with_page(PAGE_URL, html);
        let mut session = site.session();
        session.navigate(PAGE_URL).await.unwrap();
        session
    }
}
