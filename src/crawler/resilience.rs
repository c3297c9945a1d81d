//! Resilience layer
//!
//! Wraps a page session with page-load retries, session restarts and
//! extraction retries. Every page the crawler visits is loaded through
//! [`ResilientSession::load_page`].

use crate::catalog::{PageKind, PagePayload};
use crate::config::CrawlerConfig;
use crate::extract::{classify_and_extract, ExtractContext};
use crate::session::{PageSession, SessionError};
use crate::{CatalogError, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Marker that identifies server error pages by title
const ERROR_TITLE_MARKER: &str = "Error";

/// Retry bounds and delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub page_load_attempts: u32,
    pub extract_attempts: u32,
    pub min_content_length: usize,
    pub settle_delay: Duration,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            page_load_attempts: config.page_load_attempts.max(1),
            extract_attempts: config.extract_attempts.max(1),
            min_content_length: config.min_content_length,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// A page session with retry and recovery
pub struct ResilientSession<S> {
    session: S,
    policy: RetryPolicy,
    last_successful_url: Option<String>,
}

impl<S: PageSession> ResilientSession<S> {
    pub fn new(session: S, policy: RetryPolicy) -> Self {
        Self {
            session,
            policy,
            last_successful_url: None,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// URL of the last page that loaded and validated
    pub fn last_successful_url(&self) -> Option<&str> {
        self.last_successful_url.as_deref()
    }

    /// Loads `url`, restarting the session between failed attempts
    ///
    /// A permanently failing URL costs exactly `page_load_attempts`
    /// navigations and one restart fewer.
    pub async fn load_page(&mut self, url: &str) -> Result<()> {
        let attempts = self.policy.page_load_attempts;

        for attempt in 1..=attempts {
            let reason = match self.session.navigate(url).await {
                Ok(()) => match self.validate() {
                    Ok(()) => {
                        let delay = self.session.crawl_delay().unwrap_or_default();
                        pause(self.policy.settle_delay.max(delay)).await;
                        self.last_successful_url = Some(url.to_string());
                        return Ok(());
                    }
                    Err(reason) => reason,
                },
                Err(e) => e.to_string(),
            };

            let failure = CatalogError::Navigation {
                url: url.to_string(),
                reason,
            };
            warn!("Attempt {}/{}: {}", attempt, attempts, failure);

            if attempt < attempts {
                self.restart().await?;
                pause(self.policy.retry_delay).await;
            }
        }

        Err(CatalogError::SessionExhausted {
            url: url.to_string(),
            attempts,
        })
    }

    /// Checks that the loaded page is a real page and not an error stub
    fn validate(&self) -> std::result::Result<(), String> {
        let title = self.session.title();
        if title.contains(ERROR_TITLE_MARKER) {
            return Err(format!("error page (title '{}')", title));
        }

        let length = self.session.content_length();
        if length < self.policy.min_content_length {
            return Err(format!(
                "content too short ({} < {} bytes)",
                length, self.policy.min_content_length
            ));
        }

        Ok(())
    }

    /// Classifies and extracts the current page, retrying empty results
    ///
    /// Between attempts the page is refreshed; when the refresh fails the
    /// session is restarted and the last good URL reloaded. After the last
    /// attempt the (empty) result is returned as is.
    pub async fn extract_with_retry(&mut self, ctx: &ExtractContext) -> (PageKind, PagePayload) {
        let attempts = self.policy.extract_attempts;
        let mut last_kind = PageKind::BlockStructuredTable;

        for attempt in 1..=attempts {
            let (kind, payload) = classify_and_extract(&mut self.session, ctx).await;
            if !payload.is_empty() {
                return (kind, payload);
            }
            last_kind = kind;

            if attempt < attempts {
                debug!(
                    "Empty {} result on attempt {}/{}, reloading",
                    kind, attempt, attempts
                );
                if let Err(e) = self.recover().await {
                    warn!("Could not reload page for extraction retry: {}", e);
                    break;
                }
                pause(self.policy.retry_delay).await;
            }
        }

        warn!(
            "No content extracted from {} after {} attempts",
            self.session.current_url().unwrap_or_default(),
            attempts
        );
        (last_kind, PagePayload::Empty)
    }

    async fn recover(&mut self) -> Result<()> {
        match self.session.refresh().await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Refresh failed ({}), restarting session", e);
                let url = self
                    .last_successful_url
                    .clone()
                    .ok_or(SessionError::NoPage)?;
                self.restart().await?;
                self.session.navigate(&url).await?;
                Ok(())
            }
        }
    }

    /// Restarts the underlying session
    ///
    /// A session that cannot be recreated is fatal for the caller.
    pub async fn restart(&mut self) -> Result<()> {
        info!("Restarting page session");
        self.session
            .restart()
            .await
            .map_err(|e| CatalogError::SessionInit(e.to_string()))
    }

    pub async fn close(mut self) -> Result<()> {
        self.session.close().await?;
        Ok(())
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::testing::context;
    use crate::session::FixtureSite;

    const URL: &str = "https://shop.test/catalog/lathes/";

    fn policy() -> RetryPolicy {
        RetryPolicy {
            min_content_length: 10,
            ..RetryPolicy::default()
        }
    }

    fn table(rows: usize) -> String {
        let rows: String = (0..rows)
            .map(|i| {
                format!(
                    r#"<tr class="main_item_wrapper"><td><span class="font_md">Item {}</span></td></tr>"#,
                    i
                )
            })
            .collect();
        format!("<html><body><table>{}</table></body></html>", rows)
    }

    #[tokio::test]
    async fn test_load_page_retry_bound() {
        let site = FixtureSite::new().with_page(URL, &table(1));
        site.fail_always(URL);
        let mut session = ResilientSession::new(site.session(), policy());

        let result = session.load_page(URL).await;

        assert!(matches!(
            result,
            Err(CatalogError::SessionExhausted { attempts: 3, .. })
        ));
        assert_eq!(site.navigation_count(URL), 3);
        assert_eq!(site.restart_count(), 2);
        assert!(session.last_successful_url().is_none());
    }

    #[tokio::test]
    async fn test_load_page_recovers_after_failures() {
        let site = FixtureSite::new().with_page(URL, &table(1));
        site.fail_times(URL, 2);
        let mut session = ResilientSession::new(site.session(), policy());

        session.load_page(URL).await.unwrap();

        assert_eq!(site.navigation_count(URL), 3);
        assert_eq!(site.restart_count(), 2);
        assert_eq!(session.last_successful_url(), Some(URL));
    }

    #[tokio::test]
    async fn test_error_title_and_short_pages_fail_validation() {
        let site = FixtureSite::new()
            .with_page(URL, "<html><head><title>502 Error</title></head><body>................</body></html>")
            .with_page("https://shop.test/short/", "<p>x</p>");
        let mut session = ResilientSession::new(site.session(), policy());

        assert!(session.load_page(URL).await.is_err());
        assert!(session.load_page("https://shop.test/short/").await.is_err());
    }

    #[tokio::test]
    async fn test_extract_with_retry_refreshes_empty_page() {
        let empty = "<html><body><p>Loading catalog...</p></body></html>";
        let loaded = table(2);
        let site = FixtureSite::new();
        site.add_page_versions(URL, &[empty, loaded.as_str()]);
        let mut session = ResilientSession::new(site.session(), policy());
        session.load_page(URL).await.unwrap();

        let (kind, payload) = session.extract_with_retry(&context()).await;

        assert_eq!(kind, PageKind::ProductTable);
        assert_eq!(payload.product_count(), 2);
        assert_eq!(site.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_extract_with_retry_gives_up_empty() {
        let site = FixtureSite::new().with_page(URL, "<html><body><p>Nothing here</p></body></html>");
        let mut session = ResilientSession::new(site.session(), policy());
        session.load_page(URL).await.unwrap();

        let (_, payload) = session.extract_with_retry(&context()).await;

        assert_eq!(payload, PagePayload::Empty);
        // Two attempts, one reload in between
        assert_eq!(site.refresh_count(), 1);
    }
}
