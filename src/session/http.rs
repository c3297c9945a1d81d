//! HTTP page session
//!
//! Fetches pages with reqwest and keeps a scraper snapshot of the last
//! successful response. Restarting rebuilds the client, which drops cookies
//! and pooled connections.

use crate::config::UserAgentConfig;
use crate::robots::{fetch_robots, RobotsRules};
use crate::session::{
    Document, Element, PageSession, Scope, SessionError, SessionFactory, SessionResult,
};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page session over plain HTTP
pub struct HttpPageSession {
    user_agent: UserAgentConfig,
    respect_robots: bool,
    client: Client,
    document: Option<Document>,
    robots: HashMap<String, RobotsRules>,
}

impl HttpPageSession {
    pub fn new(user_agent: UserAgentConfig, respect_robots: bool) -> SessionResult<Self> {
        let client =
            build_http_client(&user_agent).map_err(|e| SessionError::Init(e.to_string()))?;
        Ok(Self {
            user_agent,
            respect_robots,
            client,
            document: None,
            robots: HashMap::new(),
        })
    }

    /// Loads robots.txt for the origin of `url` on first use and checks `url` against it
    async fn check_robots(&mut self, url: &str) -> SessionResult<()> {
        if !self.respect_robots {
            return Ok(());
        }

        let origin = crate::url::origin_of(url).map_err(|_| SessionError::NotFound {
            url: url.to_string(),
        })?;

        if !self.robots.contains_key(&origin) {
            let rules = fetch_robots(&self.client, &origin).await;
            self.robots.insert(origin.clone(), rules);
        }

        let agent = &self.user_agent.crawler_name;
        match self.robots.get(&origin) {
            Some(rules) if !rules.is_allowed(url, agent) => Err(SessionError::RobotsDenied {
                url: url.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl PageSession for HttpPageSession {
    async fn navigate(&mut self, url: &str) -> SessionResult<()> {
        self.check_robots(url).await?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| SessionError::Http {
            url: url.to_string(),
            source: e,
        })?;

        debug!("Loaded {} ({} bytes)", final_url, body.len());
        self.document = Some(Document::parse(&final_url, &body));
        Ok(())
    }

    async fn refresh(&mut self) -> SessionResult<()> {
        let url = self.current_url().ok_or(SessionError::NoPage)?;
        self.navigate(&url).await
    }

    async fn restart(&mut self) -> SessionResult<()> {
        info!("Restarting HTTP session");
        self.client =
            build_http_client(&self.user_agent).map_err(|e| SessionError::Init(e.to_string()))?;
        self.document = None;
        Ok(())
    }

    async fn close(&mut self) -> SessionResult<()> {
        self.document = None;
        Ok(())
    }

    fn current_url(&self) -> Option<String> {
        self.document.as_ref().map(|doc| doc.url().to_string())
    }

    fn title(&self) -> String {
        self.document.as_ref().map(Document::title).unwrap_or_default()
    }

    fn content_length(&self) -> usize {
        self.document.as_ref().map_or(0, Document::content_length)
    }

    fn query(&self, scope: Scope, locator: &str) -> SessionResult<Vec<Element>> {
        self.document
            .as_ref()
            .ok_or(SessionError::NoPage)?
            .query(scope, locator)
    }

    fn text(&self, element: Element) -> String {
        self.document
            .as_ref()
            .map(|doc| doc.text(element))
            .unwrap_or_default()
    }

    fn attribute(&self, element: Element, name: &str) -> Option<String> {
        self.document.as_ref()?.attribute(element, name)
    }

    fn previous_sibling(&self, element: Element) -> Option<Element> {
        self.document.as_ref()?.previous_sibling(element)
    }

    fn next_sibling(&self, element: Element) -> Option<Element> {
        self.document.as_ref()?.next_sibling(element)
    }

    /// Crawl-delay requested by the origin of the current page
    fn crawl_delay(&self) -> Option<Duration> {
        let url = self.document.as_ref()?.url();
        let origin = crate::url::origin_of(url).ok()?;
        self.robots
            .get(&origin)?
            .crawl_delay(&self.user_agent.crawler_name)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Creates one `HttpPageSession` per worker
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    user_agent: UserAgentConfig,
    respect_robots: bool,
}

impl HttpSessionFactory {
    pub fn new(user_agent: UserAgentConfig, respect_robots: bool) -> Self {
        Self {
            user_agent,
            respect_robots,
        }
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpPageSession;

    fn create(&self) -> SessionResult<HttpPageSession> {
        HttpPageSession::new(self.user_agent.clone(), self.respect_robots)
    }
}
