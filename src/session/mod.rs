//! Page sessions
//!
//! A page session is the only thing the crawler knows about the browser side:
//! it can navigate, refresh, restart itself and answer locator queries against
//! the currently loaded page. Element handles are only valid until the next
//! navigation, refresh or restart.
//!
//! # Implementations
//!
//! - `HttpPageSession`: fetches pages with reqwest and parses them with scraper
//! - `FixturePageSession`: serves pages from memory with scriptable failures

mod document;
mod fixture;
mod http;

pub use document::{Document, Element};
pub use fixture::{FixturePageSession, FixtureSite};
pub use http::{build_http_client, HttpPageSession, HttpSessionFactory};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Where a locator query is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The whole current page
    Page,
    /// Descendants of one element
    Within(Element),
}

/// Errors raised by page sessions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("No page is loaded")]
    NoPage,

    #[error("Page not found: {url}")]
    NotFound { url: String },

    #[error("Scripted failure for {url}")]
    Scripted { url: String },

    #[error("Invalid locator '{locator}': {message}")]
    InvalidLocator { locator: String, message: String },

    #[error("Element is no longer attached to the page")]
    StaleElement,

    #[error("Failed to start session: {0}")]
    Init(String),
}

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Capability the crawl core requires from a page driver
///
/// Navigation is async; queries run synchronously against the page snapshot
/// that the last successful navigation produced.
#[async_trait(?Send)]
pub trait PageSession {
    /// Loads `url` and makes it the current page
    async fn navigate(&mut self, url: &str) -> SessionResult<()>;

    /// Reloads the current page
    async fn refresh(&mut self) -> SessionResult<()>;

    /// Tears down and recreates the underlying driver
    ///
    /// The current page is dropped; callers must navigate again.
    async fn restart(&mut self) -> SessionResult<()>;

    /// Releases driver resources
    async fn close(&mut self) -> SessionResult<()>;

    fn current_url(&self) -> Option<String>;

    /// Document title, empty when no page is loaded
    fn title(&self) -> String;

    /// Size of the current page source in bytes
    fn content_length(&self) -> usize;

    /// Finds all elements matching a CSS locator, in document order
    fn query(&self, scope: Scope, locator: &str) -> SessionResult<Vec<Element>>;

    /// Visible text of an element with whitespace collapsed
    fn text(&self, element: Element) -> String;

    fn attribute(&self, element: Element, name: &str) -> Option<String>;

    /// Closest preceding sibling that is an element
    fn previous_sibling(&self, element: Element) -> Option<Element>;

    /// Closest following sibling that is an element
    fn next_sibling(&self, element: Element) -> Option<Element>;

    /// Pause the site asks for between requests, if any
    fn crawl_delay(&self) -> Option<Duration> {
        None
    }
}

/// Creates sessions for parallel workers
pub trait SessionFactory {
    type Session: PageSession;

    fn create(&self) -> SessionResult<Self::Session>;
}
