//! Catalog Crawler: an adaptive product catalog extractor
//!
//! This crate walks a multi-level product catalog (categories, subcategories and
//! nested sections), classifies each rendered page by its structural shape and
//! extracts normalized product records into a hierarchical dataset. Long crawls
//! survive transient failures through page-load retries, session restarts and
//! periodic checkpoints.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod robots;
pub mod session;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for catalog crawler operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Retries exhausted for {url} after {attempts} attempts")]
    SessionExhausted { url: String, attempts: u32 },

    #[error("Page session could not be created: {0}")]
    SessionInit(String),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TraversalState,
        to: state::TraversalState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for catalog crawler operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{AggregationSink, CatalogCollector, CategoryNode, Product, ProductBlock};
pub use config::Config;
pub use extract::{PageKind, PagePayload};
pub use session::{PageSession, SessionFactory};
pub use state::TraversalState;
pub use url::{canonical_key, normalize_reference};
