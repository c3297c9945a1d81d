//! Crawler module: the resilient catalog walk
//!
//! This module contains the core crawling logic, including:
//! - Page-load and extraction retries with session restarts (`resilience`)
//! - Category discovery from the site menu (`discovery`)
//! - The recursive per-node state machine (`traversal`)
//! - Checkpointing and run orchestration (`checkpoint`, `coordinator`)

mod checkpoint;
mod coordinator;
mod discovery;
mod resilience;
mod traversal;

pub use checkpoint::Checkpointer;
pub use coordinator::{
    Coordinator, CrawlOptions, CrawlOutcome, WorkerReport, WorkerStatus,
};
pub use discovery::{discover_categories, UNKNOWN_CATEGORY};
pub use resilience::{ResilientSession, RetryPolicy};
pub use traversal::{ProgressObserver, Traversal, TraversalLimits};

use crate::config::Config;
use crate::session::HttpSessionFactory;
use crate::storage::open_storage;
use crate::Result;
use std::path::Path;

/// Runs a complete crawl against the live site
///
/// This is the main entry point used by the CLI. It will:
/// 1. Open the checkpoint database
/// 2. Start a new run or resume the latest interrupted one
/// 3. Crawl every category with HTTP page sessions
pub async fn crawl(config: Config, config_hash: &str, options: CrawlOptions) -> Result<CrawlOutcome> {
    let store = open_storage(Path::new(&config.output.database_path))?;
    let factory = HttpSessionFactory::new(config.user_agent.clone(), config.crawler.respect_robots);
    let mut coordinator = Coordinator::new(config, factory, store, config_hash)?;
    coordinator.run(options).await
}
