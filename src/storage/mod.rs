//! Storage module for persisting crawl progress
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - Run tracking (one row per invocation)
//! - Checkpoint snapshots holding the partial category tree for resumption

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCheckpointStore;
pub use traits::{CheckpointStore, StorageError, StorageResult};

use crate::catalog::{CategoryNode, CrawlCheckpoint};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens (or creates) the checkpoint database at `path`
pub fn open_storage(path: &Path) -> StorageResult<SqliteCheckpointStore> {
    SqliteCheckpointStore::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    /// Runs that stopped before completing can be picked up with `--resume`
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::Running | Self::Interrupted | Self::Failed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Everything needed to continue a run where it stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSnapshot {
    pub run_id: i64,
    pub checkpoint: CrawlCheckpoint,
    /// Keys (canonical URLs) of top-level categories whose subtree is fully crawled
    pub completed_categories: Vec<String>,
    /// Resolved category trees, in crawl order
    pub categories: Vec<CategoryNode>,
    /// Partial trees of categories still being crawled
    #[serde(default)]
    pub in_progress: Vec<CategoryNode>,
}

impl CheckpointSnapshot {
    pub fn new(run_id: i64) -> Self {
        Self {
            run_id,
            checkpoint: CrawlCheckpoint::new(),
            completed_categories: Vec::new(),
            categories: Vec::new(),
            in_progress: Vec::new(),
        }
    }

    pub fn is_completed(&self, category: &CategoryNode) -> bool {
        let key = category.key();
        self.completed_categories.iter().any(|done| *done == key)
    }

    /// Completed trees followed by the partial ones
    pub fn all_categories(&self) -> Vec<CategoryNode> {
        self.categories
            .iter()
            .chain(self.in_progress.iter())
            .cloned()
            .collect()
    }
}
