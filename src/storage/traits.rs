//! Storage traits and error types

use crate::storage::{CheckpointSnapshot, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home for run bookkeeping and checkpoint snapshots
pub trait CheckpointStore {
    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Checkpoints =====

    /// Stores `snapshot`, replacing any earlier snapshot of the same run
    fn save(&mut self, snapshot: &CheckpointSnapshot) -> StorageResult<()>;

    /// Loads the snapshot of the most recent run that has one
    fn load(&self) -> StorageResult<Option<CheckpointSnapshot>>;

    /// Loads the snapshot of one run
    fn load_run(&self, run_id: i64) -> StorageResult<Option<CheckpointSnapshot>>;
}
