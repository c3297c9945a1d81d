//! SQLite storage implementation
//!
//! Checkpoint columns are stored individually; the path, the completed
//! category list and the category trees are JSON text.

use crate::catalog::CrawlCheckpoint;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CheckpointStore, StorageError, StorageResult};
use crate::storage::{CheckpointSnapshot, RunRecord, RunStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite checkpoint store
pub struct SqliteCheckpointStore {
    conn: Connection,
}

/// Raw checkpoint row before JSON decoding
struct CheckpointRow {
    run_id: i64,
    visited_path: String,
    last_successful_url: Option<String>,
    processed_count: i64,
    crawl_started_at: String,
    completed_categories: String,
    categories: String,
    in_progress: String,
}

const CHECKPOINT_COLUMNS: &str = "run_id, visited_path, last_successful_url, processed_count, \
     crawl_started_at, completed_categories, categories, in_progress";

impl SqliteCheckpointStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn read_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Interrupted),
        })
    }

    fn read_checkpoint(row: &Row<'_>) -> rusqlite::Result<CheckpointRow> {
        Ok(CheckpointRow {
            run_id: row.get(0)?,
            visited_path: row.get(1)?,
            last_successful_url: row.get(2)?,
            processed_count: row.get(3)?,
            crawl_started_at: row.get(4)?,
            completed_categories: row.get(5)?,
            categories: row.get(6)?,
            in_progress: row.get(7)?,
        })
    }

    fn decode(row: CheckpointRow) -> StorageResult<CheckpointSnapshot> {
        let started_at = DateTime::parse_from_rfc3339(&row.crawl_started_at)
            .map_err(|_| StorageError::InvalidTimestamp(row.crawl_started_at.clone()))?
            .with_timezone(&Utc);

        Ok(CheckpointSnapshot {
            run_id: row.run_id,
            checkpoint: CrawlCheckpoint {
                visited_path: serde_json::from_str(&row.visited_path)?,
                last_successful_url: row.last_successful_url,
                processed_count: u64::try_from(row.processed_count).unwrap_or(0),
                started_at,
            },
            completed_categories: serde_json::from_str(&row.completed_categories)?,
            categories: serde_json::from_str(&row.categories)?,
            in_progress: serde_json::from_str(&row.in_progress)?,
        })
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                Self::read_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                Self::read_run,
            )
            .optional()?;
        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Checkpoints =====

    fn save(&mut self, snapshot: &CheckpointSnapshot) -> StorageResult<()> {
        let checkpoint = &snapshot.checkpoint;
        let processed = i64::try_from(checkpoint.processed_count).unwrap_or(i64::MAX);

        self.conn.execute(
            "INSERT INTO checkpoints (run_id, saved_at, visited_path, last_successful_url,
                processed_count, crawl_started_at, completed_categories, categories, in_progress)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(run_id) DO UPDATE SET
                saved_at = excluded.saved_at,
                visited_path = excluded.visited_path,
                last_successful_url = excluded.last_successful_url,
                processed_count = excluded.processed_count,
                crawl_started_at = excluded.crawl_started_at,
                completed_categories = excluded.completed_categories,
                categories = excluded.categories,
                in_progress = excluded.in_progress",
            params![
                snapshot.run_id,
                Utc::now().to_rfc3339(),
                serde_json::to_string(&checkpoint.visited_path)?,
                checkpoint.last_successful_url,
                processed,
                checkpoint.started_at.to_rfc3339(),
                serde_json::to_string(&snapshot.completed_categories)?,
                serde_json::to_string(&snapshot.categories)?,
                serde_json::to_string(&snapshot.in_progress)?,
            ],
        )?;
        Ok(())
    }

    fn load(&self) -> StorageResult<Option<CheckpointSnapshot>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM checkpoints ORDER BY run_id DESC LIMIT 1",
                    CHECKPOINT_COLUMNS
                ),
                [],
                Self::read_checkpoint,
            )
            .optional()?;
        row.map(Self::decode).transpose()
    }

    fn load_run(&self, run_id: i64) -> StorageResult<Option<CheckpointSnapshot>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM checkpoints WHERE run_id = ?1",
                    CHECKPOINT_COLUMNS
                ),
                params![run_id],
                Self::read_checkpoint,
            )
            .optional()?;
        row.map(Self::decode).transpose()
    }
}
