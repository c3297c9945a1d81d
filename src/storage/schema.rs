//! Database schema definitions

/// SQL schema for the checkpoint database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One snapshot per run, overwritten on every save
CREATE TABLE IF NOT EXISTS checkpoints (
    run_id INTEGER PRIMARY KEY REFERENCES runs(id),
    saved_at TEXT NOT NULL,
    visited_path TEXT NOT NULL,
    last_successful_url TEXT,
    processed_count INTEGER NOT NULL DEFAULT 0,
    crawl_started_at TEXT NOT NULL,
    completed_categories TEXT NOT NULL,
    categories TEXT NOT NULL,
    in_progress TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_runs_status ON runs(status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
