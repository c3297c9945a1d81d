//! Output module for exporting crawl results
//!
//! This module handles:
//! - Exporting the category tree as a JSON dataset
//! - Generating markdown summaries of crawl results
//! - Printing crawl statistics

mod json;
mod markdown;
pub mod stats;

pub use json::{export_json, CatalogExport};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::catalog::{CatalogCollector, CategoryNode, CollectorStats};
use crate::storage::{CheckpointStore, RunRecord, RunStatus, StorageError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No crawl runs found in database")]
    NoRuns,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Everything the summary and statistics views show about one run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub run_id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub config_hash: String,
    pub categories: Vec<CategoryNode>,
    pub collector: CatalogCollector,
}

impl CrawlSummary {
    pub fn new(run: RunRecord, categories: Vec<CategoryNode>, collector: CatalogCollector) -> Self {
        Self {
            run_id: run.id,
            started_at: run.started_at,
            finished_at: run.finished_at,
            status: run.status,
            config_hash: run.config_hash,
            categories,
            collector,
        }
    }

    pub fn stats(&self) -> CollectorStats {
        self.collector.stats()
    }

    /// Seconds between start and finish, when the run finished
    pub fn duration_seconds(&self) -> Option<u64> {
        let started = self.started_at.parse::<DateTime<Utc>>().ok()?;
        let finished = self.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
        u64::try_from((finished - started).num_seconds()).ok()
    }

    /// Leaves that ended without products
    pub fn empty_leaves(&self) -> usize {
        fn count(node: &CategoryNode) -> usize {
            if node.is_leaf() {
                usize::from(node.products.is_empty())
            } else {
                node.children.iter().map(count).sum()
            }
        }
        self.categories.iter().map(count).sum()
    }
}

/// Builds the summary of the latest run from its checkpoint
///
/// Categories that were still being crawled contribute what was saved of them.
pub fn generate_summary(store: &dyn CheckpointStore) -> OutputResult<CrawlSummary> {
    let run = store.latest_run()?.ok_or(OutputError::NoRuns)?;
    let categories = store
        .load_run(run.id)?
        .map(|snapshot| snapshot.all_categories())
        .unwrap_or_default();
    let collector = CatalogCollector::from_tree(&categories);

    Ok(CrawlSummary::new(run, categories, collector))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::CrawlSummary;
    use crate::catalog::{CatalogCollector, CategoryNode, Product, ProductBlock};
    use crate::storage::{RunRecord, RunStatus};

    /// Two categories: one with a table leaf and a block leaf, one empty
    pub fn summary() -> CrawlSummary {
        let mut table_leaf = CategoryNode::new("CNC lathes", "https://shop.test/catalog/lathes/cnc/");
        let mut preorder = Product::named("CK-2");
        preorder.is_preorder = true;
        table_leaf.attach_products(Vec::new(), vec![Product::named("CK-1"), preorder]);

        let mut block_leaf = CategoryNode::new("Heavy", "https://shop.test/catalog/lathes/heavy/");
        block_leaf.attach_blocks(vec![ProductBlock {
            title: "Series H".to_string(),
            image_url: Some("https://shop.test/upload/h.jpg".to_string()),
            column_headers: Vec::new(),
            products: vec![Product::named("H-1")],
        }]);

        let mut lathes = CategoryNode::new("Lathes", "https://shop.test/catalog/lathes/");
        lathes.children = vec![table_leaf, block_leaf];
        let saws = CategoryNode::new("Saws", "https://shop.test/catalog/saws/");

        let categories = vec![lathes, saws];
        let collector = CatalogCollector::from_tree(&categories);

        CrawlSummary::new(
            RunRecord {
                id: 3,
                started_at: "2024-05-01T10:00:00+00:00".to_string(),
                finished_at: Some("2024-05-01T10:02:00+00:00".to_string()),
                config_hash: "abc123".to_string(),
                status: RunStatus::Completed,
            },
            categories,
            collector,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CategoryNode, Product};
    use crate::storage::{CheckpointSnapshot, SqliteCheckpointStore};

    #[test]
    fn test_summary_helpers() {
        let summary = testing::summary();

        assert_eq!(summary.duration_seconds(), Some(120));
        // The block leaf and the table leaf have products, "Saws" has none
        assert_eq!(summary.empty_leaves(), 1);
        assert_eq!(summary.stats().total_products, 3);
    }

    #[test]
    fn test_generate_summary_from_store() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        assert!(matches!(generate_summary(&store), Err(OutputError::NoRuns)));

        let run_id = store.create_run("hash").unwrap();
        let mut snapshot = CheckpointSnapshot::new(run_id);
        snapshot.categories = testing::summary().categories;
        store.save(&snapshot).unwrap();

        let summary = generate_summary(&store).unwrap();
        assert_eq!(summary.run_id, run_id);
        assert_eq!(summary.status, RunStatus::Running);
        assert_eq!(summary.stats().total_products, 3);
        assert_eq!(summary.duration_seconds(), None);
    }

    #[test]
    fn test_generate_summary_includes_partial_categories() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let run_id = store.create_run("hash").unwrap();

        let mut leaf = CategoryNode::new("Vertical", "https://shop.test/catalog/mills/vertical/");
        leaf.attach_products(Vec::new(), vec![Product::named("V-1")]);
        let mut mills = CategoryNode::new("Mills", "https://shop.test/catalog/mills/");
        mills.children.push(leaf);

        let mut snapshot = CheckpointSnapshot::new(run_id);
        snapshot.categories = testing::summary().categories;
        snapshot.in_progress.push(mills);
        store.save(&snapshot).unwrap();

        let summary = generate_summary(&store).unwrap();
        assert_eq!(summary.stats().total_products, 4);
        assert_eq!(summary.categories.last().map(|c| c.name.as_str()), Some("Mills"));
    }
}
