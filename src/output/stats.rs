//! Statistics from the checkpoint database

use crate::catalog::{CategoryNode, CollectorStats};
use crate::output::{generate_summary, CrawlSummary, OutputResult};
use crate::storage::{CheckpointStore, RunStatus};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub run_id: i64,
    pub status: RunStatus,
    pub duration_seconds: Option<u64>,

    /// Totals from the aggregation sink
    pub totals: CollectorStats,

    /// Nodes in all category trees, categories included
    pub total_nodes: usize,

    /// Deepest tree level reached (a category alone counts as 1)
    pub max_depth: usize,

    pub empty_leaves: usize,

    /// Products per category, in crawl order
    pub products_by_category: Vec<(String, usize)>,
}

impl CrawlStatistics {
    pub fn from_summary(summary: &CrawlSummary) -> Self {
        Self {
            run_id: summary.run_id,
            status: summary.status,
            duration_seconds: summary.duration_seconds(),
            totals: summary.stats(),
            total_nodes: summary.categories.iter().map(CategoryNode::node_count).sum(),
            max_depth: summary
                .categories
                .iter()
                .map(CategoryNode::depth)
                .max()
                .unwrap_or(0),
            empty_leaves: summary.empty_leaves(),
            products_by_category: summary
                .collector
                .categories()
                .map(|(name, record)| (name.clone(), record.product_count))
                .collect(),
        }
    }
}

/// Loads statistics for the latest run
pub fn load_statistics(store: &dyn CheckpointStore) -> OutputResult<CrawlStatistics> {
    let summary = generate_summary(store)?;
    Ok(CrawlStatistics::from_summary(&summary))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Run {} ({})", stats.run_id, stats.status.to_db_string());
    if let Some(duration) = stats.duration_seconds {
        println!("  Duration: {} seconds", duration);
    }
    println!();

    println!("Overview:");
    println!("  Categories: {}", stats.totals.categories);
    println!("  Total products: {}", stats.totals.total_products);
    println!("  Preorder products: {}", stats.totals.preorder_products);
    println!("  Subcategories with products: {}", stats.totals.total_subcategories);
    println!("  Blocks: {}", stats.totals.total_blocks);
    println!("  Tree nodes: {}", stats.total_nodes);
    println!("  Deepest level: {}", stats.max_depth);
    println!("  Empty leaves: {}", stats.empty_leaves);
    println!();

    if !stats.products_by_category.is_empty() {
        println!("Products by Category:");
        let mut counts: Vec<_> = stats.products_by_category.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        for (name, count) in counts {
            let percentage = if stats.totals.total_products > 0 {
                (*count as f64 / stats.totals.total_products as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", name, count, percentage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::summary;

    #[test]
    fn test_statistics_from_summary() {
        let stats = CrawlStatistics::from_summary(&summary());

        assert_eq!(stats.run_id, 3);
        assert_eq!(stats.totals.total_products, 3);
        // Lathes + 2 leaves + Saws
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.empty_leaves, 1);
        assert_eq!(
            stats.products_by_category,
            vec![("Lathes".to_string(), 3), ("Saws".to_string(), 0)]
        );
    }
}
