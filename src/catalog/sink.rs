//! Aggregation sink
//!
//! The traversal reports every resolved leaf to an `AggregationSink`. The
//! `CatalogCollector` keeps per-category summaries used by the exporters.

use crate::catalog::model::{CategoryNode, Product};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Separator used when a node path is rendered as one string
pub const PATH_SEPARATOR: &str = " > ";

/// Block metadata reported alongside block products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDescriptor {
    pub title: String,
    pub image_url: Option<String>,
    pub column_headers: Vec<String>,
}

/// Receives products as leaves resolve
pub trait AggregationSink {
    /// Records products found at `path` below `category`
    ///
    /// `path` lists node names below the top-level category; it is empty for
    /// products found directly on the category page.
    fn record(
        &mut self,
        category: &str,
        path: &[String],
        block: Option<&BlockDescriptor>,
        products: &[Product],
    );
}

/// One block as it appears in the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub path: String,
    pub title: String,
    pub image_url: Option<String>,
    pub product_count: usize,
}

/// Everything collected for one top-level category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub product_count: usize,
    pub preorder_count: usize,
    /// Product count per node path, in discovery order
    pub path_counts: IndexMap<String, usize>,
    pub blocks: Vec<BlockRecord>,
}

/// Totals across all categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    pub categories: usize,
    pub total_products: usize,
    pub total_subcategories: usize,
    pub total_blocks: usize,
    pub preorder_products: usize,
}

/// Per-category collector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCollector {
    categories: IndexMap<String, CategoryRecord>,
}

impl CatalogCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a collector from an already resolved tree, e.g. after resume
    pub fn from_tree(categories: &[CategoryNode]) -> Self {
        let mut collector = Self::new();
        for category in categories {
            collector.ensure_category(&category.name);
            let mut path = Vec::new();
            collector.collect_node(&category.name, category, &mut path);
        }
        collector
    }

    fn collect_node(&mut self, category: &str, node: &CategoryNode, path: &mut Vec<String>) {
        if node.is_leaf() {
            if node.blocks.is_empty() {
                if !node.products.is_empty() {
                    self.record(category, path, None, &node.products);
                }
            } else {
                for block in &node.blocks {
                    let descriptor = BlockDescriptor {
                        title: block.title.clone(),
                        image_url: block.image_url.clone(),
                        column_headers: block.column_headers.clone(),
                    };
                    self.record(category, path, Some(&descriptor), &block.products);
                }
            }
            return;
        }

        for child in &node.children {
            path.push(child.name.clone());
            self.collect_node(category, child, path);
            path.pop();
        }
    }

    /// Registers a category so it is listed even when it yields nothing
    pub fn ensure_category(&mut self, category: &str) {
        self.categories.entry(category.to_string()).or_default();
    }

    pub fn category(&self, name: &str) -> Option<&CategoryRecord> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&String, &CategoryRecord)> {
        self.categories.iter()
    }

    /// Folds a worker's collector into this one
    pub fn merge(&mut self, other: CatalogCollector) {
        for (name, record) in other.categories {
            let target = self.categories.entry(name).or_default();
            target.product_count += record.product_count;
            target.preorder_count += record.preorder_count;
            for (path, count) in record.path_counts {
                *target.path_counts.entry(path).or_insert(0) += count;
            }
            target.blocks.extend(record.blocks);
        }
    }

    pub fn stats(&self) -> CollectorStats {
        let mut stats = CollectorStats {
            categories: self.categories.len(),
            ..CollectorStats::default()
        };
        for record in self.categories.values() {
            stats.total_products += record.product_count;
            stats.preorder_products += record.preorder_count;
            stats.total_subcategories += record
                .path_counts
                .keys()
                .filter(|path| !path.is_empty())
                .count();
            stats.total_blocks += record.blocks.len();
        }
        stats
    }
}

impl AggregationSink for CatalogCollector {
    fn record(
        &mut self,
        category: &str,
        path: &[String],
        block: Option<&BlockDescriptor>,
        products: &[Product],
    ) {
        let record = self.categories.entry(category.to_string()).or_default();
        let path_key = path.join(PATH_SEPARATOR);

        record.product_count += products.len();
        record.preorder_count += products.iter().filter(|p| p.is_preorder).count();
        *record.path_counts.entry(path_key.clone()).or_insert(0) += products.len();

        if let Some(block) = block {
            record.blocks.push(BlockRecord {
                path: path_key,
                title: block.title.clone(),
                image_url: block.image_url.clone(),
                product_count: products.len(),
            });
        }
    }
}
