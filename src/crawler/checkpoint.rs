//! Periodic checkpointing
//!
//! The snapshot carries a partial tree for every category still being
//! crawled, so a save mid-category persists the leaves resolved so far.

use crate::catalog::CategoryNode;
use crate::crawler::traversal::ProgressObserver;
use crate::storage::{CheckpointSnapshot, CheckpointStore};
use crate::Result;
use tracing::debug;

/// Keeps the current snapshot and writes it every `every` visited nodes
///
/// A save that falls due on a node is written once that node resolves as a
/// leaf, or at the next visit when it does not.
pub struct Checkpointer<'s, C: ?Sized> {
    store: &'s mut C,
    snapshot: CheckpointSnapshot,
    every: u64,
    since_save: u64,
}

impl<'s, C> Checkpointer<'s, C>
where
    C: CheckpointStore + ?Sized,
{
    pub fn new(store: &'s mut C, snapshot: CheckpointSnapshot, every: u32) -> Self {
        Self {
            store,
            snapshot,
            every: u64::from(every.max(1)),
            since_save: 0,
        }
    }

    pub fn snapshot(&self) -> &CheckpointSnapshot {
        &self.snapshot
    }

    pub fn store(&mut self) -> &mut C {
        self.store
    }

    /// Replaces the partial tree of a category with its final tree and saves
    pub fn complete_category(&mut self, category: CategoryNode) -> Result<()> {
        let key = category.key();
        self.snapshot.in_progress.retain(|node| node.key() != key);
        self.snapshot.categories.retain(|node| node.key() != key);
        if !self.snapshot.completed_categories.contains(&key) {
            self.snapshot.completed_categories.push(key);
        }
        self.snapshot.categories.push(category);
        self.save()
    }

    pub fn save(&mut self) -> Result<()> {
        self.store.save(&self.snapshot)?;
        self.since_save = 0;
        debug!(
            "Checkpoint saved: {} nodes, {} categories complete, {} in progress",
            self.snapshot.checkpoint.processed_count,
            self.snapshot.completed_categories.len(),
            self.snapshot.in_progress.len()
        );
        Ok(())
    }

    pub fn into_snapshot(self) -> CheckpointSnapshot {
        self.snapshot
    }

    fn save_if_due(&mut self) -> Result<()> {
        if self.since_save >= self.every {
            self.save()?;
        }
        Ok(())
    }

    /// Node of the partial tree at `path`, created on first visit
    fn partial_node(&mut self, category: &str, path: &[String], url: &str) -> Option<&mut CategoryNode> {
        let mut node = self
            .snapshot
            .in_progress
            .iter_mut()
            .find(|root| root.key() == category)?;

        let last = path.len().saturating_sub(1);
        for (depth, name) in path.iter().enumerate().skip(1) {
            let index = match node.children.iter().position(|child| child.name == *name) {
                Some(index) => index,
                None => {
                    let child_url = if depth == last { url } else { "" };
                    node.children.push(CategoryNode::new(name, child_url));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        Some(node)
    }
}

impl<'s, C> ProgressObserver for Checkpointer<'s, C>
where
    C: CheckpointStore + ?Sized,
{
    fn category_started(&mut self, category: &CategoryNode) -> Result<()> {
        let key = category.key();
        self.snapshot.in_progress.retain(|node| node.key() != key);
        self.snapshot.in_progress.push(category.clone());
        Ok(())
    }

    fn node_visited(&mut self, category: &str, path: &[String], url: &str) -> Result<()> {
        self.save_if_due()?;

        if self.partial_node(category, path, url).is_none() {
            debug!("No partial tree for {}", category);
        }
        let checkpoint = &mut self.snapshot.checkpoint;
        checkpoint.visited_path = path.to_vec();
        checkpoint.last_successful_url = Some(url.to_string());
        checkpoint.processed_count += 1;

        self.since_save += 1;
        Ok(())
    }

    fn leaf_resolved(&mut self, category: &str, path: &[String], leaf: &CategoryNode) -> Result<()> {
        if let Some(node) = self.partial_node(category, path, &leaf.url) {
            node.column_headers = leaf.column_headers.clone();
            node.products = leaf.products.clone();
            node.blocks = leaf.blocks.clone();
        }
        self.save_if_due()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::storage::SqliteCheckpointStore;
    use pretty_assertions::assert_eq;

    const LATHES: &str = "https://shop.test/catalog/lathes/";

    fn lathes() -> CategoryNode {
        CategoryNode::new("Lathes", LATHES)
    }

    fn path(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn leaf(name: &str, url: &str, products: &[&str]) -> CategoryNode {
        let mut node = CategoryNode::new(name, url);
        node.attach_products(Vec::new(), products.iter().map(|p| Product::named(p)).collect());
        node
    }

    #[test]
    fn test_saves_every_n_nodes() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let run_id = store.create_run("hash").unwrap();
        let mut checkpointer = Checkpointer::new(&mut store, CheckpointSnapshot::new(run_id), 2);
        let key = lathes().key();
        checkpointer.category_started(&lathes()).unwrap();

        let at = path(&["Lathes", "Index"]);
        checkpointer.node_visited(&key, &at, "https://shop.test/a/").unwrap();
        checkpointer.node_visited(&key, &at, "https://shop.test/b/").unwrap();
        assert!(checkpointer.store().load().unwrap().is_none());

        // Due after two nodes; written before the third one is recorded
        checkpointer.node_visited(&key, &at, "https://shop.test/c/").unwrap();
        let saved = checkpointer.store().load().unwrap().unwrap();
        assert_eq!(saved.checkpoint.processed_count, 2);
        assert_eq!(
            saved.checkpoint.last_successful_url.as_deref(),
            Some("https://shop.test/b/")
        );
    }

    #[test]
    fn test_partial_results_survive_an_abort() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let run_id = store.create_run("hash").unwrap();
        let mut checkpointer = Checkpointer::new(&mut store, CheckpointSnapshot::new(run_id), 1);

        let mut category = lathes();
        category.children.push(CategoryNode::new("CNC", "https://shop.test/catalog/lathes/cnc/"));
        category.children.push(CategoryNode::new("Manual", "https://shop.test/catalog/lathes/manual/"));
        let key = category.key();
        checkpointer.category_started(&category).unwrap();

        let cnc = leaf("CNC", "https://shop.test/catalog/lathes/cnc/", &["CK-1"]);
        checkpointer.node_visited(&key, &path(&["Lathes", "CNC"]), &cnc.url).unwrap();
        checkpointer.leaf_resolved(&key, &path(&["Lathes", "CNC"]), &cnc).unwrap();

        let manual = leaf("Manual", "https://shop.test/catalog/lathes/manual/", &["M-1", "M-2"]);
        checkpointer.node_visited(&key, &path(&["Lathes", "Manual"]), &manual.url).unwrap();
        checkpointer.leaf_resolved(&key, &path(&["Lathes", "Manual"]), &manual).unwrap();

        // Stopped before the category completed
        drop(checkpointer);
        let saved = store.load().unwrap().unwrap();

        assert!(saved.categories.is_empty());
        assert!(saved.completed_categories.is_empty());
        assert_eq!(saved.in_progress.len(), 1);
        let partial = &saved.in_progress[0];
        assert_eq!(partial.total_products(), 3);
        assert_eq!(partial.children[1].products[1].name, "M-2");
        assert_eq!(saved.checkpoint.processed_count, 2);
    }

    #[test]
    fn test_nested_nodes_are_added_to_partial_tree() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let run_id = store.create_run("hash").unwrap();
        let mut checkpointer = Checkpointer::new(&mut store, CheckpointSnapshot::new(run_id), 100);
        let key = lathes().key();
        checkpointer.category_started(&lathes()).unwrap();

        let cnc_url = "https://shop.test/catalog/lathes/cnc/";
        let heavy = leaf("Heavy", "https://shop.test/catalog/lathes/cnc/heavy/", &["H-1"]);
        checkpointer.node_visited(&key, &path(&["Lathes", "CNC"]), cnc_url).unwrap();
        checkpointer
            .node_visited(&key, &path(&["Lathes", "CNC", "Heavy"]), &heavy.url)
            .unwrap();
        checkpointer
            .leaf_resolved(&key, &path(&["Lathes", "CNC", "Heavy"]), &heavy)
            .unwrap();

        let partial = &checkpointer.snapshot().in_progress[0];
        assert_eq!(partial.children[0].url, cnc_url);
        assert_eq!(partial.children[0].children[0], heavy);
    }

    #[test]
    fn test_complete_category_replaces_partial_tree() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let run_id = store.create_run("hash").unwrap();
        let mut checkpointer = Checkpointer::new(&mut store, CheckpointSnapshot::new(run_id), 100);

        checkpointer.category_started(&lathes()).unwrap();
        checkpointer.complete_category(lathes()).unwrap();

        let saved = store.load().unwrap().unwrap();
        assert!(saved.is_completed(&lathes()));
        assert_eq!(saved.categories.len(), 1);
        assert!(saved.in_progress.is_empty());
    }
}
