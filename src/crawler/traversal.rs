//! Recursive catalog traversal
//!
//! Each node runs through `Discover -> Navigate | Collect -> Done`:
//!
//! - **Discover**: load the page and classify it
//! - **Navigate**: child links were found, visit them depth-first
//! - **Collect**: products were found, attach them and report to the sink
//! - **Done**: node resolved, possibly as an empty leaf
//!
//! Nodes from depth 2 on first look for a nested section list and skip
//! product extraction when it has links.

use crate::catalog::{AggregationSink, BlockDescriptor, CategoryNode, NavLink, PagePayload};
use crate::crawler::resilience::ResilientSession;
use crate::extract::navigation::nested_section_links;
use crate::extract::ExtractContext;
use crate::session::PageSession;
use crate::state::TraversalState;
use crate::url::canonical_key;
use crate::{CatalogError, Result};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error, info, warn};

/// Depth from which nodes probe for a nested section list before extracting
const NESTED_PROBE_DEPTH: usize = 2;

/// Receives progress as a category subtree is crawled
///
/// `category` is the key of the top-level category (`CategoryNode::key`) and
/// `path` runs from the top-level category name down to the node.
pub trait ProgressObserver {
    /// Called before the first page of a category is loaded
    fn category_started(&mut self, _category: &CategoryNode) -> Result<()> {
        Ok(())
    }

    /// Called after a node's page loaded
    fn node_visited(&mut self, category: &str, path: &[String], url: &str) -> Result<()>;

    /// Called once a node holds its products or blocks
    fn leaf_resolved(&mut self, _category: &str, _path: &[String], _leaf: &CategoryNode) -> Result<()> {
        Ok(())
    }
}

/// Observer that ignores progress
impl ProgressObserver for () {
    fn node_visited(&mut self, _category: &str, _path: &[String], _url: &str) -> Result<()> {
        Ok(())
    }
}

/// Per-crawl traversal settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalLimits {
    /// Deepest level visited below the top-level category
    pub max_depth: usize,
}

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a>>;

/// Walks one category subtree
pub struct Traversal<'a, S, K, P> {
    session: &'a mut ResilientSession<S>,
    ctx: &'a ExtractContext,
    sink: &'a mut K,
    observer: &'a mut P,
    visited: &'a mut HashSet<String>,
    limits: TraversalLimits,
    category_key: String,
}

impl<'a, S, K, P> Traversal<'a, S, K, P>
where
    S: PageSession,
    K: AggregationSink,
    P: ProgressObserver,
{
    pub fn new(
        session: &'a mut ResilientSession<S>,
        ctx: &'a ExtractContext,
        sink: &'a mut K,
        observer: &'a mut P,
        visited: &'a mut HashSet<String>,
        limits: TraversalLimits,
    ) -> Self {
        Self {
            session,
            ctx,
            sink,
            observer,
            visited,
            limits,
            category_key: String::new(),
        }
    }

    /// Crawls a top-level category
    ///
    /// Categories with menu subcategories go straight to them; the category
    /// page itself is only loaded when the menu lists none.
    pub async fn crawl_category(&mut self, category: &mut CategoryNode) -> Result<()> {
        info!("Crawling category '{}'", category.name);
        self.category_key = category.key();
        self.observer.category_started(category)?;
        let name = category.name.clone();
        let mut path = vec![name.clone()];

        if category.children.is_empty() {
            self.visit(&name, category, &mut path, 0).await?;
        } else {
            for child in category.children.iter_mut() {
                path.push(child.name.clone());
                self.visit(&name, child, &mut path, 1).await?;
                path.pop();
            }
        }

        info!(
            "Category '{}' done: {} products in {} nodes",
            name,
            category.total_products(),
            category.node_count()
        );
        Ok(())
    }

    fn visit<'b>(
        &'b mut self,
        category: &'b str,
        node: &'b mut CategoryNode,
        path: &'b mut Vec<String>,
        depth: usize,
    ) -> NodeFuture<'b>
    where
        'a: 'b,
        S: 'b,
        K: 'b,
        P: 'b,
    {
        Box::pin(async move {
            let mut state = TraversalState::Discover;

            if depth > self.limits.max_depth {
                warn!(
                    "Not visiting '{}': depth {} exceeds limit {}",
                    node.name, depth, self.limits.max_depth
                );
                return Ok(());
            }

            let key = canonical_key(&node.url).unwrap_or_else(|_| node.url.clone());
            if !self.visited.insert(key) {
                debug!("Already visited {}", node.url);
                return Ok(());
            }

            match self.session.load_page(&node.url).await {
                Ok(()) => {}
                Err(e @ CatalogError::SessionExhausted { .. }) => {
                    error!("Abandoning '{}': {}", path.join(" > "), e);
                    transition(&node.url, &mut state, TraversalState::Done)?;
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
            self.observer
                .node_visited(&self.category_key, path, &node.url)?;

            if depth >= NESTED_PROBE_DEPTH {
                let nested = nested_section_links(self.session.session(), self.ctx);
                if !nested.is_empty() {
                    debug!("'{}' has {} nested sections", node.name, nested.len());
                    transition(&node.url, &mut state, TraversalState::Navigate)?;
                    self.visit_children(category, node, path, depth, &nested).await?;
                    return transition(&node.url, &mut state, TraversalState::Done);
                }
            }

            let (kind, payload) = self.session.extract_with_retry(self.ctx).await;
            debug!("'{}' resolved as {}", node.name, kind);

            match payload {
                PagePayload::Links(links) => {
                    transition(&node.url, &mut state, TraversalState::Navigate)?;
                    self.visit_children(category, node, path, depth, &links).await?;
                }
                PagePayload::Products {
                    headers, products, ..
                } => {
                    transition(&node.url, &mut state, TraversalState::Collect)?;
                    info!("'{}': {} products", node.name, products.len());
                    self.sink.record(category, &path[1..], None, &products);
                    node.attach_products(headers, products);
                    self.observer.leaf_resolved(&self.category_key, path, node)?;
                }
                PagePayload::Blocks(blocks) => {
                    transition(&node.url, &mut state, TraversalState::Collect)?;
                    for block in &blocks {
                        let descriptor = BlockDescriptor {
                            title: block.title.clone(),
                            image_url: block.image_url.clone(),
                            column_headers: block.column_headers.clone(),
                        };
                        self.sink
                            .record(category, &path[1..], Some(&descriptor), &block.products);
                    }
                    node.attach_blocks(blocks);
                    self.observer.leaf_resolved(&self.category_key, path, node)?;
                    info!(
                        "'{}': {} products in blocks",
                        node.name,
                        node.products.len()
                    );
                }
                PagePayload::Empty if depth > 0 => {
                    let nested = nested_section_links(self.session.session(), self.ctx);
                    if nested.is_empty() {
                        warn!("'{}' is an empty leaf", node.name);
                    } else {
                        transition(&node.url, &mut state, TraversalState::Navigate)?;
                        self.visit_children(category, node, path, depth, &nested).await?;
                    }
                }
                PagePayload::Empty => {
                    warn!("Category page '{}' has no content", node.name);
                }
            }

            transition(&node.url, &mut state, TraversalState::Done)
        })
    }

    async fn visit_children(
        &mut self,
        category: &str,
        node: &mut CategoryNode,
        path: &mut Vec<String>,
        depth: usize,
        links: &[NavLink],
    ) -> Result<()> {
        node.children = links.iter().map(CategoryNode::from_link).collect();
        for child in node.children.iter_mut() {
            path.push(child.name.clone());
            let visited = self.visit(category, child, path, depth + 1).await;
            path.pop();
            visited?;
        }
        Ok(())
    }
}

fn transition(url: &str, state: &mut TraversalState, next: TraversalState) -> Result<()> {
    if !state.can_transition_to(next) {
        return Err(CatalogError::InvalidTransition {
            from: *state,
            to: next,
        });
    }
    debug!("{}: {} -> {}", url, state, next);
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogCollector;
    use crate::crawler::resilience::RetryPolicy;
    use crate::extract::testing::context;
    use crate::session::FixtureSite;
    use pretty_assertions::assert_eq;

    const ROOT: &str = "https://shop.test/catalog/tools/";

    fn table(names: &[&str]) -> String {
        let rows: String = names
            .iter()
            .map(|name| {
                format!(
                    r#"<tr class="main_item_wrapper"><td><span class="font_md">{}</span></td></tr>"#,
                    name
                )
            })
            .collect();
        format!("<html><body><table>{}</table></body></html>", rows)
    }

    fn tiles(links: &[(&str, &str)]) -> String {
        let tiles: String = links
            .iter()
            .map(|(href, name)| {
                format!(
                    r#"<a class="item_block_href" href="{}"><span class="font_md">{}</span></a>"#,
                    href, name
                )
            })
            .collect();
        format!(
            r#"<html><body><div class="sections_wrapper block">{}</div></body></html>"#,
            tiles
        )
    }

    fn nested(links: &[(&str, &str)]) -> String {
        let anchors: String = links
            .iter()
            .map(|(href, name)| format!(r#"<a href="{}"><span>{}</span></a>"#, href, name))
            .collect();
        format!(
            r#"<html><body><div class="catalog_section_list">{}</div></body></html>"#,
            anchors
        )
    }

    #[derive(Default)]
    struct Recorder {
        visited: Vec<String>,
        leaves: Vec<(String, usize)>,
        started: Vec<String>,
    }

    impl ProgressObserver for Recorder {
        fn category_started(&mut self, category: &CategoryNode) -> Result<()> {
            self.started.push(category.key());
            Ok(())
        }

        fn node_visited(&mut self, _category: &str, path: &[String], _url: &str) -> Result<()> {
            self.visited.push(path.join("/"));
            Ok(())
        }

        fn leaf_resolved(&mut self, category: &str, path: &[String], leaf: &CategoryNode) -> Result<()> {
            assert_eq!(category, "https://shop.test/catalog/tools");
            self.leaves.push((path.join("/"), leaf.products.len()));
            Ok(())
        }
    }

    async fn crawl(site: &FixtureSite, category: &mut CategoryNode, max_depth: usize) -> (CatalogCollector, Recorder) {
        let policy = RetryPolicy {
            min_content_length: 10,
            ..RetryPolicy::default()
        };
        let mut session = ResilientSession::new(site.session(), policy);
        let ctx = context();
        let mut collector = CatalogCollector::new();
        let mut recorder = Recorder::default();
        let mut visited = HashSet::new();

        Traversal::new(
            &mut session,
            &ctx,
            &mut collector,
            &mut recorder,
            &mut visited,
            TraversalLimits { max_depth },
        )
        .crawl_category(category)
        .await
        .unwrap();

        (collector, recorder)
    }

    #[tokio::test]
    async fn test_walks_index_into_tables() {
        let site = FixtureSite::new()
            .with_page(ROOT, &tiles(&[("/catalog/tools/a/", "A"), ("/catalog/tools/b/", "B")]))
            .with_page("https://shop.test/catalog/tools/a/", &table(&["a1", "a2"]))
            .with_page("https://shop.test/catalog/tools/b/", &table(&["b1"]));
        let mut category = CategoryNode::new("Tools", ROOT);

        let (collector, recorder) = crawl(&site, &mut category, 4).await;

        assert_eq!(category.children.len(), 2);
        assert!(category.products.is_empty());
        assert_eq!(category.children[0].products.len(), 2);
        assert_eq!(category.total_products(), 3);
        assert_eq!(recorder.started, vec!["https://shop.test/catalog/tools"]);
        assert_eq!(recorder.visited, vec!["Tools", "Tools/A", "Tools/B"]);
        assert_eq!(
            recorder.leaves,
            vec![("Tools/A".to_string(), 2), ("Tools/B".to_string(), 1)]
        );

        let record = collector.category("Tools").unwrap();
        assert_eq!(record.path_counts["A"], 2);
        assert_eq!(record.path_counts["B"], 1);
    }

    #[tokio::test]
    async fn test_grandchild_prefers_nested_sections() {
        // Depth 2 page carries both a nested list and a table; only the list is followed
        let sub = "https://shop.test/catalog/tools/sub/";
        let grand = "https://shop.test/catalog/tools/sub/grand/";
        let mut grand_page = nested(&[("/catalog/tools/sub/grand/x/", "X")]);
        grand_page.push_str(&table(&["ignored"]));

        let site = FixtureSite::new()
            .with_page(sub, &tiles(&[("/catalog/tools/sub/grand/", "Grand")]))
            .with_page(grand, &grand_page)
            .with_page("https://shop.test/catalog/tools/sub/grand/x/", &table(&["x1"]));
        let mut category = CategoryNode::new("Tools", ROOT);
        category.children.push(CategoryNode::new("Sub", sub));

        crawl(&site, &mut category, 4).await;

        let grand_node = &category.children[0].children[0];
        assert!(grand_node.products.is_empty());
        assert_eq!(grand_node.children[0].name, "X");
        assert_eq!(grand_node.children[0].products[0].name, "x1");
        assert_eq!(category.total_products(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_probes_nested_sections() {
        let sub = "https://shop.test/catalog/tools/sub/";
        let site = FixtureSite::new()
            .with_page(sub, &nested(&[("/catalog/tools/sub/deep/", "Deep")]))
            .with_page("https://shop.test/catalog/tools/sub/deep/", &table(&["d1"]));
        let mut category = CategoryNode::new("Tools", ROOT);
        category.children.push(CategoryNode::new("Sub", sub));

        let (collector, _) = crawl(&site, &mut category, 4).await;

        assert_eq!(category.children[0].children[0].products.len(), 1);
        assert_eq!(collector.category("Tools").unwrap().path_counts["Sub > Deep"], 1);
    }

    #[tokio::test]
    async fn test_failed_node_is_abandoned() {
        let sub_ok = "https://shop.test/catalog/tools/ok/";
        let sub_bad = "https://shop.test/catalog/tools/bad/";
        let site = FixtureSite::new()
            .with_page(sub_ok, &table(&["ok"]))
            .with_page(sub_bad, &table(&["never"]));
        site.fail_always(sub_bad);
        let mut category = CategoryNode::new("Tools", ROOT);
        category.children.push(CategoryNode::new("Bad", sub_bad));
        category.children.push(CategoryNode::new("Ok", sub_ok));

        let (_, recorder) = crawl(&site, &mut category, 4).await;

        assert!(category.children[0].is_leaf());
        assert!(category.children[0].products.is_empty());
        assert_eq!(category.children[1].products.len(), 1);
        assert_eq!(recorder.visited, vec!["Tools/Ok"]);
        assert_eq!(recorder.leaves, vec![("Tools/Ok".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_max_depth_and_cycles() {
        // The child page links back to the root and down one more level
        let child = "https://shop.test/catalog/tools/child/";
        let site = FixtureSite::new()
            .with_page(ROOT, &tiles(&[("/catalog/tools/child/", "Child")]))
            .with_page(
                child,
                &tiles(&[("/catalog/tools/", "Back"), ("/catalog/tools/child/deeper/", "Deeper")]),
            )
            .with_page("https://shop.test/catalog/tools/child/deeper/", &table(&["d"]));
        let mut category = CategoryNode::new("Tools", ROOT);

        crawl(&site, &mut category, 1).await;

        assert_eq!(site.navigation_count(ROOT), 1);
        assert_eq!(site.navigation_count("https://shop.test/catalog/tools/child/deeper/"), 0);
        assert_eq!(category.total_products(), 0);
    }

    #[test]
    fn test_transition_rejects_invalid() {
        let mut state = TraversalState::Collect;
        let result = transition(ROOT, &mut state, TraversalState::Navigate);

        assert!(matches!(result, Err(CatalogError::InvalidTransition { .. })));
        assert_eq!(state, TraversalState::Collect);
    }
}
