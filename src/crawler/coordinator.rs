//! Crawler coordinator - run orchestration
//!
//! This module ties the pieces together for one run:
//! - Starting a new run or resuming the latest interrupted one
//! - Discovering top-level categories from the start page
//! - Walking every category, sequentially or with one worker per category
//! - Checkpointing and final run bookkeeping

use crate::catalog::{CatalogCollector, CategoryNode};
use crate::config::{Config, CrawlMode};
use crate::crawler::checkpoint::Checkpointer;
use crate::crawler::discovery::discover_categories;
use crate::crawler::resilience::{ResilientSession, RetryPolicy};
use crate::crawler::traversal::{ProgressObserver, Traversal, TraversalLimits};
use crate::extract::ExtractContext;
use crate::session::SessionFactory;
use crate::storage::{CheckpointSnapshot, CheckpointStore, RunStatus};
use crate::{CatalogError, Result};
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, LocalSet};
use tokio::time::timeout;

/// Per-invocation options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Ignore any interrupted run and start over
    pub fresh: bool,
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub run_id: i64,
    /// Category trees in menu order
    pub categories: Vec<CategoryNode>,
    pub collector: CatalogCollector,
    /// Categories whose worker stopped with an error
    pub failed_categories: Vec<String>,
}

/// Final state reported by a parallel worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Done,
    Error,
}

/// Message a worker sends when its category is finished
#[derive(Debug)]
pub struct WorkerReport {
    /// Position of the category in the menu
    pub index: usize,
    pub category: String,
    pub status: WorkerStatus,
    pub message: String,
    pub node: CategoryNode,
    pub collector: CatalogCollector,
}

#[derive(Debug, Clone, Copy)]
struct WorkerSettings {
    policy: RetryPolicy,
    limits: TraversalLimits,
}

/// Main crawler coordinator structure
pub struct Coordinator<F, C> {
    config: Config,
    ctx: ExtractContext,
    factory: F,
    store: C,
    config_hash: String,
}

impl<F, C> Coordinator<F, C>
where
    F: SessionFactory + Clone + 'static,
    F::Session: 'static,
    C: CheckpointStore,
{
    pub fn new(config: Config, factory: F, store: C, config_hash: &str) -> Result<Self> {
        let ctx = ExtractContext::from_config(&config)?;
        Ok(Self {
            config,
            ctx,
            factory,
            store,
            config_hash: config_hash.to_string(),
        })
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn into_store(self) -> C {
        self.store
    }

    /// Runs a complete crawl
    ///
    /// The run is marked completed on success and failed otherwise; progress
    /// saved up to the failure survives for `--resume`.
    pub async fn run(&mut self, options: CrawlOptions) -> Result<CrawlOutcome> {
        let snapshot = self.begin_run(options)?;
        let run_id = snapshot.run_id;
        let start_time = Instant::now();

        let result = match self.config.crawler.mode {
            CrawlMode::Sequential => self.run_sequential(snapshot).await,
            CrawlMode::Parallel => self.run_parallel(snapshot).await,
        };

        match &result {
            Ok(outcome) => {
                self.store.complete_run(run_id)?;
                let stats = outcome.collector.stats();
                tracing::info!(
                    "Run {} completed: {} products in {} categories in {:?}",
                    run_id,
                    stats.total_products,
                    stats.categories,
                    start_time.elapsed()
                );
            }
            Err(e) => {
                tracing::error!("Run {} failed: {}", run_id, e);
                if let Err(status_err) = self.store.update_run_status(run_id, RunStatus::Failed) {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, status_err);
                }
            }
        }

        result
    }

    /// Picks up the latest unfinished run, or creates a new one
    fn begin_run(&mut self, options: CrawlOptions) -> Result<CheckpointSnapshot> {
        if !options.fresh {
            if let Some(run) = self.store.latest_run()? {
                if run.status.is_resumable() {
                    if let Some(snapshot) = self.store.load_run(run.id)? {
                        if run.config_hash != self.config_hash {
                            tracing::warn!(
                                "Configuration changed since run {}; resuming anyway",
                                run.id
                            );
                        }
                        tracing::info!(
                            "Resuming run {}: {} categories already complete",
                            run.id,
                            snapshot.completed_categories.len()
                        );
                        self.store.update_run_status(run.id, RunStatus::Running)?;
                        return Ok(snapshot);
                    }
                }
            }
        }

        let run_id = self.store.create_run(&self.config_hash)?;
        tracing::info!("Starting new run {}", run_id);
        let snapshot = CheckpointSnapshot::new(run_id);
        self.store.save(&snapshot)?;
        Ok(snapshot)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.crawler)
    }

    fn limits(&self) -> TraversalLimits {
        TraversalLimits {
            max_depth: self.config.crawler.max_depth as usize,
        }
    }

    fn new_session(&self) -> Result<ResilientSession<F::Session>> {
        let session = self
            .factory
            .create()
            .map_err(|e| CatalogError::SessionInit(e.to_string()))?;
        Ok(ResilientSession::new(session, self.retry_policy()))
    }

    /// Loads the start page and reads the category menu
    async fn discover(&self, session: &mut ResilientSession<F::Session>) -> Result<Vec<CategoryNode>> {
        session.load_page(&self.config.site.start_url).await?;
        let categories = discover_categories(session.session(), &self.ctx);
        tracing::info!(
            "Discovered {} categories on {}",
            categories.len(),
            self.config.site.start_url
        );
        Ok(categories)
    }

    /// One session, categories in menu order
    async fn run_sequential(&mut self, snapshot: CheckpointSnapshot) -> Result<CrawlOutcome> {
        let limits = self.limits();
        let restart_every = self.config.crawler.restart_every.max(1) as usize;
        let checkpoint_every = self.config.crawler.checkpoint_every;

        let mut session = self.new_session()?;
        let categories = self.discover(&mut session).await?;

        let mut collector = CatalogCollector::from_tree(&snapshot.categories);
        let mut visited = HashSet::new();
        let ctx = &self.ctx;
        let mut checkpointer = Checkpointer::new(&mut self.store, snapshot, checkpoint_every);
        let mut crawled = 0usize;

        for mut category in categories {
            if checkpointer.snapshot().is_completed(&category) {
                tracing::info!("Skipping '{}': completed in an earlier run", category.name);
                continue;
            }

            if crawled > 0 && crawled % restart_every == 0 {
                tracing::info!("Proactive session restart after {} categories", crawled);
                session.restart().await?;
            }

            collector.ensure_category(&category.name);
            let result = Traversal::new(
                &mut session,
                ctx,
                &mut collector,
                &mut checkpointer,
                &mut visited,
                limits,
            )
            .crawl_category(&mut category)
            .await;
            crawled += 1;

            if let Err(e) = result {
                tracing::error!("Crawl stopped in '{}': {}", category.name, e);
                if let Err(save_err) = checkpointer.save() {
                    tracing::warn!("Final checkpoint failed: {}", save_err);
                }
                return Err(e);
            }

            checkpointer.complete_category(category)?;
            tracing::info!(
                "Progress: {} categories crawled, {} products so far",
                checkpointer.snapshot().completed_categories.len(),
                collector.stats().total_products
            );
        }

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close page session: {}", e);
        }

        let snapshot = checkpointer.into_snapshot();
        Ok(CrawlOutcome {
            run_id: snapshot.run_id,
            categories: snapshot.categories,
            collector,
            failed_categories: Vec::new(),
        })
    }

    /// One worker and one session per category, `pool-size` at a time
    ///
    /// Workers run as local tasks since DOM snapshots stay on their thread.
    async fn run_parallel(&mut self, snapshot: CheckpointSnapshot) -> Result<CrawlOutcome> {
        let run_id = snapshot.run_id;
        let settings = WorkerSettings {
            policy: self.retry_policy(),
            limits: self.limits(),
        };
        let pool_size = self.config.crawler.pool_size.max(1) as usize;
        let poll_timeout = Duration::from_secs(self.config.crawler.worker_poll_timeout_secs.max(1));

        let categories = {
            let mut session = self.new_session()?;
            let categories = self.discover(&mut session).await?;
            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close discovery session: {}", e);
            }
            categories
        };
        let menu_order: Vec<String> = categories.iter().map(CategoryNode::key).collect();

        let pending: Vec<(usize, CategoryNode)> = categories
            .into_iter()
            .enumerate()
            .filter(|(_, category)| {
                let done = snapshot.is_completed(category);
                if done {
                    tracing::info!("Skipping '{}': completed in an earlier run", category.name);
                }
                !done
            })
            .collect();
        let expected = pending.len();
        tracing::info!("Starting {} workers (pool size {})", expected, pool_size);

        let factory = self.factory.clone();
        let ctx = self.ctx.clone();
        let mut collector = CatalogCollector::from_tree(&snapshot.categories);
        let mut checkpointer =
            Checkpointer::new(&mut self.store, snapshot, self.config.crawler.checkpoint_every);

        let local = LocalSet::new();
        let mut reports = local
            .run_until(async {
                let semaphore = Rc::new(Semaphore::new(pool_size));
                let (tx, mut rx) = mpsc::unbounded_channel::<WorkerEvent>();

                for (index, category) in pending {
                    let worker = Worker {
                        index,
                        factory: factory.clone(),
                        ctx: ctx.clone(),
                        settings,
                    };
                    task::spawn_local(worker.run(category, Rc::clone(&semaphore), tx.clone()));
                }
                drop(tx);

                let mut reports = Vec::with_capacity(expected);
                while reports.len() < expected {
                    match timeout(poll_timeout, rx.recv()).await {
                        Ok(Some(WorkerEvent::Started(category))) => {
                            if let Err(e) = checkpointer.category_started(&category) {
                                tracing::warn!("Checkpoint of '{}' failed: {}", category.name, e);
                            }
                        }
                        Ok(Some(WorkerEvent::Visited { category, path, url })) => {
                            if let Err(e) = checkpointer.node_visited(&category, &path, &url) {
                                tracing::warn!("Checkpoint at {} failed: {}", url, e);
                            }
                        }
                        Ok(Some(WorkerEvent::LeafResolved { category, path, leaf })) => {
                            if let Err(e) = checkpointer.leaf_resolved(&category, &path, &leaf) {
                                tracing::warn!("Checkpoint at {} failed: {}", leaf.url, e);
                            }
                        }
                        Ok(Some(WorkerEvent::Finished(report))) => {
                            match report.status {
                                WorkerStatus::Done => {
                                    tracing::info!("Worker '{}': {}", report.category, report.message);
                                    if let Err(e) = checkpointer.complete_category(report.node.clone()) {
                                        tracing::warn!("Checkpoint after '{}' failed: {}", report.category, e);
                                    }
                                }
                                WorkerStatus::Error => {
                                    tracing::error!("Worker '{}': {}", report.category, report.message);
                                }
                            }
                            reports.push(report);
                        }
                        Ok(None) => {
                            tracing::warn!(
                                "All workers exited with {} reports outstanding",
                                expected - reports.len()
                            );
                            break;
                        }
                        Err(_) => {
                            tracing::debug!("Waiting on {} workers", expected - reports.len());
                        }
                    }
                }
                reports
            })
            .await;

        // Persists the partial trees of failed workers
        if let Err(e) = checkpointer.save() {
            tracing::warn!("Final checkpoint failed: {}", e);
        }
        reports.sort_by_key(|report| report.index);

        let mut categories = checkpointer.into_snapshot().categories;
        categories.retain(|node| !reports.iter().any(|r| r.node.key() == node.key()));
        let mut failed_categories = Vec::new();
        for report in reports {
            if report.status == WorkerStatus::Error {
                failed_categories.push(report.category.clone());
            }
            collector.merge(report.collector);
            categories.push(report.node);
        }
        categories.sort_by_key(|node| {
            let key = node.key();
            menu_order
                .iter()
                .position(|k| *k == key)
                .unwrap_or(usize::MAX)
        });

        Ok(CrawlOutcome {
            run_id,
            categories,
            collector,
            failed_categories,
        })
    }
}

/// One parallel worker, owning its session and collector
struct Worker<F> {
    index: usize,
    factory: F,
    ctx: ExtractContext,
    settings: WorkerSettings,
}

impl<F> Worker<F>
where
    F: SessionFactory,
{
    async fn run(self, category: CategoryNode, semaphore: Rc<Semaphore>, tx: mpsc::UnboundedSender<WorkerEvent>) {
        let Ok(_permit) = semaphore.acquire().await else {
            return;
        };
        tracing::debug!("Worker {} started on '{}'", self.index, category.name);

        let report = self.crawl(category, tx.clone()).await;
        if tx.send(WorkerEvent::Finished(report)).is_err() {
            tracing::warn!("Coordinator stopped listening for worker reports");
        }
    }

    async fn crawl(self, mut category: CategoryNode, tx: mpsc::UnboundedSender<WorkerEvent>) -> WorkerReport {
        let mut collector = CatalogCollector::new();
        collector.ensure_category(&category.name);

        let result: Result<()> = async {
            let session = self
                .factory
                .create()
                .map_err(|e| CatalogError::SessionInit(e.to_string()))?;
            let mut session = ResilientSession::new(session, self.settings.policy);
            let mut visited = HashSet::new();
            let mut progress = WorkerProgress { tx };

            let crawled = Traversal::new(
                &mut session,
                &self.ctx,
                &mut collector,
                &mut progress,
                &mut visited,
                self.settings.limits,
            )
            .crawl_category(&mut category)
            .await;

            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close worker session: {}", e);
            }
            crawled
        }
        .await;

        let (status, message) = match result {
            Ok(()) => (
                WorkerStatus::Done,
                format!("{} products", category.total_products()),
            ),
            Err(e) => (WorkerStatus::Error, e.to_string()),
        };

        WorkerReport {
            index: self.index,
            category: category.name.clone(),
            status,
            message,
            node: category,
            collector,
        }
    }
}

/// Progress a worker streams to the coordinator's checkpointer
enum WorkerEvent {
    Started(CategoryNode),
    Visited {
        category: String,
        path: Vec<String>,
        url: String,
    },
    LeafResolved {
        category: String,
        path: Vec<String>,
        leaf: CategoryNode,
    },
    Finished(WorkerReport),
}

/// Forwards traversal progress over the worker channel
///
/// Send errors are ignored: the coordinator only stops listening once
/// every report is in.
struct WorkerProgress {
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl ProgressObserver for WorkerProgress {
    fn category_started(&mut self, category: &CategoryNode) -> Result<()> {
        let _ = self.tx.send(WorkerEvent::Started(category.clone()));
        Ok(())
    }

    fn node_visited(&mut self, category: &str, path: &[String], url: &str) -> Result<()> {
        let _ = self.tx.send(WorkerEvent::Visited {
            category: category.to_string(),
            path: path.to_vec(),
            url: url.to_string(),
        });
        Ok(())
    }

    fn leaf_resolved(&mut self, category: &str, path: &[String], leaf: &CategoryNode) -> Result<()> {
        let _ = self.tx.send(WorkerEvent::LeafResolved {
            category: category.to_string(),
            path: path.to_vec(),
            leaf: leaf.clone(),
        });
        Ok(())
    }
}
