//! Catalog data model and aggregation
//!
//! - `CategoryNode`: the hierarchical dataset produced by a crawl
//! - `Product` / `ProductBlock`: normalized records
//! - `PageKind` / `PagePayload`: classifier and extractor results
//! - `CatalogCollector`: per-category summaries fed by the traversal

mod model;
mod sink;

pub use model::{
    CategoryNode, CrawlCheckpoint, NavLink, PageKind, PagePayload, Product, ProductBlock,
    UNNAMED_PRODUCT,
};
pub use sink::{
    AggregationSink, BlockDescriptor, BlockRecord, CatalogCollector, CategoryRecord,
    CollectorStats, PATH_SEPARATOR,
};
