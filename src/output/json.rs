//! JSON dataset export

use crate::catalog::CategoryNode;
use crate::output::OutputResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Top-level shape of the exported dataset
#[derive(Debug, Serialize)]
pub struct CatalogExport<'a> {
    pub generated_at: DateTime<Utc>,
    pub total_products: usize,
    pub categories: &'a [CategoryNode],
}

impl<'a> CatalogExport<'a> {
    pub fn new(categories: &'a [CategoryNode]) -> Self {
        Self {
            generated_at: Utc::now(),
            total_products: categories.iter().map(CategoryNode::total_products).sum(),
            categories,
        }
    }
}

/// Writes the category tree to `output_path` as pretty-printed JSON
pub fn export_json(categories: &[CategoryNode], output_path: &Path) -> OutputResult<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &CatalogExport::new(categories))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
