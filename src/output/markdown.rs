//! Markdown summary generation
//!
//! Per-category totals, per-path product counts and the block listing of a
//! run, as a human-readable report.

use crate::catalog::CategoryRecord;
use crate::output::{CrawlSummary, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Label for products found directly on a category page
const CATEGORY_PAGE_LABEL: &str = "(category page)";

/// Writes the markdown summary to `output_path`
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();
    let stats = summary.stats();

    md.push_str("# Catalog Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Run ID**: {}\n", summary.run_id));
    md.push_str(&format!("- **Started**: {}\n", summary.started_at));
    if let Some(finished) = &summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished));
    }
    if let Some(duration) = summary.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status.to_db_string()));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Categories**: {}\n", stats.categories));
    md.push_str(&format!("- **Total Products**: {}\n", stats.total_products));
    md.push_str(&format!("- **Subcategories**: {}\n", stats.total_subcategories));
    md.push_str(&format!("- **Blocks**: {}\n", stats.total_blocks));
    md.push_str(&format!("- **Preorder Products**: {}\n", stats.preorder_products));
    md.push_str(&format!("- **Empty Leaves**: {}\n\n", summary.empty_leaves()));

    md.push_str("## Categories\n\n");
    md.push_str("| Category | Products | Preorder | Subcategories | Blocks |\n");
    md.push_str("|----------|----------|----------|---------------|--------|\n");
    for (name, record) in summary.collector.categories() {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            escape_cell(name),
            record.product_count,
            record.preorder_count,
            record.path_counts.len(),
            record.blocks.len()
        ));
    }
    md.push('\n');

    for (name, record) in summary.collector.categories() {
        format_category(&mut md, name, record);
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by catalog-crawler*\n");

    md
}

fn format_category(md: &mut String, name: &str, record: &CategoryRecord) {
    md.push_str(&format!("### {}\n\n", name));

    if record.path_counts.is_empty() {
        md.push_str("No products found.\n\n");
        return;
    }

    md.push_str("| Path | Products |\n");
    md.push_str("|------|----------|\n");
    for (path, count) in &record.path_counts {
        let label = if path.is_empty() {
            CATEGORY_PAGE_LABEL
        } else {
            path.as_str()
        };
        md.push_str(&format!("| {} | {} |\n", escape_cell(label), count));
    }
    md.push('\n');

    if !record.blocks.is_empty() {
        md.push_str("#### Blocks\n\n");
        md.push_str("| Path | Block | Products | Image |\n");
        md.push_str("|------|-------|----------|-------|\n");
        for block in &record.blocks {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                escape_cell(&block.path),
                escape_cell(&block.title),
                block.product_count,
                block.image_url.as_deref().unwrap_or("-")
            ));
        }
        md.push('\n');
    }
}

/// Keeps pipes in names from breaking table rows
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
