use serde::Deserialize;

/// Main configuration structure for the catalog crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

/// Target site description
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Page carrying the top-level category menu
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Scheme and host used to absolutize relative references
    #[serde(rename = "base-origin")]
    pub base_origin: String,

    /// Path segment every nested catalog link must contain
    #[serde(rename = "catalog-path", default = "default_catalog_path")]
    pub catalog_path: String,
}

/// How top-level categories are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CrawlMode {
    /// One session, depth-first over all categories
    #[default]
    Sequential,
    /// One session per top-level category, bounded by `pool-size`
    Parallel,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    pub mode: CrawlMode,

    /// Maximum number of concurrent workers in parallel mode
    pub pool_size: u32,

    /// Navigation attempts per page before giving up
    pub page_load_attempts: u32,

    /// Extraction attempts per page before reporting it empty
    pub extract_attempts: u32,

    /// Restart the session after this many top-level categories
    pub restart_every: u32,

    /// Persist a checkpoint after this many processed nodes
    pub checkpoint_every: u32,

    /// Pages with less content than this are treated as failed loads
    pub min_content_length: usize,

    /// Maximum recursion depth below a top-level category
    pub max_depth: u32,

    /// Pause after each successful navigation (milliseconds)
    pub settle_delay_ms: u64,

    /// Pause between retries (milliseconds)
    pub retry_delay_ms: u64,

    /// How long the coordinator waits on the worker channel per poll
    pub worker_poll_timeout_secs: u64,

    /// Consult robots.txt before every navigation
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::Sequential,
            pool_size: 3,
            page_load_attempts: 3,
            extract_attempts: 2,
            restart_every: 5,
            checkpoint_every: 10,
            min_content_length: 1000,
            max_depth: 4,
            settle_delay_ms: 0,
            retry_delay_ms: 0,
            worker_poll_timeout_secs: 5,
            respect_robots: true,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the value sent in the `User-Agent` header
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Column schemas used when a page does not declare its own
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractionConfig {
    pub default_headers: Vec<String>,
    pub block_fallback_headers: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_headers: [
                "Article",
                "Name",
                "CNC system",
                "Max diameter over bed",
                "Max diameter over carriage",
                "Max turning length",
                "Spindle motor power",
                "Price",
                "Availability",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            block_fallback_headers: ["Article", "CNC system", "Specifications", "Price"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite checkpoint database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the exported JSON dataset
    #[serde(rename = "json-path")]
    pub json_path: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

fn default_catalog_path() -> String {
    "/catalog/".to_string()
}
