//! Robots.txt handling module
//!
//! The HTTP page session fetches robots.txt once per origin and consults it
//! before every navigation when `respect-robots` is enabled.

mod parser;

pub use parser::RobotsRules;

use reqwest::Client;
use tracing::{debug, warn};

/// Fetches and parses `<origin>/robots.txt`
///
/// Missing files (4xx) mean "allow everything". Server errors and network
/// failures are logged and also treated as permissive so a flaky robots.txt
/// never blocks the crawl.
pub async fn fetch_robots(client: &Client, origin: &str) -> RobotsRules {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    match client.get(&robots_url).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => {
                debug!("Loaded robots.txt from {}", robots_url);
                RobotsRules::from_content(&body)
            }
            Err(e) => {
                warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
                RobotsRules::allow_all()
            }
        },
        Ok(response) => {
            debug!("No robots.txt at {} (status {})", robots_url, response.status());
            RobotsRules::allow_all()
        }
        Err(e) => {
            warn!("Failed to fetch {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
