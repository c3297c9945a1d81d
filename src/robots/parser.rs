//! robots.txt rules backed by the robotstxt crate

use robotstxt::DefaultMatcher;

/// Rules from one origin's robots.txt
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw robots.txt body; empty means everything is allowed
    content: String,
}

impl RobotsRules {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Permissive rules, used when robots.txt is missing or unreachable
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks whether `url` may be fetched by `agent`
    ///
    /// `url` may be absolute; the matcher only looks at its path and query.
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }

    /// `Crawl-delay` for `agent` in seconds
    ///
    /// A group naming the agent wins over the `*` group. Negative and
    /// non-finite values are ignored.
    pub fn crawl_delay(&self, agent: &str) -> Option<f64> {
        let agent = agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut group_open = true;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if !group_open {
                        group.clear();
                        group_open = true;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = false;
                    let Some(delay) = value
                        .parse::<f64>()
                        .ok()
                        .filter(|delay| delay.is_finite() && *delay >= 0.0)
                    else {
                        continue;
                    };
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => group_open = false,
            }
        }

        specific.or(wildcard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = RobotsRules::allow_all();
        assert!(robots.is_allowed("https://shop.test/catalog/", "CatalogCrawler"));
        assert_eq!(robots.crawl_delay("CatalogCrawler"), None);
    }

    #[test]
    fn test_disallow_specific_path() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /personal/");
        assert!(robots.is_allowed("https://shop.test/catalog/lathes/", "CatalogCrawler"));
        assert!(!robots.is_allowed("https://shop.test/personal/cart/", "CatalogCrawler"));
    }

    #[test]
    fn test_specific_agent_group() {
        let robots =
            RobotsRules::from_content("User-agent: CatalogCrawler\nDisallow: /\n\nUser-agent: *\nAllow: /");
        assert!(!robots.is_allowed("https://shop.test/catalog/", "CatalogCrawler"));
        assert!(robots.is_allowed("https://shop.test/catalog/", "OtherBot"));
    }

    #[test]
    fn test_garbage_content_allows() {
        let robots = RobotsRules::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed("https://shop.test/any", "CatalogCrawler"));
    }

    #[test]
    fn test_crawl_delay_specific_beats_wildcard() {
        let robots = RobotsRules::from_content(
            "User-agent: *\nCrawl-delay: 10\n\nUser-agent: CatalogCrawler\nCrawl-delay: 2.5",
        );
        assert_eq!(robots.crawl_delay("CatalogCrawler"), Some(2.5));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let robots = RobotsRules::from_content("User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay("BotB"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_ignores_unusable_values() {
        for value in ["-1", "inf", "NaN", "soon"] {
            let robots = RobotsRules::from_content(&format!("User-agent: *\nCrawl-delay: {value}"));
            assert_eq!(robots.crawl_delay("CatalogCrawler"), None, "Crawl-delay: {value}");
        }

        let robots = RobotsRules::from_content("User-agent: *\nCrawl-delay: 4\nCrawl-delay: -1");
        assert_eq!(robots.crawl_delay("CatalogCrawler"), Some(4.0));
    }
}
