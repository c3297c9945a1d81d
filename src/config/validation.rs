use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site description
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("start-url", &config.start_url)?;
    let origin = validate_http_url("base-origin", &config.base_origin)?;

    if origin.path() != "/" || origin.query().is_some() {
        return Err(ConfigError::Validation(format!(
            "base-origin must be a bare scheme and host, got '{}'",
            config.base_origin
        )));
    }

    if config.catalog_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "catalog-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.pool_size < 1 || config.pool_size > 32 {
        return Err(ConfigError::Validation(format!(
            "pool-size must be between 1 and 32, got {}",
            config.pool_size
        )));
    }

    let at_least_one = [
        ("page-load-attempts", config.page_load_attempts),
        ("extract-attempts", config.extract_attempts),
        ("restart-every", config.restart_every),
        ("checkpoint-every", config.checkpoint_every),
    ];
    for (name, value) in at_least_one {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, value
            )));
        }
    }

    if config.worker_poll_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "worker-poll-timeout-secs must be >= 1, got {}",
            config.worker_poll_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Header lists must not contain blank column names
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let lists = [
        ("default-headers", &config.default_headers),
        ("block-fallback-headers", &config.block_fallback_headers),
    ];
    for (name, headers) in lists {
        if headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot contain empty column names",
                name
            )));
        }
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("database-path", &config.database_path),
        ("json-path", &config.json_path),
        ("summary-path", &config.summary_path),
    ];
    for (name, path) in paths {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }
    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            field, value
        )));
    }

    Ok(url)
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
