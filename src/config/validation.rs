use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use crate::crawler::SiteSelectors;
use crate::url::parse_site_url;
use crate::ConfigError;

/// Upper bound for both millisecond delays
const MAX_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    SiteSelectors::compile(&config.selectors)?;
    Ok(())
}

/// Validates the root url
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    parse_site_url(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root-url: {}", e)))?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_delay > MAX_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "page-delay must be <= {}ms, got {}ms",
            MAX_DELAY_MS, config.page_delay
        )));
    }

    if config.request_interval > MAX_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "request-interval must be <= {}ms, got {}ms",
            MAX_DELAY_MS, config.request_interval
        )));
    }

    if config.max_pages_per_category < 1 || config.max_pages_per_category > 10_000 {
        return Err(ConfigError::Validation(format!(
            "max-pages-per-category must be between 1 and 10000, got {}",
            config.max_pages_per_category
        )));
    }

    if config.enrich_concurrency < 1 || config.enrich_concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "enrich-concurrency must be between 1 and 32, got {}",
            config.enrich_concurrency
        )));
    }

    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 32 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 32, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request-timeout must be >= 1 second".to_string(),
        ));
    }

    if config.connect_timeout < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let value = config.value.trim();
    if value.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    // Must be usable as a header value
    if value.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user-agent value cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
