use crate::config::types::{Config, CrawlerConfig, OutputConfig, ProxyConfig, SelectorConfig};
use crate::{ConfigError, ConfigResult};
use scraper::Selector;
use url::Url;

/// Upper bound on concurrent fetches
pub const MAX_WORKERS: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    if let Some(proxy) = &config.proxy {
        validate_proxy_config(proxy)?;
    }
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    validate_http_url("start_url", &config.start_url)?;
    validate_http_url("base_url", &config.base_url)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path.is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint_path cannot be empty".to_string(),
        ));
    }

    if config.records_path == config.checkpoint_path {
        return Err(ConfigError::Validation(format!(
            "records_path and checkpoint_path must differ, both are '{}'",
            config.records_path
        )));
    }

    Ok(())
}

/// Validates the forward proxy address
fn validate_proxy_config(config: &ProxyConfig) -> ConfigResult<()> {
    Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy url '{}': {}", config.url, e)))?;
    Ok(())
}

/// Validates that every selector parses
fn validate_selectors(config: &SelectorConfig) -> ConfigResult<()> {
    for selector in [
        &config.label,
        &config.content_links,
        &config.question,
        &config.answer,
    ] {
        Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.clone(),
            message: format!("{:?}", e),
        })?;
    }
    Ok(())
}

/// Validates that a URL parses and uses HTTP or HTTPS
fn validate_http_url(field: &str, value: &str) -> ConfigResult<()> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS scheme",
            field, value
        )));
    }

    Ok(())
}
