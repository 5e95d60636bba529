use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, ProductConfig, ScopeConfig, UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_product_config(&config.products)?;
    validate_scope_config(&config.scope)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 256 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 256, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.per_page_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "per_page_timeout_ms must be >= 100ms, got {}ms",
            config.per_page_timeout_ms
        )));
    }

    if config.per_domain_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "per_domain_timeout_ms must be >= 100ms, got {}ms",
            config.per_domain_timeout_ms
        )));
    }

    if config.fetch_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "fetch_retries must be <= 10, got {}",
            config.fetch_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates product markers and patterns
fn validate_product_config(config: &ProductConfig) -> Result<(), ConfigError> {
    if config.markers.is_empty() && config.patterns.is_empty() {
        return Err(ConfigError::Validation(
            "at least one product marker or pattern is required".to_string(),
        ));
    }

    if config.markers.iter().any(|m| m.is_empty()) {
        return Err(ConfigError::Validation(
            "product markers cannot be empty strings".to_string(),
        ));
    }

    for pattern in &config.patterns {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
    }

    Ok(())
}

/// Validates scope configuration
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    match config.default_scheme.as_str() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "default_scheme must be 'http' or 'https', got '{}'",
            other
        ))),
    }
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.json_path.is_empty() {
        return Err(ConfigError::Validation(
            "json_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.report_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "report_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
