use crate::config::types::{
    Config, CrawlerConfig, DomainEntry, OutputConfig, RendererConfig, RendererKind,
};
use crate::url::{normalize, origin_of, ProductPattern};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    validate_domains(&config.domains)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency_limit < 1 || config.concurrency_limit > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency_limit must be between 1 and 64, got {}",
            config.concurrency_limit
        )));
    }

    if config.max_reveal_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_reveal_attempts must be >= 1".to_string(),
        ));
    }

    if config.navigation_timeout < 1000 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout must be >= 1000ms, got {}ms",
            config.navigation_timeout
        )));
    }

    for pattern in &config.product_patterns {
        ProductPattern::parse(pattern)?;
    }

    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.kind == RendererKind::Chromium && !cfg!(feature = "chromium") {
        return Err(ConfigError::Validation(
            "renderer kind 'chromium' requires the 'chromium' feature".to_string(),
        ));
    }

    if let Some(user_agent) = &config.user_agent {
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    validate_file_name("product_file_name", &config.product_file_name)?;
    validate_file_name("failed_urls_file_name", &config.failed_urls_file_name)?;

    if config.product_file_name == config.failed_urls_file_name {
        return Err(ConfigError::Validation(format!(
            "product_file_name and failed_urls_file_name must differ, both are '{}'",
            config.product_file_name
        )));
    }

    Ok(())
}

fn validate_file_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(ConfigError::Validation(format!(
            "{} must be a plain file name, got '{}'",
            field, name
        )));
    }

    Ok(())
}

/// Validates domain entries
fn validate_domains(domains: &[DomainEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in domains {
        validate_root_url(&entry.root_url)?;

        if !seen.insert(normalize(&entry.root_url)) {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' is configured more than once",
                entry.root_url
            )));
        }

        if let Some(selector) = &entry.reveal_selector {
            if selector.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Domain '{}' has an empty reveal_selector",
                    entry.root_url
                )));
            }
        }

        if entry.reveal_expected_label.is_some() && entry.reveal_selector.is_none() {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' sets reveal_expected_label without a reveal_selector",
                entry.root_url
            )));
        }

        if entry.max_reveal_attempts == Some(0) {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' must allow at least one reveal attempt",
                entry.root_url
            )));
        }
    }

    Ok(())
}

/// Validates that a root URL is an absolute http(s) URL with a host
fn validate_root_url(root_url: &str) -> Result<(), ConfigError> {
    origin_of(root_url)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root URL '{}': {}", root_url, e)))
}
