//! Product-Trawl: a product-page discovery crawler
//!
//! This crate walks the link graph of e-commerce domains breadth-first,
//! revealing lazy-loaded and paginated content before harvesting links, and
//! collects every URL that looks like a product page.

pub mod config;
pub mod crawler;
pub mod output;
pub mod renderer;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Product-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Renderer error: {0}")]
    Renderer(#[from] renderer::RendererError),

    #[error("Renderer session for {domain} failed: {source}")]
    DomainFatal {
        domain: String,
        source: renderer::RendererError,
    },

    #[error("Could not open renderer session for {domain}: {source}")]
    SessionOpen {
        domain: String,
        source: renderer::RendererError,
    },

    #[error("Crawl task for {domain} panicked: {message}")]
    TaskPanicked { domain: String, message: String },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid product pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Product-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_all, CrawlResult, CrawlSettings, DomainTask, FailedUrl, Orchestrator, RunResult};
pub use state::RevealState;
pub use url::{is_product, normalize, same_origin, UrlClassifier};
