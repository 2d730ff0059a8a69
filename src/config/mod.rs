//! Configuration module for Product-Trawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use product_trawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawl.toml")).unwrap();
//! println!("Crawling {} domains", config.domain_tasks().len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DomainEntry, OutputConfig, RendererConfig, RendererKind};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
