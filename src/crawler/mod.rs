//! Crawler module for product URL discovery
//!
//! This module contains the core crawling logic, including:
//! - Content reveal (scroll and click) on listing pages
//! - Breadth-first traversal of a single domain
//! - Concurrent orchestration of many domains

mod domain;
mod orchestrator;
mod reveal;
mod types;

pub use domain::DomainCrawler;
pub use orchestrator::{run_all, Orchestrator};
pub use reveal::{ContentRevealer, RevealReport};
pub use types::{
    CrawlResult, CrawlSettings, DomainTask, FailedUrl, RunResult, DEFAULT_MAX_REVEAL_ATTEMPTS,
};
