use crate::crawler::{CrawlSettings, DomainTask, DEFAULT_MAX_REVEAL_ATTEMPTS};
use crate::url::UrlClassifier;
use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Product-Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DomainEntry>,
}

impl Config {
    /// Builds one crawl task per configured domain, in file order
    pub fn domain_tasks(&self) -> Vec<DomainTask> {
        self.domains
            .iter()
            .map(|entry| {
                let attempts = entry
                    .max_reveal_attempts
                    .unwrap_or(self.crawler.max_reveal_attempts);
                let task = DomainTask::new(entry.root_url.clone()).with_max_reveal_attempts(attempts);

                match &entry.reveal_selector {
                    Some(selector) => {
                        task.with_reveal_control(selector.clone(), entry.reveal_expected_label.clone())
                    }
                    None => task,
                }
            })
            .collect()
    }

    /// Builds the settings shared by every domain crawl
    pub fn crawl_settings(&self) -> Result<CrawlSettings, ConfigError> {
        let crawler = &self.crawler;
        Ok(CrawlSettings {
            concurrency_limit: crawler.concurrency_limit as usize,
            max_reveal_attempts: crawler.max_reveal_attempts,
            reveal_settle_delay: Duration::from_millis(crawler.reveal_settle_delay),
            click_settle_delay: Duration::from_millis(crawler.click_settle_delay),
            navigation_timeout: Duration::from_millis(crawler.navigation_timeout),
            classifier: UrlClassifier::from_patterns(crawler.product_patterns.as_slice())?,
        })
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of domains crawled at the same time
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: u32,

    /// Scroll or click iterations per page, unless a domain overrides it
    #[serde(rename = "max-reveal-attempts", default = "default_max_reveal_attempts")]
    pub max_reveal_attempts: u32,

    /// Wait after scrolling (milliseconds)
    #[serde(rename = "reveal-settle-delay", default = "default_reveal_settle_delay")]
    pub reveal_settle_delay: u64,

    /// Wait after clicking a "load more" control (milliseconds)
    #[serde(rename = "click-settle-delay", default = "default_click_settle_delay")]
    pub click_settle_delay: u64,

    /// Timeout of a single navigation (milliseconds)
    #[serde(rename = "navigation-timeout", default = "default_navigation_timeout")]
    pub navigation_timeout: u64,

    /// Path segments that mark product pages; empty means the built-in set
    #[serde(rename = "product-patterns", default)]
    pub product_patterns: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            max_reveal_attempts: default_max_reveal_attempts(),
            reveal_settle_delay: default_reveal_settle_delay(),
            click_settle_delay: default_click_settle_delay(),
            navigation_timeout: default_navigation_timeout(),
            product_patterns: Vec::new(),
        }
    }
}

fn default_concurrency_limit() -> u32 {
    2
}

fn default_max_reveal_attempts() -> u32 {
    DEFAULT_MAX_REVEAL_ATTEMPTS
}

fn default_reveal_settle_delay() -> u64 {
    1000
}

fn default_click_settle_delay() -> u64 {
    3000
}

fn default_navigation_timeout() -> u64 {
    30_000
}

/// Which renderer backs the crawl sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chrome, executes scripts
    Chromium,
    /// Plain HTTP fetch, static HTML only
    Http,
}

impl Default for RendererKind {
    fn default() -> Self {
        if cfg!(feature = "chromium") {
            Self::Chromium
        } else {
            Self::Http
        }
    }
}

impl std::fmt::Display for RendererKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chromium => write!(f, "chromium"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    #[serde(default)]
    pub kind: RendererKind,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kind: RendererKind::default(),
            headless: default_headless(),
            user_agent: None,
        }
    }
}

fn default_headless() -> bool {
    true
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory the result files are written to
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// File name of the products JSON
    #[serde(rename = "product-file-name", default = "default_product_file_name")]
    pub product_file_name: String,

    /// File name of the failed URLs JSON
    #[serde(rename = "failed-urls-file-name", default = "default_failed_urls_file_name")]
    pub failed_urls_file_name: String,
}

impl OutputConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            product_file_name: default_product_file_name(),
            failed_urls_file_name: default_failed_urls_file_name(),
        }
    }

    pub fn product_path(&self) -> PathBuf {
        self.output_dir.join(&self.product_file_name)
    }

    pub fn failed_urls_path(&self) -> PathBuf {
        self.output_dir.join(&self.failed_urls_file_name)
    }
}

fn default_product_file_name() -> String {
    "products.json".to_string()
}

fn default_failed_urls_file_name() -> String {
    "failed_urls.json".to_string()
}

/// One domain to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct DomainEntry {
    /// Root URL the crawl starts from (e.g., "https://shop.example.com/")
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// CSS selector of the "load more" control
    #[serde(rename = "reveal-selector")]
    pub reveal_selector: Option<String>,

    /// Label the control shows while more content is available
    #[serde(rename = "reveal-expected-label")]
    pub reveal_expected_label: Option<String>,

    #[serde(rename = "max-reveal-attempts")]
    pub max_reveal_attempts: Option<u32>,
}
