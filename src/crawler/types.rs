//! Inputs and outputs of a crawl run

use crate::url::UrlClassifier;
use serde::Serialize;
use std::time::Duration;

/// Default bound on scroll or click iterations per page
pub const DEFAULT_MAX_REVEAL_ATTEMPTS: u32 = 10;

/// Settings shared by every domain crawl of a run
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Maximum number of domains crawled at the same time
    pub concurrency_limit: usize,

    /// Reveal attempts for tasks that do not set their own
    pub max_reveal_attempts: u32,

    /// Wait after scrolling, for new content to be inserted
    pub reveal_settle_delay: Duration,

    /// Wait after clicking a "load more" control
    pub click_settle_delay: Duration,

    /// Timeout of a single navigation
    pub navigation_timeout: Duration,

    pub classifier: UrlClassifier,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 2,
            max_reveal_attempts: DEFAULT_MAX_REVEAL_ATTEMPTS,
            reveal_settle_delay: Duration::from_millis(1000),
            click_settle_delay: Duration::from_millis(3000),
            navigation_timeout: Duration::from_secs(30),
            classifier: UrlClassifier::default(),
        }
    }
}

/// Immutable input to one domain crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainTask {
    /// Root URL the traversal starts from; also names the domain in results
    pub root_url: String,

    /// CSS selector of a "load more" control
    pub reveal_selector: Option<String>,

    /// Label the control shows while more content is available
    pub reveal_expected_label: Option<String>,

    pub max_reveal_attempts: u32,
}

impl DomainTask {
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            reveal_selector: None,
            reveal_expected_label: None,
            max_reveal_attempts: DEFAULT_MAX_REVEAL_ATTEMPTS,
        }
    }

    /// Configures the "load more" control clicked during the reveal phase
    pub fn with_reveal_control(
        mut self,
        selector: impl Into<String>,
        expected_label: Option<String>,
    ) -> Self {
        self.reveal_selector = Some(selector.into());
        self.reveal_expected_label = expected_label;
        self
    }

    pub fn with_max_reveal_attempts(mut self, attempts: u32) -> Self {
        self.max_reveal_attempts = attempts;
        self
    }

    /// Name under which this domain's result is reported
    pub fn domain_name(&self) -> &str {
        &self.root_url
    }
}

/// A URL that could not be crawled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUrl {
    pub url: String,
    pub reason: String,
}

/// Output of one domain crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlResult {
    pub domain_name: String,

    /// Product URLs in discovery order, without duplicates
    pub product_urls: Vec<String>,

    /// Failed URLs in the order they failed
    pub failed_urls: Vec<FailedUrl>,

    /// Number of distinct pages dequeued from the frontier
    #[serde(skip)]
    pub pages_visited: usize,
}

impl CrawlResult {
    /// Builds the result reported for a domain whose crawl could not finish
    pub fn domain_failure(task: &DomainTask, reason: impl Into<String>) -> Self {
        Self {
            domain_name: task.domain_name().to_string(),
            product_urls: Vec::new(),
            failed_urls: vec![FailedUrl {
                url: task.root_url.clone(),
                reason: reason.into(),
            }],
            pages_visited: 0,
        }
    }
}

/// Results of every domain of a run, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    results: Vec<CrawlResult>,
}

impl RunResult {
    pub fn new(results: Vec<CrawlResult>) -> Self {
        Self { results }
    }

    /// Looks up the result of a domain by name
    pub fn get(&self, domain_name: &str) -> Option<&CrawlResult> {
        self.results.iter().find(|r| r.domain_name == domain_name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CrawlResult> {
        self.results.iter()
    }

    pub fn into_results(self) -> Vec<CrawlResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a RunResult {
    type Item = &'a CrawlResult;
    type IntoIter = std::slice::Iter<'a, CrawlResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_task_builder() {
        let task = DomainTask::new("https://shop.test/")
            .with_reveal_control(".load-more", Some("Load More".to_string()))
            .with_max_reveal_attempts(4);

        assert_eq!(task.domain_name(), "https://shop.test/");
        assert_eq!(task.reveal_selector.as_deref(), Some(".load-more"));
        assert_eq!(task.reveal_expected_label.as_deref(), Some("Load More"));
        assert_eq!(task.max_reveal_attempts, 4);
    }

    #[test]
    fn test_domain_failure_result() {
        let task = DomainTask::new("https://shop.test/");
        let result = CrawlResult::domain_failure(&task, "browser crashed");

        assert!(result.product_urls.is_empty());
        assert_eq!(
            result.failed_urls,
            vec![FailedUrl {
                url: "https://shop.test/".to_string(),
                reason: "browser crashed".to_string(),
            }]
        );
    }

    #[test]
    fn test_run_result_lookup() {
        let a = CrawlResult::domain_failure(&DomainTask::new("https://a.test/"), "x");
        let b = CrawlResult::domain_failure(&DomainTask::new("https://b.test/"), "y");
        let run = RunResult::new(vec![a, b]);

        assert_eq!(run.len(), 2);
        assert_eq!(run.get("https://b.test/").unwrap().failed_urls[0].reason, "y");
        assert!(run.get("https://c.test/").is_none());
        assert_eq!(
            run.iter().map(|r| r.domain_name.as_str()).collect::<Vec<_>>(),
            vec!["https://a.test/", "https://b.test/"]
        );
    }
}
