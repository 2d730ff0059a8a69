//! Breadth-first traversal of a single domain
//!
//! The crawl is strictly sequential: one navigation, one reveal phase and one
//! link extraction at a time. All traversal state (frontier, visited set,
//! products, failures) belongs to a single call of [`DomainCrawler::crawl`].

use crate::crawler::reveal::{ContentRevealer, RevealReport};
use crate::crawler::{CrawlResult, CrawlSettings, DomainTask, FailedUrl};
use crate::renderer::{Renderer, RendererError};
use crate::url::{normalize, LinkClass, UrlClassifier};
use crate::TrawlError;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Per-crawl traversal state
#[derive(Debug, Default)]
struct Traversal {
    frontier: VecDeque<String>,
    visited: HashSet<String>,
    products: Vec<String>,
    product_set: HashSet<String>,
    failed: Vec<FailedUrl>,
}

impl Traversal {
    fn seeded(root_url: &str) -> Self {
        let mut traversal = Self::default();
        traversal.frontier.push_back(root_url.to_string());
        traversal
    }

    /// Pops frontier entries until one has not been visited, and marks it visited
    fn next_unvisited(&mut self) -> Option<String> {
        while let Some(next) = self.frontier.pop_front() {
            let url = normalize(&next);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    fn fail(&mut self, url: &str, reason: String) {
        self.failed.push(FailedUrl {
            url: url.to_string(),
            reason,
        });
    }

    /// Sorts one extracted link into the product set or the frontier
    fn triage(&mut self, link: &str, root_url: &str, classifier: &UrlClassifier) {
        let normalized = classifier.normalize(link);

        match classifier.classify(&normalized, root_url) {
            LinkClass::Product => {
                if self.product_set.insert(normalized.clone()) {
                    tracing::trace!("Product {}", normalized);
                    self.products.push(normalized);
                }
            }
            LinkClass::Traversal if !self.visited.contains(&normalized) => {
                self.frontier.push_back(normalized);
            }
            LinkClass::Traversal | LinkClass::Foreign => {}
        }
    }

    fn into_result(self, domain_name: &str) -> CrawlResult {
        CrawlResult {
            domain_name: domain_name.to_string(),
            product_urls: self.products,
            failed_urls: self.failed,
            pages_visited: self.visited.len(),
        }
    }
}

/// Crawls one domain at a time on a renderer it is handed
#[derive(Debug, Clone)]
pub struct DomainCrawler {
    settings: Arc<CrawlSettings>,
    revealer: ContentRevealer,
}

impl DomainCrawler {
    pub fn new(settings: Arc<CrawlSettings>) -> Self {
        let revealer = ContentRevealer::from_settings(&settings);
        Self { settings, revealer }
    }

    /// Runs a breadth-first traversal from the task's root URL
    ///
    /// Navigation failures are recorded per URL and the traversal continues.
    /// Reveal failures never stop a page from being harvested.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The frontier was exhausted
    /// * `Err(TrawlError::DomainFatal)` - The renderer session died mid-crawl
    pub async fn crawl<R>(&self, task: &DomainTask, renderer: &mut R) -> Result<CrawlResult, TrawlError>
    where
        R: Renderer + ?Sized,
    {
        let domain = task.domain_name();
        let classifier = &self.settings.classifier;
        let mut traversal = Traversal::seeded(&task.root_url);

        tracing::info!("Crawling started: {}", domain);

        while let Some(url) = traversal.next_unvisited() {
            tracing::debug!("Visiting {}", url);

            match self.navigate(renderer, &url).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(domain_fatal(domain, e)),
                Err(e) => {
                    if e.is_navigation() {
                        tracing::warn!("Failed to crawl {}: {}", url, e);
                    } else {
                        tracing::warn!("Renderer error while loading {}: {}", url, e);
                    }
                    traversal.fail(&url, e.to_string());
                    continue;
                }
            }

            if let Some(report) = self.reveal(task, renderer).await {
                if let Some(error) = &report.error {
                    tracing::warn!("Reveal failed on {}: {}", url, error);
                } else if report.state.is_stable() {
                    tracing::debug!("Reveal on {} settled after {} attempts", url, report.attempts);
                } else {
                    tracing::info!(
                        "Reveal on {} ended {} after {} attempts, more content may remain",
                        url,
                        report.state,
                        report.attempts
                    );
                }
            }

            let links = match renderer.extract_links().await {
                Ok(links) => links,
                Err(e) if e.is_fatal() => return Err(domain_fatal(domain, e)),
                Err(e) => {
                    tracing::warn!("Failed to extract links from {}: {}", url, e);
                    traversal.fail(&url, format!("Link extraction failed: {}", e));
                    continue;
                }
            };

            tracing::debug!("Found {} links on {}", links.len(), url);
            for link in &links {
                traversal.triage(link, &task.root_url, classifier);
            }
        }

        let result = traversal.into_result(domain);
        tracing::info!(
            "Crawling finished: {}, {} product URLs found, {} pages visited, {} failed",
            domain,
            result.product_urls.len(),
            result.pages_visited,
            result.failed_urls.len()
        );
        Ok(result)
    }

    /// Navigates once, bounded by the configured timeout
    async fn navigate<R>(&self, renderer: &mut R, url: &str) -> Result<(), RendererError>
    where
        R: Renderer + ?Sized,
    {
        let timeout = self.settings.navigation_timeout;
        match tokio::time::timeout(timeout, renderer.navigate(url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(RendererError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    /// Runs the reveal phase for the current page
    ///
    /// Lazy loading takes precedence over the "load more" control. A failing
    /// probe counts as the signal being absent.
    async fn reveal<R>(&self, task: &DomainTask, renderer: &mut R) -> Option<RevealReport>
    where
        R: Renderer + ?Sized,
    {
        let lazy = renderer.has_lazy_load_signal().await.unwrap_or_else(|e| {
            tracing::debug!("Lazy-load probe failed: {}", e);
            false
        });

        if lazy {
            tracing::debug!("Lazy loading detected, scrolling to load more content");
            return Some(
                self.revealer
                    .scroll_reveal(renderer, task.max_reveal_attempts)
                    .await,
            );
        }

        let selector = task.reveal_selector.as_deref()?;
        let present = match renderer.find_element(selector).await {
            Ok(control) => control.is_some(),
            Err(e) => {
                tracing::debug!("Lookup of '{}' failed: {}", selector, e);
                false
            }
        };

        if !present {
            return None;
        }

        tracing::debug!("Load-more control '{}' detected, clicking", selector);
        Some(
            self.revealer
                .click_reveal(
                    renderer,
                    selector,
                    task.reveal_expected_label.as_deref(),
                    task.max_reveal_attempts,
                )
                .await,
        )
    }
}

fn domain_fatal(domain: &str, source: RendererError) -> TrawlError {
    tracing::error!("Renderer session for {} failed: {}", domain, source);
    TrawlError::DomainFatal {
        domain: domain.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{StubControl, StubPage, StubRenderer, StubSite};
    use std::time::Duration;

    const ROOT: &str = "https://shop.test/";

    fn crawler() -> DomainCrawler {
        DomainCrawler::new(Arc::new(CrawlSettings {
            reveal_settle_delay: Duration::ZERO,
            click_settle_delay: Duration::ZERO,
            navigation_timeout: Duration::from_secs(5),
            ..CrawlSettings::default()
        }))
    }

    #[tokio::test]
    async fn test_collects_products_breadth_first() {
        let site = StubSite::new()
            .page(
                ROOT,
                StubPage::new().links([
                    "https://shop.test/men",
                    "https://shop.test/women",
                    "https://shop.test/products/hat",
                ]),
            )
            .page(
                "https://shop.test/men",
                StubPage::new().links(["https://shop.test/men/shirts", "https://shop.test/p-1"]),
            )
            .page(
                "https://shop.test/women",
                StubPage::new().links(["https://shop.test/item/dress?color=red"]),
            )
            .page(
                "https://shop.test/men/shirts",
                StubPage::new().links(["https://shop.test/products/hat#reviews"]),
            );
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(
            renderer.probe().navigations(),
            vec![
                "https://shop.test/",
                "https://shop.test/men",
                "https://shop.test/women",
                "https://shop.test/men/shirts",
            ]
        );
        assert_eq!(
            result.product_urls,
            vec![
                "https://shop.test/products/hat",
                "https://shop.test/p-1",
                "https://shop.test/item/dress",
            ]
        );
        assert!(result.failed_urls.is_empty());
        assert_eq!(result.pages_visited, 4);
    }

    #[tokio::test]
    async fn test_cycles_visited_once() {
        let site = StubSite::new()
            .page(ROOT, StubPage::new().links(["https://shop.test/a", "https://shop.test/?page=1"]))
            .page(
                "https://shop.test/a",
                StubPage::new().links(["https://shop.test/", "https://shop.test/a#top"]),
            );
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        let navigations = renderer.probe().navigations();
        let unique: HashSet<_> = navigations.iter().collect();
        assert_eq!(navigations.len(), unique.len());
        assert_eq!(navigations.len(), 2);
        assert_eq!(result.pages_visited, 2);
    }

    #[tokio::test]
    async fn test_foreign_links_not_followed() {
        let site = StubSite::new().page(
            ROOT,
            StubPage::new().links([
                "https://other.test/sale",
                "http://shop.test/insecure",
                "https://blog.shop.test/",
                "mailto:help@shop.test",
                "https://other.test/products/shared",
            ]),
        );
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(renderer.probe().navigations(), vec![ROOT]);
        assert_eq!(result.product_urls, vec!["https://other.test/products/shared"]);
    }

    #[tokio::test]
    async fn test_products_never_visited() {
        let site = StubSite::new()
            .page(ROOT, StubPage::new().links(["https://shop.test/products/a"]))
            .page(
                "https://shop.test/products/a",
                StubPage::new().links(["https://shop.test/hidden"]),
            );
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(renderer.probe().navigations(), vec![ROOT]);
        assert_eq!(result.product_urls, vec!["https://shop.test/products/a"]);
    }

    #[tokio::test]
    async fn test_navigation_failure_recorded_and_skipped() {
        let site = StubSite::new()
            .page(
                ROOT,
                StubPage::new().links(["https://shop.test/broken", "https://shop.test/missing", "https://shop.test/ok"]),
            )
            .page(
                "https://shop.test/broken",
                StubPage::new()
                    .navigation_error("net::ERR_CONNECTION_RESET")
                    .links(["https://shop.test/never"]),
            )
            .page("https://shop.test/ok", StubPage::new().links(["https://shop.test/p/9"]));
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(result.product_urls, vec!["https://shop.test/p/9"]);
        assert_eq!(result.failed_urls.len(), 2);
        assert_eq!(result.failed_urls[0].url, "https://shop.test/broken");
        assert!(result.failed_urls[0].reason.contains("ERR_CONNECTION_RESET"));
        assert_eq!(result.failed_urls[1].url, "https://shop.test/missing");
        assert!(!renderer
            .probe()
            .navigations()
            .contains(&"https://shop.test/never".to_string()));
    }

    #[tokio::test]
    async fn test_session_failure_is_fatal() {
        let site = StubSite::new()
            .page(ROOT, StubPage::new().links(["https://shop.test/crash"]))
            .page("https://shop.test/crash", StubPage::new().session_failure());
        let mut renderer = StubRenderer::new(site);

        let err = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap_err();

        assert!(matches!(err, TrawlError::DomainFatal { ref domain, .. } if domain == ROOT));
    }

    #[tokio::test]
    async fn test_extraction_failure_recorded() {
        let site = StubSite::new().page(ROOT, StubPage::new().extraction_error("page crashed"));
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(result.failed_urls.len(), 1);
        assert!(result.failed_urls[0].reason.starts_with("Link extraction failed"));
    }

    #[tokio::test]
    async fn test_lazy_load_takes_precedence_over_control() {
        let site = StubSite::new().page(
            ROOT,
            StubPage::new()
                .lazy_load([100, 200, 200])
                .control(StubControl::new(".more", ["More", "Done"])),
        );
        let mut renderer = StubRenderer::new(site);
        let task = DomainTask::new(ROOT).with_reveal_control(".more", Some("More".to_string()));

        crawler().crawl(&task, &mut renderer).await.unwrap();

        assert_eq!(renderer.probe().scrolls(), 2);
        assert_eq!(renderer.probe().clicks(), 0);
    }

    #[tokio::test]
    async fn test_click_reveal_when_control_present() {
        let site = StubSite::new().page(
            ROOT,
            StubPage::new()
                .control(StubControl::new(".more", ["More", "More", "No more items"]))
                .links(["https://shop.test/p/1"]),
        );
        let mut renderer = StubRenderer::new(site);
        let task = DomainTask::new(ROOT).with_reveal_control(".more", Some("More".to_string()));

        let result = crawler().crawl(&task, &mut renderer).await.unwrap();

        assert_eq!(renderer.probe().clicks(), 2);
        assert_eq!(result.product_urls, vec!["https://shop.test/p/1"]);
    }

    #[tokio::test]
    async fn test_reveal_error_does_not_fail_page() {
        let site = StubSite::new().page(
            ROOT,
            StubPage::new()
                .lazy_load([1, 2])
                .reveal_error("target closed")
                .links(["https://shop.test/p/1"]),
        );
        let mut renderer = StubRenderer::new(site);

        let result = crawler()
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(result.product_urls, vec!["https://shop.test/p/1"]);
        assert!(result.failed_urls.is_empty());
    }

    #[tokio::test]
    async fn test_navigation_timeout() {
        let site = StubSite::new()
            .page(ROOT, StubPage::new())
            .latency(Duration::from_millis(200));
        let mut renderer = StubRenderer::new(site);
        let crawler = DomainCrawler::new(Arc::new(CrawlSettings {
            navigation_timeout: Duration::from_millis(20),
            ..CrawlSettings::default()
        }));

        let result = crawler
            .crawl(&DomainTask::new(ROOT), &mut renderer)
            .await
            .unwrap();

        assert_eq!(result.failed_urls.len(), 1);
        assert!(result.failed_urls[0].reason.contains("timed out"));
    }
}
