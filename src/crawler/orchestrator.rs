//! Concurrent execution of domain crawls
//!
//! Every task is spawned at once onto a [`JoinSet`]; a semaphore bounds how
//! many of them hold a renderer session at the same time. A task's failure,
//! whether an error or a panic, turns into a failure result for that domain
//! and never cancels its siblings.

use crate::crawler::{CrawlResult, CrawlSettings, DomainCrawler, DomainTask, RunResult};
use crate::renderer::{Renderer, RendererError, RendererFactory};
use crate::TrawlError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs many domain crawls with bounded concurrency
pub struct Orchestrator<F: RendererFactory> {
    factory: Arc<F>,
    crawler: Arc<DomainCrawler>,
    concurrency_limit: usize,
}

impl<F: RendererFactory> Orchestrator<F> {
    pub fn new(factory: Arc<F>, settings: CrawlSettings) -> Self {
        let concurrency_limit = settings.concurrency_limit.max(1);
        Self {
            factory,
            crawler: Arc::new(DomainCrawler::new(Arc::new(settings))),
            concurrency_limit,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Crawls every task and waits for all of them to settle
    ///
    /// Results are returned in submission order. A domain whose session could
    /// not be opened, whose session died, or whose task panicked is reported
    /// with no products and a single failed URL carrying the reason.
    pub async fn run_all(&self, tasks: Vec<DomainTask>) -> RunResult {
        tracing::info!(
            "Starting run: {} domains, concurrency limit {}",
            tasks.len(),
            self.concurrency_limit
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut join_set = JoinSet::new();

        for (index, task) in tasks.iter().cloned().enumerate() {
            let factory = Arc::clone(&self.factory);
            let crawler = Arc::clone(&self.crawler);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let outcome =
                    AssertUnwindSafe(crawl_domain(factory.as_ref(), &crawler, &task, semaphore))
                        .catch_unwind()
                        .await;

                let result = match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        tracing::error!("Domain {} failed: {}", task.domain_name(), e);
                        CrawlResult::domain_failure(&task, e.to_string())
                    }
                    Err(panic) => {
                        let error = TrawlError::TaskPanicked {
                            domain: task.domain_name().to_string(),
                            message: panic_message(panic.as_ref()),
                        };
                        tracing::error!("{}", error);
                        CrawlResult::domain_failure(&task, error.to_string())
                    }
                };

                (index, result)
            });
        }

        let mut slots: Vec<Option<CrawlResult>> = vec![None; tasks.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!("Crawl task did not complete: {}", e),
            }
        }

        let results: Vec<CrawlResult> = slots
            .into_iter()
            .zip(&tasks)
            .map(|(slot, task)| {
                slot.unwrap_or_else(|| {
                    CrawlResult::domain_failure(task, "Crawl task did not complete")
                })
            })
            .collect();

        let products: usize = results.iter().map(|r| r.product_urls.len()).sum();
        tracing::info!(
            "Run finished: {} domains, {} product URLs",
            results.len(),
            products
        );

        RunResult::new(results)
    }
}

/// Crawls one domain inside a concurrency slot, always closing the session
async fn crawl_domain<F: RendererFactory>(
    factory: &F,
    crawler: &DomainCrawler,
    task: &DomainTask,
    semaphore: Arc<Semaphore>,
) -> Result<CrawlResult, TrawlError> {
    let domain = task.domain_name();

    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| TrawlError::SessionOpen {
            domain: domain.to_string(),
            source: RendererError::Session(e.to_string()),
        })?;

    let mut renderer = factory
        .open(task)
        .await
        .map_err(|source| TrawlError::SessionOpen {
            domain: domain.to_string(),
            source,
        })?;

    let outcome = crawler.crawl(task, &mut renderer).await;

    if let Err(e) = renderer.close().await {
        tracing::warn!("Failed to close renderer session for {}: {}", domain, e);
    }

    outcome
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Crawls every task with a fresh orchestrator
pub async fn run_all<F: RendererFactory>(
    factory: F,
    tasks: Vec<DomainTask>,
    settings: CrawlSettings,
) -> RunResult {
    Orchestrator::new(Arc::new(factory), settings)
        .run_all(tasks)
        .await
}
