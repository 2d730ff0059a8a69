//! Headless Chrome renderer
//!
//! Each session launches its own browser process so that cookies, storage and
//! crashes never leak between domains. The CDP event handler runs on a
//! background task that lives exactly as long as the session.

use super::{Renderer, RendererError, RendererFactory, RendererResult};
use crate::crawler::DomainTask;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::EventLifecycleEvent;
use chromiumoxide::element::Element;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

const LAZY_LOAD_PROBE: &str = r#"!!document.querySelector('img[loading="lazy"]') || !!document.querySelector('[data-lazy]')"#;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";

const SCROLL_EXTENT: &str = "document.body.scrollHeight";

const EXTRACT_LINKS: &str = "Array.from(document.querySelectorAll('a[href]'), (a) => a.href)";

const IN_VIEWPORT_FN: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const height = window.innerHeight || document.documentElement.clientHeight;
    const width = window.innerWidth || document.documentElement.clientWidth;
    return rect.bottom > 0 && rect.right > 0 && rect.top < height && rect.left < width;
}"#;

/// Renderer session backed by a dedicated headless Chrome instance
pub struct ChromiumRenderer {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    fn page(&self) -> RendererResult<&Page> {
        if self.handler.is_finished() {
            return Err(RendererError::Session(
                "browser connection closed".to_string(),
            ));
        }
        self.page.as_ref().ok_or(RendererError::NoPage)
    }

    async fn evaluate<T: serde::de::DeserializeOwned>(&self, expression: &str) -> RendererResult<T> {
        self.page()?
            .evaluate(expression)
            .await
            .map_err(|e| RendererError::Script(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| RendererError::Script(e.to_string()))
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        // `Browser` kills its child process on drop; stop polling its connection.
        self.handler.abort();
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    type Element = Element;

    async fn navigate(&mut self, url: &str, timeout: Duration) -> RendererResult<()> {
        let page = self.page()?;

        // Subscribe before `goto` so the lifecycle of the new document is not missed.
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| navigation_error(url, e))?;

        match tokio::time::timeout(timeout, load_until_idle(page, url, &mut lifecycle)).await {
            Ok(result) => result,
            Err(_) => Err(RendererError::Timeout {
                url: url.to_string(),
                timeout,
            }),
        }
    }

    async fn has_lazy_load_signal(&mut self) -> RendererResult<bool> {
        self.evaluate(LAZY_LOAD_PROBE).await
    }

    async fn find_element(&mut self, selector: &str) -> RendererResult<Option<Element>> {
        let elements = self
            .page()?
            .find_elements(selector)
            .await
            .map_err(|e| RendererError::Element(e.to_string()))?;
        Ok(elements.into_iter().next())
    }

    async fn read_label(&mut self, element: &Element) -> RendererResult<String> {
        let text = element
            .inner_text()
            .await
            .map_err(|e| RendererError::Element(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn is_in_viewport(&mut self, element: &Element) -> RendererResult<bool> {
        let returns = element
            .call_js_fn(IN_VIEWPORT_FN, false)
            .await
            .map_err(|e| RendererError::Script(e.to_string()))?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_bool())
            .unwrap_or(false))
    }

    async fn scroll_into_view(&mut self, element: &Element) -> RendererResult<()> {
        element
            .scroll_into_view()
            .await
            .map_err(|e| RendererError::Element(e.to_string()))?;
        Ok(())
    }

    async fn click(&mut self, element: &Element) -> RendererResult<()> {
        element
            .click()
            .await
            .map_err(|e| RendererError::Element(e.to_string()))?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> RendererResult<()> {
        self.page()?
            .evaluate(SCROLL_TO_BOTTOM)
            .await
            .map_err(|e| RendererError::Script(e.to_string()))?;
        Ok(())
    }

    async fn measure_scroll_extent(&mut self) -> RendererResult<u64> {
        self.evaluate(SCROLL_EXTENT).await
    }

    async fn extract_links(&mut self) -> RendererResult<Vec<String>> {
        self.evaluate(EXTRACT_LINKS).await
    }

    async fn close(&mut self) -> RendererResult<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close page: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            let closed = browser.close().await;
            if let Err(e) = browser.wait().await {
                tracing::debug!("Failed to reap browser process: {}", e);
            }
            self.handler.abort();
            closed.map_err(|e| RendererError::Session(e.to_string()))?;
        }

        Ok(())
    }
}

fn navigation_error(url: &str, reason: impl std::fmt::Display) -> RendererError {
    RendererError::Navigation {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

/// Loads `url` and waits until the main frame has gone network idle
async fn load_until_idle(
    page: &Page,
    url: &str,
    lifecycle: &mut EventStream<EventLifecycleEvent>,
) -> RendererResult<()> {
    page.goto(url).await.map_err(|e| navigation_error(url, e))?;
    let main_frame = page.mainframe().await.map_err(|e| navigation_error(url, e))?;

    let mut tracker = IdleTracker::default();
    while let Some(event) = lifecycle.next().await {
        if main_frame.as_ref().is_some_and(|frame| *frame != event.frame_id) {
            continue;
        }
        if tracker.observe(&event.name) {
            return Ok(());
        }
    }

    Err(RendererError::Session(
        "browser connection closed".to_string(),
    ))
}

/// Follows the main-frame lifecycle of one navigation
///
/// Chrome reports `networkIdle` once no requests have been in flight for
/// 500ms. Only events after the new document's `init` count, so an idle
/// signal left over from the previous page is ignored.
#[derive(Debug, Default)]
struct IdleTracker {
    started: bool,
}

impl IdleTracker {
    /// Returns true once the new document has gone network idle
    fn observe(&mut self, event: &str) -> bool {
        match event {
            "init" => {
                self.started = true;
                false
            }
            "networkIdle" => self.started,
            _ => false,
        }
    }
}

/// Launches one headless Chrome per domain session
#[derive(Debug, Clone)]
pub struct ChromiumRendererFactory {
    headless: bool,
    user_agent: Option<String>,
}

impl ChromiumRendererFactory {
    pub fn new(headless: bool, user_agent: Option<String>) -> Self {
        Self {
            headless,
            user_agent,
        }
    }
}

#[async_trait]
impl RendererFactory for ChromiumRendererFactory {
    type Renderer = ChromiumRenderer;

    async fn open(&self, task: &DomainTask) -> RendererResult<ChromiumRenderer> {
        tracing::debug!("Launching browser for {}", task.domain_name());

        let mut builder = BrowserConfig::builder();
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(RendererError::Session)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RendererError::Session(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        let mut renderer = ChromiumRenderer {
            browser: Some(browser),
            page: None,
            handler,
        };

        match open_page(&renderer, self.user_agent.as_deref()).await {
            Ok(page) => {
                renderer.page = Some(page);
                Ok(renderer)
            }
            Err(e) => {
                if let Err(close_err) = renderer.close().await {
                    tracing::debug!("Failed to close browser after launch error: {}", close_err);
                }
                Err(e)
            }
        }
    }
}

async fn open_page(renderer: &ChromiumRenderer, user_agent: Option<&str>) -> RendererResult<Page> {
    let browser = renderer
        .browser
        .as_ref()
        .ok_or_else(|| RendererError::Session("browser already closed".to_string()))?;

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| RendererError::Session(e.to_string()))?;

    if let Some(user_agent) = user_agent {
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| RendererError::Session(e.to_string()))?;
    }

    Ok(page)
}
