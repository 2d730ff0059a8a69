//! Static HTML renderer
//!
//! This renderer fetches pages with reqwest and answers DOM queries by parsing
//! the returned HTML with scraper. It executes no JavaScript, so:
//! - the scroll extent is the document size and never grows
//! - elements are always considered to be in the viewport
//! - clicking is unsupported, which ends a click reveal without new content

use super::{Renderer, RendererError, RendererFactory, RendererResult};
use crate::crawler::DomainTask;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// User agent sent when the configuration does not set one
pub const DEFAULT_USER_AGENT: &str = concat!("product-trawl/", env!("CARGO_PKG_VERSION"));

/// Elements hinting that content is loaded while scrolling
const LAZY_LOAD_SELECTOR: &str = r#"img[loading="lazy"], [data-lazy]"#;

/// Builds an HTTP client for page fetching
///
/// # Example
///
/// ```no_run
/// use product_trawl::renderer::{build_http_client, DEFAULT_USER_AGENT};
///
/// let client = build_http_client(DEFAULT_USER_AGENT).unwrap();
/// ```
pub fn build_http_client(user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A page fetched by the renderer
#[derive(Debug, Clone)]
struct LoadedPage {
    /// Final URL after redirects, used to resolve relative links
    url: Url,
    body: String,
}

/// Handle to an element of a static page, re-selected on every access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpElement {
    selector: String,
}

/// Renderer session backed by plain HTTP requests
pub struct HttpRenderer {
    client: Client,
    page: Option<LoadedPage>,
}

impl HttpRenderer {
    /// Creates a session sharing the given client's connection pool
    pub fn new(client: Client) -> Self {
        Self { client, page: None }
    }

    fn page(&self) -> RendererResult<&LoadedPage> {
        self.page.as_ref().ok_or(RendererError::NoPage)
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    type Element = HttpElement;

    async fn navigate(&mut self, url: &str, timeout: Duration) -> RendererResult<()> {
        self.page = None;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RendererError::Navigation {
                url: url.to_string(),
                reason: status_reason(status),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(RendererError::Navigation {
                url: url.to_string(),
                reason: format!("Expected HTML, got {}", content_type),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());
        self.page = Some(LoadedPage {
            url: final_url,
            body,
        });
        Ok(())
    }

    async fn has_lazy_load_signal(&mut self) -> RendererResult<bool> {
        let page = self.page()?;
        count_matches(&page.body, LAZY_LOAD_SELECTOR).map(|n| n > 0)
    }

    async fn find_element(&mut self, selector: &str) -> RendererResult<Option<HttpElement>> {
        let page = self.page()?;
        let found = count_matches(&page.body, selector)? > 0;
        Ok(found.then(|| HttpElement {
            selector: selector.to_string(),
        }))
    }

    async fn read_label(&mut self, element: &HttpElement) -> RendererResult<String> {
        let page = self.page()?;
        first_match_text(&page.body, &element.selector)?.ok_or_else(|| {
            RendererError::Element(format!("'{}' is no longer on the page", element.selector))
        })
    }

    async fn is_in_viewport(&mut self, _element: &HttpElement) -> RendererResult<bool> {
        self.page()?;
        Ok(true)
    }

    async fn scroll_into_view(&mut self, _element: &HttpElement) -> RendererResult<()> {
        self.page()?;
        Ok(())
    }

    async fn click(&mut self, element: &HttpElement) -> RendererResult<()> {
        Err(RendererError::Unsupported(format!(
            "cannot click '{}' without a scripting renderer",
            element.selector
        )))
    }

    async fn scroll_to_bottom(&mut self) -> RendererResult<()> {
        self.page()?;
        Ok(())
    }

    async fn measure_scroll_extent(&mut self) -> RendererResult<u64> {
        Ok(self.page()?.body.len() as u64)
    }

    async fn extract_links(&mut self) -> RendererResult<Vec<String>> {
        let page = self.page()?;
        Ok(extract_links(&page.body, &page.url))
    }

    async fn close(&mut self) -> RendererResult<()> {
        self.page = None;
        Ok(())
    }
}

/// Hands out [`HttpRenderer`] sessions that share one client
#[derive(Clone)]
pub struct HttpRendererFactory {
    client: Client,
}

impl HttpRendererFactory {
    pub fn new(user_agent: &str) -> RendererResult<Self> {
        let client =
            build_http_client(user_agent).map_err(|e| RendererError::Session(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RendererFactory for HttpRendererFactory {
    type Renderer = HttpRenderer;

    async fn open(&self, task: &DomainTask) -> RendererResult<HttpRenderer> {
        tracing::debug!("Opening HTTP session for {}", task.domain_name());
        Ok(HttpRenderer::new(self.client.clone()))
    }
}

/// Classifies a reqwest failure as a navigation error
fn request_error(url: &str, timeout: Duration, error: reqwest::Error) -> RendererError {
    if error.is_timeout() {
        RendererError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else if error.is_connect() {
        RendererError::Navigation {
            url: url.to_string(),
            reason: "Connection refused".to_string(),
        }
    } else if error.is_redirect() {
        RendererError::Navigation {
            url: url.to_string(),
            reason: "Too many redirects".to_string(),
        }
    } else {
        RendererError::Navigation {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

fn status_reason(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {}", status.as_u16(), reason),
        None => format!("HTTP {}", status.as_u16()),
    }
}

fn parse_selector(selector: &str) -> RendererResult<Selector> {
    Selector::parse(selector)
        .map_err(|e| RendererError::Element(format!("Invalid selector '{}': {:?}", selector, e)))
}

fn count_matches(html: &str, selector: &str) -> RendererResult<usize> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).count())
}

/// Returns the whitespace-collapsed text of the first matching element
fn first_match_text(html: &str, selector: &str) -> RendererResult<Option<String>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    Ok(document.select(&selector).next().map(|element| {
        element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }))
}

/// Extracts `<a href>` targets as absolute URLs, in document order
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
pub(crate) fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute HTTP(S) URL
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
