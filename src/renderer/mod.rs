//! Page renderers used by the crawler
//!
//! A renderer owns one live page session: it navigates, answers DOM queries
//! for the reveal protocol, and extracts links. The crawler only talks to the
//! [`Renderer`] trait; sessions are acquired through a [`RendererFactory`].
//!
//! Implementations:
//! - [`HttpRenderer`]: static HTML fetched with reqwest and parsed with scraper
//! - `ChromiumRenderer`: headless Chrome (requires the `chromium` feature)
//! - `StubRenderer`: deterministic in-memory site graph for tests (requires
//!   the `testing` feature outside this crate's own tests)

#[cfg(feature = "chromium")]
mod chromium;
mod http;
#[cfg(any(test, feature = "testing"))]
pub mod stub;

#[cfg(feature = "chromium")]
pub use chromium::{ChromiumRenderer, ChromiumRendererFactory};
pub use http::{build_http_client, HttpElement, HttpRenderer, HttpRendererFactory, DEFAULT_USER_AGENT};
#[cfg(any(test, feature = "testing"))]
pub use stub::{StubControl, StubPage, StubProbe, StubRenderer, StubRendererFactory, StubSite};

use crate::crawler::DomainTask;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a renderer session
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RendererError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Renderer session failed: {0}")]
    Session(String),

    #[error("Element error: {0}")]
    Element(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Not supported by this renderer: {0}")]
    Unsupported(String),

    #[error("No page is loaded")]
    NoPage,
}

impl RendererError {
    /// Returns true if the session itself is unusable
    ///
    /// A fatal error ends the crawl of the owning domain; every other error
    /// only affects the current page.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Session(_))
    }

    /// Returns true for errors raised while reaching a URL
    pub fn is_navigation(&self) -> bool {
        matches!(self, Self::Navigation { .. } | Self::Timeout { .. })
    }
}

/// Result type alias for renderer operations
pub type RendererResult<T> = std::result::Result<T, RendererError>;

/// Capability the crawler requires from a page rendering engine
///
/// All methods act on the page most recently loaded with [`Renderer::navigate`].
#[async_trait]
pub trait Renderer: Send {
    /// Handle to an element found on the current page
    type Element: Send + Sync;

    /// Loads `url`, failing with a navigation error on timeout or network failure
    async fn navigate(&mut self, url: &str, timeout: Duration) -> RendererResult<()>;

    /// Returns true if the page shows signs of lazy-loaded content
    async fn has_lazy_load_signal(&mut self) -> RendererResult<bool>;

    /// Looks up the first element matching a CSS selector
    async fn find_element(&mut self, selector: &str) -> RendererResult<Option<Self::Element>>;

    /// Reads the visible label text of an element
    async fn read_label(&mut self, element: &Self::Element) -> RendererResult<String>;

    async fn is_in_viewport(&mut self, element: &Self::Element) -> RendererResult<bool>;

    async fn scroll_into_view(&mut self, element: &Self::Element) -> RendererResult<()>;

    async fn click(&mut self, element: &Self::Element) -> RendererResult<()>;

    async fn scroll_to_bottom(&mut self) -> RendererResult<()>;

    /// Measures the scrollable height of the page
    async fn measure_scroll_extent(&mut self) -> RendererResult<u64>;

    /// Returns every hyperlink target as an absolute URL, in document order
    async fn extract_links(&mut self) -> RendererResult<Vec<String>>;

    /// Releases the session
    async fn close(&mut self) -> RendererResult<()>;
}

/// Opens one renderer session per domain crawl
#[async_trait]
pub trait RendererFactory: Send + Sync + 'static {
    type Renderer: Renderer + 'static;

    /// Acquires a fresh session for `task`
    ///
    /// Sessions are never shared between domains.
    async fn open(&self, task: &DomainTask) -> RendererResult<Self::Renderer>;
}
