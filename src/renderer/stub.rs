//! Deterministic in-memory renderer
//!
//! A [`StubSite`] describes a finite link graph: for every page its links,
//! whether it shows a lazy-load signal, the sequence of scroll extents it
//! reports, an optional "load more" control with a scripted label sequence,
//! and scripted failures. A [`StubProbe`] records what the crawler did with
//! the session so tests can assert on it.
//!
//! # Example
//!
//! ```
//! use product_trawl::renderer::{StubPage, StubSite};
//!
//! let site = StubSite::new()
//!     .page("https://shop.test/", StubPage::new().links(["https://shop.test/sale"]))
//!     .page("https://shop.test/sale", StubPage::new().links(["https://shop.test/p/1"]));
//! assert_eq!(site.len(), 2);
//! ```

use super::{Renderer, RendererError, RendererFactory, RendererResult};
use crate::crawler::DomainTask;
use crate::url::normalize;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted "load more" control
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubControl {
    pub selector: String,
    /// Label read before each click; the last label repeats once exhausted
    pub labels: Vec<String>,
    pub in_viewport: bool,
    /// The control disappears after this many clicks
    pub removed_after_clicks: Option<usize>,
}

impl StubControl {
    pub fn new<I, S>(selector: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selector: selector.to_string(),
            labels: labels.into_iter().map(Into::into).collect(),
            in_viewport: true,
            removed_after_clicks: None,
        }
    }

    pub fn off_screen(mut self) -> Self {
        self.in_viewport = false;
        self
    }

    pub fn removed_after(mut self, clicks: usize) -> Self {
        self.removed_after_clicks = Some(clicks);
        self
    }
}

/// One page of a stub site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubPage {
    pub links: Vec<String>,
    pub lazy_load: bool,
    /// Extents returned by successive measurements; the last one repeats
    pub scroll_extents: Vec<u64>,
    pub control: Option<StubControl>,
    /// Navigation to this page fails with the given reason
    pub navigation_error: Option<String>,
    /// Scrolling and clicking on this page fail with the given reason
    pub reveal_error: Option<String>,
    /// Link extraction on this page fails with the given reason
    pub extraction_error: Option<String>,
    /// Navigating to this page kills the session
    pub session_failure: bool,
}

impl StubPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the page as lazy loading with the given extent sequence
    pub fn lazy_load<I: IntoIterator<Item = u64>>(mut self, extents: I) -> Self {
        self.lazy_load = true;
        self.scroll_extents = extents.into_iter().collect();
        self
    }

    pub fn control(mut self, control: StubControl) -> Self {
        self.control = Some(control);
        self
    }

    pub fn navigation_error(mut self, reason: &str) -> Self {
        self.navigation_error = Some(reason.to_string());
        self
    }

    pub fn reveal_error(mut self, reason: &str) -> Self {
        self.reveal_error = Some(reason.to_string());
        self
    }

    pub fn extraction_error(mut self, reason: &str) -> Self {
        self.extraction_error = Some(reason.to_string());
        self
    }

    pub fn session_failure(mut self) -> Self {
        self.session_failure = true;
        self
    }
}

/// A finite site graph keyed by normalized URL
#[derive(Debug, Clone, Default)]
pub struct StubSite {
    pages: HashMap<String, StubPage>,
    latency: Duration,
    navigation_failure: Option<String>,
}

impl StubSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// A site whose every navigation fails with `reason`
    pub fn unreachable(reason: &str) -> Self {
        Self {
            navigation_failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn page(mut self, url: &str, page: StubPage) -> Self {
        self.pages.insert(normalize(url), page);
        self
    }

    /// Delays every navigation, so concurrent sessions overlap
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Records the interactions of one stub session
#[derive(Debug, Default)]
pub struct StubProbe {
    navigations: Mutex<Vec<String>>,
    clicks: AtomicUsize,
    scrolls: AtomicUsize,
    scrolls_into_view: AtomicUsize,
    closes: AtomicUsize,
}

impl StubProbe {
    /// URLs navigated to, in order
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn scrolls_into_view(&self) -> usize {
        self.scrolls_into_view.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Counts open sessions across a factory
#[derive(Debug, Default)]
struct SessionGauge {
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl SessionGauge {
    fn acquire(&self) {
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn release(&self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle to the stub control of the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubElement {
    selector: String,
}

/// Renderer session over a [`StubSite`]
pub struct StubRenderer {
    site: Arc<StubSite>,
    probe: Arc<StubProbe>,
    gauge: Option<Arc<SessionGauge>>,
    current: Option<String>,
    extent_cursor: usize,
    clicks_on_page: usize,
    scrolled_into_view: bool,
}

impl StubRenderer {
    /// Creates a standalone session that is not tracked by a factory
    pub fn new(site: StubSite) -> Self {
        Self::with_probe(Arc::new(site), Arc::new(StubProbe::default()), None)
    }

    fn with_probe(
        site: Arc<StubSite>,
        probe: Arc<StubProbe>,
        gauge: Option<Arc<SessionGauge>>,
    ) -> Self {
        if let Some(gauge) = &gauge {
            gauge.acquire();
        }
        Self {
            site,
            probe,
            gauge,
            current: None,
            extent_cursor: 0,
            clicks_on_page: 0,
            scrolled_into_view: false,
        }
    }

    pub fn probe(&self) -> Arc<StubProbe> {
        Arc::clone(&self.probe)
    }

    fn page(&self) -> RendererResult<&StubPage> {
        let url = self.current.as_ref().ok_or(RendererError::NoPage)?;
        self.site.pages.get(url).ok_or(RendererError::NoPage)
    }

    fn control(&self, selector: &str) -> RendererResult<Option<&StubControl>> {
        let page = self.page()?;
        Ok(page.control.as_ref().filter(|control| {
            control.selector == selector
                && control
                    .removed_after_clicks
                    .map_or(true, |limit| self.clicks_on_page < limit)
        }))
    }

    fn reveal_guard(&self) -> RendererResult<()> {
        match &self.page()?.reveal_error {
            Some(reason) => Err(RendererError::Script(reason.clone())),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        if let Some(gauge) = self.gauge.take() {
            gauge.release();
        }
    }
}

impl Drop for StubRenderer {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    type Element = StubElement;

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> RendererResult<()> {
        self.probe.navigations.lock().unwrap().push(url.to_string());
        self.current = None;
        self.extent_cursor = 0;
        self.clicks_on_page = 0;
        self.scrolled_into_view = false;

        if !self.site.latency.is_zero() {
            tokio::time::sleep(self.site.latency).await;
        }

        if let Some(reason) = &self.site.navigation_failure {
            return Err(RendererError::Navigation {
                url: url.to_string(),
                reason: reason.clone(),
            });
        }

        let key = normalize(url);
        let page = self.site.pages.get(&key).ok_or_else(|| RendererError::Navigation {
            url: url.to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        })?;

        if page.session_failure {
            return Err(RendererError::Session(format!(
                "browser disconnected while loading {}",
                url
            )));
        }

        if let Some(reason) = &page.navigation_error {
            return Err(RendererError::Navigation {
                url: url.to_string(),
                reason: reason.clone(),
            });
        }

        self.current = Some(key);
        Ok(())
    }

    async fn has_lazy_load_signal(&mut self) -> RendererResult<bool> {
        Ok(self.page()?.lazy_load)
    }

    async fn find_element(&mut self, selector: &str) -> RendererResult<Option<StubElement>> {
        Ok(self.control(selector)?.map(|control| StubElement {
            selector: control.selector.clone(),
        }))
    }

    async fn read_label(&mut self, element: &StubElement) -> RendererResult<String> {
        let control = self.control(&element.selector)?.ok_or_else(|| {
            RendererError::Element(format!("'{}' is no longer on the page", element.selector))
        })?;

        let index = self.clicks_on_page.min(control.labels.len().saturating_sub(1));
        Ok(control.labels.get(index).cloned().unwrap_or_default())
    }

    async fn is_in_viewport(&mut self, element: &StubElement) -> RendererResult<bool> {
        let in_viewport = self
            .control(&element.selector)?
            .map_or(false, |control| control.in_viewport);
        Ok(in_viewport || self.scrolled_into_view)
    }

    async fn scroll_into_view(&mut self, _element: &StubElement) -> RendererResult<()> {
        self.reveal_guard()?;
        self.probe.scrolls_into_view.fetch_add(1, Ordering::SeqCst);
        self.scrolled_into_view = true;
        Ok(())
    }

    async fn click(&mut self, element: &StubElement) -> RendererResult<()> {
        self.reveal_guard()?;
        if self.control(&element.selector)?.is_none() {
            return Err(RendererError::Element(format!(
                "'{}' is no longer on the page",
                element.selector
            )));
        }
        self.probe.clicks.fetch_add(1, Ordering::SeqCst);
        self.clicks_on_page += 1;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> RendererResult<()> {
        self.reveal_guard()?;
        self.probe.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn measure_scroll_extent(&mut self) -> RendererResult<u64> {
        let extents = &self.page()?.scroll_extents;
        let extent = match extents.len() {
            0 => 0,
            len => extents[self.extent_cursor.min(len - 1)],
        };
        self.extent_cursor += 1;
        Ok(extent)
    }

    async fn extract_links(&mut self) -> RendererResult<Vec<String>> {
        let page = self.page()?;
        match &page.extraction_error {
            Some(reason) => Err(RendererError::Script(reason.clone())),
            None => Ok(page.links.clone()),
        }
    }

    async fn close(&mut self) -> RendererResult<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.current = None;
        self.release();
        Ok(())
    }
}

/// Opens [`StubRenderer`] sessions for sites registered by domain name
#[derive(Default)]
pub struct StubRendererFactory {
    sites: HashMap<String, Arc<StubSite>>,
    probes: HashMap<String, Arc<StubProbe>>,
    gauge: Arc<SessionGauge>,
    opened: AtomicUsize,
}

impl StubRendererFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the site served for the task whose domain name is `domain`
    pub fn site(mut self, domain: &str, site: StubSite) -> Self {
        self.sites.insert(domain.to_string(), Arc::new(site));
        self.probes
            .insert(domain.to_string(), Arc::new(StubProbe::default()));
        self
    }

    pub fn probe(&self, domain: &str) -> Option<Arc<StubProbe>> {
        self.probes.get(domain).cloned()
    }

    /// Sessions currently open
    pub fn open_sessions(&self) -> usize {
        self.gauge.open.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were open at the same time
    pub fn peak_sessions(&self) -> usize {
        self.gauge.peak.load(Ordering::SeqCst)
    }

    /// Total sessions handed out
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RendererFactory for StubRendererFactory {
    type Renderer = StubRenderer;

    async fn open(&self, task: &DomainTask) -> RendererResult<StubRenderer> {
        let domain = task.domain_name();
        let (site, probe) = match (self.sites.get(domain), self.probes.get(domain)) {
            (Some(site), Some(probe)) => (Arc::clone(site), Arc::clone(probe)),
            _ => {
                return Err(RendererError::Session(format!(
                    "no stub site registered for {}",
                    domain
                )))
            }
        };

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(StubRenderer::with_probe(
            site,
            probe,
            Some(Arc::clone(&self.gauge)),
        ))
    }
}
