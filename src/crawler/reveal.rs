//! Content-reveal protocol
//!
//! Some listing pages only render their full content after the visitor
//! scrolls (lazy loading) or presses a "load more" control (pagination).
//! [`ContentRevealer`] drives either interaction until the page stops
//! changing, the attempt budget runs out, or the renderer fails.
//!
//! ```text
//! Idle -> Revealing -> Stable | MaxAttemptsReached | Error
//! ```
//!
//! A reveal never fails the crawl: every terminal state is reported back to
//! the caller, which proceeds with whatever content is on the page.

use crate::crawler::CrawlSettings;
use crate::renderer::{Renderer, RendererError};
use crate::state::RevealState;
use std::time::Duration;

/// Outcome of one reveal run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealReport {
    /// Terminal state the run ended in
    pub state: RevealState,

    /// Scrolls or clicks performed
    pub attempts: u32,

    /// Renderer error that ended the run, if any
    pub error: Option<String>,
}

/// Tracks the state machine of a single reveal run
struct RevealRun {
    state: RevealState,
    attempts: u32,
}

impl RevealRun {
    fn start() -> Self {
        let mut run = Self {
            state: RevealState::Idle,
            attempts: 0,
        };
        run.transition(RevealState::Revealing);
        run
    }

    fn transition(&mut self, next: RevealState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid reveal transition: {} -> {}",
            self.state,
            next
        );
        tracing::trace!("Reveal {} -> {}", self.state, next);
        self.state = next;
    }

    fn finish(mut self, outcome: Result<RevealState, RendererError>) -> RevealReport {
        let error = match outcome {
            Ok(state) => {
                self.transition(state);
                None
            }
            Err(e) => {
                self.transition(RevealState::Error);
                Some(e.to_string())
            }
        };

        RevealReport {
            state: self.state,
            attempts: self.attempts,
            error,
        }
    }
}

/// Drives scroll and click reveals on a renderer
#[derive(Debug, Clone)]
pub struct ContentRevealer {
    settle_delay: Duration,
    click_settle_delay: Duration,
}

impl ContentRevealer {
    pub fn new(settle_delay: Duration, click_settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            click_settle_delay,
        }
    }

    pub fn from_settings(settings: &CrawlSettings) -> Self {
        Self::new(settings.reveal_settle_delay, settings.click_settle_delay)
    }

    /// Scrolls to the bottom until the scroll extent stops growing
    ///
    /// Ends in `Stable` as soon as a scroll leaves the extent unchanged, or in
    /// `MaxAttemptsReached` after `max_attempts` scrolls that all grew it.
    pub async fn scroll_reveal<R>(&self, renderer: &mut R, max_attempts: u32) -> RevealReport
    where
        R: Renderer + ?Sized,
    {
        let mut run = RevealRun::start();
        let outcome = self.scroll_loop(renderer, max_attempts, &mut run.attempts).await;
        let report = run.finish(outcome);

        if report.state == RevealState::MaxAttemptsReached {
            tracing::warn!("Reached max scroll attempts ({})", max_attempts);
        }
        report
    }

    async fn scroll_loop<R>(
        &self,
        renderer: &mut R,
        max_attempts: u32,
        attempts: &mut u32,
    ) -> Result<RevealState, RendererError>
    where
        R: Renderer + ?Sized,
    {
        let mut previous = renderer.measure_scroll_extent().await?;

        while *attempts < max_attempts {
            *attempts += 1;
            tracing::debug!("Scroll #{}, scrolling to bottom", attempts);
            renderer.scroll_to_bottom().await?;
            settle(self.settle_delay).await;

            let current = renderer.measure_scroll_extent().await?;
            if current == previous {
                return Ok(RevealState::Stable);
            }
            previous = current;
        }

        Ok(RevealState::MaxAttemptsReached)
    }

    /// Clicks a "load more" control until it disappears or changes its label
    ///
    /// Without an `expected_label`, only the disappearance of the control or
    /// the attempt budget ends the run. Controls outside the viewport are
    /// scrolled into view before being clicked.
    pub async fn click_reveal<R>(
        &self,
        renderer: &mut R,
        selector: &str,
        expected_label: Option<&str>,
        max_attempts: u32,
    ) -> RevealReport
    where
        R: Renderer + ?Sized,
    {
        let mut run = RevealRun::start();
        let outcome = self
            .click_loop(renderer, selector, expected_label, max_attempts, &mut run.attempts)
            .await;
        let report = run.finish(outcome);

        if report.state == RevealState::MaxAttemptsReached {
            tracing::warn!("Reached max click attempts ({}) on '{}'", max_attempts, selector);
        }
        report
    }

    async fn click_loop<R>(
        &self,
        renderer: &mut R,
        selector: &str,
        expected_label: Option<&str>,
        max_attempts: u32,
        attempts: &mut u32,
    ) -> Result<RevealState, RendererError>
    where
        R: Renderer + ?Sized,
    {
        while *attempts < max_attempts {
            let Some(control) = renderer.find_element(selector).await? else {
                tracing::debug!("No '{}' control found, stopping", selector);
                return Ok(RevealState::Stable);
            };

            if let Some(expected) = expected_label {
                let label = renderer.read_label(&control).await?;
                if label.trim() != expected.trim() {
                    tracing::debug!("Control label changed to {:?}, stopping", label);
                    return Ok(RevealState::Stable);
                }
            }

            if !renderer.is_in_viewport(&control).await? {
                tracing::debug!("Control not in viewport, scrolling into view");
                renderer.scroll_into_view(&control).await?;
                settle(self.settle_delay).await;
            }

            *attempts += 1;
            tracing::debug!("Clicking '{}' #{}", selector, attempts);
            renderer.click(&control).await?;
            settle(self.click_settle_delay).await;
        }

        Ok(RevealState::MaxAttemptsReached)
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
