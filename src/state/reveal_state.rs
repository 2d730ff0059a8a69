/// Reveal state definitions for the content-reveal protocol
///
/// This module defines every state a single reveal run can be in.
use std::fmt;

/// Represents the current state of a reveal run on one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevealState {
    // ===== Active States =====
    /// No reveal has started yet
    Idle,

    /// Scrolling or clicking is in progress
    Revealing,

    // ===== Terminal States =====
    /// No further content appeared, or the control is gone
    Stable,

    /// The attempt budget ran out before the page settled
    MaxAttemptsReached,

    /// The renderer failed during the reveal
    Error,
}

impl RevealState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stable | Self::MaxAttemptsReached | Self::Error)
    }

    /// Returns true if the page settled on its own
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable)
    }

    /// Returns true if a transition from `self` to `next` is allowed
    ///
    /// Idle may only move to Revealing, Revealing may only move to a terminal
    /// state, and terminal states never move again.
    pub fn can_transition_to(&self, next: RevealState) -> bool {
        match self {
            Self::Idle => next == Self::Revealing,
            Self::Revealing => next.is_terminal(),
            _ => false,
        }
    }

    /// Returns a short lowercase label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Revealing => "revealing",
            Self::Stable => "stable",
            Self::MaxAttemptsReached => "max_attempts_reached",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RevealState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
