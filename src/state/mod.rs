//! State module for the content-reveal protocol
//!
//! # Components
//!
//! - `RevealState`: Tracks a scroll or click reveal run (idle, revealing, stable, etc.)

mod reveal_state;

// Re-export main types
pub use reveal_state::RevealState;
