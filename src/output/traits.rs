//! Output handler traits and types

use crate::crawler::RunResult;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Files written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub products: PathBuf,
    pub failed_urls: PathBuf,
}

/// Trait for run result sinks
pub trait OutputHandler {
    /// Persists the results of a finished run
    fn write(&self, run: &RunResult) -> OutputResult<WrittenFiles>;
}
