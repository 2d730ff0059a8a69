//! Output module for persisting run results
//!
//! This module handles:
//! - Writing product and failed URL maps as JSON files
//! - Summarizing run statistics

mod json;
pub mod stats;
mod traits;

pub use json::JsonOutputHandler;
pub use stats::{print_statistics, RunStatistics};
pub use traits::{OutputError, OutputHandler, OutputResult, WrittenFiles};

use crate::config::OutputConfig;
use crate::crawler::RunResult;

/// Writes the result files of a run into the configured output directory
///
/// # Returns
///
/// * `Ok(WrittenFiles)` - Paths of the products and failed URLs files
/// * `Err(OutputError)` - The directory or a file could not be written
pub fn write_results(run: &RunResult, config: &OutputConfig) -> OutputResult<WrittenFiles> {
    JsonOutputHandler::new(config.clone()).write(run)
}
