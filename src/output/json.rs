//! JSON result files
//!
//! Two objects keyed by domain name, both covering every domain of the run:
//!
//! ```json
//! { "https://shop.example.com/": ["https://shop.example.com/products/hat"] }
//! { "https://shop.example.com/": [{ "url": "...", "reason": "..." }] }
//! ```

use crate::config::OutputConfig;
use crate::crawler::{FailedUrl, RunResult};
use crate::output::{OutputError, OutputHandler, OutputResult, WrittenFiles};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Writes products and failed URLs as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct JsonOutputHandler {
    config: OutputConfig,
}

impl JsonOutputHandler {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }
}

impl OutputHandler for JsonOutputHandler {
    fn write(&self, run: &RunResult) -> OutputResult<WrittenFiles> {
        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| OutputError::Write {
            path: self.config.output_dir.clone(),
            source,
        })?;

        let products: BTreeMap<&str, &[String]> = run
            .iter()
            .map(|r| (r.domain_name.as_str(), r.product_urls.as_slice()))
            .collect();
        let failed: BTreeMap<&str, &[FailedUrl]> = run
            .iter()
            .map(|r| (r.domain_name.as_str(), r.failed_urls.as_slice()))
            .collect();

        let files = WrittenFiles {
            products: self.config.product_path(),
            failed_urls: self.config.failed_urls_path(),
        };

        write_json(&files.products, &products)?;
        tracing::info!("Product URLs saved to {}", files.products.display());

        write_json(&files.failed_urls, &failed)?;
        tracing::info!("Failed URLs saved to {}", files.failed_urls.display());

        Ok(files)
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> OutputResult<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    std::fs::write(path, json).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}
