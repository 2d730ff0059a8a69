//! Statistics of a finished run
//!
//! This module summarizes a [`RunResult`] and prints the summary to stdout.

use crate::crawler::RunResult;

/// Run statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Number of domains in the run
    pub domains: usize,

    /// Domains that yielded at least one product
    pub domains_with_products: usize,

    /// Domains that ended with no product and only failures
    pub failed_domains: usize,

    /// Total product URLs across all domains
    pub product_urls: usize,

    /// Total failed URLs across all domains
    pub failed_urls: usize,

    /// Total pages visited across all domains
    pub pages_visited: usize,

    /// Product count per domain, in run order
    pub products_by_domain: Vec<(String, usize)>,
}

impl RunStatistics {
    pub fn from_run(run: &RunResult) -> Self {
        let mut stats = Self {
            domains: run.len(),
            ..Self::default()
        };

        for result in run {
            stats.product_urls += result.product_urls.len();
            stats.failed_urls += result.failed_urls.len();
            stats.pages_visited += result.pages_visited;

            if !result.product_urls.is_empty() {
                stats.domains_with_products += 1;
            } else if !result.failed_urls.is_empty() {
                stats.failed_domains += 1;
            }

            stats
                .products_by_domain
                .push((result.domain_name.clone(), result.product_urls.len()));
        }

        stats
    }
}

/// Prints statistics to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Trawl Statistics ===\n");

    println!("Overview:");
    println!("  Domains crawled: {}", stats.domains);
    println!("  Pages visited: {}", stats.pages_visited);
    println!("  Product URLs found: {}", stats.product_urls);
    println!("  Failed URLs: {}", stats.failed_urls);
    println!();

    if !stats.products_by_domain.is_empty() {
        println!("Products by Domain:");
        let mut counts: Vec<_> = stats.products_by_domain.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        for (domain, count) in counts {
            let percentage = if stats.product_urls > 0 {
                (*count as f64 / stats.product_urls as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", domain, count, percentage);
        }
        println!();
    }

    let success_rate = if stats.domains > 0 {
        (stats.domains_with_products as f64 / stats.domains as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} domains yielded products, {} failed)",
        success_rate, stats.domains_with_products, stats.domains, stats.failed_domains
    );
}
