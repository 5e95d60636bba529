//! Console summary of a finished run

use crate::output::report::AggregateReport;
use crate::state::JobState;

/// Per-status domain counts for a report
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub completed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn from_report(report: &AggregateReport) -> Self {
        let mut counts = Self::default();
        for result in report {
            match result.status {
                JobState::Completed => counts.completed += 1,
                JobState::Failed => counts.failed += 1,
                JobState::TimedOut => counts.timed_out += 1,
                JobState::Cancelled => counts.cancelled += 1,
                JobState::Ready | JobState::Running => {}
            }
        }
        counts
    }
}

/// Enumerates every domain's product URLs to the log
pub fn log_products(report: &AggregateReport) {
    for result in report {
        tracing::info!(
            "{}: {} product URLs ({}, {} pages visited)",
            result.domain,
            result.product_urls.len(),
            result.status,
            result.pages_visited
        );
        for url in &result.product_urls {
            tracing::info!("  {}", url);
        }
    }
}

/// Prints a per-domain summary to stdout
pub fn print_summary(report: &AggregateReport) {
    println!("=== Crawl Summary ===\n");

    println!(
        "{:<32} {:<10} {:>8} {:>8} {:>8}",
        "Domain", "Status", "Products", "Pages", "Errors"
    );
    for result in report {
        println!(
            "{:<32} {:<10} {:>8} {:>8} {:>8}",
            result.domain,
            result.status.as_str(),
            result.product_urls.len(),
            result.pages_visited,
            result.errors.len()
        );
    }
    println!();

    let failures: Vec<_> = report
        .iter()
        .filter(|r| !r.errors.is_empty())
        .collect();
    if !failures.is_empty() {
        println!("Errors:");
        for result in failures {
            println!("  {}:", result.domain);
            for error in &result.errors {
                if error.url.is_empty() {
                    println!("    - {}", error.reason);
                } else {
                    println!("    - {}: {}", error.url, error.reason);
                }
            }
        }
        println!();
    }

    let counts = StatusCounts::from_report(report);
    println!(
        "Domains: {} completed, {} timed out, {} cancelled, {} failed",
        counts.completed, counts.timed_out, counts.cancelled, counts.failed
    );
    println!(
        "Totals: {} product URLs from {} pages",
        report.total_products(),
        report.total_pages_visited()
    );
}
