//! Output module for crawl results
//!
//! This module handles:
//! - The per-domain result and aggregate report types
//! - Writing the product URL document and the detailed report as JSON
//! - Printing a console summary of the run

mod json;
mod report;
pub mod summary;

pub use json::{write_report, JsonOutput};
pub use report::{
    AggregateReport, CrawlResult, ErrorRecord, ProductUrlMap, CANCELLED_REASON, TIMEOUT_REASON,
};
pub use summary::{log_products, print_summary, StatusCounts};
