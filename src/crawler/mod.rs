//! Crawler module for product discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and the retry policy between attempts
//! - HTML parsing and link extraction
//! - The per-domain breadth-first traversal
//! - Concurrent coordination of many domains under one fetch bound

mod domain_crawler;
mod fetcher;
mod frontier;
mod manager;
mod parser;
mod pool;

#[cfg(test)]
mod testing;

pub use domain_crawler::{CrawlContext, CrawlJob, DomainCrawler};
pub use fetcher::{
    build_http_client, FetchError, FetchErrorKind, FetchedPage, Fetcher, HttpFetcher, RetryPolicy,
};
pub use frontier::{Frontier, FrontierEntry};
pub use manager::CrawlerManager;
pub use parser::{HtmlLinkExtractor, LinkExtractor};
pub use pool::FetchPool;
