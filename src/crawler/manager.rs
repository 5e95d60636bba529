//! Concurrent crawl of many domains
//!
//! The manager launches one task per domain, bounds their combined fetches
//! with a shared `FetchPool`, enforces the per-domain deadline, and gathers
//! the results back into input order.

use crate::config::{config_fingerprint, validate, Config};
use crate::crawler::domain_crawler::{CrawlContext, CrawlJob, DomainCrawler};
use crate::crawler::fetcher::{Fetcher, HttpFetcher, RetryPolicy};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::pool::FetchPool;
use crate::output::{AggregateReport, CrawlResult, ErrorRecord};
use crate::url::{ProductMatcher, ScopePolicy};
use crate::ScoutError;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs domain crawlers concurrently and assembles their report
///
/// # Example
///
/// ```no_run
/// use shelf_scout::{Config, CrawlerManager};
///
/// # async fn example() -> Result<(), shelf_scout::ScoutError> {
/// let manager = CrawlerManager::new(Config::default())?;
/// let report = manager.run(&["shop.example".to_string()]).await?;
/// for result in &report {
///     println!("{}: {:?}", result.domain, result.product_urls);
/// }
/// # Ok(())
/// # }
/// ```
pub struct CrawlerManager {
    config: Config,
    context: CrawlContext,
    fingerprint: String,
    cancel: CancellationToken,
    progress: Option<UnboundedSender<CrawlResult>>,
}

impl CrawlerManager {
    /// Creates a manager using the HTTP fetcher and the HTML link extractor
    pub fn new(config: Config) -> Result<Self, ScoutError> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Self::with_collaborators(config, Arc::new(fetcher), Arc::new(HtmlLinkExtractor))
    }

    /// Creates a manager with caller-supplied page transport and extractor
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Result<Self, ScoutError> {
        validate(&config)?;

        let matcher = ProductMatcher::from_config(&config.products)?;
        let fingerprint = config_fingerprint(&config)?;
        let context = CrawlContext {
            fetcher,
            extractor,
            matcher: Arc::new(matcher),
            scope: ScopePolicy::from_include_subdomains(config.scope.include_subdomains),
            page_timeout: config.crawler.per_page_timeout(),
            retry: RetryPolicy::from_config(&config.crawler),
            pool: FetchPool::new(config.crawler.max_concurrent_fetches as usize),
        };

        Ok(Self {
            config,
            context,
            fingerprint,
            cancel: CancellationToken::new(),
            progress: None,
        })
    }

    /// Sends every `CrawlResult` on `sender` as soon as its job ends
    pub fn with_progress(mut self, sender: UnboundedSender<CrawlResult>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Token that aborts every running job when cancelled
    ///
    /// The token lives as long as the manager. Once it is cancelled, every
    /// later `run` reports all of its jobs as `Cancelled` without fetching.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> &FetchPool {
        &self.context.pool
    }

    /// Crawls every domain and returns their results in input order
    ///
    /// Duplicate domains are crawled once, at their first position. Failures
    /// of individual domains (including panics) are part of the report; an
    /// `Err` means the run itself broke down.
    pub async fn run(&self, domains: &[String]) -> Result<AggregateReport, ScoutError> {
        let domains = dedupe_domains(domains);
        let max_depth = self.config.crawler.max_depth;
        let domain_timeout = self.config.crawler.per_domain_timeout();

        tracing::info!(
            "Starting crawl of {} domains (max depth {}, {} concurrent fetches, {:?} per domain)",
            domains.len(),
            max_depth,
            self.context.pool.size(),
            domain_timeout
        );

        let mut slots: Vec<Option<CrawlResult>> = vec![None; domains.len()];
        let mut tasks = JoinSet::new();

        for (index, domain) in domains.iter().enumerate() {
            let job = match CrawlJob::from_domain(domain, max_depth, &self.config.scope.default_scheme)
            {
                Ok(job) => job,
                Err(e) => {
                    tracing::error!("Cannot crawl {}: {}", domain, e);
                    let result = CrawlResult::failed(
                        domain.clone(),
                        ErrorRecord::new(domain.clone(), format!("invalid start URL: {}", e)),
                        Utc::now(),
                    );
                    self.report_progress(&result);
                    slots[index] = Some(result);
                    continue;
                }
            };

            let crawler = DomainCrawler::new(job, self.context.clone());
            let deadline = Instant::now() + domain_timeout;
            let cancel = self.cancel.child_token();
            let progress = self.progress.clone();
            let domain = domain.clone();

            tasks.spawn(async move {
                let started_at = Utc::now();
                let outcome = AssertUnwindSafe(crawler.run_until(Some(deadline), cancel))
                    .catch_unwind()
                    .await;

                let outcome = match outcome {
                    Ok(outcome) => outcome,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!("Crawler for {} panicked: {}", domain, message);
                        Ok(CrawlResult::failed(
                            domain,
                            ErrorRecord::new("", format!("crawler panicked: {}", message)),
                            started_at,
                        ))
                    }
                };

                if let (Ok(result), Some(sender)) = (&outcome, &progress) {
                    // The receiver going away only ends progress reporting
                    let _ = sender.send(result.clone());
                }
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) =
                joined.map_err(|e| ScoutError::Coordination(format!("crawl task failed: {}", e)))?;
            slots[index] = Some(outcome?);
        }

        let results = slots
            .into_iter()
            .zip(&domains)
            .map(|(slot, domain)| {
                slot.ok_or_else(|| ScoutError::Coordination(format!("no result for {}", domain)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let report = AggregateReport::new(results, Some(self.fingerprint.clone()));
        tracing::info!(
            "Crawl finished: {} product URLs from {} pages across {} domains",
            report.total_products(),
            report.total_pages_visited(),
            report.len()
        );
        Ok(report)
    }

    fn report_progress(&self, result: &CrawlResult) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(result.clone());
        }
    }
}

/// Drops repeated domains, keeping each at its first position
fn dedupe_domains(domains: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    domains
        .iter()
        .filter(|d| seen.insert(d.as_str()))
        .cloned()
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
