//! Breadth-first traversal of a single domain
//!
//! A `DomainCrawler` owns one `CrawlJob` and everything it accumulates. The
//! traversal is sequential: at most one fetch is in flight per crawler, and
//! the only suspension points are acquiring a fetch slot, the fetch itself
//! and the backoff before a retry. All of them race the job deadline and the
//! run's cancellation token, so an interrupted crawler drops its in-flight
//! fetch and releases its slot. A slot is held for one attempt only, never
//! across a backoff.

use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher, RetryPolicy};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::LinkExtractor;
use crate::crawler::pool::FetchPool;
use crate::output::{CrawlResult, ErrorRecord};
use crate::state::JobState;
use crate::url::{is_internal, normalize_url, site_root, ProductMatcher, ScopePolicy};
use crate::{ScoutError, UrlError};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// One domain to crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    domain: String,
    start_url: Url,
    max_depth: u32,
}

impl CrawlJob {
    /// Creates a job with an explicit start URL
    ///
    /// The start URL is normalized before it seeds the frontier.
    pub fn new(domain: impl Into<String>, start_url: &str, max_depth: u32) -> Result<Self, UrlError> {
        Ok(Self {
            domain: domain.into(),
            start_url: normalize_url(start_url)?,
            max_depth,
        })
    }

    /// Creates a job for a domain as given on the command line
    ///
    /// `shop.com` starts at `<default_scheme>://shop.com/`; a full URL is
    /// used as the start URL as-is.
    pub fn from_domain(domain: &str, max_depth: u32, default_scheme: &str) -> Result<Self, UrlError> {
        let root = site_root(domain, default_scheme)?;
        Self::new(domain, root.as_str(), max_depth)
    }

    /// The domain exactly as given by the caller
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Host every discovered link is scoped against
    pub fn anchor_host(&self) -> &str {
        self.start_url.host_str().unwrap_or_default()
    }
}

/// Collaborators and settings shared by every crawler of a run
#[derive(Clone)]
pub struct CrawlContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub extractor: Arc<dyn LinkExtractor>,
    pub matcher: Arc<ProductMatcher>,
    pub scope: ScopePolicy,
    pub page_timeout: Duration,
    pub retry: RetryPolicy,
    pub pool: FetchPool,
}

enum Step {
    Fetched(Result<Result<FetchedPage, FetchError>, ScoutError>),
    TimedOut,
    Cancelled,
}

/// Crawls one domain and produces its `CrawlResult`
pub struct DomainCrawler {
    job: CrawlJob,
    context: CrawlContext,
    state: JobState,
    frontier: Frontier,
    products: BTreeSet<String>,
    errors: Vec<ErrorRecord>,
    pages_visited: usize,
    started_at: DateTime<Utc>,
}

impl DomainCrawler {
    /// Creates a crawler in the `Ready` state with the start URL queued
    pub fn new(job: CrawlJob, context: CrawlContext) -> Self {
        let frontier = Frontier::seeded(job.start_url().clone());
        Self {
            job,
            context,
            state: JobState::Ready,
            frontier,
            products: BTreeSet::new(),
            errors: Vec::new(),
            pages_visited: 0,
            started_at: Utc::now(),
        }
    }

    pub fn job(&self) -> &CrawlJob {
        &self.job
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Crawls until the frontier is exhausted
    pub async fn run(self) -> Result<CrawlResult, ScoutError> {
        self.run_until(None, CancellationToken::new()).await
    }

    /// Crawls until the frontier is exhausted, `deadline` passes, or `cancel`
    /// fires
    ///
    /// Page failures end up in the result. An `Err` means the crawler could
    /// not go on at all (the fetch pool was closed).
    pub async fn run_until(
        mut self,
        deadline: Option<Instant>,
        cancel: CancellationToken,
    ) -> Result<CrawlResult, ScoutError> {
        self.started_at = Utc::now();
        self.transition(JobState::Running)?;
        tracing::info!(
            "Crawling {} from {} (max depth {})",
            self.job.domain,
            self.job.start_url,
            self.job.max_depth
        );

        while let Some(entry) = self.frontier.pop() {
            self.pages_visited += 1;
            self.classify(&entry.url);

            if entry.depth >= self.job.max_depth {
                continue;
            }

            tracing::debug!("Fetching {} (depth {})", entry.url, entry.depth);
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Cancelled,
                _ = sleep_until_deadline(deadline) => Step::TimedOut,
                fetched = fetch_page(&self.context, &self.job.domain, &entry.url) => {
                    Step::Fetched(fetched)
                }
            };

            match step {
                Step::Cancelled => return self.interrupt(JobState::Cancelled, ErrorRecord::cancelled()),
                Step::TimedOut => return self.interrupt(JobState::TimedOut, ErrorRecord::timeout()),
                Step::Fetched(fetched) => match fetched? {
                    Ok(page) => {
                        self.mark_redirect_target(&entry, &page);
                        self.follow_links(&entry, &page);
                    }
                    Err(error) if entry.depth == 0 => return self.fail_start(&entry.url, &error),
                    Err(error) => {
                        tracing::warn!("Failed to fetch {}: {}", entry.url, error);
                        self.errors
                            .push(ErrorRecord::new(entry.url.as_str(), error.to_string()));
                    }
                },
            }
        }

        self.finish(JobState::Completed)
    }

    fn classify(&mut self, url: &Url) {
        if self.context.matcher.is_product_url(url) && self.products.insert(url.to_string()) {
            tracing::debug!("Product URL: {}", url);
        }
    }

    /// Records where a redirect landed so the same page is not fetched again
    /// under its final address
    fn mark_redirect_target(&mut self, entry: &FrontierEntry, page: &FetchedPage) {
        if page.final_url == entry.url {
            return;
        }
        match normalize_url(page.final_url.as_str()) {
            Ok(url) => {
                if self.frontier.mark_visited(&url) {
                    tracing::debug!("{} redirected to {}", entry.url, url);
                }
            }
            Err(e) => {
                tracing::debug!("Failed to normalize redirect target {}: {}", page.final_url, e)
            }
        }
    }

    /// Queues every new in-scope link of a fetched page one level deeper
    fn follow_links(&mut self, entry: &FrontierEntry, page: &FetchedPage) {
        let links = match self
            .context
            .extractor
            .extract_links(&page.body, &page.final_url)
        {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("Failed to parse HTML for {}: {}", entry.url, e);
                self.errors
                    .push(ErrorRecord::new(entry.url.as_str(), format!("parse error: {}", e)));
                return;
            }
        };

        let next_depth = entry.depth + 1;
        let mut queued = 0;
        for link in links {
            let url = match normalize_url(&link) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!("Failed to normalize URL {}: {}", link, e);
                    continue;
                }
            };

            if !is_internal(&url, self.job.anchor_host(), self.context.scope) {
                tracing::trace!("Skipping external link {}", url);
                continue;
            }

            if self.frontier.push_if_new(url, next_depth) {
                queued += 1;
            }
        }

        tracing::debug!("Queued {} new URLs from {}", queued, entry.url);
    }

    fn interrupt(mut self, status: JobState, record: ErrorRecord) -> Result<CrawlResult, ScoutError> {
        let dropped = self.frontier.discard();
        tracing::warn!(
            "{} {} after {} pages, dropping {} queued URLs",
            self.job.domain,
            status,
            self.pages_visited,
            dropped
        );
        self.errors.push(record);
        self.finish(status)
    }

    fn fail_start(mut self, url: &Url, error: &FetchError) -> Result<CrawlResult, ScoutError> {
        tracing::error!("Start URL {} of {} failed: {}", url, self.job.domain, error);
        self.transition(JobState::Failed)?;
        Ok(CrawlResult::failed(
            self.job.domain,
            ErrorRecord::new(url.as_str(), error.to_string()),
            self.started_at,
        ))
    }

    fn finish(mut self, status: JobState) -> Result<CrawlResult, ScoutError> {
        self.transition(status)?;

        let result = CrawlResult {
            domain: self.job.domain,
            status,
            product_urls: self.products.into_iter().collect(),
            pages_visited: self.pages_visited,
            errors: self.errors,
            started_at: self.started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            "Finished {} ({}): {} product URLs, {} pages visited, {} errors",
            result.domain,
            result.status,
            result.product_urls.len(),
            result.pages_visited,
            result.errors.len()
        );
        Ok(result)
    }

    fn transition(&mut self, next: JobState) -> Result<(), ScoutError> {
        if !self.state.can_transition_to(next) {
            return Err(ScoutError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("{}: {} -> {}", self.job.domain, self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Fetches a page, retrying transient failures per the context's policy
///
/// The pool slot is released before every backoff sleep.
async fn fetch_page(
    context: &CrawlContext,
    domain: &str,
    url: &Url,
) -> Result<Result<FetchedPage, FetchError>, ScoutError> {
    let mut attempt = 0;
    loop {
        let error = match fetch_with_slot(context, domain, url).await? {
            Ok(page) => return Ok(Ok(page)),
            Err(error) => error,
        };
        let Some(delay) = context.retry.next_delay(&error, attempt) else {
            return Ok(Err(error));
        };
        attempt += 1;
        tracing::debug!(
            "Retrying {} in {:?} after {} (attempt {}/{})",
            url,
            delay,
            error,
            attempt,
            context.retry.retries
        );
        tokio::time::sleep(delay).await;
    }
}

/// Holds a pool slot for exactly the duration of one fetch attempt
async fn fetch_with_slot(
    context: &CrawlContext,
    domain: &str,
    url: &Url,
) -> Result<Result<FetchedPage, FetchError>, ScoutError> {
    let _permit = context
        .pool
        .acquire()
        .await
        .map_err(|_| ScoutError::PoolClosed {
            domain: domain.to_string(),
        })?;
    Ok(context.fetcher.fetch(url, context.page_timeout).await)
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
