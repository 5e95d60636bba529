//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `Fetcher` seam the domain crawler fetches pages through
//! - Building HTTP clients with proper user agent strings
//! - Error classification
//! - The retry policy the crawler applies between attempts

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Longest `Retry-After` delay the fetcher is willing to honor
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,
    /// Final URL after redirects
    pub final_url: Url,
    /// Page body content
    pub body: String,
}

/// Broad category of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The request did not finish within its timeout
    Timeout,
    /// Connection refused, DNS failure, TLS error, broken body stream
    Connection,
    /// The server answered with a non-success status
    HttpStatus(u16),
    /// The server answered with something other than HTML
    ContentType,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection error"),
            Self::HttpStatus(code) => write!(f, "HTTP {}", code),
            Self::ContentType => write!(f, "unsupported content type"),
        }
    }
}

/// A failed fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
    /// Delay the server asked for before the next attempt
    pub retry_after: Option<Duration>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, delay: Option<Duration>) -> Self {
        self.retry_after = delay;
        self
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, detail)
    }

    pub fn connection(detail: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Connection, detail)
    }

    pub fn http_status(code: u16) -> Self {
        let reason = StatusCode::from_u16(code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("unknown status");
        Self::new(FetchErrorKind::HttpStatus(code), reason)
    }

    pub fn content_type(content_type: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ContentType, content_type)
    }

    /// Whether trying again has a reasonable chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Timeout | FetchErrorKind::Connection => true,
            FetchErrorKind::HttpStatus(code) => code == 429 || (500..600).contains(&code),
            FetchErrorKind::ContentType => false,
        }
    }
}

/// Page transport used by the domain crawler
///
/// One call is one attempt. Implementations must be cancel-safe: the crawler
/// drops the returned future when its job times out or the run is cancelled.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches one page, giving up after `timeout`
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError>;
}

/// How often and how long to wait before fetching a page again
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 429 | Retry, waiting `Retry-After` (capped) or the backoff |
/// | HTTP 5xx | Retry after the backoff |
/// | Timeout | Retry after the backoff |
/// | Connection error | Retry after the backoff |
/// | Other HTTP error | Immediate failure |
/// | Non-HTML content | Immediate failure |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            retries: config.fetch_retries,
            backoff: config.retry_backoff(),
        }
    }

    /// Never retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before the next attempt, or `None` when `error` is final
    ///
    /// `attempt` counts the retries already made for this page.
    pub fn next_delay(&self, error: &FetchError, attempt: u32) -> Option<Duration> {
        if attempt >= self.retries || !error.is_retryable() {
            return None;
        }
        Some(error.retry_after.unwrap_or(self.backoff))
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use shelf_scout::config::UserAgentConfig;
/// use shelf_scout::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a `reqwest` client
///
/// Each call sends a single request. A 429 carries its numeric `Retry-After`
/// on the returned error so the crawler can wait without holding a fetch slot.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(user_agent)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = if status == StatusCode::TOO_MANY_REQUESTS {
                parse_retry_after(response.headers())
            } else {
                None
            };
            return Err(FetchError::http_status(status.as_u16()).with_retry_after(retry_after));
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_html_content_type(content_type) {
                return Err(FetchError::content_type(content_type));
            }
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;

        Ok(FetchedPage {
            status: status.as_u16(),
            final_url,
            body,
        })
    }
}

/// Maps a transport error onto a fetch error kind
fn classify_reqwest_error(error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout("request timed out")
    } else if error.is_connect() {
        FetchError::connection(format!("connection failed: {}", error))
    } else if error.is_redirect() {
        FetchError::connection(format!("redirect error: {}", error))
    } else {
        FetchError::connection(error.to_string())
    }
}

/// Reads a numeric `Retry-After` header, capped at `MAX_RETRY_AFTER`
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

fn is_html_content_type(content_type: &str) -> bool {
    let lowered = content_type.to_ascii_lowercase();
    lowered.contains("text/html") || lowered.contains("application/xhtml+xml")
}
