//! Crawl result types
//!
//! `CrawlResult` is produced once per domain job; `AggregateReport` collects
//! them in input order for the whole run.

use crate::state::JobState;
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// Reason recorded when a job's wall-clock budget runs out
pub const TIMEOUT_REASON: &str = "timeout";

/// Reason recorded when the run is aborted while a job is active
pub const CANCELLED_REASON: &str = "cancelled";

/// One page-level or job-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    /// The URL that failed; empty for job-level records
    pub url: String,

    /// Human-readable failure reason
    pub reason: String,
}

impl ErrorRecord {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout() -> Self {
        Self::new("", TIMEOUT_REASON)
    }

    pub fn cancelled() -> Self {
        Self::new("", CANCELLED_REASON)
    }
}

/// Terminal output of one domain crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    /// The domain exactly as given by the caller
    pub domain: String,

    /// Terminal state of the job
    pub status: JobState,

    /// Normalized product URLs, sorted
    pub product_urls: Vec<String>,

    /// Number of frontier entries taken off the queue
    pub pages_visited: usize,

    /// Failures in the order they happened
    pub errors: Vec<ErrorRecord>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    /// Builds the result of a job that could not start
    pub fn failed(domain: impl Into<String>, error: ErrorRecord, started_at: DateTime<Utc>) -> Self {
        Self {
            domain: domain.into(),
            status: JobState::Failed,
            product_urls: Vec::new(),
            pages_visited: 0,
            errors: vec![error],
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobState::Failed
    }
}

/// Per-domain results of a whole run, in input order
#[derive(Debug, Clone)]
pub struct AggregateReport {
    results: Vec<CrawlResult>,
    config_fingerprint: Option<String>,
    generated_at: DateTime<Utc>,
}

impl AggregateReport {
    pub fn new(results: Vec<CrawlResult>, config_fingerprint: Option<String>) -> Self {
        Self {
            results,
            config_fingerprint,
            generated_at: Utc::now(),
        }
    }

    /// Looks up the result for a domain
    pub fn get(&self, domain: &str) -> Option<&CrawlResult> {
        self.results.iter().find(|r| r.domain == domain)
    }

    /// Domains in input order
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.domain.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CrawlResult> {
        self.results.iter()
    }

    pub fn results(&self) -> &[CrawlResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Returns true if any domain ended in `Failed`
    pub fn any_failed(&self) -> bool {
        self.results.iter().any(CrawlResult::is_failed)
    }

    pub fn total_products(&self) -> usize {
        self.results.iter().map(|r| r.product_urls.len()).sum()
    }

    pub fn total_pages_visited(&self) -> usize {
        self.results.iter().map(|r| r.pages_visited).sum()
    }

    pub fn config_fingerprint(&self) -> Option<&str> {
        self.config_fingerprint.as_deref()
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// A serializable `{domain: [product urls]}` view in input order
    pub fn product_map(&self) -> ProductUrlMap<'_> {
        ProductUrlMap(&self.results)
    }
}

impl<'a> IntoIterator for &'a AggregateReport {
    type Item = &'a CrawlResult;
    type IntoIter = std::slice::Iter<'a, CrawlResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// `{domain: [product urls]}` serialized in input order
pub struct ProductUrlMap<'a>(&'a [CrawlResult]);

impl Serialize for ProductUrlMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(&result.domain, &result.product_urls)?;
        }
        map.end()
    }
}

struct DomainResults<'a>(&'a [CrawlResult]);

impl Serialize for DomainResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(&result.domain, result)?;
        }
        map.end()
    }
}

impl Serialize for AggregateReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AggregateReport", 3)?;
        state.serialize_field("generated_at", &self.generated_at)?;
        state.serialize_field("config_fingerprint", &self.config_fingerprint)?;
        state.serialize_field("domains", &DomainResults(&self.results))?;
        state.end()
    }
}
