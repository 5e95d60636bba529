//! Deterministic collaborators for crawler unit tests

use crate::crawler::domain_crawler::CrawlContext;
use crate::crawler::fetcher::{FetchError, FetchedPage, Fetcher, RetryPolicy};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::pool::FetchPool;
use crate::url::{ProductMatcher, ScopePolicy};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

enum Reply {
    Page { final_url: Option<String>, body: String },
    Error(FetchError),
    /// Fails with the error while `failures` lasts, then serves the body
    Flaky {
        failures: AtomicUsize,
        error: FetchError,
        body: String,
    },
    Panic,
}

struct Canned {
    reply: Reply,
    delay: Duration,
}

/// `Fetcher` answering from a fixed URL table
///
/// Unknown URLs answer with HTTP 404. The stub tracks every fetched URL and
/// the highest number of fetches it saw in flight at once.
#[derive(Default)]
pub struct StubFetcher {
    replies: HashMap<String, Canned>,
    fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: impl Into<String>) -> Self {
        self.slow_page(url, Duration::ZERO, body)
    }

    pub fn slow_page(mut self, url: &str, delay: Duration, body: impl Into<String>) -> Self {
        self.replies.insert(
            url.to_string(),
            Canned {
                reply: Reply::Page {
                    final_url: None,
                    body: body.into(),
                },
                delay,
            },
        );
        self
    }

    pub fn redirect(mut self, url: &str, final_url: &str, body: impl Into<String>) -> Self {
        self.replies.insert(
            url.to_string(),
            Canned {
                reply: Reply::Page {
                    final_url: Some(final_url.to_string()),
                    body: body.into(),
                },
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn error(mut self, url: &str, error: FetchError) -> Self {
        self.replies.insert(
            url.to_string(),
            Canned {
                reply: Reply::Error(error),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn flaky(mut self, url: &str, failures: usize, error: FetchError, body: impl Into<String>) -> Self {
        self.replies.insert(
            url.to_string(),
            Canned {
                reply: Reply::Flaky {
                    failures: AtomicUsize::new(failures),
                    error,
                    body: body.into(),
                },
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn panic_on(mut self, url: &str) -> Self {
        self.replies.insert(
            url.to_string(),
            Canned {
                reply: Reply::Panic,
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());

        let Some(canned) = self.replies.get(url.as_str()) else {
            return Err(FetchError::http_status(404));
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !canned.delay.is_zero() {
            tokio::time::sleep(canned.delay).await;
        }

        match &canned.reply {
            Reply::Page { final_url, body } => Ok(FetchedPage {
                status: 200,
                final_url: match final_url {
                    Some(u) => Url::parse(u).unwrap(),
                    None => url.clone(),
                },
                body: body.clone(),
            }),
            Reply::Error(error) => Err(error.clone()),
            Reply::Flaky {
                failures,
                error,
                body,
            } => {
                let failing = failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if failing {
                    Err(error.clone())
                } else {
                    Ok(FetchedPage {
                        status: 200,
                        final_url: url.clone(),
                        body: body.clone(),
                    })
                }
            }
            Reply::Panic => panic!("stub fetcher exploded on {}", url),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Link extractor that always fails
pub struct FailingExtractor;

impl LinkExtractor for FailingExtractor {
    fn extract_links(&self, _body: &str, _base_url: &Url) -> Result<Vec<String>, String> {
        Err("unreadable markup".to_string())
    }
}

/// A page body linking to every href in `links`
pub fn html_linking(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">link</a>", href))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

/// Matches `iid=` in the query or `/product/<digits>` in the path
pub fn test_matcher() -> ProductMatcher {
    ProductMatcher::new(["iid="], [r"/product/[0-9]+"]).unwrap()
}

pub fn test_context(fetcher: Arc<dyn Fetcher>) -> CrawlContext {
    CrawlContext {
        fetcher,
        extractor: Arc::new(HtmlLinkExtractor),
        matcher: Arc::new(test_matcher()),
        scope: ScopePolicy::IncludeSubdomains,
        page_timeout: Duration::from_secs(1),
        retry: RetryPolicy::none(),
        pool: FetchPool::new(4),
    }
}
