//! JSON output of discovered product URLs
//!
//! The product document is rewritten every time a domain finishes, so an
//! interrupted run still leaves the results of every domain that got done.

use crate::output::report::{AggregateReport, CrawlResult};
use crate::ScoutError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// Writes the `{domain: [product urls]}` document
#[derive(Debug)]
pub struct JsonOutput {
    path: PathBuf,
    entries: Vec<(String, Option<Vec<String>>)>,
}

impl JsonOutput {
    /// Creates the writer and truncates the document to `{}`
    ///
    /// `domains` fixes the key order of every later write.
    pub fn create(path: impl Into<PathBuf>, domains: &[String]) -> Result<Self, ScoutError> {
        let output = Self {
            path: path.into(),
            entries: domains.iter().map(|d| (d.clone(), None)).collect(),
        };
        output.flush()?;
        Ok(output)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records one finished domain and rewrites the document
    ///
    /// Results for domains not given to [`JsonOutput::create`] are appended.
    pub fn record(&mut self, result: &CrawlResult) -> Result<(), ScoutError> {
        match self.entries.iter_mut().find(|(d, _)| *d == result.domain) {
            Some((_, slot)) => *slot = Some(result.product_urls.clone()),
            None => self
                .entries
                .push((result.domain.clone(), Some(result.product_urls.clone()))),
        }
        self.flush()
    }

    /// Rewrites the document from the final report
    pub fn finish(self, report: &AggregateReport) -> Result<(), ScoutError> {
        write_json(&self.path, &report.product_map())
    }

    fn flush(&self) -> Result<(), ScoutError> {
        write_json(&self.path, &FinishedEntries(&self.entries))
    }
}

/// Writes the detailed crawl report
pub fn write_report(path: &Path, report: &AggregateReport) -> Result<(), ScoutError> {
    write_json(path, report)
}

/// Serializes to a sibling temp file and renames it over the target
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ScoutError> {
    let body = serde_json::to_string_pretty(value)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

struct FinishedEntries<'a>(&'a [(String, Option<Vec<String>>)]);

impl Serialize for FinishedEntries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (domain, urls) in self.0 {
            if let Some(urls) = urls {
                map.serialize_entry(domain, urls)?;
            }
        }
        map.end()
    }
}
