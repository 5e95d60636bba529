use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Shelf-Scout
///
/// Every section falls back to its defaults when absent, so an empty file is a
/// valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub products: ProductConfig,
    pub scope: ScopeConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of link hops from a domain's start URL
    pub max_depth: u32,

    /// Size of the fetch pool shared by every domain
    pub max_concurrent_fetches: u32,

    /// Timeout for a single page request (milliseconds)
    pub per_page_timeout_ms: u64,

    /// Wall-clock budget for one domain's whole crawl (milliseconds)
    pub per_domain_timeout_ms: u64,

    /// Number of retries for transient fetch failures
    pub fetch_retries: u32,

    /// Delay between retries (milliseconds)
    pub retry_backoff_ms: u64,
}

impl CrawlerConfig {
    pub fn per_page_timeout(&self) -> Duration {
        Duration::from_millis(self.per_page_timeout_ms)
    }

    pub fn per_domain_timeout(&self) -> Duration {
        Duration::from_millis(self.per_domain_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_concurrent_fetches: 4,
            per_page_timeout_ms: 10_000,
            per_domain_timeout_ms: 300_000,
            fetch_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL)`, the comment being omitted
    /// when no contact URL is configured.
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ShelfScout".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

/// Product page recognition rules
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProductConfig {
    /// Plain substrings that mark a product-detail URL
    pub markers: Vec<String>,

    /// Regular expressions that mark a product-detail URL
    pub patterns: Vec<String>,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            markers: vec!["pd_rd_r".to_string(), "iid=".to_string()],
            patterns: vec![
                "[0-9]{6,10}/buy".to_string(),
                "product/[^/]+/[0-9]{7,}".to_string(),
                "/p/[0-9]{7,}".to_string(),
            ],
        }
    }
}

/// Link scope rules
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScopeConfig {
    /// Whether subdomains of the crawled host count as internal
    pub include_subdomains: bool,

    /// Scheme used when a domain is given without one
    pub default_scheme: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            include_subdomains: true,
            default_scheme: "https".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the `{domain: [product urls]}` JSON document
    pub json_path: String,

    /// Path of the detailed crawl report, if one should be written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: "product_urls.json".to_string(),
            report_path: None,
        }
    }
}
