use crate::url::domain::host_key;
use url::Url;

/// Which hosts count as part of a crawl's authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScopePolicy {
    /// Only the start host itself (ignoring a leading `www.`)
    ExactHost,
    /// The start host and any of its subdomains
    #[default]
    IncludeSubdomains,
}

impl ScopePolicy {
    pub fn from_include_subdomains(include: bool) -> Self {
        if include {
            Self::IncludeSubdomains
        } else {
            Self::ExactHost
        }
    }
}

/// Decides whether a discovered link stays inside a crawl's authority
///
/// `domain` is the crawl's anchor host. Both sides are reduced with
/// [`host_key`] first, so `www.` prefixes never matter. Scheme and port are
/// ignored.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shelf_scout::url::{is_internal, ScopePolicy};
///
/// let link = Url::parse("https://m.shop.com/p/1").unwrap();
/// assert!(is_internal(&link, "www.shop.com", ScopePolicy::IncludeSubdomains));
/// assert!(!is_internal(&link, "shop.com", ScopePolicy::ExactHost));
/// ```
pub fn is_internal(candidate: &Url, domain: &str, policy: ScopePolicy) -> bool {
    let Some(host) = candidate.host_str() else {
        return false;
    };

    let candidate_key = host_key(host);
    let anchor_key = host_key(domain);

    if anchor_key.is_empty() {
        return false;
    }

    match policy {
        ScopePolicy::ExactHost => candidate_key == anchor_key,
        ScopePolicy::IncludeSubdomains => {
            matches_wildcard(&format!("*.{}", anchor_key), &candidate_key)
        }
    }
}

/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// # Examples
///
/// ```
/// use shelf_scout::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "notexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
