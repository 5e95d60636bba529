use crate::UrlError;
use url::Url;

/// Reduces a host to the key used for scope comparisons
///
/// The host is lowercased and a single leading `www.` label is dropped, so
/// `www.shop.com` and `shop.com` share a key.
pub fn host_key(host: &str) -> String {
    let lowered = host.to_lowercase();
    match lowered.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lowered,
    }
}

/// Builds the start URL for a crawl target
///
/// A bare domain (`shop.com`) becomes `<default_scheme>://shop.com/`. Input that
/// already carries a scheme (`http://127.0.0.1:8080/catalog`) is used as given.
///
/// # Returns
///
/// * `Ok(Url)` - The start URL
/// * `Err(UrlError)` - The input is empty, has no host, or is not HTTP(S)
pub fn site_root(domain: &str, default_scheme: &str) -> Result<Url, UrlError> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}://{}/", default_scheme, trimmed.trim_end_matches('/'))
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingDomain),
    }
}
