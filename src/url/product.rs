use crate::config::ProductConfig;
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Recognizes product-detail URLs by their shape
///
/// A URL is a product URL when its path-and-query contains one of the plain
/// markers or matches one of the regular expressions. The query is included
/// because several shops carry the product id there (`?iid=...`); the
/// fragment never takes part.
#[derive(Debug, Clone)]
pub struct ProductMatcher {
    markers: Vec<String>,
    patterns: Vec<Regex>,
}

impl ProductMatcher {
    /// Builds a matcher from plain markers and uncompiled patterns
    pub fn new<M, P>(markers: M, patterns: P) -> Result<Self, ConfigError>
    where
        M: IntoIterator,
        M::Item: Into<String>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p.as_ref(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            markers: markers.into_iter().map(Into::into).collect(),
            patterns,
        })
    }

    pub fn from_config(config: &ProductConfig) -> Result<Self, ConfigError> {
        Self::new(config.markers.iter().cloned(), config.patterns.iter())
    }

    /// Returns true if the URL looks like a product-detail page
    pub fn is_product_url(&self, url: &Url) -> bool {
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        self.markers.iter().any(|m| target.contains(m.as_str()))
            || self.patterns.iter().any(|p| p.is_match(&target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn default_matcher() -> ProductMatcher {
        ProductMatcher::from_config(&ProductConfig::default()).unwrap()
    }

    #[test]
    fn test_marker_in_path() {
        let matcher = ProductMatcher::new(["/product/"], Vec::<String>::new()).unwrap();
        assert!(matcher.is_product_url(&url("https://shop.com/product/42")));
        assert!(!matcher.is_product_url(&url("https://shop.com/category/")));
    }

    #[test]
    fn test_marker_in_query() {
        let matcher = default_matcher();
        assert!(matcher.is_product_url(&url(
            "https://www.flipkart.com/phone/p/itm123?pid=MOB&iid=en_abc"
        )));
        assert!(matcher.is_product_url(&url(
            "https://www.amazon.com/dp/B0001?pd_rd_r=abc-123"
        )));
    }

    #[test]
    fn test_marker_in_host_does_not_count() {
        let matcher = ProductMatcher::new(["product"], Vec::<String>::new()).unwrap();
        assert!(!matcher.is_product_url(&url("https://product.shop.com/about")));
    }

    #[test]
    fn test_marker_in_fragment_does_not_count() {
        let matcher = ProductMatcher::new(["/product/"], Vec::<String>::new()).unwrap();
        assert!(!matcher.is_product_url(&url("https://shop.com/help#/product/1")));
    }

    #[test]
    fn test_default_patterns() {
        let matcher = default_matcher();
        assert!(matcher.is_product_url(&url(
            "https://www.snapdeal.com/product/red-shoes/6412345678"
        )));
        assert!(matcher.is_product_url(&url("https://www.shop.com/p/12345678")));
        assert!(matcher.is_product_url(&url("https://www.shop.com/item/1234567/buy")));
        assert!(!matcher.is_product_url(&url("https://www.snapdeal.com/product/red/123")));
        assert!(!matcher.is_product_url(&url("https://www.shop.com/")));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = ProductMatcher::new(Vec::<String>::new(), ["([a-z"]);
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }
}
