//! URL handling module for Shelf-Scout
//!
//! This module provides URL normalization, host handling, the link scope
//! predicate, and product URL recognition.

mod domain;
mod matcher;
mod normalize;
mod product;

// Re-export main functions
pub use domain::{host_key, site_root};
pub use matcher::{is_internal, matches_wildcard, ScopePolicy};
pub use normalize::normalize_url;
pub use product::ProductMatcher;
