//! Configuration module for Shelf-Scout
//!
//! This module handles loading, parsing, validating and fingerprinting TOML
//! configuration files. Every setting has a built-in default, so the crawler
//! also runs without a file.
//!
//! # Example
//!
//! ```no_run
//! use shelf_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shelf-scout.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, ProductConfig, ScopeConfig, UserAgentConfig,
};

// Re-export parser and validation functions
pub use parser::{config_fingerprint, load_config, parse_config};
pub use validation::validate;
