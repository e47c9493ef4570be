//! Configuration module for qa-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the crawler also runs without a file.
//!
//! # Example
//!
//! ```no_run
//! use qa_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawl starts at: {}", config.crawler.start_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, OutputFormat, ProxyConfig, SelectorConfig,
    UserAgentConfig, DEFAULT_BASE_URL, DEFAULT_START_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, MAX_WORKERS};
