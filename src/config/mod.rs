//! Configuration module
//!
//! This module builds the run configuration: defaults, an optional TOML
//! defaults file, then command-line overrides, validated once before the
//! crawl starts.
//!
//! # Example
//!
//! ```no_run
//! use lrn_crawler::config::{load_default_config, validate, CrawlOptions};
//!
//! let mut options = CrawlOptions::new("https://docs.example.com/llms.txt").unwrap();
//! options.apply_file(&load_default_config().unwrap());
//! validate(&options).unwrap();
//! println!("Crawling at {} req/s", options.rate);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_user_agent, CrawlOptions, CrawlerSection, FetchOptions, FetchSection, FileConfig,
    CRAWLER_INFO_URL, CRAWLER_NAME, CRAWLER_VERSION, DEFAULT_RATE,
};

// Re-export parser functions
pub use parser::{default_config_path, load_config, load_default_config, parse_config};
pub use validation::validate;
