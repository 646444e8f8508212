//! Storage module for persisting crawl data
//!
//! This module handles everything the crawler writes to disk:
//! - One markdown file per saved page
//! - `_meta.json` with per-page hashes for incremental runs
//! - Loading the previous run's metadata

mod filesystem;
mod meta;
mod paths;

pub use filesystem::{content_hash, CrawlStorage, META_FILE};
pub use meta::{CrawlMetadata, PageMeta, NO_RESPONSE_STATUS};
pub use paths::url_to_file_path;
