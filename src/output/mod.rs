//! Output module for reporting crawl results
//!
//! Page content and metadata are written by the storage layer; this module
//! renders what a run did (or, for a dry run, would do) for the terminal.

mod summary;

pub use summary::{CrawlSummary, DryRunReport, MAX_LISTED_FAILURES};
