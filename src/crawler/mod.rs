//! Crawler module for fetching and processing documentation pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with redirect, retry and size limits
//! - The rate-paced crawl queue
//! - Converting bodies to markdown and extracting links from it
//! - Overall crawl orchestration

mod content;
mod fetcher;
mod links;
mod orchestrator;
mod queue;

pub use content::{normalize_whitespace, process_content, ProcessedContent};
pub use fetcher::{
    build_http_client, is_allowed_content_type, retry_after, FetchResult, Fetcher, ACCEPT_HEADER,
};
pub use links::{extract_links, LinkFilter};
pub use orchestrator::Orchestrator;
pub use queue::{CrawlQueue, QueueItem, MAX_QUEUE_RETRIES};

use crate::config::CrawlOptions;
use crate::output::CrawlSummary;
use crate::CrawlError;

/// Runs a complete crawl
///
/// Validates the options, resolves the manifest, crawls every queued page
/// and writes `_meta.json`.
///
/// # Example
///
/// ```no_run
/// use lrn_crawler::config::CrawlOptions;
/// use lrn_crawler::crawler::crawl;
///
/// # async fn example() -> Result<(), lrn_crawler::CrawlError> {
/// let options = CrawlOptions::new("https://docs.example.com/llms.txt")?;
/// let summary = crawl(options).await?;
/// println!("{}", summary.render());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(options: CrawlOptions) -> Result<CrawlSummary, CrawlError> {
    Orchestrator::new(options)?.run().await
}
