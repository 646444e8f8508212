//! FIFO crawl queue with dedup and rate pacing
//!
//! The queue is the only pacing point of a crawl: `next()` waits until at
//! least `1 / rate` seconds have passed since the previous dequeue.

use crate::url::{dedup_key, normalize_parsed};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Times an item may be re-enqueued after a transient failure
pub const MAX_QUEUE_RETRIES: u32 = 3;

/// Longest spacing between dequeues, whatever robots.txt or the rate asks for
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// Normalized URL (fragment stripped)
    pub url: Url,

    /// Page the URL was discovered on; `None` for manifest entries
    pub parent: Option<Url>,

    /// Times this item has been re-enqueued
    pub retry_count: u32,

    /// Link hops below the manifest pages
    pub depth: u32,
}

/// Crawl frontier
///
/// Every normalized URL is admitted at most once per run. The only way back
/// in is `retry`, which un-visits the URL first.
#[derive(Debug)]
pub struct CrawlQueue {
    items: VecDeque<QueueItem>,
    visited: HashSet<String>,

    /// Rate requested by the user
    configured_rate: f64,

    /// Effective rate after robots.txt crawl-delays
    rate: f64,

    last_dequeue: Option<Instant>,
}

impl CrawlQueue {
    /// Creates an empty queue paced at `rate` requests per second
    pub fn new(rate: f64) -> Self {
        Self {
            items: VecDeque::new(),
            visited: HashSet::new(),
            configured_rate: rate,
            rate,
            last_dequeue: None,
        }
    }

    /// Adds a manifest URL at depth 0
    ///
    /// Returns false if the URL was already seen this run or is not a valid
    /// http(s) URL.
    pub fn add(&mut self, url: &Url, parent: Option<&Url>) -> bool {
        self.push(url, parent, 0)
    }

    /// Adds every URL at depth 0, returning how many were new
    pub fn add_all<'a, I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = &'a Url>,
    {
        urls.into_iter().filter(|url| self.add(url, None)).count()
    }

    /// Adds a link discovered on `parent`, one level deeper
    pub fn add_child(&mut self, url: &Url, parent: &QueueItem) -> bool {
        self.push(url, Some(&parent.url), parent.depth + 1)
    }

    /// Dequeues the next item, waiting out the rate interval first
    pub async fn next(&mut self) -> Option<QueueItem> {
        let item = self.items.pop_front()?;

        if let Some(last) = self.last_dequeue {
            let interval = self.interval();
            let elapsed = last.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        self.last_dequeue = Some(Instant::now());

        tracing::trace!("Dequeued {} ({} remaining)", item.url, self.items.len());
        Some(item)
    }

    /// Re-enqueues an item at the back after a transient failure
    ///
    /// Returns false once the item has used up its retries.
    pub fn retry(&mut self, item: QueueItem) -> bool {
        if item.retry_count >= MAX_QUEUE_RETRIES {
            return false;
        }

        let key = dedup_key(&item.url);
        self.visited.remove(&key);
        self.visited.insert(key);

        tracing::debug!(
            "Re-queued {} (retry {}/{})",
            item.url,
            item.retry_count + 1,
            MAX_QUEUE_RETRIES
        );
        self.items.push_back(QueueItem {
            retry_count: item.retry_count + 1,
            ..item
        });
        true
    }

    /// Applies a robots.txt `Crawl-delay`, never speeding up
    ///
    /// Delays above `MAX_CRAWL_DELAY` are clamped to it.
    pub fn apply_crawl_delay(&mut self, seconds: f64) {
        if seconds > 0.0 && seconds.is_finite() {
            let seconds = seconds.min(MAX_CRAWL_DELAY.as_secs_f64());
            let limited = self.configured_rate.min(1.0 / seconds);
            if limited < self.rate {
                tracing::info!(
                    "Crawl-delay {}s: slowing to {:.3} req/s",
                    seconds,
                    limited
                );
            }
            self.rate = limited;
        }
    }

    /// Effective requests per second
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// URLs admitted so far this run
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.rate)
            .map_or(MAX_CRAWL_DELAY, |interval| interval.min(MAX_CRAWL_DELAY))
    }

    fn push(&mut self, url: &Url, parent: Option<&Url>, depth: u32) -> bool {
        let Ok(url) = normalize_parsed(url.clone()) else {
            return false;
        };

        if !self.visited.insert(dedup_key(&url)) {
            return false;
        }

        self.items.push_back(QueueItem {
            url,
            parent: parent.cloned(),
            retry_count: 0,
            depth,
        });
        true
    }
}
