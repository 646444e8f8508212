//! Per-run robots.txt cache
//!
//! Each origin's robots.txt is fetched at most once per run. Any failure to
//! fetch it degrades to the permissive rule set.

use crate::crawler::Fetcher;
use crate::robots::ParsedRobots;
use crate::url::{origin_join, origin_of};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use url::Url;

/// Retries spent on robots.txt before failing open
const ROBOTS_MAX_RETRIES: u32 = 1;

/// Cached robots.txt data for an origin
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: ParsedRobots,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content,
            fetched_at: Utc::now(),
        }
    }
}

/// Robots.txt rules keyed by origin
pub struct RobotsCache {
    fetcher: Fetcher,
    agent: String,
    entries: HashMap<String, CachedRobots>,
}

impl RobotsCache {
    /// Creates an empty cache that fetches with `fetcher` and evaluates rules
    /// for the `agent` product token
    pub fn new(fetcher: Fetcher, agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            agent: agent.into(),
            entries: HashMap::new(),
        }
    }

    /// Checks whether robots.txt of the URL's origin allows it
    pub async fn is_allowed(&mut self, url: &Url) -> bool {
        let agent = self.agent.clone();
        self.rules_for(url).await.is_allowed(url.as_str(), &agent)
    }

    /// Crawl-delay (seconds) declared for the URL's origin
    pub async fn crawl_delay(&mut self, url: &Url) -> Option<f64> {
        let agent = self.agent.clone();
        self.rules_for(url).await.crawl_delay(&agent)
    }

    /// Sitemap URLs advertised by the URL's origin
    pub async fn sitemaps(&mut self, url: &Url) -> Vec<String> {
        self.rules_for(url).await.sitemaps().to_vec()
    }

    /// Number of origins fetched so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pre-populates an origin's rules
    pub fn insert(&mut self, url: &Url, robots: ParsedRobots) {
        self.entries
            .insert(origin_of(url), CachedRobots::new(robots));
    }

    /// Returns the rules for the URL's origin, fetching them on first use
    pub async fn rules_for(&mut self, url: &Url) -> &ParsedRobots {
        let origin = origin_of(url);

        let fetched = if self.entries.contains_key(&origin) {
            None
        } else {
            Some(self.fetch_rules(url, &origin).await)
        };

        &self
            .entries
            .entry(origin)
            .or_insert_with(|| CachedRobots::new(fetched.unwrap_or_default()))
            .content
    }

    async fn fetch_rules(&self, url: &Url, origin: &str) -> ParsedRobots {
        let Some(robots_url) = origin_join(url, "/robots.txt") else {
            tracing::warn!("Cannot build robots.txt URL for {}; allowing all", origin);
            return ParsedRobots::allow_all();
        };

        match self
            .fetcher
            .fetch_with_retries(&robots_url, ROBOTS_MAX_RETRIES)
            .await
        {
            Ok(result) => {
                let robots = ParsedRobots::from_content(&result.body);
                tracing::debug!(
                    "Loaded robots.txt for {} (crawl-delay: {:?}, {} sitemap(s))",
                    origin,
                    robots.crawl_delay(&self.agent),
                    robots.sitemaps().len()
                );
                robots
            }
            Err(e) => {
                tracing::warn!("robots.txt unavailable for {} ({}); allowing all", origin, e);
                ParsedRobots::allow_all()
            }
        }
    }
}
