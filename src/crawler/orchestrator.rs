//! Crawl orchestration - the main crawl loop
//!
//! The orchestrator resolves the manifest into the queue, then drives each
//! dequeued URL through the page state machine:
//!
//! ```text
//! Queued -> RobotsChecked -> Fetched -> Converted -> Saved
//!    \            \              \           \
//!     `------------`--------------`-----------`--> Skipped(reason) / Failed
//! ```
//!
//! Per-page problems are recorded and reported; only invalid options, a
//! manifest that cannot be loaded, and failing to write `_meta.json` end a
//! run with an error.

use crate::config::{validate, CrawlOptions, CRAWLER_NAME};
use crate::crawler::content::process_content;
use crate::crawler::links::{extract_links, LinkFilter};
use crate::crawler::queue::{CrawlQueue, QueueItem};
use crate::crawler::Fetcher;
use crate::manifest::{ManifestResolver, ManifestType};
use crate::output::{CrawlSummary, DryRunReport};
use crate::robots::RobotsCache;
use crate::state::{PageState, SkipReason};
use crate::storage::{content_hash, CrawlStorage, NO_RESPONSE_STATUS};
use crate::url::{origin_of, same_origin, PatternFilter};
use crate::CrawlError;
use tokio::time::Instant;
use url::Url;

/// Pages between progress log lines
const PROGRESS_INTERVAL: usize = 10;

/// Manifest URLs after origin and pattern filtering
struct Seeding {
    queued: Vec<Url>,
    skipped: Vec<(String, SkipReason)>,
}

/// Drives one crawl run
pub struct Orchestrator {
    options: CrawlOptions,
    manifest_type: ManifestType,
    fetcher: Fetcher,
    robots: RobotsCache,
    queue: CrawlQueue,
    links: LinkFilter,
    patterns: PatternFilter,
}

impl Orchestrator {
    /// Validates the options and prepares a run
    ///
    /// Fails before any network I/O if the options are invalid or the seed
    /// URL is not a supported manifest.
    pub fn new(options: CrawlOptions) -> Result<Self, CrawlError> {
        validate(&options)?;
        let manifest_type = ManifestType::detect(&options.seed_url)?;

        let fetcher = Fetcher::new(options.fetch.clone())?;
        let robots = RobotsCache::new(fetcher.clone(), CRAWLER_NAME);
        let queue = CrawlQueue::new(options.rate);
        let patterns = options.pattern_filter()?;
        let links = LinkFilter::new(options.seed_url.clone(), patterns.clone());

        Ok(Self {
            options,
            manifest_type,
            fetcher,
            robots,
            queue,
            links,
            patterns,
        })
    }

    /// Manifest kind detected from the seed URL
    pub fn manifest_type(&self) -> ManifestType {
        self.manifest_type
    }

    /// Runs the crawl to completion
    ///
    /// The loop ends when the queue is empty or the optional time limit has
    /// passed. `_meta.json` is written in both cases.
    pub async fn run(&mut self) -> Result<CrawlSummary, CrawlError> {
        let start = Instant::now();
        let seed = self.options.seed_url.clone();
        let origin = origin_of(&seed);
        let output_dir = self.options.resolved_output_dir();

        tracing::info!(
            "Crawling {} ({}) into {}",
            seed,
            self.manifest_type,
            output_dir.display()
        );

        let mut storage = CrawlStorage::open(&output_dir);
        if storage.previous_count() > 0 {
            tracing::info!(
                "Found previous crawl with {} pages; unchanged pages will be skipped",
                storage.previous_count()
            );
        }

        let seeding = self.seed().await?;
        tracing::info!(
            "Manifest resolved: {} URLs queued, {} skipped",
            seeding.queued.len(),
            seeding.skipped.len()
        );

        let mut summary = CrawlSummary::new(origin.clone(), self.manifest_type, output_dir);
        summary.skipped.extend(seeding.skipped);

        let deadline = self.options.max_duration.map(|limit| start + limit);
        let mut processed = 0usize;

        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                if !self.queue.is_empty() {
                    tracing::warn!(
                        "Time limit reached with {} URLs still queued",
                        self.queue.len()
                    );
                    summary.stopped_early = true;
                }
                break;
            }

            let Some(item) = self.queue.next().await else {
                tracing::debug!("Queue is empty, crawl complete");
                break;
            };

            let url = item.url.clone();
            match self.process_item(item, &mut storage, &mut summary).await {
                Ok(state) => tracing::trace!("{} -> {}", url, state),
                Err(e) => tracing::error!("Error processing {}: {}", url, e),
            }

            processed += 1;
            if processed % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} processed, {} saved, {} in queue",
                    processed,
                    summary.saved.len(),
                    self.queue.len()
                );
            }
        }

        summary.elapsed = start.elapsed();
        storage.save_meta(&origin, self.manifest_type)?;

        tracing::info!(
            "Crawl complete: {} saved, {} skipped, {} failed in {:.1}s",
            summary.saved.len(),
            summary.skipped.len(),
            summary.failed.len(),
            summary.elapsed.as_secs_f64()
        );

        Ok(summary)
    }

    /// Resolves the manifest and reports what a run would crawl
    ///
    /// Nothing is written. With link-following enabled, the manifest pages
    /// are fetched once to list the links they lead to.
    pub async fn dry_run(&mut self) -> Result<DryRunReport, CrawlError> {
        let seed = self.options.seed_url.clone();
        let seeding = self.seed().await?;

        let mut discovered = Vec::new();
        if self.options.depth > 0 {
            while let Some(item) = self.queue.next().await {
                if item.depth > 0 {
                    break;
                }

                if !self.robots.is_allowed(&item.url).await {
                    continue;
                }

                match self.fetcher.fetch(&item.url).await {
                    Ok(result) if same_origin(&result.final_url, &seed) => {
                        let content =
                            process_content(&result.body, &result.content_type, &result.final_url);
                        for link in self
                            .links
                            .filter(extract_links(&content.markdown, &result.final_url))
                        {
                            if self.queue.add_child(&link, &item) {
                                discovered.push(link.to_string());
                            }
                        }
                    }
                    Ok(result) => {
                        tracing::debug!("{} redirects off-origin to {}", item.url, result.final_url)
                    }
                    Err(e) => tracing::warn!("Could not fetch {}: {}", item.url, e),
                }
            }
        }

        Ok(DryRunReport {
            manifest_url: seed.to_string(),
            source: self.manifest_type,
            output_dir: self.options.resolved_output_dir(),
            urls: seeding.queued.iter().map(Url::to_string).collect(),
            skipped: seeding.skipped,
            discovered,
            sitemaps: self.robots.sitemaps(&seed).await,
        })
    }

    /// Resolves the manifest and fills the queue
    async fn seed(&mut self) -> Result<Seeding, CrawlError> {
        let seed = self.options.seed_url.clone();
        let urls = ManifestResolver::new(&self.fetcher)
            .resolve(self.manifest_type, &seed)
            .await?;

        let mut seeding = Seeding {
            queued: Vec::new(),
            skipped: Vec::new(),
        };

        for url in urls {
            if !same_origin(&url, &seed) {
                tracing::debug!("Skipping {} ({})", url, SkipReason::OffOrigin);
                seeding.skipped.push((url.to_string(), SkipReason::OffOrigin));
                continue;
            }

            if !self.patterns.matches(&url) {
                tracing::debug!("Skipping {} ({})", url, SkipReason::Filtered);
                seeding.skipped.push((url.to_string(), SkipReason::Filtered));
                continue;
            }

            if self.queue.add(&url, None) {
                seeding.queued.push(url);
            }
        }

        if seeding.queued.is_empty() {
            tracing::warn!("Manifest {} lists no crawlable URLs", seed);
        }

        Ok(seeding)
    }

    /// Processes a single URL
    ///
    /// Returns the state the item ended in; an active state means it was
    /// re-queued for another attempt.
    async fn process_item(
        &mut self,
        item: QueueItem,
        storage: &mut CrawlStorage,
        summary: &mut CrawlSummary,
    ) -> Result<PageState, CrawlError> {
        let url = item.url.clone();
        let mut state = PageState::Queued;

        // Check robots.txt
        if !self.robots.is_allowed(&url).await {
            tracing::debug!("Skipping {} ({})", url, SkipReason::Robots);
            summary.skipped.push((url.to_string(), SkipReason::Robots));
            return state.transition(PageState::Skipped(SkipReason::Robots));
        }
        state = state.transition(PageState::RobotsChecked)?;

        if let Some(delay) = self.robots.crawl_delay(&url).await {
            self.queue.apply_crawl_delay(delay);
        }

        // Fetch the page. Transient failures are retried through the queue,
        // so each dequeue makes exactly one request.
        let result = match self.fetcher.fetch_once(&url).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_transient() && self.queue.retry(item.clone()) {
                    tracing::warn!("{}; will retry later", e);
                    return Ok(state);
                }

                tracing::warn!("Failed {}: {}", url, e);
                storage.record_failure(&url, e.status().unwrap_or(NO_RESPONSE_STATUS));
                summary.failed.push((url.to_string(), e.to_string()));
                return state.transition(PageState::Failed);
            }
        };

        if !same_origin(&result.final_url, &self.options.seed_url) {
            let reason = SkipReason::CrossOriginRedirect;
            tracing::debug!("Skipping {} ({}: {})", url, reason, result.final_url);
            summary.skipped.push((url.to_string(), reason));
            return state.transition(PageState::Skipped(reason));
        }
        state = state.transition(PageState::Fetched)?;

        // Convert
        let content = process_content(&result.body, &result.content_type, &result.final_url);
        state = state.transition(PageState::Converted)?;

        // Follow links, including from unchanged pages so their children
        // are still visited
        if item.depth < self.options.depth {
            let mut added = 0usize;
            for link in self
                .links
                .filter(extract_links(&content.markdown, &result.final_url))
            {
                if self.queue.add_child(&link, &item) {
                    added += 1;
                }
            }
            if added > 0 {
                tracing::debug!("Queued {} links from {}", added, url);
            }
        }

        let hash = content_hash(&content.markdown);
        if storage.has_unchanged(&url, &hash) {
            // Unlike a plain skip, the previous entry is copied into this
            // run's metadata; without it the next run would re-save the page.
            storage.carry_forward(&url);
            tracing::debug!("Skipping {} ({})", url, SkipReason::Unchanged);
            summary.skipped.push((url.to_string(), SkipReason::Unchanged));
            return state.transition(PageState::Skipped(SkipReason::Unchanged));
        }

        match storage.save_page(&url, &content.markdown, content.title.as_deref(), result.status) {
            Ok(page) => {
                tracing::info!(
                    "Saved {} -> {}",
                    url,
                    page.file.as_deref().unwrap_or_default()
                );
                summary.saved.push(url.to_string());
                state.transition(PageState::Saved)
            }
            Err(e) => {
                tracing::error!("Could not save {}: {}", url, e);
                summary.failed.push((url.to_string(), e.to_string()));
                state.transition(PageState::Failed)
            }
        }
    }
}
