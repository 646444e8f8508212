//! End-of-run summary and dry-run report

use crate::manifest::ManifestType;
use crate::state::SkipReason;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

/// Failures listed individually in the summary
pub const MAX_LISTED_FAILURES: usize = 10;

/// Outcome of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Origin of the manifest
    pub origin: String,

    /// Manifest kind
    pub source: ManifestType,

    /// Directory pages were written to
    pub output_dir: PathBuf,

    /// URLs saved this run
    pub saved: Vec<String>,

    /// URLs skipped, with the reason
    pub skipped: Vec<(String, SkipReason)>,

    /// URLs that failed, with the error message
    pub failed: Vec<(String, String)>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,

    /// True if the run stopped at its deadline with URLs still queued
    pub stopped_early: bool,
}

impl CrawlSummary {
    pub fn new(origin: impl Into<String>, source: ManifestType, output_dir: PathBuf) -> Self {
        Self {
            origin: origin.into(),
            source,
            output_dir,
            saved: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            elapsed: Duration::ZERO,
            stopped_early: false,
        }
    }

    /// Total URLs that reached a terminal state
    pub fn total(&self) -> usize {
        self.saved.len() + self.skipped.len() + self.failed.len()
    }

    /// Skip counts keyed by reason
    pub fn skipped_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, reason) in &self.skipped {
            *counts.entry(reason.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of pages skipped for `reason`
    pub fn skipped_count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|(_, r)| *r == reason).count()
    }

    /// Renders the summary printed at the end of a run
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "=== Crawl Summary ===\n");
        let _ = writeln!(out, "Source: {} ({})", self.origin, self.source);
        let _ = writeln!(out, "Output: {}", self.output_dir.display());
        let _ = writeln!(out, "Duration: {:.1}s", self.elapsed.as_secs_f64());
        let _ = writeln!(out);
        let _ = writeln!(out, "  Saved:   {}", self.saved.len());
        let _ = writeln!(out, "  Skipped: {}", self.skipped.len());
        for (reason, count) in self.skipped_by_reason() {
            let _ = writeln!(out, "    {}: {}", reason, count);
        }
        let _ = writeln!(out, "  Failed:  {}", self.failed.len());

        if !self.failed.is_empty() {
            let _ = writeln!(out, "\nFailures:");
            for (url, message) in self.failed.iter().take(MAX_LISTED_FAILURES) {
                let _ = writeln!(out, "  - {}: {}", url, message);
            }
            if self.failed.len() > MAX_LISTED_FAILURES {
                let _ = writeln!(
                    out,
                    "  ... and {} more",
                    self.failed.len() - MAX_LISTED_FAILURES
                );
            }
        }

        if self.stopped_early {
            let _ = writeln!(out, "\nStopped at the time limit; remaining URLs were not crawled.");
        }

        out
    }
}

/// What a run would crawl, without fetching pages or writing files
#[derive(Debug, Clone)]
pub struct DryRunReport {
    pub manifest_url: String,
    pub source: ManifestType,
    pub output_dir: PathBuf,

    /// URLs that would be crawled, in queue order
    pub urls: Vec<String>,

    /// Manifest entries that would be skipped
    pub skipped: Vec<(String, SkipReason)>,

    /// Links found on the manifest pages when link-following is enabled
    pub discovered: Vec<String>,

    /// Sitemaps advertised by the site's robots.txt
    pub sitemaps: Vec<String>,
}

impl DryRunReport {
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "=== Dry Run ===\n");
        let _ = writeln!(out, "Manifest: {} ({})", self.manifest_url, self.source);
        let _ = writeln!(out, "Output: {}", self.output_dir.display());

        let _ = writeln!(out, "\nWould crawl {} URLs:", self.urls.len());
        for url in &self.urls {
            let _ = writeln!(out, "  - {}", url);
        }

        if !self.skipped.is_empty() {
            let _ = writeln!(out, "\nWould skip {} URLs:", self.skipped.len());
            for (url, reason) in &self.skipped {
                let _ = writeln!(out, "  - {} ({})", url, reason);
            }
        }

        if !self.discovered.is_empty() {
            let _ = writeln!(out, "\nDiscovered {} linked URLs:", self.discovered.len());
            for url in &self.discovered {
                let _ = writeln!(out, "  - {}", url);
            }
        }

        if !self.sitemaps.is_empty() {
            let _ = writeln!(out, "\nrobots.txt advertises {} sitemaps:", self.sitemaps.len());
            for url in &self.sitemaps {
                let _ = writeln!(out, "  - {}", url);
            }
        }

        out
    }
}
