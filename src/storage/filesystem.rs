//! Filesystem-backed crawl storage
//!
//! Pages are written as `{dir}/{path}.md`; per-run metadata lives in
//! `{dir}/_meta.json` and is replaced atomically at the end of a run.

use crate::manifest::ManifestType;
use crate::storage::meta::{CrawlMetadata, PageMeta};
use crate::storage::paths::url_to_file_path;
use crate::CrawlError;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Metadata file name inside the output directory
pub const META_FILE: &str = "_meta.json";

/// Hex characters of the SHA-256 digest kept as the content hash
const HASH_LEN: usize = 16;

/// Computes the content hash stored in `_meta.json`
///
/// # Examples
///
/// ```
/// use lrn_crawler::storage::content_hash;
///
/// let hash = content_hash("# Title\n");
/// assert_eq!(hash.len(), 16);
/// assert_eq!(hash, content_hash("# Title\n"));
/// ```
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    hash
}

/// Page files and metadata for one output directory
#[derive(Debug)]
pub struct CrawlStorage {
    dir: PathBuf,

    /// Entries from the previous run, keyed by URL
    previous: HashMap<String, PageMeta>,

    /// Entries for this run, in the order they were recorded
    pages: Vec<PageMeta>,

    /// URL -> index into `pages`
    index: HashMap<String, usize>,

    /// Relative file -> URL written there this run
    files: HashMap<String, String>,
}

impl CrawlStorage {
    /// Opens an output directory, loading the previous run's metadata
    ///
    /// Nothing is created on disk until a page or the metadata is saved. A
    /// missing or unreadable `_meta.json` means there is no prior state.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let previous = load_previous(&dir.join(META_FILE))
            .map(|meta| {
                meta.pages
                    .into_iter()
                    .map(|page| (page.url.clone(), page))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            dir,
            previous,
            pages: Vec::new(),
            index: HashMap::new(),
            files: HashMap::new(),
        }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Entry recorded for `url` by the previous run
    pub fn previous(&self, url: &Url) -> Option<&PageMeta> {
        self.previous.get(url.as_str())
    }

    /// Number of entries loaded from the previous run
    pub fn previous_count(&self) -> usize {
        self.previous.len()
    }

    /// Entries recorded so far in this run
    pub fn pages(&self) -> &[PageMeta] {
        &self.pages
    }

    /// Returns true if the previous run saved `url` with the same hash
    pub fn has_unchanged(&self, url: &Url, hash: &str) -> bool {
        self.previous(url)
            .filter(|page| page.is_saved())
            .and_then(|page| page.content_hash.as_deref())
            == Some(hash)
    }

    /// Writes a page's markdown and records its metadata
    pub fn save_page(
        &mut self,
        url: &Url,
        content: &str,
        title: Option<&str>,
        status: u16,
    ) -> Result<PageMeta, CrawlError> {
        let relative = url_to_file_path(url);
        let file = relative.to_string_lossy().replace('\\', "/");
        let path = self.dir.join(&relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        if let Some(other) = self.files.insert(file.clone(), url.to_string()) {
            if other != url.as_str() {
                tracing::debug!("{} overwrites {} (both map to {})", url, other, file);
            }
        }

        let page = PageMeta {
            url: url.to_string(),
            file: Some(file),
            fetched_at: Utc::now(),
            status,
            content_hash: Some(content_hash(content)),
            title: title.map(str::to_string),
        };
        self.record(page.clone());
        Ok(page)
    }

    /// Records a page that could not be fetched
    pub fn record_failure(&mut self, url: &Url, status: u16) -> PageMeta {
        let page = PageMeta {
            url: url.to_string(),
            file: None,
            fetched_at: Utc::now(),
            status,
            content_hash: None,
            title: None,
        };
        self.record(page.clone());
        page
    }

    /// Copies the previous run's entry for an unchanged page into this run
    ///
    /// Returns false if the previous run has no entry for `url`.
    pub fn carry_forward(&mut self, url: &Url) -> bool {
        match self.previous.get(url.as_str()).cloned() {
            Some(page) => {
                if let Some(file) = &page.file {
                    self.files.insert(file.clone(), page.url.clone());
                }
                self.record(page);
                true
            }
            None => false,
        }
    }

    /// Builds the metadata for this run without writing it
    pub fn metadata(&self, origin: &str, source: ManifestType) -> CrawlMetadata {
        CrawlMetadata {
            origin: origin.to_string(),
            crawled_at: Utc::now(),
            source,
            page_count: self.pages.len(),
            pages: self.pages.clone(),
        }
    }

    /// Persists `_meta.json` atomically
    ///
    /// The JSON is written to a temporary file in the same directory and
    /// renamed over the old file, so an interrupted write leaves the
    /// previous metadata intact.
    pub fn save_meta(
        &self,
        origin: &str,
        source: ManifestType,
    ) -> Result<CrawlMetadata, CrawlError> {
        let meta = self.metadata(origin, source);
        let json = serde_json::to_string_pretty(&meta)?;

        fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(META_FILE);
        let temp = self.dir.join(format!("{}.tmp", META_FILE));

        fs::write(&temp, json)?;
        fs::rename(&temp, &target).map_err(|e| {
            let _ = fs::remove_file(&temp);
            CrawlError::Storage(format!("failed to replace {}: {}", target.display(), e))
        })?;

        tracing::debug!("Wrote {} ({} pages)", target.display(), meta.page_count);
        Ok(meta)
    }

    fn record(&mut self, page: PageMeta) {
        match self.index.get(&page.url) {
            Some(&i) => self.pages[i] = page,
            None => {
                self.index.insert(page.url.clone(), self.pages.len());
                self.pages.push(page);
            }
        }
    }
}

/// Loads a metadata file, logging and returning `None` when it is missing or
/// corrupt
fn load_previous(path: &Path) -> Option<CrawlMetadata> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No previous crawl metadata at {}", path.display());
            return None;
        }
        Err(e) => {
            tracing::warn!("Cannot read {}: {}; starting fresh", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str::<CrawlMetadata>(&content) {
        Ok(meta) => {
            tracing::debug!(
                "Loaded previous crawl of {} ({} pages)",
                meta.origin,
                meta.pages.len()
            );
            Some(meta)
        }
        Err(e) => {
            tracing::warn!("Ignoring corrupt {}: {}", path.display(), e);
            None
        }
    }
}
