//! `_meta.json` records

use crate::manifest::ManifestType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status recorded for failures that never produced an HTTP response
pub const NO_RESPONSE_STATUS: u16 = 0;

/// One page entry in `_meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Normalized page URL
    pub url: String,

    /// Markdown file relative to the output directory; absent for failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,

    /// HTTP status, or 0 when no response was received
    pub status: u16,

    /// First 16 hex chars of SHA-256 over the converted markdown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl PageMeta {
    /// Returns true if this entry records a saved page
    pub fn is_saved(&self) -> bool {
        self.file.is_some()
    }
}

/// Contents of `_meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlMetadata {
    /// Origin of the manifest the crawl started from
    pub origin: String,

    /// When the run finished
    pub crawled_at: DateTime<Utc>,

    /// Manifest kind the URLs came from
    pub source: ManifestType,

    /// Number of entries in `pages`
    #[serde(default)]
    pub page_count: usize,

    /// Per-page records; older files call this list `urls`
    #[serde(default, alias = "urls")]
    pub pages: Vec<PageMeta>,
}
