//! Manifest detection and resolution
//!
//! A crawl starts from one of three manifest kinds, detected from the last
//! path segment of the seed URL:
//!
//! | File name | Kind | Pages |
//! |-----------|------|-------|
//! | `llms-full.txt` | `LlmsFull` | the manifest itself |
//! | `llms*.txt` | `LlmsTxt` | every listed link |
//! | `sitemap*.xml` | `Sitemap` | every `<loc>`, following index children |

mod llms_txt;
mod sitemap;

pub use llms_txt::{LlmsTxt, ManifestEntry};
pub use sitemap::{parse_sitemap, SitemapDocument};

use crate::crawler::Fetcher;
use crate::url::normalize_parsed;
use crate::CrawlError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use url::Url;

/// Nesting allowed below the root sitemap index
const MAX_SITEMAP_NESTING: u32 = 2;

/// Kind of manifest a crawl starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestType {
    /// `llms-full.txt`: the documentation in one file
    LlmsFull,

    /// `llms.txt`: a list of links
    LlmsTxt,

    /// `sitemap.xml` or a sitemap index
    Sitemap,
}

impl ManifestType {
    /// Detects the manifest kind from the URL's last path segment
    ///
    /// The most specific name wins: `llms-full.txt` before `llms*.txt`.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use lrn_crawler::ManifestType;
    ///
    /// let url = Url::parse("https://docs.example.com/llms-full.txt").unwrap();
    /// assert_eq!(ManifestType::detect(&url).unwrap(), ManifestType::LlmsFull);
    ///
    /// let url = Url::parse("https://docs.example.com/sitemap-docs.xml").unwrap();
    /// assert_eq!(ManifestType::detect(&url).unwrap(), ManifestType::Sitemap);
    ///
    /// let url = Url::parse("https://docs.example.com/index.html").unwrap();
    /// assert!(ManifestType::detect(&url).is_err());
    /// ```
    pub fn detect(url: &Url) -> Result<Self, CrawlError> {
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
            .to_lowercase();

        if name == "llms-full.txt" {
            Ok(Self::LlmsFull)
        } else if name.starts_with("llms") && name.ends_with(".txt") {
            Ok(Self::LlmsTxt)
        } else if name.starts_with("sitemap") && name.ends_with(".xml") {
            Ok(Self::Sitemap)
        } else {
            Err(CrawlError::UnsupportedManifest {
                url: url.to_string(),
            })
        }
    }

    /// Name written to `_meta.json`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LlmsFull => "llms-full",
            Self::LlmsTxt => "llms-txt",
            Self::Sitemap => "sitemap",
        }
    }
}

impl fmt::Display for ManifestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns a manifest URL into the list of page URLs to crawl
pub struct ManifestResolver<'a> {
    fetcher: &'a Fetcher,
}

impl<'a> ManifestResolver<'a> {
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self { fetcher }
    }

    /// Resolves a manifest to page URLs, in manifest order
    ///
    /// Failing to fetch or parse the manifest itself is an error; failing to
    /// fetch a child sitemap is logged and the child skipped.
    pub async fn resolve(
        &self,
        manifest_type: ManifestType,
        url: &Url,
    ) -> Result<Vec<Url>, CrawlError> {
        match manifest_type {
            ManifestType::LlmsFull => Ok(vec![url.clone()]),
            ManifestType::LlmsTxt => {
                let body = self.fetch_manifest(url).await?;
                let doc = LlmsTxt::parse(&body);
                tracing::debug!(
                    "llms.txt '{}' lists {} entries",
                    doc.title.as_deref().unwrap_or("untitled"),
                    doc.entries.len()
                );
                Ok(doc.resolve(url))
            }
            ManifestType::Sitemap => self.resolve_sitemap(url).await,
        }
    }

    async fn resolve_sitemap(&self, url: &Url) -> Result<Vec<Url>, CrawlError> {
        let body = self.fetch_manifest(url).await?;
        let root = parse_sitemap(&body).map_err(|message| CrawlError::Manifest {
            url: url.to_string(),
            message,
        })?;

        let mut urls = root.urls;
        let mut pending: VecDeque<(Url, u32)> =
            root.children.into_iter().map(|child| (child, 1)).collect();

        while let Some((child, level)) = pending.pop_front() {
            let body = match self.fetcher.fetch(&child).await {
                Ok(result) => result.body,
                Err(e) => {
                    tracing::warn!("Skipping child sitemap {}: {}", child, e);
                    continue;
                }
            };

            let doc = match parse_sitemap(&body) {
                Ok(doc) => doc,
                Err(message) => {
                    tracing::warn!("Skipping child sitemap {}: {}", child, message);
                    continue;
                }
            };

            tracing::debug!("Child sitemap {} lists {} URLs", child, doc.urls.len());
            let is_index = doc.is_index();
            urls.extend(doc.urls);

            if level < MAX_SITEMAP_NESTING {
                pending.extend(doc.children.into_iter().map(|c| (c, level + 1)));
            } else if is_index {
                tracing::warn!("Ignoring sitemap index nested too deeply: {}", child);
            }
        }

        Ok(urls
            .into_iter()
            .filter_map(|u| normalize_parsed(u).ok())
            .collect())
    }

    async fn fetch_manifest(&self, url: &Url) -> Result<String, CrawlError> {
        self.fetcher
            .fetch(url)
            .await
            .map(|result| result.body)
            .map_err(|e| CrawlError::Manifest {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
