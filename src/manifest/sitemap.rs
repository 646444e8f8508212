//! sitemap.xml and sitemap index parsing

use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::io::Cursor;
use url::Url;

/// Locations found in one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<url><loc>` values of a `<urlset>`
    pub urls: Vec<Url>,

    /// `<sitemap><loc>` values of a `<sitemapindex>`
    pub children: Vec<Url>,
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Parses a sitemap or sitemap index with the streaming reader
///
/// Returns an error message if the document has neither a `<urlset>` nor a
/// `<sitemapindex>` root.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, String> {
    if !xml.contains("<urlset") && !xml.contains("<sitemapindex") {
        return Err("no <urlset> or <sitemapindex> element".to_string());
    }

    let mut doc = SitemapDocument::default();
    let mut errors = 0usize;

    for entity in SiteMapReader::new(Cursor::new(xml.as_bytes())) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    doc.urls.push(url);
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    doc.children.push(url);
                }
            }
            SiteMapEntity::Err(e) => {
                errors += 1;
                tracing::trace!("Sitemap entry error: {:?}", e);
            }
        }
    }

    if errors > 0 {
        tracing::debug!("Ignored {} malformed sitemap entries", errors);
    }

    Ok(doc)
}
