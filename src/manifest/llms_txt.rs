//! llms.txt parser
//!
//! ```text
//! # Project title
//! > One-line description
//!
//! ## Section
//! - Label: /docs/page
//! - [Label](https://example.com/docs/other): optional note
//! - /docs/bare
//! ```

use crate::url::{normalize_parsed, origin_join};
use url::Url;

/// One link listed in an llms.txt file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// `## Section` heading the entry appears under; `None` before the first
    pub section: Option<String>,

    /// Link label, when one was given
    pub label: Option<String>,

    /// Path or URL exactly as written
    pub path: String,
}

/// Parsed llms.txt document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmsTxt {
    pub title: Option<String>,
    pub description: Option<String>,
    pub entries: Vec<ManifestEntry>,
}

impl LlmsTxt {
    /// Parses llms.txt content
    ///
    /// Lines that are not a heading, a blockquote or a list item are ignored.
    pub fn parse(content: &str) -> Self {
        let mut doc = LlmsTxt::default();
        let mut section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();

            if let Some(heading) = line.strip_prefix("## ") {
                section = Some(heading.trim().to_string());
            } else if let Some(title) = line.strip_prefix("# ") {
                if doc.title.is_none() {
                    doc.title = Some(title.trim().to_string());
                }
            } else if let Some(quote) = line.strip_prefix('>') {
                if doc.description.is_none() {
                    doc.description = Some(quote.trim().to_string());
                }
            } else if let Some(item) = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
            {
                if let Some((label, path)) = parse_item(item.trim()) {
                    doc.entries.push(ManifestEntry {
                        section: section.clone(),
                        label,
                        path,
                    });
                }
            }
        }

        doc
    }

    /// Resolves entries against the manifest's origin, in order
    ///
    /// Entries that do not form a valid http(s) URL are dropped with a debug
    /// log.
    pub fn resolve(&self, manifest_url: &Url) -> Vec<Url> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let resolved = origin_join(manifest_url, &entry.path)
                    .and_then(|url| normalize_parsed(url).ok());
                if resolved.is_none() {
                    tracing::debug!("Ignoring llms.txt entry '{}'", entry.path);
                }
                resolved
            })
            .collect()
    }
}

/// Splits a list item into `(label, path)`
fn parse_item(item: &str) -> Option<(Option<String>, String)> {
    if item.is_empty() {
        return None;
    }

    // [Label](path) with an optional ": note"
    if let Some(rest) = item.strip_prefix('[') {
        let (label, after) = rest.split_once("](")?;
        let (path, _) = after.split_once(')')?;
        let path = first_token(path)?;
        let label = label.trim();
        let label = (!label.is_empty()).then(|| label.to_string());
        return Some((label, path));
    }

    // "Label: path". A colon inside the URL itself (https://) has no space
    // after it, so splitting on ": " keeps bare URLs intact.
    if let Some((label, path)) = item.split_once(": ") {
        let label = label.trim();
        if !label.contains("://") {
            let path = first_token(path)?;
            let label = (!label.is_empty()).then(|| label.to_string());
            return Some((label, path));
        }
    }

    Some((None, first_token(item)?))
}

fn first_token(s: &str) -> Option<String> {
    s.split_whitespace().next().map(str::to_string)
}
