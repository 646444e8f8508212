//! Link extraction from converted markdown
//!
//! Three link forms are recognized:
//! - inline links `[text](target "title")` (images are skipped)
//! - autolinks `<https://example.com/page>`
//! - reference definitions `[id]: target`

use crate::url::{dedup_key, normalize_parsed, same_origin, PatternFilter};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

static INLINE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(!?)\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+["'][^"']*["'])?\s*\)"#)
        .expect("valid inline link regex")
});

static AUTOLINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(https?://[^>\s]+)>").expect("valid autolink regex"));

static REFERENCE_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^ {0,3}\[[^\]]+\]:\s*<?([^\s>]+)>?").expect("valid reference regex")
});

/// Extracts links from markdown, resolved against `base`
///
/// Results are http(s) only, fragment-stripped and de-duplicated, in the
/// order they appear in the document.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lrn_crawler::crawler::extract_links;
///
/// let base = Url::parse("https://docs.example.com/guide/").unwrap();
/// let links = extract_links("See [setup](setup#install) and <https://docs.example.com/faq>.", &base);
/// assert_eq!(links[0].as_str(), "https://docs.example.com/guide/setup");
/// assert_eq!(links[1].as_str(), "https://docs.example.com/faq");
/// ```
pub fn extract_links(markdown: &str, base: &Url) -> Vec<Url> {
    let mut found: Vec<(usize, &str)> = Vec::new();

    for caps in INLINE_LINK.captures_iter(markdown) {
        let is_image = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if let (false, Some(target)) = (is_image, caps.get(2)) {
            found.push((target.start(), target.as_str()));
        }
    }
    for caps in AUTOLINK.captures_iter(markdown) {
        if let Some(target) = caps.get(1) {
            found.push((target.start(), target.as_str()));
        }
    }
    for caps in REFERENCE_DEF.captures_iter(markdown) {
        if let Some(target) = caps.get(1) {
            found.push((target.start(), target.as_str()));
        }
    }

    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(|(_, target)| base.join(target).ok())
        .filter_map(|url| normalize_parsed(url).ok())
        .filter(|url| seen.insert(dedup_key(url)))
        .collect()
}

/// Decides which discovered links are followed
#[derive(Debug, Clone)]
pub struct LinkFilter {
    root: Url,
    patterns: PatternFilter,
}

impl LinkFilter {
    /// Keeps links on `root`'s origin that pass `patterns`
    pub fn new(root: Url, patterns: PatternFilter) -> Self {
        Self { root, patterns }
    }

    /// Returns true if the link should be crawled
    pub fn accepts(&self, url: &Url) -> bool {
        same_origin(&self.root, url) && self.patterns.matches(url)
    }

    /// Filters links, preserving order
    pub fn filter(&self, links: Vec<Url>) -> Vec<Url> {
        links.into_iter().filter(|url| self.accepts(url)).collect()
    }
}
