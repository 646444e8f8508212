//! URL to output-file mapping

use std::path::PathBuf;
use url::Url;

/// Extensions replaced by `.md`
const STRIPPED_EXTENSIONS: [&str; 4] = [".html", ".htm", ".md", ".txt"];

/// Maps a page URL to its markdown file, relative to the output directory
///
/// The query string is not part of the path, so URLs differing only by
/// query map to the same file.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lrn_crawler::storage::url_to_file_path;
///
/// let url = Url::parse("https://docs.example.com/guide/intro.html").unwrap();
/// assert_eq!(url_to_file_path(&url).to_str(), Some("guide/intro.md"));
///
/// let url = Url::parse("https://docs.example.com/").unwrap();
/// assert_eq!(url_to_file_path(&url).to_str(), Some("index.md"));
/// ```
pub fn url_to_file_path(url: &Url) -> PathBuf {
    let segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    let mut path = if segments.is_empty() {
        "index".to_string()
    } else {
        segments.join("/")
    };

    let lower = path.to_lowercase();
    if let Some(ext) = STRIPPED_EXTENSIONS.iter().find(|ext| lower.ends_with(*ext)) {
        path.truncate(path.len() - ext.len());
        if path.is_empty() || path.ends_with('/') {
            path.push_str("index");
        }
    }

    path.push_str(".md");
    PathBuf::from(path)
}
