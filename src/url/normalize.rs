use crate::UrlError;
use url::Url;

/// Normalizes a URL into the form used as the crawl's identity key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Only `http` and `https` are accepted
/// 3. A host is required (the parser already lowercases it)
/// 4. Remove fragment (everything after #)
/// 5. Remove an empty query string (trailing ?)
///
/// Paths and query parameters are otherwise kept as written: documentation
/// sites routinely serve `/guide` and `/guide/` as different pages.
///
/// # Examples
///
/// ```
/// use lrn_crawler::url::normalize_url;
///
/// let url = normalize_url("https://DOCS.Example.com/guide?#intro").unwrap();
/// assert_eq!(url.as_str(), "https://docs.example.com/guide");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Returns the dedup key for a URL: its normalized string form
pub fn dedup_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    if key.query() == Some("") {
        key.set_query(None);
    }
    key.into()
}
