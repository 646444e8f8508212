use url::Url;

/// Returns the origin (scheme + host + port) of a URL as a string
///
/// Default ports are omitted, so `https://example.com:443/` and
/// `https://example.com/` share an origin.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lrn_crawler::url::origin_of;
///
/// let url = Url::parse("https://docs.example.com/guide").unwrap();
/// assert_eq!(origin_of(&url), "https://docs.example.com");
///
/// let url = Url::parse("http://127.0.0.1:8080/llms.txt").unwrap();
/// assert_eq!(origin_of(&url), "http://127.0.0.1:8080");
/// ```
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Returns true when both URLs share scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Returns the lowercase host of a URL
pub fn host_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Builds the URL of a resource at the root of `url`'s origin
pub fn origin_join(url: &Url, path: &str) -> Option<Url> {
    Url::parse(&origin_of(url)).ok()?.join(path).ok()
}
