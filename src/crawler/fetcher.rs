//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the crawler's User-Agent and Accept headers
//! - Manual redirect handling with a hop limit
//! - Retry logic with `Retry-After` support and exponential backoff
//! - Content-Type validation before the body is read
//! - Bounded, incremental body reads
//! - Error classification

use crate::config::FetchOptions;
use crate::url::normalize_parsed;
use crate::CrawlError;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, Response};
use std::error::Error as StdError;
use std::time::Duration;
use url::Url;

/// Accept header sent with every request
pub const ACCEPT_HEADER: &str =
    "text/html, text/markdown, text/plain, application/xhtml+xml, */*;q=0.8";

/// Longest `Retry-After` the fetcher will sleep for
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL originally requested
    pub requested_url: Url,

    /// URL after following redirects
    pub final_url: Url,

    /// HTTP status code of the final response
    pub status: u16,

    /// Headers of the final response
    pub headers: HeaderMap,

    /// Response body, decoded lossily as UTF-8
    pub body: String,

    /// Content-Type header value
    pub content_type: String,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled on the client so the fetcher can count hops and
/// re-resolve each `Location` itself.
///
/// # Example
///
/// ```
/// use lrn_crawler::config::FetchOptions;
/// use lrn_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&FetchOptions::default()).unwrap();
/// ```
pub fn build_http_client(options: &FetchOptions) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));

    Client::builder()
        .user_agent(options.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Single-URL HTTP client
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 3xx with Location | Follow, up to `max_redirects` hops |
/// | HTTP 429, 500, 502, 503, 504 | Retry, honoring `Retry-After` |
/// | Timeout / connection failure | Retry with backoff |
/// | Other 4xx / 5xx | Fail immediately |
/// | TLS / certificate error | Fail immediately |
/// | Disallowed Content-Type | Fail immediately |
/// | Body over the size ceiling | Fail immediately |
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    options: FetchOptions,
}

impl Fetcher {
    /// Creates a fetcher with its own HTTP client
    pub fn new(options: FetchOptions) -> Result<Self, CrawlError> {
        let client = build_http_client(&options)?;
        Ok(Self { client, options })
    }

    /// Returns the options this fetcher was built with
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetches a URL using the configured retry budget
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, CrawlError> {
        self.fetch_with_retries(url, self.options.max_retries).await
    }

    /// Fetches a URL with a single attempt
    ///
    /// Used where the caller owns retries, such as the crawl queue.
    pub async fn fetch_once(&self, url: &Url) -> Result<FetchResult, CrawlError> {
        self.fetch_with_retries(url, 0).await
    }

    /// Fetches a URL with an explicit retry budget
    ///
    /// `max_retries` counts retries after the first attempt, so a URL that
    /// always answers 503 is requested `max_retries + 1` times.
    pub async fn fetch_with_retries(
        &self,
        url: &Url,
        max_retries: u32,
    ) -> Result<FetchResult, CrawlError> {
        let mut current = url.clone();
        let mut redirects = 0u32;
        let mut attempt = 0u32;

        loop {
            let timeout = self.options.timeout * (attempt + 1);
            tracing::trace!("GET {} (attempt {}, timeout {:?})", current, attempt + 1, timeout);

            let response = match self
                .client
                .get(current.clone())
                .timeout(timeout)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let error = classify_request_error(&current, &e);
                    if error.is_transient() && attempt < max_retries {
                        let delay = self.backoff(attempt);
                        tracing::warn!(
                            "{}; retrying in {}ms (attempt {}/{})",
                            error,
                            delay.as_millis(),
                            attempt + 1,
                            max_retries
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            };

            let status = response.status();

            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                let Some(location) = location else {
                    return Err(CrawlError::HttpStatus {
                        url: current.to_string(),
                        status: status.as_u16(),
                    });
                };

                redirects += 1;
                if redirects > self.options.max_redirects {
                    return Err(CrawlError::TooManyRedirects {
                        url: url.to_string(),
                    });
                }

                let next = normalize_parsed(current.join(&location)?)?;
                tracing::debug!("Redirect {} -> {} ({})", current, next, status.as_u16());
                current = next;
                continue;
            }

            if CrawlError::RETRYABLE_STATUSES.contains(&status.as_u16()) {
                if attempt < max_retries {
                    let delay = retry_after(response.headers())
                        .unwrap_or_else(|| self.backoff(attempt));
                    tracing::warn!(
                        "HTTP {} for {}; retrying in {}ms (attempt {}/{})",
                        status.as_u16(),
                        current,
                        delay.as_millis(),
                        attempt + 1,
                        max_retries
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                return Err(CrawlError::HttpStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            if !status.is_success() {
                return Err(CrawlError::HttpStatus {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            return self.read_response(url, current, response).await;
        }
    }

    /// Validates the Content-Type and reads the body under the size ceiling
    async fn read_response(
        &self,
        requested_url: &Url,
        final_url: Url,
        mut response: Response,
    ) -> Result<FetchResult, CrawlError> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| mime::TEXT_PLAIN.to_string());

        if !is_allowed_content_type(&content_type) {
            return Err(CrawlError::UnsupportedContentType {
                url: final_url.to_string(),
                content_type,
            });
        }

        let limit = self.options.max_body_bytes;
        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                return Err(CrawlError::ResponseTooLarge {
                    url: final_url.to_string(),
                    limit,
                });
            }
        }

        let mut body: Vec<u8> = Vec::new();
        loop {
            let chunk = response.chunk().await.map_err(|e| CrawlError::Body {
                url: final_url.to_string(),
                message: e.to_string(),
            })?;

            let Some(chunk) = chunk else {
                break;
            };

            if body.len() + chunk.len() > limit {
                return Err(CrawlError::ResponseTooLarge {
                    url: final_url.to_string(),
                    limit,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchResult {
            requested_url: requested_url.clone(),
            final_url,
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
            content_type,
        })
    }

    /// Backoff before retry `attempt`: `base * 2^attempt` plus random jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.options.backoff_base.as_millis() as u64;
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt));
        let jitter_cap = self.options.max_jitter.as_millis() as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..jitter_cap)
        };
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}

/// Checks a Content-Type header against the allow-list
///
/// Accepted: `text/*`, `application/json`, `application/xml` and
/// `application/xhtml+*`. Parameters such as `charset` are ignored.
pub fn is_allowed_content_type(value: &str) -> bool {
    let Ok(parsed) = value.trim().parse::<mime::Mime>() else {
        return false;
    };

    if parsed.type_() == mime::TEXT {
        return true;
    }

    parsed.type_() == mime::APPLICATION
        && matches!(parsed.subtype().as_str(), "json" | "xml" | "xhtml")
}

/// Parses a `Retry-After` header given either as delta-seconds or as an
/// HTTP date
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    let delay = if let Ok(seconds) = value.parse::<u64>() {
        Duration::from_secs(seconds)
    } else {
        let date = chrono::DateTime::parse_from_rfc2822(value).ok()?;
        let delta = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        delta.to_std().unwrap_or(Duration::ZERO)
    };

    Some(delay.min(MAX_RETRY_AFTER))
}

/// Maps a reqwest send error onto the crawl error taxonomy
fn classify_request_error(url: &Url, error: &reqwest::Error) -> CrawlError {
    if error.is_timeout() {
        return CrawlError::Timeout {
            url: url.to_string(),
        };
    }

    if is_tls_error(error) {
        return CrawlError::Tls {
            url: url.to_string(),
            message: error_chain(error),
        };
    }

    if error.is_builder() {
        return CrawlError::InvalidInput(format!("{}: {}", url, error));
    }

    CrawlError::Network {
        url: url.to_string(),
        message: error_chain(error),
    }
}

/// Returns true if any error in the source chain is a TLS/certificate failure
fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = source {
        let message = err.to_string().to_lowercase();
        if message.contains("certificate")
            || message.contains("tls")
            || message.contains("ssl")
            || message.contains("handshake")
        {
            return true;
        }
        source = err.source();
    }
    false
}

/// Joins an error and its sources into one line
fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(err) = source {
        parts.push(err.to_string());
        source = err.source();
    }
    parts.join(": ")
}
