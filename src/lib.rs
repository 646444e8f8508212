//! lrn-crawler: a polite documentation crawler
//!
//! This crate discovers a site's documentation pages from an `llms.txt`,
//! `llms-full.txt` or `sitemap.xml` manifest, fetches them under rate, redirect
//! and size limits, converts them to markdown and keeps incremental crawl
//! state on disk so repeated runs skip unchanged pages.

pub mod config;
pub mod crawler;
pub mod manifest;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported manifest: {url} (expected llms.txt, llms-full.txt or sitemap*.xml)")]
    UnsupportedManifest { url: String },

    #[error("Failed to load manifest {url}: {message}")]
    Manifest { url: String, message: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("TLS error for {url}: {message}")]
    Tls { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Too many redirects from {url}")]
    TooManyRedirects { url: String },

    #[error("Unsupported content type '{content_type}' for {url}")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Response too large for {url} (limit {limit} bytes)")]
    ResponseTooLarge { url: String, limit: usize },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CrawlError {
    /// HTTP statuses that are worth another attempt
    pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

    /// Returns true for failures that may succeed on a later attempt:
    /// timeouts, dropped connections and retryable HTTP statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => Self::RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{CrawlOptions, FetchOptions};
pub use crawler::{CrawlQueue, Fetcher, Orchestrator};
pub use manifest::ManifestType;
pub use state::PageState;
pub use storage::{CrawlMetadata, CrawlStorage, PageMeta};
pub use crate::url::{normalize_url, origin_of, same_origin};
