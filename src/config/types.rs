use crate::url::{host_of, normalize_url, PatternFilter};
use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Product token used for robots.txt matching
pub const CRAWLER_NAME: &str = "lrn-crawler";

/// Version advertised in the User-Agent header
pub const CRAWLER_VERSION: &str = "1.0";

/// Page describing the crawler, advertised in the User-Agent header
pub const CRAWLER_INFO_URL: &str = "https://github.com/lrn-dev/lrn";

/// Default requests per second
pub const DEFAULT_RATE: f64 = 2.0;

/// Formats the default User-Agent: `lrn-crawler/1.0 (+<info-url>)`
pub fn default_user_agent() -> String {
    format!("{}/{} (+{})", CRAWLER_NAME, CRAWLER_VERSION, CRAWLER_INFO_URL)
}

/// Defaults file loaded from TOML
///
/// Every field is optional; values present here are overridden by
/// command-line flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub crawler: CrawlerSection,
    #[serde(default)]
    pub fetch: FetchSection,
}

/// `[crawler]` section of the defaults file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlerSection {
    /// Requests per second
    pub rate: Option<f64>,

    /// Link-following depth below the manifest pages
    pub depth: Option<u32>,

    /// Output directory override
    #[serde(rename = "output-dir")]
    pub output_dir: Option<PathBuf>,

    /// Glob patterns a URL must match
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns a URL must not match
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Overall crawl deadline (seconds)
    #[serde(rename = "max-duration")]
    pub max_duration: Option<u64>,
}

/// `[fetch]` section of the defaults file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchSection {
    /// Base per-attempt timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[serde(rename = "max-retries")]
    pub max_retries: Option<u32>,

    /// Redirect hops followed before giving up
    #[serde(rename = "max-redirects")]
    pub max_redirects: Option<u32>,

    /// Response body ceiling (bytes)
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: Option<usize>,

    /// User-Agent header override
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,
}

/// HTTP behaviour of the fetcher
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout of the first attempt; attempt `n` gets `timeout * (n + 1)`
    pub timeout: Duration,

    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Redirect hops followed before `TooManyRedirects`
    pub max_redirects: u32,

    /// Hard ceiling on the response body size
    pub max_body_bytes: usize,

    /// Backoff base: attempt `n` waits `backoff_base * 2^n` plus jitter
    pub backoff_base: Duration,

    /// Upper bound of the random jitter added to each backoff
    pub max_jitter: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            max_retries: 3,
            max_redirects: 5,
            max_body_bytes: 1024 * 1024,
            backoff_base: Duration::from_millis(1000),
            max_jitter: Duration::from_millis(1000),
            user_agent: default_user_agent(),
        }
    }
}

/// Run configuration for one crawl invocation
///
/// Built once (defaults, then the TOML file, then CLI flags), validated, and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Manifest URL the crawl starts from
    pub seed_url: Url,

    /// Requests per second
    pub rate: f64,

    /// Link-following depth below the manifest pages (0 = manifest only)
    pub depth: u32,

    /// Output directory override
    pub output_dir: Option<PathBuf>,

    /// Include glob patterns
    pub include: Vec<String>,

    /// Exclude glob patterns
    pub exclude: Vec<String>,

    /// Resolve and report without writing anything
    pub dry_run: bool,

    /// Verbosity level (count of `-v`)
    pub verbose: u8,

    /// Suppress non-error output
    pub quiet: bool,

    /// Stop dequeuing once this much time has elapsed
    pub max_duration: Option<Duration>,

    /// HTTP behaviour
    pub fetch: FetchOptions,
}

impl CrawlOptions {
    /// Creates options with defaults for the given seed URL
    pub fn new(seed_url: &str) -> Result<Self, ConfigError> {
        let seed_url = normalize_url(seed_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", seed_url, e)))?;

        Ok(Self {
            seed_url,
            rate: DEFAULT_RATE,
            depth: 0,
            output_dir: None,
            include: Vec::new(),
            exclude: Vec::new(),
            dry_run: false,
            verbose: 0,
            quiet: false,
            max_duration: None,
            fetch: FetchOptions::default(),
        })
    }

    /// Applies values from a defaults file
    pub fn apply_file(&mut self, file: &FileConfig) {
        let crawler = &file.crawler;
        if let Some(rate) = crawler.rate {
            self.rate = rate;
        }
        if let Some(depth) = crawler.depth {
            self.depth = depth;
        }
        if crawler.output_dir.is_some() {
            self.output_dir = crawler.output_dir.clone();
        }
        self.include.extend(crawler.include.iter().cloned());
        self.exclude.extend(crawler.exclude.iter().cloned());
        if let Some(secs) = crawler.max_duration {
            self.max_duration = Some(Duration::from_secs(secs));
        }

        let fetch = &file.fetch;
        if let Some(ms) = fetch.timeout_ms {
            self.fetch.timeout = Duration::from_millis(ms);
        }
        if let Some(retries) = fetch.max_retries {
            self.fetch.max_retries = retries;
        }
        if let Some(redirects) = fetch.max_redirects {
            self.fetch.max_redirects = redirects;
        }
        if let Some(bytes) = fetch.max_body_bytes {
            self.fetch.max_body_bytes = bytes;
        }
        if let Some(agent) = &fetch.user_agent {
            self.fetch.user_agent = agent.clone();
        }
    }

    /// Resolves the output directory: the override, or
    /// `~/.lrn/crawled/<hostname>`
    pub fn resolved_output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }

        let host = host_of(&self.seed_url).unwrap_or_else(|| "unknown".to_string());
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lrn")
            .join("crawled")
            .join(host)
    }

    /// Compiles the include/exclude lists
    pub fn pattern_filter(&self) -> Result<PatternFilter, ConfigError> {
        PatternFilter::new(&self.include, &self.exclude)
    }
}
