use crate::ConfigError;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use url::Url;

/// Include/exclude filter built from glob patterns
///
/// Patterns are matched against the URL path (`/docs/**`, `**/*.md`). A
/// pattern containing `://` is matched against the full URL instead. A
/// relative pattern such as `docs/**` is anchored at the root.
///
/// A URL passes when it matches at least one include pattern (or there are
/// none) and matches no exclude pattern.
///
/// # Examples
///
/// ```
/// use lrn_crawler::url::PatternFilter;
/// use url::Url;
///
/// let filter = PatternFilter::new(&["/docs/**".into()], &["**/changelog*".into()]).unwrap();
/// assert!(filter.matches(&Url::parse("https://x.test/docs/intro").unwrap()));
/// assert!(!filter.matches(&Url::parse("https://x.test/docs/changelog").unwrap()));
/// assert!(!filter.matches(&Url::parse("https://x.test/blog/post").unwrap()));
/// ```
#[derive(Debug, Clone)]
pub struct PatternFilter {
    include: Option<CompiledPatterns>,
    exclude: Option<CompiledPatterns>,
}

#[derive(Debug, Clone)]
struct CompiledPatterns {
    paths: GlobSet,
    urls: GlobSet,
}

impl CompiledPatterns {
    fn build(patterns: &[String]) -> Result<Option<Self>, ConfigError> {
        if patterns.is_empty() {
            return Ok(None);
        }

        let mut paths = GlobSetBuilder::new();
        let mut urls = GlobSetBuilder::new();

        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                return Err(ConfigError::InvalidPattern("empty pattern".to_string()));
            }

            if pattern.contains("://") {
                urls.add(compile(pattern)?);
            } else if pattern.starts_with('/') || pattern.starts_with('*') {
                paths.add(compile(pattern)?);
            } else {
                paths.add(compile(&format!("/{}", pattern))?);
            }
        }

        Ok(Some(Self {
            paths: paths
                .build()
                .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?,
            urls: urls
                .build()
                .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?,
        }))
    }

    fn is_match(&self, url: &Url) -> bool {
        self.paths.is_match(url.path()) || self.urls.is_match(url.as_str())
    }
}

fn compile(pattern: &str) -> Result<Glob, ConfigError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}

impl PatternFilter {
    /// Compiles include and exclude pattern lists
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: CompiledPatterns::build(include)?,
            exclude: CompiledPatterns::build(exclude)?,
        })
    }

    /// A filter that accepts every URL
    pub fn allow_all() -> Self {
        Self {
            include: None,
            exclude: None,
        }
    }

    /// Returns true if the URL passes the include and exclude lists
    pub fn matches(&self, url: &Url) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(url) {
                return false;
            }
        }

        match &self.exclude {
            Some(exclude) => !exclude.is_match(url),
            None => true,
        }
    }
}
