//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate. `Crawl-delay`
//! and `Sitemap` lines, which the matcher ignores, are collected here.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,

    /// Crawl-delay per lowercase user-agent token, in file order
    delays: Vec<(String, f64)>,

    /// Sitemap URLs advertised by the file
    sitemaps: Vec<String>,
}

impl ParsedRobots {
    /// Parses raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        let mut delays = Vec::new();
        let mut sitemaps = Vec::new();

        // Consecutive User-agent lines form one group; the first rule line
        // after them closes the list of agents.
        let mut group: Vec<String> = Vec::new();
        let mut group_has_rules = false;

        for line in content.lines() {
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if group_has_rules {
                        group.clear();
                        group_has_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_has_rules = true;
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay.is_finite() && delay >= 0.0 {
                            for agent in &group {
                                delays.push((agent.clone(), delay));
                            }
                        }
                    }
                }
                "sitemap" => {
                    // Not part of any group
                    if !value.is_empty() {
                        sitemaps.push(value.to_string());
                    }
                }
                _ => group_has_rules = true,
            }
        }

        Self {
            content: content.to_string(),
            delays,
            sitemaps,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt cannot be fetched or parsed.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns true if this rule set has no content
    pub fn is_permissive(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given product token
    ///
    /// `url` may be an absolute URL or a path such as `/page.html`.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_permissive() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay for a product token
    ///
    /// A group naming the token wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let agent = user_agent.to_lowercase();

        let specific = self
            .delays
            .iter()
            .find(|(ua, _)| ua != "*" && agent.contains(ua.as_str()))
            .map(|(_, d)| *d);

        specific.or_else(|| {
            self.delays
                .iter()
                .find(|(ua, _)| ua == "*")
                .map(|(_, d)| *d)
        })
    }

    /// Sitemap URLs listed in the file
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}
