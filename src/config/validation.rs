use crate::config::types::{CrawlOptions, FetchOptions};
use crate::ConfigError;
use std::time::Duration;

/// Validates a complete set of crawl options
pub fn validate(options: &CrawlOptions) -> Result<(), ConfigError> {
    validate_rate(options.rate)?;
    validate_fetch_options(&options.fetch)?;
    validate_seed(options)?;

    // Compiling the filter surfaces bad patterns before any network I/O
    options.pattern_filter()?;

    if options.max_duration == Some(Duration::ZERO) {
        return Err(ConfigError::Validation(
            "max_duration must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates the requests-per-second rate
fn validate_rate(rate: f64) -> Result<(), ConfigError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate must be a positive number of requests/sec, got {}",
            rate
        )));
    }
    Ok(())
}

/// Validates HTTP limits
fn validate_fetch_options(fetch: &FetchOptions) -> Result<(), ConfigError> {
    if fetch.timeout < Duration::from_millis(100) {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 100ms, got {}ms",
            fetch.timeout.as_millis()
        )));
    }

    if fetch.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 20, got {}",
            fetch.max_redirects
        )));
    }

    if fetch.max_body_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "max_body_bytes must be >= 1024, got {}",
            fetch.max_body_bytes
        )));
    }

    if fetch.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed URL
fn validate_seed(options: &CrawlOptions) -> Result<(), ConfigError> {
    let seed = &options.seed_url;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if seed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}
