use crate::config::types::FileConfig;
use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Loads and parses a defaults file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use lrn_crawler::config::load_config;
///
/// let file = load_config(Path::new("crawler.toml")).unwrap();
/// println!("Rate: {:?}", file.crawler.rate);
/// ```
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses defaults from TOML text
pub fn parse_config(content: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Location of the per-user defaults file: `~/.lrn/crawler.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lrn").join("crawler.toml"))
}

/// Loads the per-user defaults file if it exists
///
/// A missing file yields empty defaults; a file that exists but does not
/// parse is an error.
pub fn load_default_config() -> Result<FileConfig, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Loading defaults from {}", path.display());
            load_config(&path)
        }
        _ => Ok(FileConfig::default()),
    }
}
