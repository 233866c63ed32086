//! Configuration file discovery and writing.
//!
//! # Configuration File Format
//!
//! ```toml
//! citation_guide = "ou_harvard_cite_them_right_guide.md"
//!
//! [api_keys]
//! google_search = "your-google-api-key"
//! google_cx = "your-search-engine-id"
//! ncbi = "your-ncbi-api-key"
//! openai = "sk-..."
//!
//! [model]
//! name = "gpt-4o"
//! timeout_secs = 120
//!
//! [search]
//! max_candidates = 10
//! max_concurrent = 10
//!
//! [audit]
//! enabled = true
//! path = "logs/searches.jsonl"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! Any value can be overridden from the environment, e.g.
//! `CITATION_FINDER__MODEL__NAME=gpt-4o-mini`.

use std::path::{Path, PathBuf};

use super::Config;

const CONFIG_FILE_NAME: &str = "citation-finder.toml";

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Per-user configuration path, e.g. `~/.config/citation-finder/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("citation-finder").join("config.toml"))
}

/// Look for a config file in the working directory, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

/// Write a configuration to a TOML file, creating parent directories
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigFileError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
