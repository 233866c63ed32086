//! Configuration management.
//!
//! A [`Config`] is built once at start-up and handed by reference to the
//! components that need credentials or endpoints.

mod file_config;

pub use file_config::{default_config_path, find_config_file, save_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on candidates evaluated (and pipelines run concurrently) per request
pub const MAX_FAN_OUT: usize = 10;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Base URLs of external services
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Language model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Fan-out settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Citation style guide passed to the model
    #[serde(default = "default_citation_guide")]
    pub citation_guide: PathBuf,

    /// Audit log settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            endpoints: Endpoints::default(),
            model: ModelConfig::default(),
            search: SearchConfig::default(),
            citation_guide: default_citation_guide(),
            audit: AuditConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Copy of this configuration with every secret replaced by `***`
    pub fn masked(&self) -> Self {
        let mask = |key: &Option<String>| key.as_ref().map(|_| "***".to_string());
        Self {
            api_keys: ApiKeys {
                google_search: mask(&self.api_keys.google_search),
                google_cx: mask(&self.api_keys.google_cx),
                ncbi: mask(&self.api_keys.ncbi),
                openai: mask(&self.api_keys.openai),
            },
            ..self.clone()
        }
    }
}

fn default_citation_guide() -> PathBuf {
    PathBuf::from("ou_harvard_cite_them_right_guide.md")
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Google Custom Search API key
    #[serde(default = "env_google_search", skip_serializing_if = "Option::is_none")]
    pub google_search: Option<String>,

    /// Google Programmable Search Engine ID
    #[serde(default = "env_google_cx", skip_serializing_if = "Option::is_none")]
    pub google_cx: Option<String>,

    /// NCBI E-utilities API key (optional, for higher rate limits)
    #[serde(default = "env_ncbi", skip_serializing_if = "Option::is_none")]
    pub ncbi: Option<String>,

    /// OpenAI API key
    #[serde(default = "env_openai", skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            google_search: env_google_search(),
            google_cx: env_google_cx(),
            ncbi: env_ncbi(),
            openai: env_openai(),
        }
    }
}

impl ApiKeys {
    /// No keys at all (used when writing a template config file)
    pub fn empty() -> Self {
        Self {
            google_search: None,
            google_cx: None,
            ncbi: None,
            openai: None,
        }
    }
}

fn env_google_search() -> Option<String> {
    std::env::var("GOOGLE_CUSTOM_SEARCH_API_KEY").ok()
}

fn env_google_cx() -> Option<String> {
    std::env::var("GOOGLE_CUSTOM_SEARCH_CX").ok()
}

fn env_ncbi() -> Option<String> {
    std::env::var("NCBI_API_KEY").ok()
}

fn env_openai() -> Option<String> {
    std::env::var("OPENAI_API_KEY").ok()
}

/// Base URLs of the search, literature and model APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_search_url")]
    pub search_url: String,

    #[serde(default = "default_efetch_url")]
    pub efetch_url: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            efetch_url: default_efetch_url(),
            openai_base_url: default_openai_base_url(),
        }
    }
}

fn default_search_url() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_efetch_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Language model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Chat model used for both citation generation and relevance checks
    #[serde(default = "default_model")]
    pub name: String,

    /// Per-call timeout in seconds (full article bodies make these calls slow)
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            timeout_secs: default_model_timeout(),
        }
    }
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_model_timeout() -> u64 {
    120
}

/// Candidate fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How many search results to evaluate
    #[serde(default = "default_max_fan_out")]
    pub max_candidates: usize,

    /// How many candidate pipelines may run at once
    #[serde(default = "default_max_fan_out")]
    pub max_concurrent: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_candidates: MAX_FAN_OUT,
            max_concurrent: MAX_FAN_OUT,
        }
    }
}

impl SearchConfig {
    /// Candidates per request, never more than [`MAX_FAN_OUT`]
    pub fn candidate_limit(&self) -> usize {
        self.max_candidates.min(MAX_FAN_OUT)
    }

    /// Concurrent pipelines, between 1 and [`MAX_FAN_OUT`]
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent.clamp(1, MAX_FAN_OUT)
    }
}

fn default_max_fan_out() -> usize {
    MAX_FAN_OUT
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether to write one record per request
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON lines file records are appended to
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_audit_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("logs/searches.jsonl")
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load configuration from a file, with `CITATION_FINDER__*` environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix("CITATION_FINDER").separator("__"))
        .build()?;

    settings.try_deserialize()
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.search.candidate_limit(), 10);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert!(config.audit.enabled);
        assert_eq!(
            config.citation_guide,
            PathBuf::from("ou_harvard_cite_them_right_guide.md")
        );
    }

    #[test]
    fn test_fan_out_is_capped() {
        let search = SearchConfig {
            max_candidates: 50,
            max_concurrent: 0,
        };
        assert_eq!(search.candidate_limit(), 10);
        assert_eq!(search.concurrency_limit(), 1);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
citation_guide = "/etc/citation-finder/guide.md"

[api_keys]
openai = "sk-test"

[model]
name = "gpt-4o-mini"

[search]
max_candidates = 5

[server]
port = 9000

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api_keys.openai.as_deref(), Some("sk-test"));
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.timeout_secs, 120);
        assert_eq!(config.search.candidate_limit(), 5);
        assert_eq!(config.search.concurrency_limit(), 10);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.citation_guide,
            PathBuf::from("/etc/citation-finder/guide.md")
        );
    }

    #[test]
    fn test_masked_hides_secrets() {
        let mut config = Config::default();
        config.api_keys.openai = Some("sk-secret".to_string());
        config.api_keys.ncbi = None;

        let masked = config.masked();
        assert_eq!(masked.api_keys.openai.as_deref(), Some("***"));
        assert!(masked.api_keys.ncbi.is_none());
        assert_eq!(masked.model.name, config.model.name);
    }
}
