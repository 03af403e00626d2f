// ⚙️ Configuration - TOML file, environment overrides, defaults
//
// Precedence: environment variables (COUNTRIES_API, EXCHANGE_RATE_API, ...),
// then the TOML file, then defaults. The binaries load `.env` before
// overrides are applied.

use crate::engine::InvalidRecordPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub countries_url: String,
    pub rates_url: String,
    /// Per-request timeout for both feeds
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            countries_url:
                "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies"
                    .to_string(),
            rates_url: "https://open.er-api.com/v6/latest/USD".to_string(),
            timeout_secs: 10,
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("countries.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub cache_dir: PathBuf,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub invalid_records: InvalidRecordPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Every section is optional in the file.
///
/// ```rust
/// use country_ledger::config::AppConfig;
///
/// let config: AppConfig = toml::from_str(r#"
/// [sources]
/// timeout_secs = 5
/// "#).unwrap();
/// assert_eq!(config.sources.timeout_secs, 5);
/// assert_eq!(config.server.port, 3000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    pub database: DatabaseConfig,
    pub summary: SummaryConfig,
    pub refresh: RefreshConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides.
    /// Unparseable values are ignored and the previous value is kept.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (used by tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("COUNTRIES_API") {
            self.sources.countries_url = url;
        }
        if let Some(url) = lookup("EXCHANGE_RATE_API") {
            self.sources.rates_url = url;
        }
        if let Some(secs) = lookup("FETCH_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.sources.timeout_secs = secs;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("SUMMARY_CACHE_DIR") {
            self.summary.cache_dir = PathBuf::from(dir);
        }
        if let Some(policy) = lookup("INVALID_RECORDS").and_then(|v| v.parse().ok()) {
            self.refresh.invalid_records = policy;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.logging.format = format;
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.countries_url.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "sources.countries_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.sources.rates_url.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "sources.rates_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.sources.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "sources.timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
