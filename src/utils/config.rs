//! TOML-based configuration for the CaseCrafter client
//!
//! Configuration is read from `casecrafter.toml` when present and then
//! overridden by environment variables (a `.env` file is honoured via
//! `dotenvy`). Every field has a default, so a missing file is not an error.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `CASECRAFTER_API_BASE_URL` | `api.base_url` |
//! | `CASECRAFTER_CACHE_TTL_SECS` | `cache.ttl_secs` |
//! | `CASECRAFTER_POLL_INTERVAL_MS` | `polling.interval_ms` |
//! | `CASECRAFTER_POLL_MAX_ATTEMPTS` | `polling.max_attempts` |
//! | `CASECRAFTER_STORAGE_PATH` | `storage.path` |
//! | `CASECRAFTER_LOG_LEVEL` | `log_level` |

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Root configuration structure loaded from casecrafter.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub uploads: UploadConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            polling: PollingConfig::default(),
            storage: StorageConfig::default(),
            uploads: UploadConfig::default(),
            log_level: default_log_level(),
        }
    }
}

// ============= API Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST API root, including the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Cache Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched collection stays fresh
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ============= Polling Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound on status queries per poll; `None` or 0 polls until
    /// cancelled
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_max_attempts() -> Option<u32> {
    Some(150)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Effective attempt limit, with 0 lifting it the same way the
    /// environment override does
    pub fn attempt_limit(&self) -> Option<u32> {
        self.max_attempts.filter(|&max| max > 0)
    }
}

// ============= Storage Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Session file; defaults to `<config dir>/casecrafter/session.json`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("casecrafter")
                .join("session.json")
        })
    }
}

// ============= Upload Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10 MB
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "docx".to_string(), "txt".to_string()]
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

// ============= Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Environment variable '{0}' has an invalid value: {1}")]
    InvalidEnvVar(String, String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Config(err.to_string())
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            debug!("No config file at {:?}, using defaults", path);
            ClientConfig::default()
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CASECRAFTER_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(ttl) = lookup("CASECRAFTER_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_env("CASECRAFTER_CACHE_TTL_SECS", &ttl)?;
        }
        if let Some(interval) = lookup("CASECRAFTER_POLL_INTERVAL_MS") {
            self.polling.interval_ms = parse_env("CASECRAFTER_POLL_INTERVAL_MS", &interval)?;
        }
        if let Some(attempts) = lookup("CASECRAFTER_POLL_MAX_ATTEMPTS") {
            // 0 lifts the limit
            let attempts: u32 = parse_env("CASECRAFTER_POLL_MAX_ATTEMPTS", &attempts)?;
            self.polling.max_attempts = (attempts > 0).then_some(attempts);
        }
        if let Some(path) = lookup("CASECRAFTER_STORAGE_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("CASECRAFTER_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "api.base_url '{}' is not a valid URL: {}",
                self.api.base_url, e
            ))
        })?;

        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.uploads.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "uploads.allowed_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8000/api");
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.polling.interval(), Duration::from_secs(2));
        assert_eq!(config.polling.max_attempts, Some(150));
        assert_eq!(config.uploads.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.uploads.allowed_extensions, vec!["pdf", "docx", "txt"]);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let content = r#"
log_level = "debug"

[api]
base_url = "https://qa.example.com/api"

[polling]
interval_ms = 500
"#;
        let config: ClientConfig = toml::from_str(content).expect("Failed to parse config");

        assert_eq!(config.api.base_url, "https://qa.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.max_attempts, Some(150));
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_zero_attempts_in_file_lifts_limit() {
        let config: ClientConfig = toml::from_str("[polling]\nmax_attempts = 0\n").unwrap();
        assert_eq!(config.polling.attempt_limit(), None);
        assert_eq!(crate::polling::PollOptions::from(&config.polling).max_attempts, None);

        let config: ClientConfig = toml::from_str("[polling]\nmax_attempts = 4\n").unwrap();
        assert_eq!(config.polling.attempt_limit(), Some(4));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CASECRAFTER_API_BASE_URL", "http://api.internal:9000/api"),
            ("CASECRAFTER_CACHE_TTL_SECS", "60"),
            ("CASECRAFTER_POLL_MAX_ATTEMPTS", "0"),
            ("CASECRAFTER_STORAGE_PATH", "/tmp/session.json"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.base_url, "http://api.internal:9000/api");
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.polling.max_attempts, None);
        assert_eq!(
            config.storage.resolved_path(),
            PathBuf::from("/tmp/session.json")
        );
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env(|name| (name == "CASECRAFTER_CACHE_TTL_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref n, _) if n == "CASECRAFTER_CACHE_TTL_SECS"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.polling.interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.uploads.allowed_extensions.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.cache.ttl_secs, 300);
    }
}
