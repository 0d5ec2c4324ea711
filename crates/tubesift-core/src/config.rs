//! Configuration management for tubesift.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. The pipeline itself never reads raw
//! argument strings or environment variables; everything arrives through
//! this layer as typed values.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/tubesift/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Search query settings
    pub search: SearchSettings,
    /// Browser session and collection settings
    pub browser: BrowserSettings,
    /// Connection retry settings
    pub retry: RetrySettings,
    /// Record sink settings
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `TUBESIFT_QUERY`: Override the search query
    /// - `TUBESIFT_MAX_RESULTS`: Override the maximum result count
    /// - `TUBESIFT_BROWSERLESS_URL`: Override the remote CDP endpoint
    /// - `TUBESIFT_SHEET_ID`: Override the spreadsheet id
    /// - `TUBESIFT_SHEETS_TOKEN`: Override the spreadsheet API token
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        // Override from environment
        if let Ok(val) = std::env::var("TUBESIFT_QUERY") {
            if !val.is_empty() {
                tracing::debug!("Override search.query from env: {}", val);
                config.search.query = val;
            }
        }

        if let Ok(val) = std::env::var("TUBESIFT_MAX_RESULTS") {
            if let Ok(max) = val.parse() {
                config.search.max_results = max;
                tracing::debug!("Override search.max_results from env: {}", max);
            }
        }

        if let Ok(val) = std::env::var("TUBESIFT_BROWSERLESS_URL") {
            if !val.is_empty() {
                tracing::debug!("Override browser.remote_endpoint from env");
                config.browser.remote_endpoint = Some(val);
            }
        }

        if let Ok(val) = std::env::var("TUBESIFT_SHEET_ID") {
            if !val.is_empty() {
                config.storage.sheet_id = Some(val);
            }
        }

        if let Ok(val) = std::env::var("TUBESIFT_SHEETS_TOKEN") {
            if !val.is_empty() {
                config.storage.sheets_token = Some(val);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration before any browser work starts.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for a malformed remote endpoint
    /// or out-of-range numeric settings, and `ConfigError::MissingCredential`
    /// when the spreadsheet sink is selected without a token.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.search.query.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "search.query".to_string(),
                reason: "query must not be empty".to_string(),
            });
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.max_results".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if let Some(endpoint) = &self.browser.remote_endpoint {
            if !endpoint.starts_with("ws://") && !endpoint.starts_with("wss://") {
                return Err(ConfigError::InvalidValue {
                    field: "browser.remote_endpoint".to_string(),
                    reason: format!("expected a ws:// or wss:// URL, got '{endpoint}'"),
                });
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.storage.sheet_id.is_some() && self.storage.sheets_token.is_none() {
            return Err(ConfigError::MissingCredential {
                sink: "sheets".to_string(),
                reason: "storage.sheet_id is set but no API token is configured".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/tubesift/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "tubesift", "tubesift").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Search query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Search query string
    pub query: String,
    /// Maximum number of result cards to collect per run
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            query: "ChatGPT".to_string(),
            max_results: 50,
        }
    }
}

/// Browser session and collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Remote CDP websocket endpoint; `None` launches a local browser
    pub remote_endpoint: Option<String>,
    /// Run browser in headless mode (local launch only)
    pub headless: bool,
    /// Browser viewport width
    pub viewport_width: u32,
    /// Browser viewport height
    pub viewport_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Wait after a scroll step for new content to settle, in milliseconds
    pub scroll_settle_ms: u64,
    /// Consecutive scroll rounds with zero new cards before giving up
    pub max_stalled_rounds: u32,
    /// Hard wall-clock budget for a whole collection, in seconds
    pub collect_budget_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            remote_endpoint: None,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            navigation_timeout_secs: 30,
            scroll_settle_ms: 2000,
            max_stalled_rounds: 3,
            collect_budget_secs: 120,
        }
    }
}

/// Connection retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum connection attempts before giving up
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds (doubled per attempt)
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Record sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the JSON store
    pub json_path: Option<PathBuf>,
    /// Path of the CSV mirror
    pub csv_path: Option<PathBuf>,
    /// Spreadsheet id for the remote sink; `None` disables it
    pub sheet_id: Option<String>,
    /// Sheet (tab) name inside the spreadsheet
    pub sheet_name: String,
    /// API bearer token for the spreadsheet sink (never written back to disk)
    #[serde(skip)]
    pub sheets_token: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            json_path: Some(PathBuf::from("data/results.json")),
            csv_path: Some(PathBuf::from("data/results.csv")),
            sheet_id: None,
            sheet_name: "Sheet1".to_string(),
            sheets_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.search.query, "ChatGPT");
        assert_eq!(config.search.max_results, 50);
        assert!(config.browser.headless);
        assert!(config.browser.remote_endpoint.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.storage.sheet_name, "Sheet1");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[search]"));
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[retry]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.search.query, config.search.query);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        // Create a custom config
        let mut config = AppConfig::default();
        config.search.query = "rust tutorial".to_string();
        config.search.max_results = 10;

        config.save_to(&config_path).expect("save config");

        let loaded_contents = fs::read_to_string(&config_path).expect("read config file");
        let loaded: AppConfig = toml::from_str(&loaded_contents).expect("parse loaded config");

        assert_eq!(loaded.search.query, "rust tutorial");
        assert_eq!(loaded.search.max_results, 10);
    }

    #[test]
    fn test_save_creates_missing_directories() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        AppConfig::default()
            .save_to(&config_path)
            .expect("save into missing directory");
        assert!(config_path.exists());
    }

    #[test]
    fn test_partial_config() {
        // Partial TOML configs fill the rest from defaults
        let toml_str = r#"
[search]
query = "cooking"

[browser]
max_stalled_rounds = 5
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.search.query, "cooking");
        assert_eq!(config.browser.max_stalled_rounds, 5);
        // These should be defaults
        assert_eq!(config.search.max_results, 50);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = AppConfig::default();
        config.browser.remote_endpoint = Some("http://localhost:3000".to_string());

        let err = config.validate().expect_err("http endpoint should fail");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        config.browser.remote_endpoint = Some("ws://localhost:3000".to_string());
        config.validate().expect("ws endpoint should pass");
    }

    #[test]
    fn test_validate_requires_sheets_token() {
        let mut config = AppConfig::default();
        config.storage.sheet_id = Some("abc123".to_string());

        let err = config.validate().expect_err("sheet without token should fail");
        assert!(matches!(err, ConfigError::MissingCredential { .. }));

        config.storage.sheets_token = Some("token".to_string());
        config.validate().expect("sheet with token should pass");
    }

    #[test]
    fn test_validate_rejects_empty_query() {
        let mut config = AppConfig::default();
        config.search.query = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
