//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/aivis/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/aivis/` (~/.config/aivis/)
//! - Data: `$XDG_DATA_HOME/aivis/` (~/.local/share/aivis/)
//! - State/Logs: `$XDG_STATE_HOME/aivis/` (~/.local/state/aivis/)

use crate::error::{Error, Result};
use crate::types::DashboardFilter;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Backend API connection
    #[serde(default)]
    pub api: ApiConfig,

    /// Default dashboard filter
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Trend series options
    #[serde(default)]
    pub trends: TrendConfig,

    /// Query draft persistence
    #[serde(default)]
    pub drafts: DraftConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Backend base URL (e.g., `http://127.0.0.1:8000`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds for JSON endpoints
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Timeout in seconds for the same-day run lookup before a live query
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_api_timeout(),
            lookup_timeout_secs: default_lookup_timeout(),
        }
    }
}

impl ApiConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(Error::Config(format!(
                "api.base_url must start with http:// or https://, got {url}"
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.lookup_timeout_secs == 0 {
            return Err(Error::Config(
                "api.lookup_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Lookup timeout as a [`Duration`]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_lookup_timeout() -> u64 {
    5
}

/// Default dashboard filter values
#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    /// Look-back window in days
    #[serde(default = "default_days")]
    pub days: u32,

    /// Engine filter (None = all engines)
    #[serde(default)]
    pub engine: Option<String>,

    /// Maximum number of recent queries to fetch
    #[serde(default)]
    pub recent_limit: Option<u32>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            engine: None,
            recent_limit: None,
        }
    }
}

impl DashboardConfig {
    /// Build the filter object passed to every dashboard fetch.
    pub fn filter(&self) -> DashboardFilter {
        DashboardFilter {
            days: self.days,
            engine: self.engine.clone(),
        }
    }
}

fn default_days() -> u32 {
    30
}

/// Trend series configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TrendConfig {
    /// Calendar days (`MM-DD`) whose points are dropped from every trend
    #[serde(default)]
    pub excluded_days: Vec<String>,
}

impl TrendConfig {
    /// Parse `excluded_days` into `(month, day)` pairs.
    ///
    /// Entries that do not parse are skipped with a warning.
    pub fn excluded_month_days(&self) -> Vec<(u32, u32)> {
        self.excluded_days
            .iter()
            .filter_map(|entry| match parse_month_day(entry) {
                Some(md) => Some(md),
                None => {
                    tracing::warn!(entry = %entry, "Ignoring invalid trends.excluded_days entry");
                    None
                }
            })
            .collect()
    }
}

fn parse_month_day(entry: &str) -> Option<(u32, u32)> {
    let (month, day) = entry.trim().split_once('-')?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    if (1..=12).contains(&month) && (1..=31).contains(&day) {
        Some((month, day))
    } else {
        None
    }
}

/// Draft persistence configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DraftConfig {
    /// Days before a saved draft expires
    #[serde(default = "default_draft_ttl_days")]
    pub ttl_days: u64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_draft_ttl_days(),
        }
    }
}

impl DraftConfig {
    /// Draft TTL as a [`Duration`]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_days * 24 * 60 * 60)
    }
}

fn default_draft_ttl_days() -> u64 {
    7
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.api.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/aivis/config.toml` (~/.config/aivis/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("aivis").join("config.toml")
    }

    /// Returns the data directory path (for saved drafts)
    ///
    /// `$XDG_DATA_HOME/aivis/` (~/.local/share/aivis/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("aivis")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/aivis/` (~/.local/state/aivis/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("aivis")
    }

    /// Returns the saved query draft path
    ///
    /// `$XDG_DATA_HOME/aivis/query-draft.json`
    pub fn draft_path() -> PathBuf {
        Self::data_dir().join("query-draft.json")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/aivis/aivis.log` (~/.local/state/aivis/aivis.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("aivis.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.api.lookup_timeout(), Duration::from_secs(5));
        assert_eq!(config.dashboard.days, 30);
        assert!(config.dashboard.engine.is_none());
        assert!(config.trends.excluded_days.is_empty());
        assert_eq!(config.drafts.ttl_days, 7);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[api]
base_url = "https://metrics.example.com"
lookup_timeout_secs = 2

[dashboard]
days = 7
engine = "perplexity"
recent_limit = 50

[trends]
excluded_days = ["08-19", "bogus", "13-01"]

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.api.base_url, "https://metrics.example.com");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.api.lookup_timeout(), Duration::from_secs(2));

        let filter = config.dashboard.filter();
        assert_eq!(filter.days, 7);
        assert_eq!(filter.engine.as_deref(), Some("perplexity"));
        assert_eq!(config.dashboard.recent_limit, Some(50));

        assert_eq!(config.trends.excluded_month_days(), vec![(8, 19)]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_api_config_validation() {
        assert!(ApiConfig::default().validate().is_ok());

        let config = ApiConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ApiConfig {
            lookup_timeout_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("lookup_timeout_secs")));
    }

    #[test]
    fn test_load_from_rejects_invalid_api() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nbase_url = \"localhost\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_draft_ttl() {
        let config = DraftConfig { ttl_days: 1 };
        assert_eq!(config.ttl(), Duration::from_secs(86_400));
    }
}
