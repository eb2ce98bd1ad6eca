use crate::backoff::BackoffStrategy;
use crate::notifier::NotificationChannel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_URL_ENV: &str = "BULKGEN_API_URL";
pub const API_TOKEN_ENV: &str = "BULKGEN_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { common::DEFAULT_API_URL.to_string() }
fn default_timeout_secs() -> u64 { 30 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default)]
    pub backoff: BackoffStrategy,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_interval_ms() -> u64 { common::DEFAULT_POLL_INTERVAL_MS }
fn default_max_interval_ms() -> u64 { 60_000 }
fn default_page_size() -> u32 { common::DEFAULT_PAGE_SIZE }

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff: BackoffStrategy::default(),
            page_size: default_page_size(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms.max(self.interval_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    #[serde(default = "default_drafts_path")]
    pub path: PathBuf,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_drafts_path() -> PathBuf { user_path(common::USER_DRAFTS_PATH, common::DEFAULT_DRAFTS_PATH) }
fn default_ttl_hours() -> u64 { 72 }
fn default_debounce_ms() -> u64 { 500 }

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            path: default_drafts_path(),
            ttl_hours: default_ttl_hours(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl DraftsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub output: Option<PathBuf>,
}

fn default_log_level() -> String { "warn".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String { "UTC".to_string() }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { timezone: default_timezone() }
    }
}

impl DisplayConfig {
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        common::parse_timezone(&self.timezone)
            .with_context(|| format!("Invalid display.timezone in config: {}", self.timezone))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub drafts: DraftsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub notifications: Vec<NotificationChannel>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Detect file type by extension and load
    pub fn from_file(path: &Path) -> Result<Self> {
        let ext = path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "toml" => Self::from_toml_file(path),
            _ => Err(anyhow::anyhow!("Unsupported config file format. Use .yaml, .yml, or .toml")),
        }
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must load. Without one, the per-user file and then the
    /// system file are tried and defaults are used when neither exists.
    /// Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let candidates = [
                    user_path(common::USER_CONFIG_PATH, common::DEFAULT_CONFIG_PATH),
                    PathBuf::from(common::DEFAULT_CONFIG_PATH),
                ];
                match candidates.iter().find(|p| p.exists()) {
                    Some(path) => {
                        log::debug!("Using config file {:?}", path);
                        Self::from_file(path)?
                    }
                    None => Config::default(),
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(API_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.api.token = Some(token);
        }
    }
}

fn user_path(relative: &str, fallback: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(relative),
        None => PathBuf::from(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poller.interval(), Duration::from_secs(5));
        assert_eq!(config.poller.backoff, BackoffStrategy::Fixed);
        assert_eq!(config.poller.page_size, 20);
        assert_eq!(config.drafts.ttl(), Duration::from_secs(72 * 3600));
        assert!(config.notifications.is_empty());
    }

    #[test]
    fn test_yaml_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "api:\n  base_url: https://api.example.com/v1\npoller:\n  interval_ms: 2000\n  backoff: exponential\nnotifications:\n  - type: slack\n    webhook_url: https://hooks.slack.com/x"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com/v1");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.poller.interval_ms, 2000);
        assert_eq!(config.poller.backoff, BackoffStrategy::Exponential);
        assert_eq!(config.notifications.len(), 1);
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[display]\ntimezone = \"Europe/Paris\"\n\n[drafts]\nttl_hours = 1").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.display.timezone, "Europe/Paris");
        assert_eq!(config.drafts.ttl_hours, 1);
        assert_eq!(config.drafts.debounce_ms, 500);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            API_URL_ENV => Some("https://staging.example.com".to_string()),
            API_TOKEN_ENV => Some("secret".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "https://staging.example.com");
        assert_eq!(config.api.token.as_deref(), Some("secret"));

        config.apply_env_overrides(|_| Some(String::new()));
        assert_eq!(config.api.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_display_timezone() {
        let mut display = DisplayConfig::default();
        assert_eq!(display.tz().unwrap(), chrono_tz::Tz::UTC);
        display.timezone = "Europe/Berlin".to_string();
        assert_eq!(display.tz().unwrap(), chrono_tz::Europe::Berlin);
        display.timezone = "Mars/Olympus".to_string();
        assert!(display.tz().is_err());
    }

    #[test]
    fn test_max_interval_never_below_interval() {
        let poller = PollerConfig {
            interval_ms: 10_000,
            max_interval_ms: 1_000,
            ..PollerConfig::default()
        };
        assert_eq!(poller.max_interval(), Duration::from_secs(10));
    }
}
