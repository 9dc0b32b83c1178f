//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tagtrack/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tagtrack/` (~/.config/tagtrack/)
//! - Data: `$XDG_DATA_HOME/tagtrack/` (~/.local/share/tagtrack/)
//! - State/Logs: `$XDG_STATE_HOME/tagtrack/` (~/.local/state/tagtrack/)

use crate::error::{Error, Result};
use crate::types::Variables;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environments the tag container is published to.
pub const ENVIRONMENTS: &[&str] = &["dev", "qa", "prod"];

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
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Account identity and tracker defaults
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Application and device facts reported with every event
    #[serde(default)]
    pub app: AppConfig,

    /// Queue drain and reachability timing
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Delivery channel endpoint
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Network reachability probe
    #[serde(default)]
    pub reachability: ReachabilityConfig,

    /// Durable store location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tag-management account identity plus tracker-wide variables
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// Account name (likely the company name)
    pub account: Option<String>,

    /// Profile associated with this application
    pub profile: Option<String>,

    /// One of `dev`, `qa`, `prod`
    pub environment: Option<String>,

    /// Title used for the automatic screen view fired on wake
    #[serde(default = "default_screen_title")]
    pub screen_title: String,

    /// Variables sent with every event (overridable per call)
    #[serde(default)]
    pub variables: Variables,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            account: None,
            profile: None,
            environment: None,
            screen_title: default_screen_title(),
            variables: Variables::new(),
        }
    }
}

fn default_screen_title() -> String {
    "main".to_string()
}

impl TrackerConfig {
    /// Validate the identity fields. Missing identity is fatal.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("tracker.account", &self.account),
            ("tracker.profile", &self.profile),
            ("tracker.environment", &self.environment),
        ];
        for (name, value) in required {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => {}
                _ => return Err(Error::Config(format!("{} is required", name))),
            }
        }

        let env = self.environment.as_deref().unwrap_or_default().trim();
        if !ENVIRONMENTS.contains(&env) {
            return Err(Error::Config(format!(
                "tracker.environment must be one of {:?}, got {:?}",
                ENVIRONMENTS, env
            )));
        }
        Ok(())
    }

    /// Account, profile and environment, once validated.
    pub fn identity(&self) -> Result<(&str, &str, &str)> {
        self.validate()?;
        Ok((
            self.account.as_deref().unwrap_or_default().trim(),
            self.profile.as_deref().unwrap_or_default().trim(),
            self.environment.as_deref().unwrap_or_default().trim(),
        ))
    }
}

/// Application facts. Anything left unset falls back to what the host reports.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct AppConfig {
    pub name: Option<String>,
    pub version: Option<String>,
    pub device: Option<String>,
    pub resolution: Option<String>,
    pub os_version: Option<String>,
    pub carrier: Option<String>,
    pub connection_type: Option<String>,
    pub orientation: Option<String>,
}

/// Dispatch queue timing
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Delay between two queue entries handed to the channel
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,

    /// Period of the reachability poll
    #[serde(default = "default_reachability_interval")]
    pub reachability_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval(),
            reachability_interval_ms: default_reachability_interval(),
        }
    }
}

impl DispatchConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn reachability_interval(&self) -> Duration {
        Duration::from_millis(self.reachability_interval_ms)
    }
}

fn default_flush_interval() -> u64 {
    200
}

fn default_reachability_interval() -> u64 {
    2000
}

/// Delivery channel configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Base URL of the tag container CDN
    #[serde(default = "default_channel_base_url")]
    pub base_url: String,

    /// Function invoked by every serialized command
    #[serde(default = "default_function_name")]
    pub function_name: String,

    /// Callback reference appended to every serialized command
    #[serde(default = "default_callback")]
    pub callback: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_channel_timeout")]
    pub timeout_secs: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: default_channel_base_url(),
            function_name: default_function_name(),
            callback: default_callback(),
            timeout_secs: default_channel_timeout(),
        }
    }
}

fn default_channel_base_url() -> String {
    "https://tags.tiqcdn.com/utag".to_string()
}

fn default_function_name() -> String {
    "utag.track".to_string()
}

fn default_callback() -> String {
    "function() {TaggerCallback.callback();}".to_string()
}

fn default_channel_timeout() -> u64 {
    10
}

/// Reachability probe target
#[derive(Debug, Deserialize, Clone)]
pub struct ReachabilityConfig {
    #[serde(default = "default_probe_host")]
    pub host: String,

    #[serde(default = "default_probe_port")]
    pub port: u16,

    #[serde(default = "default_probe_timeout")]
    pub timeout_ms: u64,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            host: default_probe_host(),
            port: default_probe_port(),
            timeout_ms: default_probe_timeout(),
        }
    }
}

fn default_probe_host() -> String {
    "tags.tiqcdn.com".to_string()
}

fn default_probe_port() -> u16 {
    443
}

fn default_probe_timeout() -> u64 {
    1500
}

/// Durable store location
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Override path for the store file
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Store file path, honoring `[storage] path`
    pub fn resolved_store_path(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(Self::store_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tagtrack/config.toml` (~/.config/tagtrack/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("tagtrack").join("config.toml")
    }

    /// Returns the data directory path (for the durable store)
    ///
    /// `$XDG_DATA_HOME/tagtrack/` (~/.local/share/tagtrack/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("tagtrack")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tagtrack/` (~/.local/state/tagtrack/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("tagtrack")
    }

    /// Returns the store file path
    ///
    /// `$XDG_DATA_HOME/tagtrack/store.db` (~/.local/share/tagtrack/store.db)
    pub fn store_path() -> PathBuf {
        Self::data_dir().join("store.db")
    }

    /// Returns the directory holding dated log files
    ///
    /// Same as [`Config::state_dir`]; files are named `tagtrack.log.<date>`.
    pub fn log_dir() -> PathBuf {
        Self::state_dir()
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(account: &str, profile: &str, environment: &str) -> TrackerConfig {
        TrackerConfig {
            account: Some(account.to_string()),
            profile: Some(profile.to_string()),
            environment: Some(environment.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dispatch.flush_interval_ms, 200);
        assert_eq!(config.dispatch.reachability_interval_ms, 2000);
        assert_eq!(config.channel.function_name, "utag.track");
        assert_eq!(config.tracker.screen_title, "main");
        assert!(config.tracker.account.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[tracker]
account = "acme"
profile = "mobile"
environment = "qa"
screen_title = "Home"

[tracker.variables]
brand = "acme"

[app]
name = "Shop"
version = "2.1.0"

[dispatch]
flush_interval_ms = 50

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.tracker.account.as_deref(), Some("acme"));
        assert_eq!(config.tracker.screen_title, "Home");
        assert_eq!(config.tracker.variables.get("brand").map(String::as_str), Some("acme"));
        assert_eq!(config.app.version.as_deref(), Some("2.1.0"));
        assert_eq!(config.dispatch.flush_interval_ms, 50);
        assert_eq!(config.dispatch.reachability_interval_ms, 2000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.tracker.validate().is_ok());
    }

    #[test]
    fn test_tracker_identity_required() {
        let config = TrackerConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tracker.account"));

        let config = TrackerConfig {
            account: Some("acme".to_string()),
            profile: Some("  ".to_string()),
            environment: Some("dev".to_string()),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tracker.profile"));
    }

    #[test]
    fn test_tracker_environment_must_be_known() {
        assert!(identity("acme", "mobile", "staging").validate().is_err());
        for env in ENVIRONMENTS {
            assert!(identity("acme", "mobile", env).validate().is_ok());
        }
    }

    #[test]
    fn test_identity_is_trimmed() {
        let config = identity(" acme ", "mobile", "prod");
        assert_eq!(config.identity().unwrap(), ("acme", "mobile", "prod"));
    }

    #[test]
    fn test_store_path_override() {
        let mut config = Config::default();
        assert!(config.resolved_store_path().ends_with("tagtrack/store.db"));

        config.storage.path = Some(PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.resolved_store_path(), PathBuf::from("/tmp/custom.db"));
    }
}
