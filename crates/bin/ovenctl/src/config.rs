//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `ovenctl.toml` in the working directory (or the path given on
//! the command line). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values. The
//! token is deliberately defaulted to empty: the websocket adapter reports
//! a configuration error the moment a command actually needs the cloud.

use std::time::Duration;

use serde::Deserialize;

use ovenctl_app::session::RetryPolicy;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cloud connection settings.
    pub connection: ConnectionConfig,
    /// Command retry settings.
    pub retry: RetryConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Recipe library settings.
    pub recipes: RecipesConfig,
}

/// Cloud channel configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Websocket endpoint of the appliance cloud.
    pub url: String,
    /// Account bearer token.
    pub token: String,
    /// Socket open deadline, seconds.
    pub connect_timeout_secs: u64,
    /// Per-command acknowledgement deadline, seconds.
    pub ack_timeout_secs: u64,
    /// Default device discovery window, seconds.
    pub discover_timeout_secs: u64,
}

/// Retry/backoff configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per command, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt, milliseconds.
    pub initial_backoff_ms: u64,
    /// Backoff ceiling, milliseconds.
    pub max_backoff_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Recipe library configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecipesConfig {
    /// Recipe document path. When unset, the conventional locations are
    /// searched (`recipes.toml`, then `~/.ovenctl/recipes.toml`).
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from the given TOML file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or a setting
    /// fails validation.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OVENCTL_URL") {
            self.connection.url = val;
        }
        if let Ok(val) = std::env::var("OVENCTL_TOKEN") {
            self.connection.token = val;
        }
        if let Ok(val) = std::env::var("OVENCTL_RECIPES") {
            self.recipes.path = Some(val);
        }
        if let Ok(val) = std::env::var("OVENCTL_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.connection.url.is_empty() {
            return Err(ConfigError::Validation(
                "connection.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry settings as the session's policy type.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    /// Default discovery window.
    #[must_use]
    pub fn discover_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.discover_timeout_secs)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "wss://devices.anovaculinary.io".to_string(),
            token: String::new(),
            connect_timeout_secs: 30,
            ack_timeout_secs: 10,
            discover_timeout_secs: 5,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "ovenctl=info,ovenctl_app=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.connection.url, "wss://devices.anovaculinary.io");
        assert!(config.connection.token.is_empty());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.connection.discover_timeout_secs, 5);
        assert!(config.recipes.path.is_none());
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [connection]
            url = 'wss://example.test'
            token = 'secret'
            discover_timeout_secs = 2

            [retry]
            max_attempts = 5
            initial_backoff_ms = 100
            max_backoff_ms = 2000

            [logging]
            filter = 'debug'

            [recipes]
            path = '/etc/ovenctl/recipes.toml'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.url, "wss://example.test");
        assert_eq!(config.connection.token, "secret");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.recipes.path.as_deref(), Some("/etc/ovenctl/recipes.toml"));
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [connection]
            token = 'secret'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.connection.token, "secret");
        assert_eq!(config.connection.url, "wss://devices.anovaculinary.io");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn should_reject_zero_retry_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_empty_url() {
        let mut config = Config::default();
        config.connection.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_convert_retry_settings_into_a_policy() {
        let config = Config::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
