//! Configuration management for the provider
//!
//! Sources, highest precedence first:
//! - Environment variables (`REDSHIFT__SECTION__KEY`)
//! - Config file named by the `REDSHIFT_PROVIDER_CONFIG` env var
//! - ./config/redshift-provider.{toml,yaml,json}
//! - Hardcoded defaults

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure for the provider
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub settle: SettleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProviderConfig {
    /// Load configuration from all sources and validate it.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("REDSHIFT_PROVIDER_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder.add_source(File::with_name("./config/redshift-provider").required(false));

        // Example: REDSHIFT__SETTLE__TIMEOUT_MS=60000
        builder = builder.add_source(
            Environment::with_prefix("REDSHIFT")
                .separator("__")
                .try_parsing(true),
        );

        let config: ProviderConfig = builder.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("connection.url", default_url())?
            .set_default("connection.max_connections", 4)?
            .set_default("connection.acquire_timeout_secs", 30)?
            .set_default("settle.initial_backoff_ms", 250)?
            .set_default("settle.max_backoff_ms", 2000)?
            .set_default("settle.backoff_multiplier", 2.0)?
            .set_default("settle.timeout_ms", 30_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.url.trim().is_empty() {
            return Err(ConfigError::Message(
                "connection.url must not be empty".to_string(),
            ));
        }

        if self.connection.max_connections == 0 {
            return Err(ConfigError::Message(
                "connection.max_connections must be > 0".to_string(),
            ));
        }

        if self.settle.initial_backoff_ms == 0 {
            return Err(ConfigError::Message(
                "settle.initial_backoff_ms must be > 0".to_string(),
            ));
        }

        if self.settle.max_backoff_ms < self.settle.initial_backoff_ms {
            return Err(ConfigError::Message(
                "settle.max_backoff_ms must be >= initial_backoff_ms".to_string(),
            ));
        }

        if self.settle.backoff_multiplier < 1.0 {
            return Err(ConfigError::Message(
                "settle.backoff_multiplier must be >= 1.0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Message(format!(
                "logging.format must be `pretty` or `json`, got `{}`",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: ProviderConfig = Self::set_defaults(Config::builder())?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;

        config.validate()?;

        Ok(config)
    }
}

fn default_url() -> String {
    "postgres://localhost:5439/dev".to_string()
}

/// Cluster connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// PostgreSQL-protocol URL of the cluster
    pub url: String,

    /// Max connections in pool
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: 4,
            acquire_timeout_secs: 30,
        }
    }
}

impl ConnectionConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Bounded poll used while a new database propagates to the catalog
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettleConfig {
    /// Delay before the second lookup
    pub initial_backoff_ms: u64,

    /// Upper bound for a single delay
    pub max_backoff_ms: u64,

    /// Growth factor between delays
    pub backoff_multiplier: f64,

    /// Total time to wait before giving up
    pub timeout_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 250,
            max_backoff_ms: 2000,
            backoff_multiplier: 2.0,
            timeout_ms: 30_000,
        }
    }
}

impl SettleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay to sleep after the given (zero-based) failed lookup
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(attempt as i32))
        .min(self.max_backoff_ms as f64);
        Duration::from_millis(delay_ms as u64)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level or filter directive: trace, debug, info, warn, error
    pub level: String,

    /// Log format: json or pretty
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = ProviderConfig::default();

        assert_eq!(config.connection.max_connections, 4);
        assert_eq!(config.connection.acquire_timeout().as_secs(), 30);
        assert_eq!(config.settle.initial_backoff_ms, 250);
        assert_eq!(config.settle.timeout().as_secs(), 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_settle_backoff() {
        let settle = SettleConfig::default();

        assert_eq!(settle.backoff_for_attempt(0).as_millis(), 250);
        assert_eq!(settle.backoff_for_attempt(1).as_millis(), 500);
        assert_eq!(settle.backoff_for_attempt(2).as_millis(), 1000);

        // Max backoff cap
        assert_eq!(settle.backoff_for_attempt(10).as_millis(), 2000);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ProviderConfig::default();

        config.connection.max_connections = 0;
        assert!(config.validate().is_err());
        config.connection.max_connections = 4;

        config.settle.max_backoff_ms = 10;
        assert!(config.validate().is_err());
        config.settle.max_backoff_ms = 2000;

        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
        config.logging.format = "json".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.toml");
        std::fs::write(
            &path,
            "[connection]\nurl = \"postgres://cluster:5439/admin\"\n\n[settle]\ntimeout_ms = 5000\n",
        )
        .unwrap();

        let config = ProviderConfig::from_file(&path).unwrap();
        assert_eq!(config.connection.url, "postgres://cluster:5439/admin");
        assert_eq!(config.connection.max_connections, 4);
        assert_eq!(config.settle.timeout_ms, 5000);
        assert_eq!(config.settle.initial_backoff_ms, 250);
        assert_eq!(config.logging.format, "pretty");
    }
}
