//! Service configuration.
//!
//! The configuration is read from an optional TOML file and then overridden
//! by environment variables:
//!
//! | Variable             | Overrides                   |
//! |----------------------|-----------------------------|
//! | `PROMOTION_CONFIG`   | path of the TOML file       |
//! | `API_HOST`           | `server.host`               |
//! | `API_PORT`           | `server.port`               |
//! | `PROMOTION_STORE`    | `store.backend`             |
//! | `PROMOTION_DB_PATH`  | `store.sqlite_path`         |
//! | `CONFIG_SERVICE_URL` | `config_service.base_url`   |
//! | `LOG_FORMAT`         | `log_format`                |
//!
//! # Example TOML Configuration
//!
//! ```toml
//! log_format = "json"
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [store]
//! backend = "sqlite"
//! sqlite_path = "promotions.db"
//!
//! [config_service]
//! base_url = "http://localhost:8081/api/v1"
//! typed_snapshots = true
//!
//! [smoke_tests.probes]
//! production = ["https://prod.example.com/health"]
//! ```

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::debug;

use crate::server::ApiConfig;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "PROMOTION_CONFIG";

/// Default SQLite database file
pub const DEFAULT_SQLITE_PATH: &str = "promotions.db";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path:?}")]
    NotFound { path: PathBuf },

    #[error("Failed to read configuration file {path:?}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse configuration file: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{}'", other)),
        }
    }
}

/// Where promotion requests are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(format!("expected 'memory' or 'sqlite', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
        }
    }
}

/// Connection to the configuration service. Without a `base_url` the service
/// runs against an in-process configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigServiceConfig {
    pub base_url: Option<String>,
    /// Read typed, versioned snapshots instead of the plain key/value map
    pub typed_snapshots: bool,
}

impl Default for ConfigServiceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            typed_snapshots: true,
        }
    }
}

/// Probe URLs per target environment. Every probe must answer 2xx.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeTestConfig {
    pub probes: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Pending executions buffered by the background queue
    pub queue_capacity: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            queue_capacity: promotion_core::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Complete configuration of the promotion service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_format: LogFormat,
    pub server: ApiConfig,
    pub store: StoreConfig,
    pub config_service: ConfigServiceConfig,
    pub smoke_tests: SmokeTestConfig,
    pub execution: ExecutionConfig,
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file does not exist, cannot be read or
    /// does not match the expected structure.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {:?}", path);

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load the file named by `PROMOTION_CONFIG` (defaults when unset), then
    /// apply environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an explicit variable lookup.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Override file values with environment variables.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", &port, |v| {
                v.trim().parse::<u16>().map_err(|e| e.to_string())
            })?;
        }
        if let Some(backend) = lookup("PROMOTION_STORE") {
            self.store.backend = parse_value("PROMOTION_STORE", &backend, StoreBackend::from_str)?;
        }
        if let Some(path) = lookup("PROMOTION_DB_PATH") {
            self.store.sqlite_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("CONFIG_SERVICE_URL") {
            self.config_service.base_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.log_format = parse_value("LOG_FORMAT", &format, LogFormat::from_str)?;
        }
        Ok(())
    }
}

fn parse_value<T>(
    name: &str,
    value: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    parse(value).map_err(|reason| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
        reason,
    })
}
