//! TOML-based runtime configuration.
//!
//! # Responsibility
//! - Describe how to reach the external festival service.
//! - Name the on-device database file and the default log level.
//!
//! # Invariants
//! - Every key is optional; a missing file or section yields defaults.
//! - `validate()` must pass before a config is used to build a remote store.

use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use url::Url;

/// External service connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Sent as `client=` with every request; the service rejects unknown clients.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Local database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_file_name")]
    pub db_file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

/// Application configuration, usually read from `festpal.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FestpalConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/".to_string()
}
fn default_client_name() -> String {
    "festpal-rust".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    15_000
}
fn default_read_timeout_ms() -> u64 {
    10_000
}
fn default_db_file_name() -> String {
    "festpal.sqlite3".to_string()
}
fn default_level() -> String {
    default_log_level().to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_name: default_client_name(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file_name: default_db_file_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Configuration loading/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid { key, message } => write!(f, "invalid config `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl FestpalConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: FestpalConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file; a missing file yields validated defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(source) => Self::from_toml_str(&source),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.remote.base_url).map_err(|err| ConfigError::Invalid {
            key: "remote.base_url",
            message: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "remote.base_url",
                message: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        if self.remote.client_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "remote.client_name",
                message: "must not be empty".to_string(),
            });
        }
        if self.remote.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "remote.connect_timeout_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.remote.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "remote.read_timeout_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.storage.db_file_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "storage.db_file_name",
                message: "must not be empty".to_string(),
            });
        }
        normalize_level(&self.logging.level).map_err(|err| ConfigError::Invalid {
            key: "logging.level",
            message: err.to_string(),
        })?;
        Ok(())
    }
}
