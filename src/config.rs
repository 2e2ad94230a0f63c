//! Service configuration loaded from TOML.
//!
//! Every section and key is optional; an empty file yields [`ServiceConfig::default`].
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! max_upload_bytes = 33554432
//!
//! [store]
//! backend = "sqlite"
//! path = "work-records.db"
//! busy_timeout_ms = 5000
//!
//! [ingestion]
//! parallel_parse = true
//! log_file = "ingest.log"
//! stderr = true
//! alert_at_or_above = "critical"
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ingestion::{
    CompositeObserver, FileObserver, IngestionObserver, IngestionOptions, IngestionSeverity, StdErrObserver,
};

const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage backend settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Ingestion and logging settings.
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl ServiceConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = fs::read(path.as_ref())?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.store.validate()?;
        self.ingestion.validate()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum upload body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Parsed bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let bind = self.bind.trim();
        if bind.is_empty() {
            return Err(ConfigError::Invalid("server bind address is empty".to_string()));
        }
        bind.parse()
            .map_err(|_| ConfigError::Invalid(format!("invalid server bind address: {bind}")))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        self.socket_addr().map(|_| ())
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

const fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

/// Store backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// SQLite database file (feature `sqlite`).
    Sqlite,
}

/// Store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.backend {
            StoreBackend::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid("memory store must not set path".to_string()));
                }
                Ok(())
            }
            StoreBackend::Sqlite => {
                if !cfg!(feature = "sqlite") {
                    return Err(ConfigError::Invalid(
                        "sqlite store requires the `sqlite` cargo feature".to_string(),
                    ));
                }
                match self.path.as_deref() {
                    Some(p) if !p.as_os_str().is_empty() => Ok(()),
                    _ => Err(ConfigError::Invalid("sqlite store requires path".to_string())),
                }
            }
        }
    }
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Ingestion and logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestionConfig {
    /// Parse rows in parallel.
    #[serde(default = "default_true")]
    pub parallel_parse: bool,
    /// CSV delimiter for CSV uploads.
    #[serde(default = "default_csv_delimiter")]
    pub csv_delimiter: char,
    /// Append ingestion events to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Log ingestion events to stderr.
    #[serde(default = "default_true")]
    pub stderr: bool,
    /// Failures at or above this severity raise an alert.
    #[serde(default = "default_alert_severity")]
    pub alert_at_or_above: IngestionSeverity,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            parallel_parse: true,
            csv_delimiter: default_csv_delimiter(),
            log_file: None,
            stderr: true,
            alert_at_or_above: default_alert_severity(),
        }
    }
}

impl IngestionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.csv_delimiter.is_ascii() || self.csv_delimiter.is_ascii_alphanumeric() {
            return Err(ConfigError::Invalid(format!(
                "csv_delimiter must be an ascii punctuation or whitespace character, got {:?}",
                self.csv_delimiter
            )));
        }
        Ok(())
    }

    /// Build [`IngestionOptions`] with the configured observers attached.
    pub fn to_options(&self) -> IngestionOptions {
        let mut observers: Vec<Arc<dyn IngestionObserver>> = Vec::new();
        if self.stderr {
            observers.push(Arc::new(StdErrObserver));
        }
        if let Some(path) = &self.log_file {
            observers.push(Arc::new(FileObserver::new(path)));
        }
        let observer: Option<Arc<dyn IngestionObserver>> = match observers.len() {
            0 => None,
            1 => observers.pop(),
            _ => Some(Arc::new(CompositeObserver::new(observers))),
        };

        IngestionOptions {
            csv_delimiter: self.csv_delimiter as u8,
            parallel_parse: self.parallel_parse,
            observer,
            alert_at_or_above: self.alert_at_or_above,
            ..Default::default()
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_csv_delimiter() -> char {
    ','
}

const fn default_alert_severity() -> IngestionSeverity {
    IngestionSeverity::Critical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.server.bind, DEFAULT_BIND);
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(cfg.ingestion.parallel_parse);
        assert_eq!(cfg.ingestion.alert_at_or_above, IngestionSeverity::Critical);
    }

    #[test]
    fn observers_follow_logging_switches() {
        let quiet = IngestionConfig {
            stderr: false,
            ..Default::default()
        };
        assert!(quiet.to_options().observer.is_none());
        assert!(IngestionConfig::default().to_options().observer.is_some());
    }
}
