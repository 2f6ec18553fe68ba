//! Sensorsrv configuration
//!
//! Loaded in layers: struct defaults, then the YAML file, then `SENSORSRV_*`
//! environment variables (`__` separates nested keys, e.g.
//! `SENSORSRV_API__PORT=9000`).

use errors::{config_error, MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ingest::PresencePolicy;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SENSORSRV";

/// Searched in order when no `--config` is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "config/sensorsrv/sensorsrv.yaml",
    "config/sensorsrv.yaml",
    "sensorsrv.yaml",
];

/// Sensor service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensorsrvConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file, created if missing
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/monitoring.db"),
            max_connections: common::sqlite::client::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When false, `/login` is not served and no route requires a token
    pub enabled: bool,
    /// HS256 signing secret
    pub jwt_secret: String,
    pub username: String,
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jwt_secret: "change-me-in-production".to_string(),
            username: "admin".to_string(),
            password: "password".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Treat a literal zero in any field as absent
    #[serde(default)]
    pub reject_zero_values: bool,
}

impl ValidationConfig {
    pub fn policy(&self) -> PresencePolicy {
        if self.reject_zero_values {
            PresencePolicy::Falsy
        } else {
            PresencePolicy::Presence
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Daily-rolling log files are written here when set
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

impl SensorsrvConfig {
    /// Load from an explicit file, or the first default path that exists.
    ///
    /// Not validated here: command-line overrides are applied first, then
    /// [`validate`](Self::validate).
    pub fn load(path: Option<&Path>) -> MonitorResult<Self> {
        let yaml_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(config_error!("Config file not found: {}", p.display()));
                }
                Some(p.to_path_buf())
            },
            None => DEFAULT_CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        common::load_layered(yaml_path.as_deref(), ENV_PREFIX)
    }

    /// Apply command-line overrides on top of the layered values
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        db: Option<PathBuf>,
        no_auth: bool,
    ) -> Self {
        if let Some(port) = port {
            self.api.port = port;
        }
        if let Some(db) = db {
            self.database.path = db;
        }
        if no_auth {
            self.auth.enabled = false;
        }
        self
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.api.port == 0 {
            return Err(MonitorError::Configuration(
                "api.port must be non-zero".to_string(),
            ));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(MonitorError::Configuration(
                "database.path must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(MonitorError::Configuration(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.auth.enabled && self.auth.jwt_secret.is_empty() {
            return Err(MonitorError::Configuration(
                "auth.jwt_secret is required when auth is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
