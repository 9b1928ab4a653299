//! Connection configuration models.
//!
//! Contains models for data-source connection registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::{AppError, AppResult};

/// Name given to a connection whose config does not carry one.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Database type enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// MySQL database.
    MySQL,
    /// PostgreSQL database.
    Postgres,
    /// SQLite database.
    SQLite,
    /// Redis key-value store.
    Redis,
}

impl DbType {
    /// Returns the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbType::MySQL => Some(3306),
            DbType::Postgres => Some(5432),
            DbType::SQLite => None,
            DbType::Redis => Some(6379),
        }
    }

    /// Whether the driver talks to a server (and therefore needs a host).
    pub fn is_network(&self) -> bool {
        !matches!(self, DbType::SQLite)
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbType::MySQL => write!(f, "mysql"),
            DbType::Postgres => write!(f, "postgres"),
            DbType::SQLite => write!(f, "sqlite"),
            DbType::Redis => write!(f, "redis"),
        }
    }
}

/// Options identifying one data source.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConnectionConfig {
    /// Connection name. Defaults to `"default"` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    /// Database type.
    #[serde(alias = "type")]
    pub db_type: DbType,
    /// Database host (required for mysql/postgres/redis).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Database port (uses the driver default if not specified).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Database username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Database password (never serialized back out).
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    /// Default database name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// SQLite file path (required for sqlite).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// Per-connection connect/close timeout, overriding the service default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

impl ConnectionConfig {
    /// Creates a bare config for the given driver.
    pub fn new(db_type: DbType) -> Self {
        Self {
            name: None,
            db_type,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            file_path: None,
            connect_timeout_secs: None,
        }
    }

    /// File-backed SQLite config.
    pub fn sqlite(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self::new(DbType::SQLite)
            .with_name(name)
            .with_file_path(file_path)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_file_path(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// The name this connection is registered under.
    pub fn connection_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONNECTION_NAME)
    }

    /// Port to use, falling back to the driver default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| self.db_type.default_port())
    }

    /// Checks the config is structurally usable for its driver kind.
    ///
    /// # Errors
    /// Returns `AppError::InvalidConfig` describing the first problem found.
    pub fn check(&self) -> AppResult<()> {
        self.validate()
            .map_err(|e| AppError::InvalidConfig(e.to_string()))?;

        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        match self.db_type {
            DbType::SQLite if blank(&self.file_path) => Err(AppError::InvalidConfig(format!(
                "{}: sqlite requires file_path",
                self.connection_name()
            ))),
            db_type if db_type.is_network() && blank(&self.host) => {
                Err(AppError::InvalidConfig(format!(
                    "{}: {} requires host",
                    self.connection_name(),
                    db_type
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Lifecycle state of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Created, not connected.
    Registered,
    /// Connect succeeded.
    Connected,
    /// Last connect or close attempt failed.
    Failed,
    /// Closed. Terminal.
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Registered => "registered",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Descriptor of where a connection can be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ToSchema)]
pub struct ConnectionHandle {
    /// Connection name.
    pub name: String,
    /// Binding key (`connections.<name>`).
    pub key: String,
}

impl ConnectionHandle {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: crate::keys::connection_key(&name),
            name,
        }
    }
}

/// Connection item for API responses (excludes sensitive data).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConnectionItem {
    /// Connection name.
    pub name: String,
    /// Binding key.
    pub key: String,
    /// Database type.
    pub db_type: DbType,
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Database host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Database port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Default database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// SQLite file path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// When the connection last connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}
