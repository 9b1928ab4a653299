//! Error types shared by the registry and its HTTP surface.
//!
//! Every failure is surfaced to the immediate caller (registration) or to the
//! lifecycle driver (start/stop). Nothing here retries.

use std::fmt;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// One named connection that failed during a lifecycle fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ConnectionFailure {
    /// Connection name.
    pub name: String,
    /// Underlying cause, rendered.
    pub cause: String,
}

impl ConnectionFailure {
    pub fn new(name: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.cause)
    }
}

/// Renders `a: x; b: y` for the aggregate variants.
fn join_failures(failures: &[ConnectionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application error taxonomy.
#[derive(Debug, Error)]
pub enum AppError {
    /// Connection configuration cannot be used for its driver kind.
    #[error("invalid connection config: {0}")]
    InvalidConfig(String),

    /// A connection with the derived name is already registered.
    #[error("connection '{0}' is already registered")]
    DuplicateConnection(String),

    /// A binding with this key already exists in the container.
    #[error("binding '{0}' already exists")]
    DuplicateBinding(String),

    /// No connection registered under this name.
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    /// No binding (or no resolvable value) under this key.
    #[error("binding '{0}' not found")]
    BindingNotFound(String),

    /// Driver-level failure opening or closing a SQL pool.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// Driver-level failure opening a Redis connection.
    #[error("redis connection error: {0}")]
    RedisConnection(String),

    /// A connect or close did not settle within its timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The connection was closed and cannot be reopened.
    #[error("connection '{0}' is closed")]
    ConnectionClosed(String),

    /// Aggregate failure of `start()`.
    #[error("failed to start {} connection(s): {}", .failures.len(), join_failures(.failures))]
    ConnectionStartup { failures: Vec<ConnectionFailure> },

    /// Aggregate failure of `stop()`.
    #[error("failed to close {} connection(s): {}", .failures.len(), join_failures(.failures))]
    ConnectionShutdown { failures: Vec<ConnectionFailure> },

    /// Capability intentionally left unimplemented.
    #[error("{0} is not implemented")]
    NotImplemented(String),

    /// Filesystem error while booting artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
            AppError::DuplicateBinding(_) => "DUPLICATE_BINDING",
            AppError::ConnectionNotFound(_) => "CONNECTION_NOT_FOUND",
            AppError::BindingNotFound(_) => "BINDING_NOT_FOUND",
            AppError::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            AppError::RedisConnection(_) => "REDIS_CONNECTION_ERROR",
            AppError::Timeout(_) => "TIMEOUT",
            AppError::ConnectionClosed(_) => "CONNECTION_CLOSED",
            AppError::ConnectionStartup { .. } => "CONNECTION_STARTUP_ERROR",
            AppError::ConnectionShutdown { .. } => "CONNECTION_SHUTDOWN_ERROR",
            AppError::NotImplemented(_) => "NOT_IMPLEMENTED",
            AppError::Io(_) => "IO_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateConnection(_)
            | AppError::DuplicateBinding(_)
            | AppError::ConnectionClosed(_) => StatusCode::CONFLICT,
            AppError::ConnectionNotFound(_) | AppError::BindingNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::DatabaseConnection(_)
            | AppError::RedisConnection(_)
            | AppError::ConnectionStartup { .. }
            | AppError::ConnectionShutdown { .. } => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Io(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Per-connection failures carried by the aggregate variants.
    pub fn failures(&self) -> &[ConnectionFailure] {
        match self {
            AppError::ConnectionStartup { failures } | AppError::ConnectionShutdown { failures } => {
                failures
            }
            _ => &[],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let body = match self.failures() {
            [] => ApiResponse::err(self.code(), self.to_string()),
            failures => ApiResponse::err_with_details(
                self.code(),
                self.to_string(),
                serde_json::to_value(failures).unwrap_or_default(),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_error_names_only_failures() {
        let err = AppError::ConnectionStartup {
            failures: vec![ConnectionFailure::new("B", "refused")],
        };
        assert_eq!(err.to_string(), "failed to start 1 connection(s): B: refused");
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.code(), "CONNECTION_STARTUP_ERROR");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::DuplicateConnection("a".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ConnectionNotFound("a".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::NotImplemented("schema migration".into()).status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn test_non_aggregate_has_no_failures() {
        assert!(AppError::Timeout(Duration::from_secs(3)).failures().is_empty());
    }
}
