//! Connection registry.
//!
//! Owns every named connection of one application instance and drives their
//! connect/close lifecycle together. Published connections are never removed.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult, ConnectionFailure};
use common::models::connection::{ConnectionConfig, ConnectionHandle};
use futures::future::join_all;

use crate::connection::Connection;
use crate::connector::{Connector, SqlxConnector};

/// Restartable snapshot of the registered connection handles.
///
/// Enumeration order is unspecified.
#[derive(Debug, Clone, Default)]
pub struct ConnectionList {
    handles: Vec<ConnectionHandle>,
}

impl ConnectionList {
    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionHandle> {
        self.handles.iter()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl IntoIterator for ConnectionList {
    type Item = ConnectionHandle;
    type IntoIter = std::vec::IntoIter<ConnectionHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConnectionList {
    type Item = &'a ConnectionHandle;
    type IntoIter = std::slice::Iter<'a, ConnectionHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}

/// Manages the named connections of one application.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    default_timeout: Option<Duration>,
    /// Registered connections indexed by name.
    connections: RwLock<HashMap<String, Arc<Connection>>>,
}

impl ConnectionManager {
    /// Creates an empty registry that opens connections through `connector`.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            default_timeout: None,
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Registry using the sqlx/redis drivers and the configured default timeout.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(Arc::new(SqlxConnector::from_config(config)))
            .with_default_timeout(config.connect_timeout())
    }

    /// Sets the connect/close timeout used when a config does not carry one.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Registers a new, not yet connected, connection.
    ///
    /// # Errors
    /// - `InvalidConfig` if the config is unusable for its driver kind
    /// - `DuplicateConnection` if the derived name is taken; the registry is
    ///   left unchanged
    pub fn create(&self, config: ConnectionConfig) -> AppResult<Arc<Connection>> {
        config.check()?;
        let name = config.connection_name().to_string();

        // Check and insert under one write lock so concurrent callers cannot
        // both claim the same name.
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if connections.contains_key(&name) {
            return Err(AppError::DuplicateConnection(name));
        }
        let connection = Arc::new(Connection::new(
            config,
            Arc::clone(&self.connector),
            self.default_timeout,
        ));
        connections.insert(name.clone(), Arc::clone(&connection));
        drop(connections);

        tracing::info!(name = %name, db_type = %connection.config().db_type, "connection registered");
        Ok(connection)
    }

    /// Drops a connection that was registered but never published. Used to
    /// undo `create` when a later registration step fails.
    pub(crate) fn discard(&self, name: &str) {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_some() {
            tracing::debug!(name = %name, "connection registration rolled back");
        }
    }

    /// Gets a connection by name.
    pub fn get(&self, name: &str) -> Option<Arc<Connection>> {
        self.read().get(name).cloned()
    }

    /// Gets a connection by name or fails with `ConnectionNotFound`.
    pub fn require(&self, name: &str) -> AppResult<Arc<Connection>> {
        self.get(name)
            .ok_or_else(|| AppError::ConnectionNotFound(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All registered connections.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.read().values().cloned().collect()
    }

    /// Handles of all registered connections.
    pub fn list_connections(&self) -> ConnectionList {
        ConnectionList {
            handles: self
                .read()
                .keys()
                .map(|name| ConnectionHandle::new(name.as_str()))
                .collect(),
        }
    }

    /// Connects every registered connection concurrently.
    ///
    /// Waits for every attempt to settle. Connections that succeed stay open
    /// even when others fail.
    ///
    /// # Errors
    /// `ConnectionStartup` naming each connection that failed.
    pub async fn connect_all(&self) -> AppResult<()> {
        let connections = self.connections();
        tracing::info!(count = connections.len(), "connecting all connections");

        let failures = settle(&connections, |c| async move { c.connect().await }).await;
        if failures.is_empty() {
            tracing::info!(count = connections.len(), "all connections started");
            Ok(())
        } else {
            tracing::warn!(
                total = connections.len(),
                failed = failures.len(),
                "some connections failed to start"
            );
            Err(AppError::ConnectionStartup { failures })
        }
    }

    /// Closes every registered connection concurrently, best effort.
    ///
    /// # Errors
    /// `ConnectionShutdown` naming each connection whose close failed, after
    /// every close has been attempted.
    pub async fn close_all(&self) -> AppResult<()> {
        let connections = self.connections();
        tracing::info!(count = connections.len(), "closing all connections");

        let failures = settle(&connections, |c| async move { c.close().await }).await;
        if failures.is_empty() {
            tracing::info!(count = connections.len(), "all connections closed");
            Ok(())
        } else {
            tracing::warn!(
                total = connections.len(),
                failed = failures.len(),
                "some connections failed to close"
            );
            Err(AppError::ConnectionShutdown { failures })
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Connection>>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs `op` on every connection at once and collects the failures, sorted by name.
async fn settle<'a, F, Fut>(connections: &'a [Arc<Connection>], op: F) -> Vec<ConnectionFailure>
where
    F: Fn(&'a Connection) -> Fut,
    Fut: std::future::Future<Output = AppResult<()>> + 'a,
{
    let results = join_all(connections.iter().map(|c| {
        let fut = op(c.as_ref());
        async move { (c.name(), fut.await) }
    }))
    .await;

    let mut failures: Vec<ConnectionFailure> = results
        .into_iter()
        .filter_map(|(name, result)| result.err().map(|e| ConnectionFailure::new(name, e)))
        .collect();
    failures.sort_by(|a, b| a.name.cmp(&b.name));
    failures
}
