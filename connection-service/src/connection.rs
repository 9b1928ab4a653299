//! A single named data-source connection and its lifecycle state.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::errors::{AppError, AppResult};
use common::keys;
use common::models::connection::{ConnectionConfig, ConnectionItem, ConnectionState};
use tokio::sync::Mutex;

use crate::connector::{Connector, DatabasePool};

struct Status {
    state: ConnectionState,
    pool: Option<DatabasePool>,
    connected_at: Option<DateTime<Utc>>,
}

/// Live handle to one configured data source.
///
/// Created in [`ConnectionState::Registered`]; `connect` moves it to
/// `Connected` (or `Failed`), `close` moves it to `Closed`, which is terminal.
pub struct Connection {
    name: String,
    config: ConnectionConfig,
    connector: Arc<dyn Connector>,
    timeout: Option<Duration>,
    /// Serializes connect/close on this connection.
    op: Mutex<()>,
    status: RwLock<Status>,
}

impl Connection {
    /// Creates an unconnected connection. The per-connection timeout in
    /// `config` takes precedence over `default_timeout`; a timeout of 0
    /// seconds means no bound.
    pub fn new(
        config: ConnectionConfig,
        connector: Arc<dyn Connector>,
        default_timeout: Option<Duration>,
    ) -> Self {
        let timeout = match config.connect_timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => default_timeout,
        };
        Self {
            name: config.connection_name().to_string(),
            config,
            connector,
            timeout,
            op: Mutex::new(()),
            status: RwLock::new(Status {
                state: ConnectionState::Registered,
                pool: None,
                connected_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Binding key this connection is published under.
    pub fn key(&self) -> String {
        keys::connection_key(&self.name)
    }

    pub fn state(&self) -> ConnectionState {
        self.read().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Clone of the driver pool while connected.
    pub fn pool(&self) -> Option<DatabasePool> {
        self.read().pool.clone()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.read().connected_at
    }

    /// Establishes the underlying resource.
    ///
    /// Already-connected connections are left untouched. A failed or timed-out
    /// attempt leaves the connection `Failed` so a later call can retry it.
    ///
    /// # Errors
    /// `ConnectionClosed` once closed, otherwise whatever the connector (or the
    /// timeout) reported.
    pub async fn connect(&self) -> AppResult<()> {
        let _op = self.op.lock().await;

        match self.state() {
            ConnectionState::Connected => {
                tracing::debug!(name = %self.name, "already connected, skipping");
                return Ok(());
            }
            ConnectionState::Closed => return Err(AppError::ConnectionClosed(self.name.clone())),
            ConnectionState::Registered | ConnectionState::Failed => {}
        }

        let started = Instant::now();
        match self.bounded(self.connector.open(&self.config)).await {
            Ok(pool) => {
                {
                    let mut status = self.write();
                    status.state = ConnectionState::Connected;
                    status.pool = Some(pool);
                    status.connected_at = Some(Utc::now());
                }
                tracing::info!(
                    name = %self.name,
                    db_type = %self.config.db_type,
                    latency_ms = started.elapsed().as_millis() as u64,
                    "connection established"
                );
                Ok(())
            }
            Err(e) => {
                self.write().state = ConnectionState::Failed;
                tracing::warn!(name = %self.name, error = %e, "connection failed");
                Err(e)
            }
        }
    }

    /// Releases the underlying resource.
    ///
    /// A connection that never connected is marked `Closed` without I/O.
    /// A failed close leaves it `Failed`.
    pub async fn close(&self) -> AppResult<()> {
        let _op = self.op.lock().await;

        let pool = {
            let mut status = self.write();
            match status.state {
                ConnectionState::Closed => return Ok(()),
                ConnectionState::Connected => status.pool.take(),
                ConnectionState::Registered | ConnectionState::Failed => None,
            }
        };

        let Some(pool) = pool else {
            self.write().state = ConnectionState::Closed;
            tracing::debug!(name = %self.name, "closed without an open resource");
            return Ok(());
        };

        match self.bounded(self.connector.close(&self.config, pool)).await {
            Ok(()) => {
                let mut status = self.write();
                status.state = ConnectionState::Closed;
                status.connected_at = None;
                drop(status);
                tracing::info!(name = %self.name, "connection closed");
                Ok(())
            }
            Err(e) => {
                self.write().state = ConnectionState::Failed;
                tracing::warn!(name = %self.name, error = %e, "connection close failed");
                Err(e)
            }
        }
    }

    /// API view of this connection.
    pub fn to_item(&self) -> ConnectionItem {
        let status = self.read();
        ConnectionItem {
            name: self.name.clone(),
            key: self.key(),
            db_type: self.config.db_type,
            state: status.state,
            host: self.config.host.clone(),
            port: self.config.effective_port(),
            database: self.config.database.clone(),
            file_path: self.config.file_path.clone(),
            connected_at: status.connected_at,
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| AppError::Timeout(limit))?,
            None => fut.await,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Status> {
        self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Status> {
        self.status.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("db_type", &self.config.db_type)
            .field("state", &self.state())
            .finish()
    }
}
