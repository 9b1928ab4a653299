//! Lifecycle observers driven by the host application's start/stop.

use std::sync::Arc;

use async_trait::async_trait;
use common::errors::AppResult;

use crate::manager::ConnectionManager;

/// Receives the host application's lifecycle events.
#[async_trait]
pub trait LifeCycleObserver: Send + Sync {
    /// Called when the application transitions into the running state.
    async fn start(&self) -> AppResult<()>;

    /// Called when the application shuts down.
    async fn stop(&self) -> AppResult<()>;
}

/// Keeps every registered connection in step with the application lifecycle.
pub struct ConnectionLifeCycleManager {
    manager: Arc<ConnectionManager>,
}

impl ConnectionLifeCycleManager {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl LifeCycleObserver for ConnectionLifeCycleManager {
    /// Connects all connections concurrently; see [`ConnectionManager::connect_all`].
    async fn start(&self) -> AppResult<()> {
        self.manager.connect_all().await
    }

    /// Closes all connections concurrently; see [`ConnectionManager::close_all`].
    async fn stop(&self) -> AppResult<()> {
        self.manager.close_all().await
    }
}
