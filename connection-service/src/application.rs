//! Host application.
//!
//! Owns the binding container, the connection registry and the lifecycle
//! observers, and forwards its own start/stop to the observers.

use std::any::Any;
use std::sync::Arc;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::keys;
use common::models::connection::{ConnectionConfig, ConnectionHandle};
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::booter::ConnectionBooter;
use crate::connector::Connector;
use crate::container::{Binding, Container};
use crate::lifecycle::{ConnectionLifeCycleManager, LifeCycleObserver};
use crate::manager::{ConnectionList, ConnectionManager};

/// Where the application is in its own lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationState {
    Created,
    Booted,
    Started,
    Stopped,
}

struct ObserverRegistration {
    group: String,
    observer: Arc<dyn LifeCycleObserver>,
}

/// Application hosting a connection registry.
pub struct Application {
    config: AppConfig,
    container: Container,
    connection_manager: Arc<ConnectionManager>,
    observers: Vec<ObserverRegistration>,
    /// Held for the whole of boot/start/stop so they never interleave.
    state: Mutex<ApplicationState>,
}

impl Application {
    /// Creates an application whose connections use the sqlx/redis drivers.
    pub fn new(config: AppConfig) -> Self {
        let manager = ConnectionManager::from_config(&config);
        Self::with_manager(config, manager)
    }

    /// Creates an application whose connections open through `connector`.
    pub fn with_connector(config: AppConfig, connector: Arc<dyn Connector>) -> Self {
        let manager = ConnectionManager::new(connector).with_default_timeout(config.connect_timeout());
        Self::with_manager(config, manager)
    }

    fn with_manager(config: AppConfig, manager: ConnectionManager) -> Self {
        let connection_manager = Arc::new(manager);
        let container = Container::with_binding(Binding::constant(
            keys::MANAGER,
            Arc::clone(&connection_manager),
        ));
        tracing::debug!(key = keys::MANAGER, "binding created for connection manager");

        let mut app = Self {
            config,
            container,
            connection_manager: Arc::clone(&connection_manager),
            observers: Vec::new(),
            state: Mutex::new(ApplicationState::Created),
        };
        app.lifecycle_observer(
            keys::LIFECYCLE_GROUP,
            Arc::new(ConnectionLifeCycleManager::new(connection_manager)),
        );
        app
    }

    /// Registers an observer. Observers start in registration order and
    /// stop in reverse.
    pub fn lifecycle_observer(&mut self, group: &str, observer: Arc<dyn LifeCycleObserver>) {
        tracing::debug!(group = group, "lifecycle observer registered");
        self.observers.push(ObserverRegistration {
            group: group.to_string(),
            observer,
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    /// Creates a connection and publishes it as `connections.<name>`, tagged
    /// `connection`. The binding looks the connection up by name on every
    /// resolve.
    ///
    /// # Errors
    /// - `InvalidConfig` or `DuplicateConnection` from the registry
    /// - `DuplicateBinding` if the key is already bound
    ///
    /// On error neither the registry nor the container is changed.
    pub fn connection(&self, config: ConnectionConfig) -> AppResult<ConnectionHandle> {
        let connection = self.connection_manager.create(config)?;
        let handle = ConnectionHandle::new(connection.name());

        let name = handle.name.clone();
        let manager = Arc::clone(&self.connection_manager);
        let binding = Binding::dynamic(handle.key.clone(), move || manager.get(&name))
            .tag(keys::TAG);
        if let Err(e) = self.container.add(binding) {
            self.connection_manager.discard(&handle.name);
            return Err(e);
        }

        tracing::debug!(key = %handle.key, "connection binding created");
        Ok(handle)
    }

    pub fn list_connections(&self) -> ConnectionList {
        self.connection_manager.list_connections()
    }

    /// Keys of all bindings carrying `tag`, sorted.
    pub fn find_by_tag(&self, tag: &str) -> Vec<String> {
        self.container
            .find_by_tag(tag)
            .into_iter()
            .map(|b| b.key().to_string())
            .collect()
    }

    /// Resolves a binding.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> AppResult<Arc<T>> {
        self.container.get(key)
    }

    pub async fn state(&self) -> ApplicationState {
        *self.state.lock().await
    }

    /// Registers connection artifacts found under the project root.
    /// Booting an already booted application does nothing.
    pub async fn boot(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.boot_locked(&mut state).await
    }

    async fn boot_locked(&self, state: &mut ApplicationState) -> AppResult<()> {
        if *state != ApplicationState::Created {
            return Ok(());
        }
        let booted = ConnectionBooter::new(&self.config.project_root)
            .boot(self)
            .await?;
        tracing::info!(count = booted.len(), "application booted");
        *state = ApplicationState::Booted;
        Ok(())
    }

    /// Boots if needed, then starts every observer in order.
    ///
    /// Calling it again re-runs the observers; connections already connected
    /// are left alone and failed ones are retried.
    ///
    /// # Errors
    /// The first observer failure. The application is still marked started,
    /// whatever connected stays connected.
    pub async fn start(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        self.boot_locked(&mut state).await?;

        *state = ApplicationState::Started;
        for registration in &self.observers {
            tracing::debug!(group = %registration.group, "starting observer");
            registration.observer.start().await?;
        }
        tracing::info!(service = %self.config.service_name, "application started");
        Ok(())
    }

    /// Stops every observer in reverse order. All observers are stopped even
    /// if one fails.
    ///
    /// # Errors
    /// The first observer failure, after all observers ran.
    pub async fn stop(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;

        let mut first_error = None;
        for registration in self.observers.iter().rev() {
            tracing::debug!(group = %registration.group, "stopping observer");
            if let Err(e) = registration.observer.stop().await {
                tracing::error!(group = %registration.group, error = %e, "observer failed to stop");
                first_error.get_or_insert(e);
            }
        }
        *state = ApplicationState::Stopped;
        tracing::info!(service = %self.config.service_name, "application stopped");

        first_error.map_or(Ok(()), Err)
    }

    /// Schema migration is not supported.
    pub async fn migrate_schema(&self) -> AppResult<()> {
        Err(AppError::NotImplemented("schema migration".to_string()))
    }
}
