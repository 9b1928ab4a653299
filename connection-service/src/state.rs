//! Application state for connection service.

use std::sync::Arc;

use crate::application::Application;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(app: Arc<Application>) -> Self {
        Self { app }
    }

    /// Service name reported in responses.
    pub fn service_name(&self) -> &str {
        &self.app.config().service_name
    }
}
