//! Shared building blocks for the connection registry service.
//!
//! - [`errors`]: error taxonomy and HTTP mapping
//! - [`config`]: environment-driven configuration
//! - [`keys`]: well-known binding keys
//! - [`models`]: connection configuration and state models
//! - [`response`]: JSON response envelope

pub mod config;
pub mod errors;
pub mod keys;
pub mod models;
pub mod response;

pub use errors::{AppError, AppResult, ConnectionFailure};
