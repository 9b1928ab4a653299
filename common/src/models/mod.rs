//! Shared data models.

pub mod connection;

pub use connection::{
    ConnectionConfig, ConnectionHandle, ConnectionItem, ConnectionState, DbType,
    DEFAULT_CONNECTION_NAME,
};
