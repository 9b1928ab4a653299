//! Well-known binding keys.
//!
//! Consumers of the registry address bindings with these keys verbatim.

/// Key of the connection manager itself.
pub const MANAGER: &str = "datasource.manager";

/// Key prefix for connection bindings (`connections.<name>`).
pub const PREFIX: &str = "connections";

/// Tag carried by every connection binding.
pub const TAG: &str = "connection";

/// Lifecycle group the registry's observer is registered in.
pub const LIFECYCLE_GROUP: &str = "datasource";

/// Binding key for the connection with the given name.
pub fn connection_key(name: &str) -> String {
    format!("{PREFIX}.{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_key() {
        assert_eq!(connection_key("SQLite"), "connections.SQLite");
    }
}
