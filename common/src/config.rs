//! Service configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in responses and logs.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory scanned by the connection booter.
    pub project_root: PathBuf,
    /// Pool size for network SQL drivers.
    pub max_connections: u32,
    /// Default per-connection connect/close timeout. `None` waits indefinitely.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "connection-service".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            project_root: PathBuf::from("."),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_secs: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// | variable | default |
    /// |---|---|
    /// | `SERVER_HOST` | `0.0.0.0` |
    /// | `SERVER_PORT` | `8081` |
    /// | `PROJECT_ROOT` | `.` |
    /// | `DB_MAX_CONNECTIONS` | `10` |
    /// | `DB_CONNECT_TIMEOUT_SECS` | unset |
    pub fn load_with_service(service_name: &str) -> Self {
        Self::from_lookup(service_name, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load_with_service`] but with an injectable lookup.
    pub fn from_lookup<F>(service_name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            service_name: service_name.to_string(),
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "SERVER_PORT").unwrap_or(defaults.port),
            project_root: lookup("PROJECT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.project_root),
            max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            connect_timeout_secs: parse_var(&lookup, "DB_CONNECT_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0),
        }
    }

    /// Default connect/close timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Address to bind the HTTP listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = AppConfig::from_lookup("svc", lookup_from(&[]));
        assert_eq!(config.service_name, "svc");
        assert_eq!(config.port, 8081);
        assert_eq!(config.max_connections, 10);
        assert!(config.connect_timeout().is_none());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = AppConfig::from_lookup(
            "svc",
            lookup_from(&[
                ("SERVER_PORT", "9000"),
                ("DB_MAX_CONNECTIONS", "not-a-number"),
                ("DB_CONNECT_TIMEOUT_SECS", "5"),
                ("PROJECT_ROOT", "/srv/app"),
            ]),
        );
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.connect_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.project_root, PathBuf::from("/srv/app"));
    }

    #[test]
    fn test_zero_timeout_means_none() {
        let config =
            AppConfig::from_lookup("svc", lookup_from(&[("DB_CONNECT_TIMEOUT_SECS", "0")]));
        assert!(config.connect_timeout_secs.is_none());
    }
}
