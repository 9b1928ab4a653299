//! Connection booter.
//!
//! Discovers connection artifacts under `<project_root>/connections/` and
//! registers each with the application. An artifact is a JSON-encoded
//! [`ConnectionConfig`] in a file named `*.connection.json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionConfig, ConnectionHandle};

use crate::application::Application;

/// Directory scanned for artifacts, relative to the project root.
pub const CONNECTIONS_DIR: &str = "connections";

/// File suffix of a connection artifact.
pub const ARTIFACT_SUFFIX: &str = ".connection.json";

pub struct ConnectionBooter {
    root: PathBuf,
}

impl ConnectionBooter {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Artifact paths, sorted. A missing directory yields none.
    pub async fn discover(&self) -> AppResult<Vec<PathBuf>> {
        let dir = self.root.join(CONNECTIONS_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %dir.display(), "no connections directory");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_artifact = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(ARTIFACT_SUFFIX));
            if is_artifact && entry.file_type().await?.is_file() {
                artifacts.push(path);
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Reads one artifact.
    ///
    /// # Errors
    /// `InvalidConfig` naming the file if it cannot be read or parsed.
    pub async fn load(path: &Path) -> AppResult<ConnectionConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Loads and checks every discovered artifact, in path order.
    ///
    /// # Errors
    /// - `InvalidConfig` naming the file for the first unusable artifact
    /// - `DuplicateConnection` if two artifacts derive the same name
    pub async fn load_all(&self) -> AppResult<Vec<(PathBuf, ConnectionConfig)>> {
        let mut seen = HashSet::new();
        let mut loaded = Vec::new();
        for path in self.discover().await? {
            let config = Self::load(&path).await?;
            config.check().map_err(|e| match e {
                AppError::InvalidConfig(msg) => {
                    AppError::InvalidConfig(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;
            let name = config.connection_name().to_string();
            if !seen.insert(name.clone()) {
                return Err(AppError::DuplicateConnection(name));
            }
            loaded.push((path, config));
        }
        Ok(loaded)
    }

    /// Registers every discovered artifact with `app`, in path order.
    ///
    /// All artifacts are loaded and checked before the first one is
    /// registered, so a bad artifact leaves `app` untouched.
    pub async fn boot(&self, app: &Application) -> AppResult<Vec<ConnectionHandle>> {
        let loaded = self.load_all().await?;
        if let Some((_, config)) = loaded
            .iter()
            .find(|(_, c)| app.connection_manager().has(c.connection_name()))
        {
            return Err(AppError::DuplicateConnection(
                config.connection_name().to_string(),
            ));
        }

        let mut handles = Vec::with_capacity(loaded.len());
        for (path, config) in loaded {
            let handle = app.connection(config)?;
            tracing::info!(file = %path.display(), name = %handle.name, "connection booted");
            handles.push(handle);
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, file: &str, body: &str) {
        let connections = dir.join(CONNECTIONS_DIR);
        std::fs::create_dir_all(&connections).unwrap();
        std::fs::write(connections.join(file), body).unwrap();
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let found = ConnectionBooter::new(dir.path()).discover().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.connection.json", "{}");
        write(dir.path(), "a.connection.json", "{}");
        write(dir.path(), "notes.txt", "ignored");
        write(dir.path(), "c.json", "{}");

        let found = ConnectionBooter::new(dir.path()).discover().await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.connection.json", "b.connection.json"]);
    }

    #[tokio::test]
    async fn test_load_bad_json_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.connection.json", "{ not json");
        let path = dir.path().join(CONNECTIONS_DIR).join("bad.connection.json");

        let err = ConnectionBooter::load(&path).await.unwrap_err();
        match err {
            AppError::InvalidConfig(msg) => assert!(msg.contains("bad.connection.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_load_all_checks_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.connection.json",
            r#"{"name":"a","type":"sqlite","file_path":"a.db"}"#,
        );
        write(dir.path(), "b.connection.json", r#"{"name":"b","type":"sqlite"}"#);

        let err = ConnectionBooter::new(dir.path()).load_all().await.unwrap_err();
        match err {
            AppError::InvalidConfig(msg) => {
                assert!(msg.contains("b.connection.json"));
                assert!(msg.contains("file_path"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_load_all_rejects_repeated_names() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{"name":"shared","type":"sqlite","file_path":"s.db"}"#;
        write(dir.path(), "a.connection.json", body);
        write(dir.path(), "b.connection.json", body);

        let err = ConnectionBooter::new(dir.path()).load_all().await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateConnection(name) if name == "shared"));
    }
}
