//! Boots applications from a sandbox project directory against real SQLite files.

use std::path::Path;
use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppError;
use common::keys;
use common::models::connection::{ConnectionConfig, ConnectionState};
use connection_service::{Application, ApplicationState, Connection, ConnectionManager};
use tempfile::TempDir;

/// Sandbox with a `connections/` directory holding the given artifacts.
fn sandbox(artifacts: &[(&str, serde_json::Value)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let connections = dir.path().join("connections");
    std::fs::create_dir_all(&connections).unwrap();
    for (file, body) in artifacts {
        std::fs::write(connections.join(file), body.to_string()).unwrap();
    }
    dir
}

fn app_for(root: &Path) -> Application {
    Application::new(AppConfig {
        project_root: root.to_path_buf(),
        ..AppConfig::default()
    })
}

fn sqlite_artifact(root: &Path, name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "type": "sqlite",
        "file_path": root.join(format!("{name}.sqlite")).to_string_lossy(),
    })
}

#[tokio::test]
async fn boots_connections_when_app_starts() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = sqlite_artifact(dir.path(), "SQLite");
    let connections = dir.path().join("connections");
    std::fs::create_dir_all(&connections).unwrap();
    std::fs::write(
        connections.join("sqlite.connection.json"),
        artifact.to_string(),
    )
    .unwrap();

    let app = app_for(dir.path());
    app.start().await.unwrap();

    let bindings = app.find_by_tag(keys::TAG);
    assert_eq!(bindings, vec![format!("{}.SQLite", keys::PREFIX)]);

    let connection = app.get::<Connection>("connections.SQLite").unwrap();
    assert_eq!(connection.state(), ConnectionState::Connected);
    let pool = connection.pool().unwrap();
    sqlx::query("SELECT 1")
        .execute(pool.as_sqlite().unwrap())
        .await
        .unwrap();

    app.stop().await.unwrap();
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn boot_without_connections_dir_registers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(dir.path());
    app.start().await.unwrap();
    assert!(app.find_by_tag(keys::TAG).is_empty());
    assert!(app.list_connections().is_empty());
}

#[tokio::test]
async fn boot_rejects_unusable_artifact() {
    let dir = sandbox(&[(
        "broken.connection.json",
        serde_json::json!({ "name": "broken", "type": "sqlite" }),
    )]);
    let app = app_for(dir.path());
    let err = app.boot().await.unwrap_err();
    assert!(matches!(err, AppError::InvalidConfig(_)));
    assert!(app.list_connections().is_empty());
}

#[tokio::test]
async fn boot_rejects_duplicate_names_across_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let first = sqlite_artifact(dir.path(), "shared");
    let connections = dir.path().join("connections");
    std::fs::create_dir_all(&connections).unwrap();
    std::fs::write(connections.join("a.connection.json"), first.to_string()).unwrap();
    std::fs::write(connections.join("b.connection.json"), first.to_string()).unwrap();

    let app = app_for(dir.path());
    let err = app.boot().await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateConnection(name) if name == "shared"));
    assert!(app.list_connections().is_empty());
}

#[tokio::test]
async fn boot_succeeds_after_bad_artifact_is_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let connections = dir.path().join("connections");
    std::fs::create_dir_all(&connections).unwrap();
    std::fs::write(
        connections.join("a.connection.json"),
        sqlite_artifact(dir.path(), "a").to_string(),
    )
    .unwrap();
    std::fs::write(
        connections.join("b.connection.json"),
        serde_json::json!({ "name": "b", "type": "sqlite" }).to_string(),
    )
    .unwrap();

    let app = app_for(dir.path());
    assert!(matches!(app.boot().await, Err(AppError::InvalidConfig(_))));
    assert!(app.list_connections().is_empty());
    assert_eq!(app.state().await, ApplicationState::Created);

    std::fs::write(
        connections.join("b.connection.json"),
        sqlite_artifact(dir.path(), "b").to_string(),
    )
    .unwrap();
    app.start().await.unwrap();
    assert_eq!(app.list_connections().len(), 2);
    assert!(app.connection_manager().require("a").unwrap().is_connected());
    assert!(app.connection_manager().require("b").unwrap().is_connected());
    app.stop().await.unwrap();
}

#[tokio::test]
async fn boot_rejects_artifact_colliding_with_code_connection() {
    let dir = sandbox(&[]);
    let artifact = sqlite_artifact(dir.path(), "main");
    std::fs::write(
        dir.path().join("connections").join("main.connection.json"),
        artifact.to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("connections").join("other.connection.json"),
        sqlite_artifact(dir.path(), "other").to_string(),
    )
    .unwrap();

    let app = app_for(dir.path());
    let path = dir.path().join("code.sqlite").to_string_lossy().into_owned();
    app.connection(ConnectionConfig::sqlite("main", path)).unwrap();

    let err = app.boot().await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateConnection(name) if name == "main"));
    let names: Vec<_> = app.list_connections().iter().map(|h| h.name.clone()).collect();
    assert_eq!(names, vec!["main".to_string()]);
    assert!(app.container().contains("connections.main"));
    assert!(!app.container().contains("connections.other"));
}

#[tokio::test]
async fn manager_is_reachable_under_well_known_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(dir.path());
    let manager = app.get::<ConnectionManager>(keys::MANAGER).unwrap();
    assert!(Arc::ptr_eq(&manager, app.connection_manager()));
}

#[tokio::test]
async fn start_is_a_join_over_real_sqlite_files() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(dir.path());
    let path = |name: &str| dir.path().join(name).to_string_lossy().into_owned();

    app.connection(ConnectionConfig::sqlite("A", path("a.sqlite")))
        .unwrap();
    // Parent directory does not exist, so SQLite cannot create the file.
    app.connection(ConnectionConfig::sqlite("B", path("missing/b.sqlite")))
        .unwrap();
    app.connection(ConnectionConfig::sqlite("C", path("c.sqlite")))
        .unwrap();

    let err = app.start().await.unwrap_err();
    let failed: Vec<_> = err.failures().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["B"]);

    let manager = app.connection_manager();
    assert_eq!(manager.require("A").unwrap().state(), ConnectionState::Connected);
    assert_eq!(manager.require("B").unwrap().state(), ConnectionState::Failed);
    assert_eq!(manager.require("C").unwrap().state(), ConnectionState::Connected);

    app.stop().await.unwrap();
    for connection in manager.connections() {
        assert_eq!(connection.state(), ConnectionState::Closed);
    }
}

#[tokio::test]
async fn failed_connection_is_retried_on_next_start() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_for(dir.path());
    let late_dir = dir.path().join("late");
    let file = late_dir.join("db.sqlite").to_string_lossy().into_owned();
    app.connection(ConnectionConfig::sqlite("late", file)).unwrap();

    assert!(app.start().await.is_err());

    std::fs::create_dir_all(&late_dir).unwrap();
    app.start().await.unwrap();
    assert!(app.connection_manager().require("late").unwrap().is_connected());
    app.stop().await.unwrap();
}
