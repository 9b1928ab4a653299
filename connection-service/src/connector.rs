//! Driver seam: opens and closes the underlying pool for one connection.
//!
//! Supports MySQL, PostgreSQL and SQLite through sqlx and Redis through a
//! `redis` connection manager.

use async_trait::async_trait;
use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::connection::{ConnectionConfig, DbType};
use redis::aio::ConnectionManager as RedisConnectionManager;
use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions};
use sqlx::{MySqlPool, PgPool, SqlitePool};

/// Connection pool wrapper for different database types.
#[derive(Clone)]
pub enum DatabasePool {
    /// MySQL connection pool.
    MySQL(MySqlPool),
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    SQLite(SqlitePool),
    /// Redis connection manager.
    Redis(RedisConnectionManager),
}

impl DatabasePool {
    pub fn db_type(&self) -> DbType {
        match self {
            DatabasePool::MySQL(_) => DbType::MySQL,
            DatabasePool::Postgres(_) => DbType::Postgres,
            DatabasePool::SQLite(_) => DbType::SQLite,
            DatabasePool::Redis(_) => DbType::Redis,
        }
    }

    /// The SQLite pool, if this is one.
    pub fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            DatabasePool::SQLite(pool) => Some(pool),
            _ => None,
        }
    }
}

/// Opens and closes driver pools.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes the underlying resource for `config`.
    async fn open(&self, config: &ConnectionConfig) -> AppResult<DatabasePool>;

    /// Releases a pool previously returned by [`Connector::open`] for `config`.
    async fn close(&self, config: &ConnectionConfig, pool: DatabasePool) -> AppResult<()>;
}

/// Default connector backed by sqlx and redis.
pub struct SqlxConnector {
    max_connections: u32,
}

impl SqlxConnector {
    pub fn new(max_connections: u32) -> Self {
        Self { max_connections }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.max_connections)
    }
}

#[async_trait]
impl Connector for SqlxConnector {
    async fn open(&self, config: &ConnectionConfig) -> AppResult<DatabasePool> {
        match config.db_type {
            DbType::MySQL => {
                let url = mysql_url(config)?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::MySQL(pool))
            }
            DbType::Postgres => {
                let url = postgres_url(config)?;
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::Postgres(pool))
            }
            DbType::SQLite => {
                let url = sqlite_url(config)?;
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(&url)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::SQLite(pool))
            }
            DbType::Redis => {
                let url = redis_url(config)?;
                let client = redis::Client::open(url)
                    .map_err(|e| AppError::RedisConnection(e.to_string()))?;
                let manager = RedisConnectionManager::new(client)
                    .await
                    .map_err(|e| AppError::RedisConnection(e.to_string()))?;
                Ok(DatabasePool::Redis(manager))
            }
        }
    }

    async fn close(&self, _config: &ConnectionConfig, pool: DatabasePool) -> AppResult<()> {
        match pool {
            DatabasePool::MySQL(pool) => pool.close().await,
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::SQLite(pool) => pool.close().await,
            // The manager's multiplexed connection shuts down once the last clone drops.
            DatabasePool::Redis(manager) => drop(manager),
        }
        Ok(())
    }
}

// ============== URL Builders ==============

fn required<'a>(value: &'a Option<String>, what: &str, config: &ConnectionConfig) -> AppResult<&'a str> {
    value.as_deref().filter(|v| !v.trim().is_empty()).ok_or_else(|| {
        AppError::InvalidConfig(format!(
            "{}: {} requires {}",
            config.connection_name(),
            config.db_type,
            what
        ))
    })
}

fn mysql_url(config: &ConnectionConfig) -> AppResult<String> {
    let host = required(&config.host, "host", config)?;
    let port = config.effective_port().unwrap_or(3306);
    let username = config.username.as_deref().unwrap_or("root");
    let password = config.password.as_deref().unwrap_or("");
    let database = config.database.as_deref().unwrap_or("");

    Ok(format!(
        "mysql://{}:{}@{}:{}/{}",
        username, password, host, port, database
    ))
}

fn postgres_url(config: &ConnectionConfig) -> AppResult<String> {
    let host = required(&config.host, "host", config)?;
    let port = config.effective_port().unwrap_or(5432);
    let username = config.username.as_deref().unwrap_or("postgres");
    let password = config.password.as_deref().unwrap_or("");
    let database = config.database.as_deref().unwrap_or("postgres");

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        username, password, host, port, database
    ))
}

fn sqlite_url(config: &ConnectionConfig) -> AppResult<String> {
    let path = required(&config.file_path, "file_path", config)?;
    Ok(format!("sqlite:{}?mode=rwc", path))
}

fn redis_url(config: &ConnectionConfig) -> AppResult<String> {
    let host = required(&config.host, "host", config)?;
    let port = config.effective_port().unwrap_or(6379);

    match &config.password {
        Some(password) => Ok(format!("redis://:{}@{}:{}", password, host, port)),
        None => Ok(format!("redis://{}:{}", host, port)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_url_defaults() {
        let config = ConnectionConfig::new(DbType::MySQL)
            .with_name("m")
            .with_host("db.local");
        assert_eq!(mysql_url(&config).unwrap(), "mysql://root:@db.local:3306/");
    }

    #[test]
    fn test_postgres_url_defaults() {
        let config = ConnectionConfig::new(DbType::Postgres).with_host("pg");
        assert_eq!(
            postgres_url(&config).unwrap(),
            "postgres://postgres:@pg:5432/postgres"
        );
    }

    #[test]
    fn test_redis_url_with_password() {
        let mut config = ConnectionConfig::new(DbType::Redis).with_host("cache");
        config.password = Some("pw".into());
        assert_eq!(redis_url(&config).unwrap(), "redis://:pw@cache:6379");
    }

    #[test]
    fn test_sqlite_url_requires_path() {
        let config = ConnectionConfig::new(DbType::SQLite);
        assert!(matches!(sqlite_url(&config), Err(AppError::InvalidConfig(_))));
        let config = config.with_file_path("/tmp/a.db");
        assert_eq!(sqlite_url(&config).unwrap(), "sqlite:/tmp/a.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_sqlx_connector_sqlite_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.db");
        let config = ConnectionConfig::sqlite("lite", path.to_string_lossy());

        let connector = SqlxConnector::new(4);
        let pool = connector.open(&config).await.unwrap();
        assert_eq!(pool.db_type(), DbType::SQLite);
        sqlx::query("SELECT 1")
            .execute(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        connector.close(&config, pool).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_sqlx_connector_sqlite_bad_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.db");
        let config = ConnectionConfig::sqlite("lite", path.to_string_lossy());

        let result = SqlxConnector::new(1).open(&config).await;
        assert!(matches!(result, Err(AppError::DatabaseConnection(_))));
    }
}
