use std::time::Duration;

use sqlx::migrate::MigrateError;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::migrations;

pub type DbPool = sqlx::SqlitePool;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] MigrateError),
}

pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Process-wide document store handle.
///
/// The pool is opened and migrated on the first call to [`Database::pool`] and released by
/// [`Database::close`] during shutdown.
pub struct Database {
    url: String,
    max_connections: u32,
    timeout_secs: u64,
    pool: OnceCell<DbPool>,
}

impl Database {
    pub fn new(url: impl Into<String>, max_connections: u32, timeout_secs: u64) -> Self {
        Self { url: url.into(), max_connections, timeout_secs, pool: OnceCell::new() }
    }

    pub async fn pool(&self) -> Result<&DbPool, DatabaseError> {
        self.pool
            .get_or_try_init(|| async {
                let pool =
                    connect_with_settings(&self.url, self.max_connections, self.timeout_secs)
                        .await
                        .map_err(DatabaseError::Connect)?;
                migrations::run_pending(&pool).await.map_err(DatabaseError::Migration)?;
                info!(
                    event_name = "system.database.connected",
                    correlation_id = "database",
                    "document store connection established"
                );
                Ok(pool)
            })
            .await
    }

    pub fn is_connected(&self) -> bool {
        self.pool.get().is_some_and(|pool| !pool.is_closed())
    }

    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            info!(
                event_name = "system.database.closed",
                correlation_id = "shutdown",
                "document store connection has closed"
            );
        }
    }
}

/// Names of the user tables ("collections") currently present in the store.
pub async fn collection_names(pool: &DbPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::{collection_names, Database};

    #[tokio::test]
    async fn pool_is_created_lazily_and_migrated_once() {
        let database = Database::new("sqlite::memory:", 1, 5);
        assert!(!database.is_connected());

        let first = database.pool().await.expect("first use connects").clone();
        let second = database.pool().await.expect("second use reuses the pool");
        assert!(database.is_connected());

        let names = collection_names(second).await.expect("list collections");
        assert_eq!(names, vec!["query_log".to_owned()]);

        database.close().await;
        assert!(first.is_closed());
        assert!(!database.is_connected());
    }

    #[tokio::test]
    async fn close_without_use_is_a_no_op() {
        let database = Database::new("sqlite::memory:", 1, 5);
        database.close().await;
        assert!(!database.is_connected());
    }

    #[tokio::test]
    async fn unreachable_store_reports_connect_error() {
        let database = Database::new("sqlite:///nonexistent-dir/shopbot.db", 1, 1);
        let error = database.pool().await.expect_err("missing directory cannot be opened");
        assert!(error.to_string().contains("database connection failed"));
    }
}
