pub mod config;
pub mod operations;
pub mod schema;

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::config::DbConfig;
use crate::db::schema::{split_sql_statements, SCHEMA_VERSION, SQLITE_SCHEMA_SQL};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbInitError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        tracing::info!(path = %config.path.display(), "sqlite database ready");
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// `SELECT 1` with a timeout.
    pub async fn ping(&self) -> bool {
        let query = sqlx::query("SELECT 1").execute(&self.pool);
        matches!(tokio::time::timeout(HEALTH_CHECK_TIMEOUT, query).await, Ok(Ok(_)))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        let version = match sqlx::query_scalar::<_, String>(
            r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#,
        )
        .fetch_optional(&self.pool)
        .await
        {
            Ok(version) => version,
            // The metadata table comes from the script itself.
            Err(err) if is_missing_table(&err) => None,
            Err(err) => return Err(err),
        };

        if version.as_deref() == Some(SCHEMA_VERSION) {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for statement in split_sql_statements(SQLITE_SCHEMA_SQL) {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(version = SCHEMA_VERSION, "sqlite schema applied");
        Ok(())
    }
}

fn is_missing_table(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("no such table"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_table_counts_as_fresh_database() {
        assert!(!is_missing_table(&sqlx::Error::RowNotFound));
        assert!(!is_missing_table(&sqlx::Error::PoolTimedOut));
    }

    #[tokio::test]
    async fn missing_metadata_table_is_reported_as_such() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let err = sqlx::query(r#"SELECT "value" FROM "_db_metadata""#)
            .fetch_optional(&pool)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(is_missing_table(&err));
    }
}
