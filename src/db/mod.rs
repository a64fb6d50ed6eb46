//! Database module for gator.
//!
//! This module provides sqlx connectivity and migration management. The
//! backend is chosen at compile time with the `sqlite` (default) or
//! `postgres` feature; every query is written so it runs on both.

mod repository;
mod schema;
mod user;

pub use repository::UserRepository;
pub use schema::MIGRATIONS;
pub use user::{NewUser, User};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::datetime::to_db_timestamp;
use crate::{GatorError, Result};

/// Connection pool for the compiled-in backend.
#[cfg(feature = "sqlite")]
pub type DbPool = sqlx::SqlitePool;

/// Connection pool for the compiled-in backend.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type DbPool = sqlx::PgPool;

/// Database wrapper owning the pool and applying migrations.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open a database at the given connection URL.
    ///
    /// SQLite files are created on demand. Migrations are automatically
    /// applied.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        info!("Opening database at {}", redact_url(url));
        let pool = Self::connect(url, max_connections.max(1)).await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[cfg(feature = "sqlite")]
    async fn connect(url: &str, max_connections: u32) -> Result<DbPool> {
        use std::str::FromStr;

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        Ok(SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?)
    }

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    async fn connect(url: &str, max_connections: u32) -> Result<DbPool> {
        use sqlx::postgres::PgPoolOptions;

        Ok(PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?)
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool is pinned to a single connection that never expires, so
    /// every query sees the same in-memory database.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        use std::str::FromStr;

        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;
        let migrations = MIGRATIONS;

        if current_version as usize >= migrations.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            migrations.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     BIGINT PRIMARY KEY,
                applied_at  TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in migrations.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES ($1, $2)")
                .bind(version)
                .bind(to_db_timestamp(&Utc::now()))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            migrations.len()
        );
        Ok(())
    }

    /// Check if a table exists.
    #[cfg(feature = "sqlite")]
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Check if a table exists.
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

/// Parse an identifier column back into a UUID.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| GatorError::Database(format!("invalid id {raw:?}: {e}")))
}

/// Whether a sqlx error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Strip credentials from a connection URL before it is logged.
fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}
