//! # SQLite Entity Store
//!
//! Implements `NewsRepo` and `AccountRepo` on a single `sqlx` pool.
//! Referential behaviour (cascades, set-null on author deletion, unique
//! names) is declared in the schema and relies on `foreign_keys = ON`.

mod accounts;
mod news;

use std::str::FromStr;
use std::time::Duration;

use domains::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and applies pending migrations.
    ///
    /// `sqlite::memory:` databases live as long as their connection, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn connect(url: &str, max_connections: u32) -> domains::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(db_err)?;
        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| AppError::internal(format!("migration failed: {e}")))?;

        tracing::info!(%url, in_memory, "sqlite store ready");
        Ok(Self { pool })
    }

    /// An empty, migrated in-memory store.
    pub async fn in_memory() -> domains::Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Maps driver errors onto the domain taxonomy. Unique violations become
/// `Conflict`; everything else is an infrastructure failure.
pub(crate) fn db_err(err: sqlx::Error) -> AppError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return AppError::Conflict(db.message().to_string());
        }
    }
    tracing::error!(error = %err, "sqlite error");
    AppError::internal(err)
}
