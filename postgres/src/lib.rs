//! `PostgreSQL` persistence for the Brigade order pipeline.
//!
//! This crate provides:
//!
//! - [`PostgresOrderStore`]: the chef's ledger (completed orders plus the
//!   processed-event dedup table) and the read side used by the HTTP layer
//! - [`PostgresMenu`]: price lookup and menu catalog
//! - [`connect`] / [`connect_with_retry`] / [`migrate`]: pool construction and
//!   idempotent schema setup
//!
//! # Example
//!
//! ```ignore
//! use brigade_postgres::{PostgresOrderStore, connect, migrate, PoolConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/restaurant", &PoolConfig::default()).await?;
//!     migrate(&pool).await?;
//!     let store = PostgresOrderStore::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod menu;
mod orders;

pub use menu::PostgresMenu;
pub use orders::{PostgresOrderStore, PostgresTransaction};

use brigade_core::ledger::StoreError;
use brigade_runtime::{RetryPolicy, retry_with_backoff};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connection pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Connection`] if the database cannot be reached.
pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Connection(format!("Failed to connect: {e}")))
}

/// Open a connection pool, retrying according to `policy`.
///
/// # Errors
///
/// Returns the last [`StoreError::Connection`] once every attempt has failed.
pub async fn connect_with_retry(
    database_url: &str,
    config: &PoolConfig,
    policy: &RetryPolicy,
) -> Result<PgPool, StoreError> {
    retry_with_backoff(policy, "postgres", || connect(database_url, config)).await
}

/// Create the schema if it does not exist.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Map a sqlx error onto the ledger's error type.
fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(err.to_string())
        }
        other => StoreError::Database(other.to_string()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
