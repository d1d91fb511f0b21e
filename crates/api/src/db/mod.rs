//! Order persistence.
//!
//! # Backends
//!
//! - [`PgOrderStore`] - `PostgreSQL`, used whenever `DATABASE_URL` is set
//! - [`MemoryOrderStore`] - process-local map for tests and local development
//!
//! Both enforce code uniqueness at insert time and persist transitions with
//! a compare-and-set on the order's previous status.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p orderflow-cli -- migrate
//! ```

pub mod memory;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryOrderStore;
pub use orders::PgOrderStore;

/// Errors raised by an order store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Another order already uses this code.
    #[error("order code already in use")]
    DuplicateCode,

    /// Constraint violation other than a code collision.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
