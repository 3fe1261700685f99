//! Database operations for the admin API.
//!
//! # Tables
//!
//! - `catalog.product` - Products (never hard-deleted; "delete" sets `inactive`)
//! - `catalog.category` - Category hierarchy
//! - `catalog.product_section` - Landing page section configuration
//! - `catalog.coupon` - Discount codes
//!
//! Every repository call is bounded by the configured store timeout. Unique
//! and foreign-key violations surface as [`RepositoryError::Conflict`].
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

pub mod categories;
pub mod coupons;
pub mod products;
pub mod sections;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::rows::RowError;

pub use categories::CategoryRepository;
pub use coupons::CouponRepository;
pub use products::{ProductListFilter, ProductRepository};
pub use sections::SectionRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug, cyclic hierarchy).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The input names a related row that does not exist.
    #[error("unknown {0}")]
    UnknownReference(String),

    /// The store did not answer within the configured bound.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<RowError> for RepositoryError {
    fn from(err: RowError) -> Self {
        Self::DataCorruption(err.to_string())
    }
}

/// Classify a failed write, reporting constraint violations as conflicts.
pub(crate) fn write_error(err: sqlx::Error, entity: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{entity} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(format!("{entity} references a missing row"));
        }
    }
    RepositoryError::Database(err)
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

/// Run a repository operation, failing with [`RepositoryError::Timeout`] if it
/// takes longer than `limit`. A transaction dropped on timeout rolls back.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| RepositoryError::Timeout(limit))?
}
