//! Database operations for the storefront.
//!
//! # Tables
//!
//! Read-only:
//! - `catalog.product`, `catalog.category` - Catalog maintained by the admin API
//! - `catalog.product_section` - Landing page section configuration
//! - `catalog.coupon` - Discount codes
//!
//! Read-write:
//! - `storefront.wishlist_item` - Persisted per-user wishlists
//!
//! # Store seams
//!
//! Services depend on the [`CatalogStore`], [`SectionStore`] and
//! [`WishlistStore`] traits rather than on `PgPool`, so they can be exercised
//! against in-memory stores in tests. The Postgres implementations live in
//! [`catalog`] and [`wishlist`]; every call they make is bounded by the
//! configured store timeout.
//!
//! # Migrations
//!
//! Migrations live in `migrations/` at the workspace root and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::catalog::{Category, Product};
use emporium_core::coupon::Coupon;
use emporium_core::rows::RowError;
use emporium_core::section::ProductSection;
use emporium_core::selection::{ProductFilter, ProductQuery};
use emporium_core::wishlist::WishlistItem;
use emporium_core::{ProductId, Slug, UserId};

pub mod catalog;
pub mod wishlist;

pub use catalog::CatalogRepository;
pub use wishlist::WishlistRepository;

/// Errors that can occur during database operations.
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

    /// The store did not answer within the configured bound.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<RowError> for RepositoryError {
    fn from(err: RowError) -> Self {
        Self::DataCorruption(err.to_string())
    }
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

/// Run a store call, failing with [`RepositoryError::Timeout`] if it takes
/// longer than `limit`.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| RepositoryError::Timeout(limit))?
        .map_err(RepositoryError::from)
}

/// Read access to products, categories and coupons.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Run a typed product query.
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;

    /// Count the products matching a filter, ignoring limit and offset.
    async fn count_products(&self, filter: &ProductFilter) -> Result<i64, RepositoryError>;

    /// Fetch products by id in any status. Order is unspecified and missing
    /// ids are simply absent from the result.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Fetch a product by slug in any status.
    async fn product_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError>;

    /// The subset of `ids` that exist in the catalog, in any status.
    async fn existing_product_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashSet<ProductId>, RepositoryError>;

    /// Active categories ordered by sort order, then name.
    async fn active_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// Look up a coupon by its normalized code.
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError>;
}

/// Read access to product section configuration.
#[async_trait]
pub trait SectionStore: Send + Sync {
    /// Active sections ordered by `(sort_order asc, created_at desc)`.
    ///
    /// `page` is `(limit, offset)`; `None` returns every active section.
    async fn active_sections(
        &self,
        page: Option<(u32, u32)>,
    ) -> Result<Vec<ProductSection>, RepositoryError>;

    async fn count_active_sections(&self) -> Result<i64, RepositoryError>;

    /// An active section by slug.
    async fn active_section_by_slug(
        &self,
        slug: &Slug,
    ) -> Result<Option<ProductSection>, RepositoryError>;
}

/// Persisted wishlists.
///
/// Mutations are single atomic statements; implementations must never read,
/// modify in memory and write back.
#[async_trait]
pub trait WishlistStore: Send + Sync {
    /// A user's items in insertion order.
    async fn items(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError>;

    /// Insert an item unless the product is already saved.
    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        added_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Delete an item if present.
    async fn remove_item(&self, user_id: UserId, product_id: ProductId)
    -> Result<(), RepositoryError>;

    /// Upsert items, keeping the earlier `added_at` for products already saved.
    async fn merge_items(
        &self,
        user_id: UserId,
        items: &[WishlistItem],
    ) -> Result<(), RepositoryError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_passes_through_result() {
        let value = bounded(Duration::from_secs(1), async { Ok::<_, sqlx::Error>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = bounded(Duration::from_secs(1), async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let limit = Duration::from_millis(20);
        let err = bounded(limit, async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RepositoryError::Timeout(d) if d == limit));
    }
}
