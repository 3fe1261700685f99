//! Wishlist persistence.
//!
//! Every mutation is one statement against the `(user_id, product_id)` unique
//! key, so concurrent adds and merges for the same user cannot duplicate or
//! lose items.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use emporium_core::wishlist::WishlistItem;
use emporium_core::{ProductId, UserId};

use super::{RepositoryError, WishlistStore, bounded};

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl WishlistStore for WishlistRepository<'_> {
    async fn items(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        let rows = bounded(
            self.timeout,
            sqlx::query_as::<_, (i32, DateTime<Utc>)>(
                r"
                SELECT product_id, added_at
                FROM storefront.wishlist_item
                WHERE user_id = $1
                ORDER BY id
                ",
            )
            .bind(user_id.as_i32())
            .fetch_all(self.pool),
        )
        .await?;

        Ok(rows
            .into_iter()
            .map(|(product_id, added_at)| WishlistItem {
                product_id: ProductId::new(product_id),
                added_at,
            })
            .collect())
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        added_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        bounded(
            self.timeout,
            sqlx::query(
                r"
                INSERT INTO storefront.wishlist_item (user_id, product_id, added_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, product_id) DO NOTHING
                ",
            )
            .bind(user_id.as_i32())
            .bind(product_id.as_i32())
            .bind(added_at)
            .execute(self.pool),
        )
        .await?;
        Ok(())
    }

    async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        bounded(
            self.timeout,
            sqlx::query(
                "DELETE FROM storefront.wishlist_item WHERE user_id = $1 AND product_id = $2",
            )
            .bind(user_id.as_i32())
            .bind(product_id.as_i32())
            .execute(self.pool),
        )
        .await?;
        Ok(())
    }

    async fn merge_items(
        &self,
        user_id: UserId,
        items: &[WishlistItem],
    ) -> Result<(), RepositoryError> {
        if items.is_empty() {
            return Ok(());
        }
        let product_ids: Vec<i32> = items.iter().map(|i| i.product_id.as_i32()).collect();
        let added_at: Vec<DateTime<Utc>> = items.iter().map(|i| i.added_at).collect();

        // Rows are inserted in the order given so new items append in client order
        bounded(
            self.timeout,
            sqlx::query(
                r"
                INSERT INTO storefront.wishlist_item (user_id, product_id, added_at)
                SELECT $1, u.product_id, u.added_at
                FROM UNNEST($2::int4[], $3::timestamptz[]) WITH ORDINALITY
                     AS u(product_id, added_at, ord)
                ORDER BY u.ord
                ON CONFLICT (user_id, product_id)
                DO UPDATE SET added_at = LEAST(wishlist_item.added_at, EXCLUDED.added_at)
                ",
            )
            .bind(user_id.as_i32())
            .bind(&product_ids)
            .bind(&added_at)
            .execute(self.pool),
        )
        .await?;
        Ok(())
    }
}
