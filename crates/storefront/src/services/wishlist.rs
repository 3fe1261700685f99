//! Wishlist Reconciler.
//!
//! Reads and mutates a user's persisted wishlist, and folds in the anonymous
//! wishlist a visitor built before signing in. The merge rule itself lives in
//! [`emporium_core::wishlist::merge`]; this service canonicalizes the client
//! list with it, drops products the catalog no longer has and hands the rest to
//! the store as one atomic upsert.

use chrono::{DateTime, Utc};
use thiserror::Error;

use emporium_core::wishlist::{Wishlist, WishlistItem, merge};
use emporium_core::{ProductId, UserId};

use crate::db::{CatalogStore, RepositoryError, WishlistStore};

/// Most items accepted in one reconciliation request.
pub const MAX_MERGE_ITEMS: usize = 500;

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The product to add does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// The anonymous list is larger than accepted.
    #[error("too many wishlist items (max {MAX_MERGE_ITEMS})")]
    TooManyItems,

    /// Store failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// An item from a client-side wishlist. `added_at` defaults to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonymousItem {
    pub product_id: ProductId,
    pub added_at: Option<DateTime<Utc>>,
}

/// Wishlist operations over a catalog and a wishlist store.
pub struct WishlistReconciler<'a, C: ?Sized, W: ?Sized> {
    catalog: &'a C,
    store: &'a W,
}

impl<'a, C, W> WishlistReconciler<'a, C, W>
where
    C: CatalogStore + ?Sized,
    W: WishlistStore + ?Sized,
{
    #[must_use]
    pub const fn new(catalog: &'a C, store: &'a W) -> Self {
        Self { catalog, store }
    }

    /// The persisted wishlist, empty if the user never saved anything.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the store fails.
    pub async fn get(&self, user_id: UserId) -> Result<Wishlist, WishlistError> {
        let items = self.store.items(user_id).await?;
        Ok(Wishlist { user_id, items })
    }

    /// Add a product. Adding a product already saved changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::ProductNotFound` if the product does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Wishlist, WishlistError> {
        let existing = self.catalog.existing_product_ids(&[product_id]).await?;
        if !existing.contains(&product_id) {
            return Err(WishlistError::ProductNotFound(product_id));
        }

        self.store.add_item(user_id, product_id, Utc::now()).await?;
        self.get(user_id).await
    }

    /// Remove a product. Removing a product not saved changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Repository` if the store fails.
    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Wishlist, WishlistError> {
        self.store.remove_item(user_id, product_id).await?;
        self.get(user_id).await
    }

    /// Merge an anonymous wishlist into the persisted one.
    ///
    /// Duplicates in `anonymous` collapse to their earliest `added_at`, items
    /// whose product no longer exists are dropped, and products already saved
    /// keep the earlier of the two timestamps. Reconciling the same list twice
    /// leaves the wishlist unchanged the second time.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::TooManyItems` for oversized lists, or
    /// `WishlistError::Repository` if the store fails.
    #[tracing::instrument(skip(self, anonymous), fields(items = anonymous.len()))]
    pub async fn reconcile(
        &self,
        user_id: UserId,
        anonymous: &[AnonymousItem],
    ) -> Result<Wishlist, WishlistError> {
        if anonymous.len() > MAX_MERGE_ITEMS {
            return Err(WishlistError::TooManyItems);
        }

        let now = Utc::now();
        let incoming: Vec<WishlistItem> = anonymous
            .iter()
            .map(|i| WishlistItem {
                product_id: i.product_id,
                added_at: i.added_at.unwrap_or(now),
            })
            .collect();
        let canonical = merge(&[], &incoming);

        let ids: Vec<ProductId> = canonical.iter().map(|i| i.product_id).collect();
        let existing = self.catalog.existing_product_ids(&ids).await?;
        let kept: Vec<WishlistItem> = canonical
            .into_iter()
            .filter(|i| existing.contains(&i.product_id))
            .collect();

        let dropped = ids.len() - kept.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Dropped anonymous wishlist items for missing products");
        }

        self.store.merge_items(user_id, &kept).await?;
        self.get(user_id).await
    }
}
