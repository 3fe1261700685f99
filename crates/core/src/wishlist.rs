//! Wishlist items and the merge-on-login rule.
//!
//! A wishlist is an insertion-ordered set of products keyed by user. Visitors
//! who are not signed in keep theirs in client-local storage; on login the
//! client sends it once and it is merged into the persisted one.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, UserId};

/// One wishlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

/// A user's persisted wishlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub user_id: UserId,
    pub items: Vec<WishlistItem>,
}

impl Wishlist {
    /// The wishlist of a user who has never saved anything.
    #[must_use]
    pub const fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }
}

/// Merge `incoming` into `existing`.
///
/// The result is the union of both, one entry per product. Existing entries
/// keep their position; products only present in `incoming` are appended in
/// the order they first appear there. When a product is in both, the earlier
/// `added_at` wins. Duplicates inside either input collapse the same way, so
/// `merge(&[], items)` is the canonical form of a raw client list.
#[must_use]
pub fn merge(existing: &[WishlistItem], incoming: &[WishlistItem]) -> Vec<WishlistItem> {
    let mut merged: Vec<WishlistItem> = Vec::with_capacity(existing.len() + incoming.len());
    let mut positions: HashMap<ProductId, usize> = HashMap::new();

    for item in existing.iter().chain(incoming) {
        if let Some(&pos) = positions.get(&item.product_id) {
            if let Some(slot) = merged.get_mut(pos)
                && item.added_at < slot.added_at
            {
                slot.added_at = item.added_at;
            }
        } else {
            positions.insert(item.product_id, merged.len());
            merged.push(*item);
        }
    }

    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn item(product: i32, minutes: i64) -> WishlistItem {
        WishlistItem {
            product_id: ProductId::new(product),
            added_at: at(minutes),
        }
    }

    #[test]
    fn test_merge_keeps_earlier_timestamp() {
        let persisted = [item(1, 10)];
        let anonymous = [item(1, 5)];
        let merged = merge(&persisted, &anonymous);
        assert_eq!(merged, vec![item(1, 5)]);

        // And the other way round
        let merged = merge(&[item(1, 5)], &[item(1, 10)]);
        assert_eq!(merged, vec![item(1, 5)]);
    }

    #[test]
    fn test_merge_is_union_preserving_order() {
        let persisted = [item(1, 0), item(2, 1)];
        let anonymous = [item(3, 2), item(2, 3), item(4, 4)];
        let ids: Vec<i32> = merge(&persisted, &anonymous)
            .iter()
            .map(|i| i.product_id.as_i32())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_merge_collapses_duplicates_within_input() {
        let raw = [item(7, 3), item(7, 1), item(8, 2), item(7, 9)];
        let merged = merge(&[], &raw);
        assert_eq!(merged, vec![item(7, 1), item(8, 2)]);
    }

    #[test]
    fn test_merge_never_duplicates() {
        let a: Vec<WishlistItem> = (0..20).map(|i| item(i % 6, i64::from(i))).collect();
        let b: Vec<WishlistItem> = (0..20).map(|i| item(i % 9, 100 - i64::from(i))).collect();
        let merged = merge(&a, &b);
        let unique: HashSet<ProductId> = merged.iter().map(|i| i.product_id).collect();
        assert_eq!(unique.len(), merged.len());
        assert_eq!(merged.len(), 9);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let persisted = [item(1, 10), item(2, 0)];
        let anonymous = [item(1, 5), item(3, 1)];
        let once = merge(&persisted, &anonymous);
        let twice = merge(&once, &anonymous);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_wishlist() {
        let w = Wishlist::empty(UserId::new(3));
        assert!(w.items.is_empty());
    }
}
