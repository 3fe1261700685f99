//! Catalog domain types: products and categories.
//!
//! These are validated domain objects, separate from database row types.
//! Normalization helpers used by the admin write path also live here so the
//! storefront and admin agree on what a tag or a category reference is.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ProductId, ProductStatus, Slug};

/// Average star rating and number of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rating {
    /// Average in `[0, 5]`.
    pub average: f64,
    /// Number of ratings, never negative.
    pub count: i32,
}

impl Rating {
    /// Highest possible average.
    pub const MAX: f64 = 5.0;
}

/// Lifetime sales figures, maintained by order processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Sales {
    /// Units sold.
    pub count: i32,
    /// Revenue in store currency.
    pub revenue: Decimal,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    /// Pre-discount price. Always greater than `price` when present.
    pub original_price: Option<Decimal>,
    pub category_id: Option<CategoryId>,
    /// Lowercase, deduplicated tags.
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub featured: bool,
    pub is_new: bool,
    pub is_sale: bool,
    pub rating: Rating,
    pub sales: Sales,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product is visible on the storefront.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Whether the product carries at least one of `wanted` (already lowercase).
    #[must_use]
    pub fn has_any_tag(&self, wanted: &[String]) -> bool {
        self.tags
            .iter()
            .any(|tag| wanted.iter().any(|w| w.eq_ignore_ascii_case(tag)))
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    /// Direct children, derived from the children's parent references.
    pub children: Vec<CategoryId>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A reference to a category by id or by slug.
///
/// Request parameters accept either form: a purely numeric value is an id,
/// anything else a slug. A slug that matches nothing selects no products.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(CategoryId),
    Slug(String),
}

impl std::str::FromStr for CategoryRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(trimmed.parse::<CategoryId>().map_or_else(
            |_| Self::Slug(trimmed.to_ascii_lowercase()),
            Self::Id,
        ))
    }
}

impl From<CategoryId> for CategoryRef {
    fn from(id: CategoryId) -> Self {
        Self::Id(id)
    }
}

impl std::fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Normalize a tag set: trim, lowercase, drop empties, dedupe keeping first
/// occurrence order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Parse a comma-separated tag list as sent in query strings.
#[must_use]
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

/// Returns true if making `new_parent` the parent of `category` would close a
/// loop in the hierarchy.
///
/// `parents` maps every known category to its current parent. Walking stops on
/// an unknown id, a root, or an already-visited id (so pre-existing damage in
/// the table cannot hang the check).
#[must_use]
pub fn creates_cycle<S: std::hash::BuildHasher>(
    parents: &HashMap<CategoryId, Option<CategoryId>, S>,
    category: CategoryId,
    new_parent: CategoryId,
) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = Some(new_parent);

    while let Some(current) = cursor {
        if current == category {
            return true;
        }
        if !visited.insert(current) {
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }

    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Linen Dress".to_string(),
            slug: Slug::parse("linen-dress").unwrap(),
            description: String::new(),
            price: Decimal::new(8000, 2),
            original_price: Some(Decimal::new(10000, 2)),
            category_id: None,
            tags: vec!["summer".to_string(), "linen".to_string()],
            status: ProductStatus::Active,
            featured: false,
            is_new: false,
            is_sale: true,
            rating: Rating::default(),
            sales: Sales::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_any_tag_is_case_insensitive() {
        let p = product();
        assert!(p.has_any_tag(&["LINEN".to_string()]));
        assert!(p.has_any_tag(&["wool".to_string(), "summer".to_string()]));
        assert!(!p.has_any_tag(&["wool".to_string()]));
        assert!(!p.has_any_tag(&[]));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = normalize_tags([" Summer", "LINEN", "", "summer", "  "]);
        assert_eq!(tags, vec!["summer", "linen"]);
    }

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(parse_tag_list("Red, blue,,RED"), vec!["red", "blue"]);
        assert!(parse_tag_list("").is_empty());
    }

    #[test]
    fn test_category_ref_parse() {
        assert_eq!(
            "12".parse::<CategoryRef>().unwrap(),
            CategoryRef::Id(CategoryId::new(12))
        );
        assert_eq!(
            " Dresses ".parse::<CategoryRef>().unwrap(),
            CategoryRef::Slug("dresses".to_string())
        );
    }

    #[test]
    fn test_creates_cycle_self_parent() {
        let parents = HashMap::new();
        assert!(creates_cycle(&parents, CategoryId::new(1), CategoryId::new(1)));
    }

    #[test]
    fn test_creates_cycle_through_ancestor() {
        // 1 <- 2 <- 3 ; making 3 the parent of 1 closes the loop
        let parents = HashMap::from([
            (CategoryId::new(1), None),
            (CategoryId::new(2), Some(CategoryId::new(1))),
            (CategoryId::new(3), Some(CategoryId::new(2))),
        ]);
        assert!(creates_cycle(&parents, CategoryId::new(1), CategoryId::new(3)));
        assert!(!creates_cycle(&parents, CategoryId::new(3), CategoryId::new(1)));
    }

    #[test]
    fn test_creates_cycle_terminates_on_existing_loop() {
        let parents = HashMap::from([
            (CategoryId::new(1), Some(CategoryId::new(2))),
            (CategoryId::new(2), Some(CategoryId::new(1))),
        ]);
        assert!(!creates_cycle(&parents, CategoryId::new(9), CategoryId::new(1)));
    }
}
