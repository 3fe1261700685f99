//! Product section configuration.
//!
//! A product section is a named block of products on a landing page
//! ("Best Sellers", "New In", ...). Admins either hand-pick the products
//! (`manual`) or describe them with criteria (`automatic`), which the
//! [`selection`](crate::selection) evaluator turns into a query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CategoryRef;
use crate::selection::SelectionError;
use crate::types::{ProductId, SectionId, Slug};

/// Most products a manual section may curate.
pub const MAX_MANUAL_PRODUCTS: usize = 100;

/// The kind of section, which decides the base product predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Featured,
    NewArrivals,
    BestSellers,
    OnSale,
    Trending,
    Recommended,
}

impl SectionType {
    pub const ALL: [Self; 6] = [
        Self::Featured,
        Self::NewArrivals,
        Self::BestSellers,
        Self::OnSale,
        Self::Trending,
        Self::Recommended,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::NewArrivals => "new-arrivals",
            Self::BestSellers => "best-sellers",
            Self::OnSale => "on-sale",
            Self::Trending => "trending",
            Self::Recommended => "recommended",
        }
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SectionType {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SelectionError::InvalidSectionType(s.to_string()))
    }
}

/// Requested ordering for a product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    Rating,
    Popularity,
    Sales,
    Name,
}

impl SortBy {
    pub const ALL: [Self; 8] = [
        Self::Newest,
        Self::Oldest,
        Self::PriceLow,
        Self::PriceHigh,
        Self::Rating,
        Self::Popularity,
        Self::Sales,
        Self::Name,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Rating => "rating",
            Self::Popularity => "popularity",
            Self::Sales => "sales",
            Self::Name => "name",
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortBy {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| SelectionError::InvalidSortBy(s.to_string()))
    }
}

/// How a section picks its products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    Manual,
    #[default]
    Automatic,
}

impl SelectionMethod {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl std::str::FromStr for SelectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            _ => Err(format!("invalid selection method: {s}")),
        }
    }
}

/// Criteria for automatic sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SectionCriteria {
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub sort_by: Option<SortBy>,
    /// Stored limit, `[1, 50]` after normalization.
    pub limit: Option<u32>,
}

/// The selection half of a section's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProductSelection {
    #[serde(default)]
    pub method: SelectionMethod,
    /// Curated order for manual sections. References are weak: products may
    /// have been withdrawn since the section was saved.
    #[serde(default)]
    pub product_ids: Vec<ProductId>,
    #[serde(default)]
    pub criteria: SectionCriteria,
}

/// A configured product section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSection {
    pub id: SectionId,
    pub name: String,
    pub slug: Slug,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    pub product_selection: ProductSelection,
    /// Presentation-only settings, passed through untouched.
    pub display_settings: serde_json::Value,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
