//! Selection Criteria Evaluator.
//!
//! Translates a section type plus optional overrides into a typed
//! [`ProductQuery`]: a filter, a sort and a limit over the product collection.
//! The query is plain data. Repositories turn it into SQL at the store
//! boundary; [`ProductQuery::apply`] evaluates it over an in-memory slice with
//! identical semantics.
//!
//! # Rules
//!
//! | section type | predicate added to `status == active` |
//! |---|---|
//! | featured | `featured` |
//! | new-arrivals | `is_new` |
//! | best-sellers | `sales.count > 0` |
//! | on-sale | `is_sale` |
//! | trending | `rating.average >= 4` |
//! | recommended | `rating.average >= 4.5` |
//!
//! Category and tag filters layer on top when present. Without an explicit
//! `sortBy`, best-sellers sort by sales, trending and recommended by rating,
//! everything else newest first.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::catalog::{CategoryRef, Product, normalize_tags};
use crate::section::{SectionCriteria, SectionType, SortBy};
use crate::types::{CategoryId, ProductId, ProductStatus};

/// Errors raised while building a query from request input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    /// The section type is not one of the known kinds.
    #[error("invalid section type: {0}")]
    InvalidSectionType(String),
    /// The sort key is not one of the known orderings.
    #[error("invalid sort: {0}")]
    InvalidSortBy(String),
}

/// Minimum average rating for trending sections.
pub const TRENDING_MIN_RATING: f64 = 4.0;
/// Minimum average rating for recommended sections.
pub const RECOMMENDED_MIN_RATING: f64 = 4.5;

/// The per-type predicate. At most one applies to a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionPredicate {
    Featured,
    IsNew,
    HasSales,
    OnSale,
    MinRating(f64),
}

impl SectionPredicate {
    /// The predicate a section type contributes.
    #[must_use]
    pub const fn for_type(section_type: SectionType) -> Self {
        match section_type {
            SectionType::Featured => Self::Featured,
            SectionType::NewArrivals => Self::IsNew,
            SectionType::BestSellers => Self::HasSales,
            SectionType::OnSale => Self::OnSale,
            SectionType::Trending => Self::MinRating(TRENDING_MIN_RATING),
            SectionType::Recommended => Self::MinRating(RECOMMENDED_MIN_RATING),
        }
    }

    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match *self {
            Self::Featured => product.featured,
            Self::IsNew => product.is_new,
            Self::HasSales => product.sales.count > 0,
            Self::OnSale => product.is_sale,
            Self::MinRating(min) => product.rating.average >= min,
        }
    }
}

/// Typed product filter. Every populated field must match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub status: ProductStatus,
    pub predicate: Option<SectionPredicate>,
    pub category: Option<CategoryRef>,
    /// Any-of membership over lowercase tags. Empty means no tag filter.
    pub tags: Vec<String>,
    /// Case-insensitive substring over name, description and tags.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub exclude: Option<ProductId>,
}

impl ProductFilter {
    /// A filter matching every active product.
    #[must_use]
    pub const fn active() -> Self {
        Self {
            status: ProductStatus::Active,
            predicate: None,
            category: None,
            tags: Vec::new(),
            search: None,
            min_price: None,
            max_price: None,
            exclude: None,
        }
    }

    /// Evaluate the filter in memory.
    ///
    /// `resolve_category` maps a category reference to an id; `None` means the
    /// reference points nowhere and nothing matches.
    pub fn matches<F>(&self, product: &Product, resolve_category: F) -> bool
    where
        F: Fn(&CategoryRef) -> Option<CategoryId>,
    {
        if product.status != self.status {
            return false;
        }
        if let Some(predicate) = &self.predicate
            && !predicate.matches(product)
        {
            return false;
        }
        if let Some(category) = &self.category {
            let Some(id) = resolve_category(category) else {
                return false;
            };
            if product.category_id != Some(id) {
                return false;
            }
        }
        if !self.tags.is_empty() && !product.has_any_tag(&self.tags) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = product.name.to_lowercase().contains(&term)
                || product.description.to_lowercase().contains(&term)
                || product.tags.iter().any(|t| t.contains(&term));
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        self.exclude != Some(product.id)
    }
}

/// Column a product list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    CreatedAt,
    Price,
    RatingAverage,
    SalesCount,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// A resolved ordering. Ties are broken by product id, newest id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// The ordering an explicit `sortBy` asks for.
    #[must_use]
    pub const fn for_sort_by(sort_by: SortBy) -> Self {
        match sort_by {
            SortBy::Newest => Self::new(SortField::CreatedAt, SortDirection::Desc),
            SortBy::Oldest => Self::new(SortField::CreatedAt, SortDirection::Asc),
            SortBy::PriceLow => Self::new(SortField::Price, SortDirection::Asc),
            SortBy::PriceHigh => Self::new(SortField::Price, SortDirection::Desc),
            SortBy::Rating => Self::new(SortField::RatingAverage, SortDirection::Desc),
            SortBy::Popularity | SortBy::Sales => {
                Self::new(SortField::SalesCount, SortDirection::Desc)
            }
            SortBy::Name => Self::new(SortField::Name, SortDirection::Asc),
        }
    }

    /// The ordering a section type uses when no `sortBy` is given.
    #[must_use]
    pub const fn default_for(section_type: SectionType) -> Self {
        match section_type {
            SectionType::BestSellers => Self::new(SortField::SalesCount, SortDirection::Desc),
            SectionType::Trending | SectionType::Recommended => {
                Self::new(SortField::RatingAverage, SortDirection::Desc)
            }
            SectionType::Featured | SectionType::NewArrivals | SectionType::OnSale => {
                Self::new(SortField::CreatedAt, SortDirection::Desc)
            }
        }
    }

    /// Compare two products under this ordering.
    #[must_use]
    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Price => a.price.cmp(&b.price),
            SortField::RatingAverage => a.rating.average.total_cmp(&b.rating.average),
            SortField::SalesCount => a.sales.count.cmp(&b.sales.count),
            SortField::Name => a.name.cmp(&b.name),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

/// Default and maximum page size for one kind of product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub default: u32,
    pub cap: u32,
}

impl LimitPolicy {
    /// Automatic product sections.
    pub const SECTION: Self = Self { default: 8, cap: 50 };
    /// General product listings.
    pub const LISTING: Self = Self {
        default: 12,
        cap: 50,
    };
    /// Product search.
    pub const SEARCH: Self = Self {
        default: 10,
        cap: 20,
    };
    /// "You may also like" on a product page.
    pub const RELATED: Self = Self { default: 4, cap: 4 };
    /// Pages of sections (the sections themselves, not their products).
    pub const SECTION_PAGE: Self = Self {
        default: 50,
        cap: 200,
    };

    /// Clamp a requested limit into `[1, cap]`, falling back to the default.
    #[must_use]
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        requested.map_or(self.default, |n| {
            u32::try_from(n.clamp(1, i64::from(self.cap))).unwrap_or(self.default)
        })
    }
}

/// Caller-supplied refinements to a section's base query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionOverrides {
    pub category: Option<CategoryRef>,
    pub tags: Vec<String>,
    pub sort_by: Option<SortBy>,
    pub limit: Option<i64>,
}

impl From<&SectionCriteria> for SelectionOverrides {
    fn from(criteria: &SectionCriteria) -> Self {
        Self {
            category: criteria.category.clone(),
            tags: criteria.tags.clone(),
            sort_by: criteria.sort_by,
            limit: criteria.limit.map(i64::from),
        }
    }
}

/// A concrete query over the product collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductQuery {
    pub filter: ProductFilter,
    pub sort: SortSpec,
    pub limit: u32,
    pub offset: u32,
}

impl ProductQuery {
    #[must_use]
    pub const fn new(filter: ProductFilter, sort: SortSpec, limit: u32) -> Self {
        Self {
            filter,
            sort,
            limit,
            offset: 0,
        }
    }

    /// Skip the rows of earlier pages (`page` is 1-based).
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.offset = page.saturating_sub(1).saturating_mul(self.limit);
        self
    }

    /// Run the query over an in-memory collection.
    pub fn apply<'a, I, F>(&self, products: I, resolve_category: F) -> Vec<Product>
    where
        I: IntoIterator<Item = &'a Product>,
        F: Fn(&CategoryRef) -> Option<CategoryId>,
    {
        let mut matched: Vec<&Product> = products
            .into_iter()
            .filter(|p| self.filter.matches(p, &resolve_category))
            .collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));
        matched
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// Build the query for a section type with optional overrides.
#[must_use]
pub fn evaluate(section_type: SectionType, overrides: &SelectionOverrides) -> ProductQuery {
    let filter = ProductFilter {
        predicate: Some(SectionPredicate::for_type(section_type)),
        category: overrides.category.clone(),
        tags: normalize_tags(&overrides.tags),
        ..ProductFilter::active()
    };

    let sort = overrides.sort_by.map_or_else(
        || SortSpec::default_for(section_type),
        SortSpec::for_sort_by,
    );

    ProductQuery::new(filter, sort, LimitPolicy::SECTION.clamp(overrides.limit))
}

/// Build the query for a section type given by name.
///
/// # Errors
///
/// Returns [`SelectionError::InvalidSectionType`] for unknown names. Callers
/// reject the request; there is no fallback type.
pub fn evaluate_named(
    section_type: &str,
    overrides: &SelectionOverrides,
) -> Result<ProductQuery, SelectionError> {
    let section_type = section_type.parse::<SectionType>()?;
    Ok(evaluate(section_type, overrides))
}
