//! Database row shapes shared by the storefront and admin repositories.
//!
//! Both binaries read the same catalog tables. Row types mirror the columns
//! one-to-one; conversion into domain types validates anything the database
//! cannot (slugs, enum-like text columns) and reports a [`RowError`] instead of
//! trusting the data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::catalog::{Category, CategoryRef, Product, Rating, Sales};
use crate::coupon::{Coupon, DiscountKind};
use crate::section::{ProductSection, ProductSelection, SectionCriteria};
use crate::types::{CategoryId, CouponId, ProductId, ProductStatus, SectionId, Slug};

/// A stored value that does not satisfy its domain invariants.
#[derive(Debug, thiserror::Error)]
#[error("invalid {column} in {table} row {id}: {reason}")]
pub struct RowError {
    pub table: &'static str,
    pub column: &'static str,
    pub id: i32,
    pub reason: String,
}

impl RowError {
    fn new(table: &'static str, column: &'static str, id: i32, reason: impl ToString) -> Self {
        Self {
            table,
            column,
            id,
            reason: reason.to_string(),
        }
    }
}

/// Column list matching [`ProductRow`], for a `catalog.product` aliased `p`.
pub const PRODUCT_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.price, \
    p.original_price, p.category_id, p.tags, p.status, p.featured, p.is_new, p.is_sale, \
    p.rating_average, p.rating_count, p.sales_count, p.sales_revenue, p.created_at, p.updated_at";

/// Row of `catalog.product`.
#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category_id: Option<i32>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub featured: bool,
    pub is_new: bool,
    pub is_sale: bool,
    pub rating_average: f64,
    pub rating_count: i32,
    pub sales_count: i32,
    pub sales_revenue: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RowError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let slug =
            Slug::parse(&row.slug).map_err(|e| RowError::new("product", "slug", row.id, e))?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug,
            description: row.description,
            price: row.price,
            original_price: row.original_price,
            category_id: row.category_id.map(CategoryId::new),
            tags: row.tags,
            status: row.status,
            featured: row.featured,
            is_new: row.is_new,
            is_sale: row.is_sale,
            rating: Rating {
                average: row.rating_average,
                count: row.rating_count,
            },
            sales: Sales {
                count: row.sales_count,
                revenue: row.sales_revenue,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Column list matching [`CategoryRow`], for a `catalog.category` aliased `c`.
///
/// `children` is aggregated from the children's `parent_id`.
pub const CATEGORY_COLUMNS: &str = "c.id, c.name, c.slug, c.description, c.parent_id, \
    c.is_active, c.sort_order, c.created_at, \
    COALESCE((SELECT array_agg(k.id ORDER BY k.sort_order, k.id) \
              FROM catalog.category k WHERE k.parent_id = c.id), '{}') AS children";

/// Row of `catalog.category` with its children ids.
#[derive(Debug, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub children: Vec<i32>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = RowError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let slug =
            Slug::parse(&row.slug).map_err(|e| RowError::new("category", "slug", row.id, e))?;

        Ok(Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug,
            description: row.description,
            parent_id: row.parent_id.map(CategoryId::new),
            children: row.children.into_iter().map(CategoryId::new).collect(),
            is_active: row.is_active,
            sort_order: row.sort_order,
            created_at: row.created_at,
        })
    }
}

/// Column list matching [`SectionRow`], for a `catalog.product_section` aliased `s`.
pub const SECTION_COLUMNS: &str = "s.id, s.name, s.slug, s.title, s.description, \
    s.section_type, s.selection_method, s.product_ids, s.criteria_category_id, \
    s.criteria_tags, s.criteria_sort_by, s.criteria_limit, s.display_settings, \
    s.sort_order, s.is_active, s.created_at, s.updated_at";

/// Row of `catalog.product_section`.
#[derive(Debug, sqlx::FromRow)]
pub struct SectionRow {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub title: String,
    pub description: Option<String>,
    pub section_type: String,
    pub selection_method: String,
    pub product_ids: Vec<i32>,
    pub criteria_category_id: Option<i32>,
    pub criteria_tags: Vec<String>,
    pub criteria_sort_by: Option<String>,
    pub criteria_limit: Option<i32>,
    pub display_settings: serde_json::Value,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SectionRow> for ProductSection {
    type Error = RowError;

    fn try_from(row: SectionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let err = |column, reason: String| RowError::new("product_section", column, id, reason);

        let slug = Slug::parse(&row.slug).map_err(|e| err("slug", e.to_string()))?;
        let section_type = row
            .section_type
            .parse()
            .map_err(|e: crate::selection::SelectionError| err("section_type", e.to_string()))?;
        let method = row
            .selection_method
            .parse()
            .map_err(|e: String| err("selection_method", e))?;
        let sort_by = row
            .criteria_sort_by
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e: crate::selection::SelectionError| err("criteria_sort_by", e.to_string()))?;
        let limit = row
            .criteria_limit
            .map(u32::try_from)
            .transpose()
            .map_err(|e| err("criteria_limit", e.to_string()))?;

        Ok(Self {
            id: SectionId::new(row.id),
            name: row.name,
            slug,
            title: row.title,
            description: row.description,
            section_type,
            product_selection: ProductSelection {
                method,
                product_ids: row.product_ids.into_iter().map(ProductId::new).collect(),
                criteria: SectionCriteria {
                    category: row
                        .criteria_category_id
                        .map(|c| CategoryRef::Id(CategoryId::new(c))),
                    tags: row.criteria_tags,
                    sort_by,
                    limit,
                },
            },
            display_settings: row.display_settings,
            sort_order: row.sort_order,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Column list matching [`CouponRow`].
pub const COUPON_COLUMNS: &str = "id, code, description, discount_kind, discount_value, \
    minimum_subtotal, usage_limit, used_count, starts_at, expires_at, is_active, created_at";

/// Row of `catalog.coupon`.
#[derive(Debug, sqlx::FromRow)]
pub struct CouponRow {
    pub id: i32,
    pub code: String,
    pub description: Option<String>,
    pub discount_kind: String,
    pub discount_value: Decimal,
    pub minimum_subtotal: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RowError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let kind: DiscountKind = row
            .discount_kind
            .parse()
            .map_err(|e: String| RowError::new("coupon", "discount_kind", row.id, e))?;

        Ok(Self {
            id: CouponId::new(row.id),
            code: row.code,
            description: row.description,
            kind,
            value: row.discount_value,
            minimum_subtotal: row.minimum_subtotal,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// `%term%` for ILIKE, with `%`, `_` and `\` escaped so they match literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::section::{SectionType, SelectionMethod, SortBy};

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("linen"), "%linen%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    fn section_row() -> SectionRow {
        SectionRow {
            id: 4,
            name: "Best Sellers".to_string(),
            slug: "best-sellers".to_string(),
            title: "Our best sellers".to_string(),
            description: None,
            section_type: "best-sellers".to_string(),
            selection_method: "automatic".to_string(),
            product_ids: vec![],
            criteria_category_id: Some(2),
            criteria_tags: vec!["linen".to_string()],
            criteria_sort_by: Some("price-low".to_string()),
            criteria_limit: Some(6),
            display_settings: serde_json::json!({"columns": 4}),
            sort_order: 1,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_section_row_converts() {
        let section = ProductSection::try_from(section_row()).unwrap();
        assert_eq!(section.section_type, SectionType::BestSellers);
        assert_eq!(section.product_selection.method, SelectionMethod::Automatic);
        assert_eq!(
            section.product_selection.criteria.category,
            Some(CategoryRef::Id(CategoryId::new(2)))
        );
        assert_eq!(
            section.product_selection.criteria.sort_by,
            Some(SortBy::PriceLow)
        );
        assert_eq!(section.product_selection.criteria.limit, Some(6));
    }

    #[test]
    fn test_section_row_rejects_unknown_type() {
        let mut row = section_row();
        row.section_type = "clearance".to_string();
        let err = ProductSection::try_from(row).unwrap_err();
        assert_eq!(err.column, "section_type");
        assert_eq!(err.id, 4);
    }

    #[test]
    fn test_coupon_row_rejects_unknown_kind() {
        let row = CouponRow {
            id: 9,
            code: "SAVE5".to_string(),
            description: None,
            discount_kind: "bogo".to_string(),
            discount_value: Decimal::from(5),
            minimum_subtotal: None,
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let err = Coupon::try_from(row).unwrap_err();
        assert_eq!(err.column, "discount_kind");
    }
}
