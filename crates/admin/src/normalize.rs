//! Write-path normalization for catalog entities.
//!
//! Every create and update runs its input through one of these functions
//! before touching the database. They are pure: references to other rows
//! (categories, parents) are carried through as [`CategoryRef`] and resolved
//! by the repository that writes the row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use emporium_core::catalog::{CategoryRef, Rating, Sales, normalize_tags};
use emporium_core::coupon::{CouponError, DiscountKind, normalize_code};
use emporium_core::section::{MAX_MANUAL_PRODUCTS, ProductSelection, SectionType, SelectionMethod};
use emporium_core::selection::LimitPolicy;
use emporium_core::{ProductStatus, Slug, SlugError};

/// Input that fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("invalid slug: {0}")]
    Slug(#[from] SlugError),
    #[error("{0} cannot be negative")]
    Negative(&'static str),
    #[error("originalPrice must be greater than price")]
    OriginalPriceNotAbovePrice,
    #[error("rating average must be between 0 and 5")]
    RatingOutOfRange,
    #[error("section limit must be between 1 and {max}")]
    LimitOutOfRange { max: u32 },
    #[error("manual sections need at least one product")]
    ManualWithoutProducts,
    #[error("manual sections can hold at most {max} products")]
    TooManyProducts { max: usize },
    #[error(transparent)]
    CouponCode(#[from] CouponError),
    #[error("discount value must be greater than zero")]
    NonPositiveDiscount,
    #[error("percentage discount cannot exceed 100")]
    PercentageOver100,
    #[error("usageLimit must be greater than zero")]
    NonPositiveUsageLimit,
    #[error("expiresAt must be after startsAt")]
    WindowReversed,
}

fn default_true() -> bool {
    true
}

/// Trimmed non-empty text, or a `Required` error naming the field.
fn required_text(value: &str, field: &'static str) -> Result<String, NormalizeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Required(field));
    }
    Ok(trimmed.to_string())
}

/// Trimmed text, with blanks collapsed to `None`.
fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Slug for a named entity: the explicit slug when given, else the name.
///
/// Explicit slugs go through the same derivation, so `"Summer Sale!"` and
/// `"summer-sale"` store identically.
///
/// # Errors
///
/// Returns [`NormalizeError::Slug`] when nothing URL-safe remains.
pub fn derive_slug(explicit: Option<&str>, name: &str) -> Result<Slug, NormalizeError> {
    let source = explicit.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(name);
    Ok(Slug::from_name(source)?)
}

// =============================================================================
// Products
// =============================================================================

/// Product create/update request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_sale: bool,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub sales: Sales,
}

/// A validated product ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub featured: bool,
    pub is_new: bool,
    pub is_sale: bool,
    pub rating: Rating,
    pub sales: Sales,
}

/// Validate and normalize a product.
///
/// # Errors
///
/// Returns the first rule the input breaks.
pub fn product(input: ProductInput) -> Result<NewProduct, NormalizeError> {
    let name = required_text(&input.name, "name")?;
    let slug = derive_slug(input.slug.as_deref(), &name)?;

    if input.price.is_sign_negative() {
        return Err(NormalizeError::Negative("price"));
    }
    if let Some(original) = input.original_price
        && original <= input.price
    {
        return Err(NormalizeError::OriginalPriceNotAbovePrice);
    }
    if !(0.0..=Rating::MAX).contains(&input.rating.average) {
        return Err(NormalizeError::RatingOutOfRange);
    }
    if input.rating.count < 0 {
        return Err(NormalizeError::Negative("rating count"));
    }
    if input.sales.count < 0 {
        return Err(NormalizeError::Negative("sales count"));
    }
    if input.sales.revenue.is_sign_negative() {
        return Err(NormalizeError::Negative("sales revenue"));
    }

    Ok(NewProduct {
        name,
        slug,
        description: input.description.trim().to_string(),
        price: input.price,
        original_price: input.original_price,
        category: input.category,
        tags: normalize_tags(&input.tags),
        status: input.status,
        featured: input.featured,
        is_new: input.is_new,
        is_sale: input.is_sale,
        rating: input.rating,
        sales: input.sales,
    })
}

// =============================================================================
// Categories
// =============================================================================

/// Category create/update request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent: Option<CategoryRef>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// A validated category ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub parent: Option<CategoryRef>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Validate and normalize a category.
///
/// Parent existence and acyclicity need the stored hierarchy and are checked
/// by the category repository.
///
/// # Errors
///
/// Returns an error for a blank name or an unusable slug.
pub fn category(input: CategoryInput) -> Result<NewCategory, NormalizeError> {
    let name = required_text(&input.name, "name")?;
    let slug = derive_slug(input.slug.as_deref(), &name)?;

    Ok(NewCategory {
        name,
        slug,
        description: optional_text(input.description),
        parent: input.parent,
        is_active: input.is_active,
        sort_order: input.sort_order,
    })
}

// =============================================================================
// Sections
// =============================================================================

/// Product section create/update request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub product_selection: ProductSelection,
    #[serde(default)]
    pub display_settings: serde_json::Value,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A validated section ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSection {
    pub name: String,
    pub slug: Slug,
    pub title: String,
    pub description: Option<String>,
    pub section_type: SectionType,
    pub selection: ProductSelection,
    pub display_settings: serde_json::Value,
    pub sort_order: i32,
    pub is_active: bool,
}

/// Validate and normalize a product section.
///
/// Curated product ids are deduplicated keeping their first position. The
/// title defaults to the name.
///
/// # Errors
///
/// Returns an error for a blank name, a limit outside `[1, 50]`, or a manual
/// section without products.
pub fn section(input: SectionInput) -> Result<NewSection, NormalizeError> {
    let name = required_text(&input.name, "name")?;
    let slug = derive_slug(input.slug.as_deref(), &name)?;
    let title = optional_text(input.title).unwrap_or_else(|| name.clone());

    let mut selection = input.product_selection;
    let cap = LimitPolicy::SECTION.cap;
    if let Some(limit) = selection.criteria.limit
        && !(1..=cap).contains(&limit)
    {
        return Err(NormalizeError::LimitOutOfRange { max: cap });
    }
    selection.criteria.tags = normalize_tags(&selection.criteria.tags);

    let mut seen = std::collections::HashSet::new();
    selection.product_ids.retain(|id| seen.insert(*id));
    if selection.method == SelectionMethod::Manual {
        if selection.product_ids.is_empty() {
            return Err(NormalizeError::ManualWithoutProducts);
        }
        if selection.product_ids.len() > MAX_MANUAL_PRODUCTS {
            return Err(NormalizeError::TooManyProducts {
                max: MAX_MANUAL_PRODUCTS,
            });
        }
    }

    let display_settings = if input.display_settings.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        input.display_settings
    };

    Ok(NewSection {
        name,
        slug,
        title,
        description: optional_text(input.description),
        section_type: input.section_type,
        selection,
        display_settings,
        sort_order: input.sort_order,
        is_active: input.is_active,
    })
}

// =============================================================================
// Coupons
// =============================================================================

/// Coupon create/update request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    #[serde(default)]
    pub minimum_subtotal: Option<Decimal>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A validated coupon ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCoupon {
    pub code: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub minimum_subtotal: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Validate and normalize a coupon. Codes are stored uppercase.
///
/// # Errors
///
/// Returns the first rule the input breaks.
pub fn coupon(input: CouponInput) -> Result<NewCoupon, NormalizeError> {
    let code = normalize_code(&input.code)?;

    if input.value <= Decimal::ZERO {
        return Err(NormalizeError::NonPositiveDiscount);
    }
    if input.kind == DiscountKind::Percentage && input.value > Decimal::ONE_HUNDRED {
        return Err(NormalizeError::PercentageOver100);
    }
    if input.minimum_subtotal.is_some_and(|m| m.is_sign_negative()) {
        return Err(NormalizeError::Negative("minimumSubtotal"));
    }
    if input.usage_limit.is_some_and(|limit| limit <= 0) {
        return Err(NormalizeError::NonPositiveUsageLimit);
    }
    if let (Some(start), Some(end)) = (input.starts_at, input.expires_at)
        && end <= start
    {
        return Err(NormalizeError::WindowReversed);
    }

    Ok(NewCoupon {
        code,
        description: optional_text(input.description),
        kind: input.kind,
        value: input.value,
        minimum_subtotal: input.minimum_subtotal,
        usage_limit: input.usage_limit,
        starts_at: input.starts_at,
        expires_at: input.expires_at,
        is_active: input.is_active,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use emporium_core::ProductId;
    use serde_json::json;

    use super::*;

    fn product_input() -> ProductInput {
        serde_json::from_value(json!({
            "name": "  Linen Midi Dress ",
            "price": "89.00",
            "tags": ["Linen", " summer ", "linen", ""],
        }))
        .unwrap()
    }

    fn section_input(selection: serde_json::Value) -> SectionInput {
        serde_json::from_value(json!({
            "name": "Editor's Picks",
            "type": "featured",
            "productSelection": selection,
        }))
        .unwrap()
    }

    fn coupon_input() -> CouponInput {
        serde_json::from_value(json!({
            "code": " spring-10 ",
            "kind": "percentage",
            "value": "10",
        }))
        .unwrap()
    }

    #[test]
    fn test_derive_slug() {
        assert_eq!(derive_slug(None, "Summer Sale!").unwrap().as_str(), "summer-sale");
        assert_eq!(
            derive_slug(Some(" Hot  Deals "), "ignored").unwrap().as_str(),
            "hot-deals"
        );
        assert_eq!(derive_slug(Some("  "), "Fallback Name").unwrap().as_str(), "fallback-name");
        assert!(matches!(derive_slug(None, "***"), Err(NormalizeError::Slug(_))));
    }

    #[test]
    fn test_product_defaults_and_normalization() {
        let p = product(product_input()).unwrap();
        assert_eq!(p.name, "Linen Midi Dress");
        assert_eq!(p.slug.as_str(), "linen-midi-dress");
        assert_eq!(p.tags, vec!["linen", "summer"]);
        assert_eq!(p.status, ProductStatus::Draft);
        assert_eq!(p.rating, Rating::default());
    }

    #[test]
    fn test_product_rejects_bad_prices() {
        let mut input = product_input();
        input.price = Decimal::new(-1, 0);
        assert_eq!(product(input).unwrap_err(), NormalizeError::Negative("price"));

        let mut input = product_input();
        input.original_price = Some(Decimal::new(89, 0));
        assert_eq!(
            product(input).unwrap_err(),
            NormalizeError::OriginalPriceNotAbovePrice
        );

        let mut input = product_input();
        input.original_price = Some(Decimal::new(120, 0));
        assert!(product(input).is_ok());
    }

    #[test]
    fn test_product_rejects_bad_rating_and_blank_name() {
        let mut input = product_input();
        input.rating.average = 5.5;
        assert_eq!(product(input).unwrap_err(), NormalizeError::RatingOutOfRange);

        let mut input = product_input();
        input.name = "   ".to_string();
        assert_eq!(product(input).unwrap_err(), NormalizeError::Required("name"));
    }

    #[test]
    fn test_category_parent_ref_accepts_id_or_slug() {
        let input: CategoryInput =
            serde_json::from_value(json!({"name": "Dresses", "parent": 3})).unwrap();
        let c = category(input).unwrap();
        assert_eq!(c.parent, Some(CategoryRef::Id(emporium_core::CategoryId::new(3))));
        assert!(c.is_active);

        let input: CategoryInput =
            serde_json::from_value(json!({"name": "Dresses", "parent": "women"})).unwrap();
        assert_eq!(
            category(input).unwrap().parent,
            Some(CategoryRef::Slug("women".to_string()))
        );
    }

    #[test]
    fn test_section_dedupes_manual_products_in_order() {
        let s = section(section_input(json!({
            "method": "manual",
            "productIds": [5, 2, 5, 9, 2],
        })))
        .unwrap();
        assert_eq!(
            s.selection.product_ids,
            vec![ProductId::new(5), ProductId::new(2), ProductId::new(9)]
        );
        assert_eq!(s.slug.as_str(), "editor-s-picks");
        assert_eq!(s.title, "Editor's Picks");
        assert_eq!(s.display_settings, json!({}));
    }

    #[test]
    fn test_section_rejects_empty_manual_selection() {
        let err = section(section_input(json!({"method": "manual"}))).unwrap_err();
        assert_eq!(err, NormalizeError::ManualWithoutProducts);
    }

    #[test]
    fn test_section_limit_bounds() {
        for limit in [0, 51] {
            let err = section(section_input(json!({"criteria": {"limit": limit}}))).unwrap_err();
            assert_eq!(err, NormalizeError::LimitOutOfRange { max: 50 });
        }
        let s = section(section_input(json!({"criteria": {"limit": 50, "tags": ["New", "new"]}})))
            .unwrap();
        assert_eq!(s.selection.criteria.limit, Some(50));
        assert_eq!(s.selection.criteria.tags, vec!["new"]);
    }

    #[test]
    fn test_coupon_code_uppercased() {
        let c = coupon(coupon_input()).unwrap();
        assert_eq!(c.code, "SPRING-10");
        assert!(c.is_active);
    }

    #[test]
    fn test_coupon_rules() {
        let mut input = coupon_input();
        input.value = Decimal::new(101, 0);
        assert_eq!(coupon(input).unwrap_err(), NormalizeError::PercentageOver100);

        let mut input = coupon_input();
        input.kind = DiscountKind::Fixed;
        input.value = Decimal::new(150, 0);
        assert!(coupon(input).is_ok());

        let mut input = coupon_input();
        input.value = Decimal::ZERO;
        assert_eq!(coupon(input).unwrap_err(), NormalizeError::NonPositiveDiscount);

        let mut input = coupon_input();
        let now = Utc::now();
        input.starts_at = Some(now);
        input.expires_at = Some(now - Duration::days(1));
        assert_eq!(coupon(input).unwrap_err(), NormalizeError::WindowReversed);

        let mut input = coupon_input();
        input.code = "x".to_string();
        assert!(matches!(coupon(input), Err(NormalizeError::CouponCode(_))));
    }
}
