//! Product route handlers.

use axum::{
    Json,
    extract::rejection::QueryRejection,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use emporium_core::Slug;
use emporium_core::catalog::{CategoryRef, Product, parse_tag_list};
use emporium_core::section::SortBy;
use emporium_core::selection::{
    LimitPolicy, ProductFilter, ProductQuery, SelectionOverrides, SortDirection, SortField,
    SortSpec, evaluate_named,
};

use super::query_params;
use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::state::AppState;

type QueryResult<T> = std::result::Result<Query<T>, QueryRejection>;

/// Parse an optional category parameter; blank means no filter.
fn category_param(raw: Option<&str>) -> Option<CategoryRef> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}

fn sort_param(raw: Option<&str>) -> Result<Option<SortBy>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<SortBy>)
        .transpose()
        .map_err(AppError::from)
}

fn page_param(raw: Option<i64>) -> u32 {
    raw.map_or(1, |p| u32::try_from(p.max(1)).unwrap_or(u32::MAX))
}

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    pub tags: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Pagination metadata for list responses.
#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub returned: usize,
}

/// A page of products.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub data: Vec<Product>,
    pub meta: PageMeta,
}

/// List active products with optional filters.
#[tracing::instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    query: QueryResult<ListQuery>,
) -> Result<Json<ProductPage>> {
    let query = query_params(query)?;

    if let (Some(min), Some(max)) = (query.min_price, query.max_price)
        && min > max
    {
        return Err(AppError::BadRequest(
            "minPrice must not exceed maxPrice".to_string(),
        ));
    }

    let filter = ProductFilter {
        category: category_param(query.category.as_deref()),
        tags: query.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
        min_price: query.min_price,
        max_price: query.max_price,
        ..ProductFilter::active()
    };
    let sort = SortSpec::for_sort_by(sort_param(query.sort_by.as_deref())?.unwrap_or(SortBy::Newest));
    let limit = LimitPolicy::LISTING.clamp(query.limit);
    let page = page_param(query.page);

    let catalog = state.catalog();
    let total = catalog.count_products(&filter).await?;
    let products = catalog
        .find_products(&ProductQuery::new(filter, sort, limit).page(page))
        .await?;

    Ok(Json(ProductPage {
        meta: PageMeta {
            total,
            page,
            limit,
            returned: products.len(),
        },
        data: products,
    }))
}

/// Query parameters for product search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<i64>,
}

/// Case-insensitive search over name, description and tags.
#[tracing::instrument(skip(state, query))]
pub async fn search(
    State(state): State<AppState>,
    query: QueryResult<SearchQuery>,
) -> Result<Json<Value>> {
    let query = query_params(query)?;
    let term = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".to_string()))?;

    let filter = ProductFilter {
        search: Some(term.to_string()),
        ..ProductFilter::active()
    };
    let sort = SortSpec::new(SortField::RatingAverage, SortDirection::Desc);
    let limit = LimitPolicy::SEARCH.clamp(query.limit);

    let products = state
        .catalog()
        .find_products(&ProductQuery::new(filter, sort, limit))
        .await?;

    Ok(Json(json!({
        "data": products,
        "count": products.len(),
        "query": term,
    })))
}

/// Query parameters for products by section type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProductsQuery {
    #[serde(rename = "type")]
    pub section_type: Option<String>,
    pub limit: Option<i64>,
    pub sort_by: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

/// Products for a section type, with optional overrides.
///
/// A missing or unknown `type` is rejected; there is no fallback type.
#[tracing::instrument(skip(state, query))]
pub async fn by_section(
    State(state): State<AppState>,
    query: QueryResult<SectionProductsQuery>,
) -> Result<Json<Value>> {
    let query = query_params(query)?;
    let section_type = query
        .section_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Section type is required".to_string()))?;

    let overrides = SelectionOverrides {
        category: category_param(query.category.as_deref()),
        tags: query.tags.as_deref().map(parse_tag_list).unwrap_or_default(),
        sort_by: sort_param(query.sort_by.as_deref())?,
        limit: query.limit,
    };
    let product_query = evaluate_named(section_type, &overrides)?;
    let products = state.catalog().find_products(&product_query).await?;

    Ok(Json(json!({
        "data": products,
        "count": products.len(),
        "sectionType": section_type,
        "filters": {
            "category": overrides.category,
            "tags": product_query.filter.tags,
            "sortBy": overrides.sort_by,
            "limit": product_query.limit,
        },
    })))
}

/// Look up an active product by slug.
async fn active_product<S>(store: &S, slug: &str) -> Result<Product>
where
    S: CatalogStore + ?Sized,
{
    let not_found = || AppError::NotFound(format!("product {slug}"));
    let parsed = Slug::parse(slug).map_err(|_| not_found())?;
    store
        .product_by_slug(&parsed)
        .await?
        .filter(Product::is_active)
        .ok_or_else(not_found)
}

/// Show an active product.
#[tracing::instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Product>> {
    Ok(Json(active_product(&state.catalog(), &slug).await?))
}

/// Active products in the same category, best sellers first.
#[tracing::instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Value>> {
    let catalog = state.catalog();
    let product = active_product(&catalog, &slug).await?;

    let products = match product.category_id {
        Some(category_id) => {
            let filter = ProductFilter {
                category: Some(CategoryRef::Id(category_id)),
                exclude: Some(product.id),
                ..ProductFilter::active()
            };
            let query = ProductQuery::new(
                filter,
                SortSpec::for_sort_by(SortBy::Sales),
                LimitPolicy::RELATED.clamp(None),
            );
            catalog.find_products(&query).await?
        }
        None => Vec::new(),
    };

    Ok(Json(json!({
        "data": products,
        "count": products.len(),
    })))
}
