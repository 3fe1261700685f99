//! Product administration handlers.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use emporium_core::catalog::{CategoryRef, Product};
use emporium_core::selection::LimitPolicy;
use emporium_core::{ProductId, ProductStatus};

use super::{json_body, or_not_found};
use crate::db::ProductListFilter;
use crate::error::{AppError, Result};
use crate::normalize::{self, ProductInput};
use crate::state::AppState;

/// Page size policy for the admin product list.
const ADMIN_LIST: LimitPolicy = LimitPolicy {
    default: 50,
    cap: 200,
};

/// Query parameters for the product list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn filter(&self) -> Result<ProductListFilter> {
        let status = self
            .status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<ProductStatus>)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<CategoryRef>().ok());

        Ok(ProductListFilter {
            status,
            category,
            q: self.q.clone(),
        })
    }
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

/// List products in any status.
#[tracing::instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ProductPage>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = query.filter()?;
    let limit = ADMIN_LIST.clamp(query.limit);
    let page = query
        .page
        .map_or(1, |p| u32::try_from(p.max(1)).unwrap_or(u32::MAX));
    let offset = (page - 1).saturating_mul(limit);

    let (products, total) = state.products().list(&filter, limit, offset).await?;

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

/// Create a product.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = normalize::product(json_body(body)?)?;
    let created = state.products().create(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Show a product in any status.
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    state
        .products()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Replace a product.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    body: std::result::Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<Product>> {
    let product = normalize::product(json_body(body)?)?;
    let updated = state
        .products()
        .update(id, &product)
        .await
        .map_err(or_not_found(format!("product {id}")))?;
    Ok(Json(updated))
}

/// Body for a status change.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ProductStatus,
}

/// Move a product to another status.
#[tracing::instrument(skip(state, body))]
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    body: std::result::Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<Product>> {
    let change = json_body(body)?;
    let product = state
        .products()
        .set_status(id, change.status)
        .await
        .map_err(or_not_found(format!("product {id}")))?;
    Ok(Json(product))
}

/// "Delete" a product by marking it inactive.
#[tracing::instrument(skip(state))]
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .products()
        .set_status(id, ProductStatus::Inactive)
        .await
        .map_err(or_not_found(format!("product {id}")))?;
    Ok(Json(product))
}
