//! Category administration handlers.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
};

use emporium_core::CategoryId;
use emporium_core::catalog::Category;

use super::{json_body, or_not_found};
use crate::error::{AppError, Result};
use crate::normalize::{self, CategoryInput};
use crate::state::AppState;

/// List every category with its child ids.
#[tracing::instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.categories().list().await?))
}

/// Create a category. A missing parent is a conflict.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<CategoryInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = normalize::category(json_body(body)?)?;
    let created = state.categories().create(&category).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Show a category.
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<Category>> {
    state
        .categories()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))
}

/// Replace a category. Re-parenting under itself or a descendant is a
/// conflict.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    body: std::result::Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<Category>> {
    let category = normalize::category(json_body(body)?)?;
    let updated = state
        .categories()
        .update(id, &category)
        .await
        .map_err(or_not_found(format!("category {id}")))?;
    Ok(Json(updated))
}

/// Delete a category.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    state
        .categories()
        .delete(id)
        .await
        .map_err(or_not_found(format!("category {id}")))?;
    Ok(StatusCode::NO_CONTENT)
}
