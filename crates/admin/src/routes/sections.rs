//! Product section administration handlers.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
};

use emporium_core::SectionId;
use emporium_core::section::ProductSection;

use super::{json_body, or_not_found};
use crate::error::{AppError, Result};
use crate::normalize::{self, SectionInput};
use crate::state::AppState;

/// List every section in display order.
#[tracing::instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductSection>>> {
    Ok(Json(state.sections().list().await?))
}

/// Create a section.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<SectionInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductSection>)> {
    let section = normalize::section(json_body(body)?)?;
    let created = state.sections().create(&section).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Show a section.
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<SectionId>,
) -> Result<Json<ProductSection>> {
    state
        .sections()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("section {id}")))
}

/// Replace a section.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<SectionId>,
    body: std::result::Result<Json<SectionInput>, JsonRejection>,
) -> Result<Json<ProductSection>> {
    let section = normalize::section(json_body(body)?)?;
    let updated = state
        .sections()
        .update(id, &section)
        .await
        .map_err(or_not_found(format!("section {id}")))?;
    Ok(Json(updated))
}

/// Delete a section.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<SectionId>,
) -> Result<StatusCode> {
    state
        .sections()
        .delete(id)
        .await
        .map_err(or_not_found(format!("section {id}")))?;
    Ok(StatusCode::NO_CONTENT)
}
