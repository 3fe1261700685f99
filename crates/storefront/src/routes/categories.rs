//! Category route handlers.

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::db::CatalogStore;
use crate::error::Result;
use crate::state::AppState;

/// List active categories with their child ids.
#[tracing::instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Value>> {
    let categories = state.catalog().active_categories().await?;

    Ok(Json(json!({
        "data": categories,
        "count": categories.len(),
    })))
}
