//! Landing page section handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::rejection::QueryRejection,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use emporium_core::Slug;

use super::query_params;
use crate::db::SectionStore;
use crate::error::{AppError, Result};
use crate::services::sections::{
    AggregatedSections, ResolvedSection, SectionPage, aggregate_sections, resolve_section,
};
use crate::state::AppState;

/// Query parameters for the section list.
#[derive(Debug, Deserialize)]
pub struct SectionsQuery {
    pub all: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Aggregate sections, serving complete pages from the cache when enabled.
///
/// Pages with failed sections are not cached so the next request retries them.
async fn load_sections(state: &AppState, request: SectionPage) -> Result<Arc<AggregatedSections>> {
    if let Some(cache) = state.section_cache()
        && let Some(hit) = cache.get(&request).await
    {
        return Ok(hit);
    }

    let aggregated = Arc::new(aggregate_sections(&state.catalog(), request).await?);

    if let Some(cache) = state.section_cache()
        && aggregated.failures.is_empty()
    {
        cache.insert(request, Arc::clone(&aggregated)).await;
    }
    Ok(aggregated)
}

/// List the resolved active sections.
///
/// Responds with `{data, meta, errors}`; `errors` lists sections that could
/// not be resolved and were left out.
#[tracing::instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<SectionsQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let query = query_params(query)?;
    let request = SectionPage::from_params(query.all.unwrap_or(false), query.page, query.limit);
    let page = load_sections(&state, request).await?;

    Ok(Json(json!({
        "data": page.sections,
        "meta": {
            "total": page.total,
            "page": page.page,
            "limit": page.limit,
            "returned": page.sections.len(),
        },
        "errors": page.failures,
    })))
}

/// Show one active section with its products.
#[tracing::instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ResolvedSection>> {
    let not_found = || AppError::NotFound(format!("section {slug}"));
    let parsed = Slug::parse(&slug).map_err(|_| not_found())?;

    let catalog = state.catalog();
    let section = catalog
        .active_section_by_slug(&parsed)
        .await?
        .ok_or_else(not_found)?;
    let products = resolve_section(&catalog, &section).await?;

    Ok(Json(ResolvedSection { section, products }))
}
