//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (database)
//!
//! # Products (any status; delete moves to inactive)
//! GET    /api/products                 - List (?status=&category=&q=&page=&limit=)
//! POST   /api/products                 - Create
//! GET    /api/products/{id}            - Detail
//! PUT    /api/products/{id}            - Replace
//! PATCH  /api/products/{id}/status     - Change status {status}
//! DELETE /api/products/{id}            - Deactivate
//!
//! # Categories
//! GET    /api/categories               - List with child ids
//! POST   /api/categories               - Create
//! GET    /api/categories/{id}          - Detail
//! PUT    /api/categories/{id}          - Replace (parent changes are cycle-checked)
//! DELETE /api/categories/{id}          - Delete
//!
//! # Sections
//! GET    /api/sections                 - List in display order
//! POST   /api/sections                 - Create
//! GET    /api/sections/{id}            - Detail
//! PUT    /api/sections/{id}            - Replace
//! DELETE /api/sections/{id}            - Delete
//!
//! # Coupons
//! GET    /api/coupons                  - List
//! POST   /api/coupons                  - Create
//! PUT    /api/coupons/{id}             - Replace
//! DELETE /api/coupons/{id}             - Delete
//! ```

pub mod categories;
pub mod coupons;
pub mod products;
pub mod sections;

use axum::{
    Json, Router,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    routing::{get, patch, put},
};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::state::AppState;

/// Unwrap a JSON body extractor, reporting malformed bodies as JSON 400s.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(b)| b)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Map a repository error, naming the entity when it is missing.
pub(crate) fn or_not_found(what: String) -> impl FnOnce(RepositoryError) -> AppError {
    move |err| match err {
        RepositoryError::NotFound => AppError::NotFound(what),
        other => AppError::from(other),
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::deactivate),
        )
        .route("/{id}/status", patch(products::set_status))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route(
            "/{id}",
            get(categories::show)
                .put(categories::update)
                .delete(categories::delete),
        )
}

/// Create the section routes router.
pub fn section_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sections::index).post(sections::create))
        .route(
            "/{id}",
            get(sections::show)
                .put(sections::update)
                .delete(sections::delete),
        )
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/{id}", put(coupons::update).delete(coupons::delete))
}

/// Create all API routes for admin.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/categories", category_routes())
        .nest("/api/sections", section_routes())
        .nest("/api/coupons", coupon_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable within
/// the store timeout.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let ping = sqlx::query("SELECT 1").fetch_one(state.pool());
    match tokio::time::timeout(state.config().store_timeout, ping).await {
        Ok(Ok(_)) => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}
