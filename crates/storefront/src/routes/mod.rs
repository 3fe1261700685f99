//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness check
//! GET  /health/ready                   - Readiness check (database)
//!
//! # Sections
//! GET  /api/sections                   - Resolved landing page sections (?all=&page=&limit=)
//! GET  /api/sections/{slug}            - One resolved section
//!
//! # Products
//! GET  /api/products                   - Listing (?category=&tags=&minPrice=&maxPrice=&sortBy=&page=&limit=)
//! GET  /api/products/search            - Search (?q=&limit=)
//! GET  /api/products/section           - Products for a section type (?type=&limit=&sortBy=&category=&tags=)
//! GET  /api/products/{slug}            - Product detail
//! GET  /api/products/{slug}/related    - Related products
//!
//! # Categories
//! GET  /api/categories                 - Active categories
//!
//! # Wishlist
//! GET    /api/wishlist?userId=         - Persisted wishlist
//! POST   /api/wishlist                 - Add {userId, productId}
//! DELETE /api/wishlist                 - Remove {userId, productId}
//! POST   /api/wishlist/merge           - Merge anonymous wishlist {userId, items}
//!
//! # Coupons
//! POST /api/coupons/validate           - Check a code against a subtotal
//! ```

pub mod categories;
pub mod coupons;
pub mod products;
pub mod sections;
pub mod wishlist;

use axum::{
    Json, Router,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// Unwrap a query extractor, reporting malformed parameters as JSON 400s.
pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Unwrap a JSON body extractor, reporting malformed bodies as JSON 400s.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(b)| b)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Create the section routes router.
pub fn section_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sections::index))
        .route("/{slug}", get(sections::show))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/search", get(products::search))
        .route("/section", get(products::by_section))
        .route("/{slug}", get(products::show))
        .route("/{slug}/related", get(products::related))
}

/// Create the wishlist routes router.
///
/// Writes share the stricter wishlist limiter; reads only count against the
/// general API limit.
pub fn wishlist_routes() -> Router<AppState> {
    let writes = crate::middleware::wishlist_rate_limiter();
    Router::new()
        .route(
            "/",
            post(wishlist::add)
                .delete(wishlist::remove)
                .layer(writes.clone())
                .get(wishlist::show),
        )
        .route("/merge", post(wishlist::merge).layer(writes))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/sections", section_routes())
        .nest("/api/products", product_routes())
        .route("/api/categories", get(categories::index))
        .nest("/api/wishlist", wishlist_routes())
        .route("/api/coupons/validate", post(coupons::validate))
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
