//! Emporium storefront library.
//!
//! Read-side catalog API: section aggregation, product listings, wishlists and
//! coupon checks. Exposed as a library so the router can be tested without a
//! running server.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::http::{Method, header};
use axum::{Router, middleware as axum_middleware, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the storefront router with its middleware stack.
///
/// Health checks sit outside the API rate limiter.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let api = routes::routes().layer(middleware::api_rate_limiter());

    Router::new()
        .route("/health", get(routes::health))
        .route("/health/ready", get(routes::readiness))
        .merge(api)
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{LogFormat, StorefrontConfig};

    fn test_app() -> Router {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/emporium_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            store_timeout: Duration::from_millis(200),
            section_cache_ttl: Duration::ZERO,
            sentry_dsn: None,
            sentry_environment: None,
            log_format: LogFormat::Pretty,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/emporium_test")
            .unwrap();
        app(AppState::new(config, pool))
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.10")
            .body(Body::empty())
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.10")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_skips_database() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_section_products_require_type() {
        let (status, body) = send(get_request("/api/products/section")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Section type is required");
    }

    #[tokio::test]
    async fn test_section_products_reject_unknown_type() {
        let (status, body) = send(get_request("/api/products/section?type=bogus")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn test_section_products_reject_unknown_sort() {
        let (status, _) =
            send(get_request("/api/products/section?type=featured&sortBy=cheapest")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (status, body) = send(get_request("/api/products/search?q=%20")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Search query is required");
    }

    #[tokio::test]
    async fn test_listing_rejects_inverted_price_range() {
        let (status, _) = send(get_request("/api/products?minPrice=50&maxPrice=10")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wishlist_requires_user() {
        let (status, body) = send(get_request("/api/wishlist")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "userId is required");

        let (status, body) = send(json_request(Method::POST, "/api/wishlist", r#"{"productId": 3}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "userId is required");
    }

    #[tokio::test]
    async fn test_wishlist_remove_requires_product() {
        let (status, body) =
            send(json_request(Method::DELETE, "/api/wishlist", r#"{"userId": 7}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "productId is required");
    }

    #[tokio::test]
    async fn test_wishlist_rejects_malformed_json() {
        let (status, body) = send(json_request(Method::POST, "/api/wishlist/merge", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_coupon_validation_requires_code() {
        let (status, _) =
            send(json_request(Method::POST, "/api/coupons/validate", r#"{"subtotal": "10.00"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rate_limited_requests_get_json_error() {
        let app = test_app();
        let mut limited = None;
        for _ in 0..60 {
            let response = app
                .clone()
                .oneshot(get_request("/api/products/section"))
                .await
                .unwrap();
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                limited = Some(response);
                break;
            }
        }

        let response = limited.expect("burst of 50 should be exhausted");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().contains_key(header::RETRY_AFTER));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Too many requests");
    }

    #[tokio::test]
    async fn test_wishlist_limiter_only_counts_writes() {
        let app = test_app();
        for _ in 0..15 {
            let response = app.clone().oneshot(get_request("/api/wishlist")).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let mut statuses = Vec::new();
        for _ in 0..11 {
            let response = app
                .clone()
                .oneshot(json_request(Method::POST, "/api/wishlist", r#"{"productId": 3}"#))
                .await
                .unwrap();
            statuses.push(response.status());
        }
        assert!(statuses[..10].iter().all(|s| *s == StatusCode::BAD_REQUEST));
        assert_eq!(statuses[10], StatusCode::TOO_MANY_REQUESTS);
    }
}
