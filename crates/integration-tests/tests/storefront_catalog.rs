//! Integration tests for the public storefront API.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The storefront server running (cargo run -p emporium-storefront)
//!
//! Run with: cargo test -p emporium-integration-tests -- --ignored

use emporium_integration_tests::{client, expect_json, storefront_base_url};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_and_request_id() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/health"))
        .header("x-request-id", "it-health-check")
        .send()
        .await
        .expect("Failed to call health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some(&b"it-health-check"[..])
    );
    assert!(resp.headers().contains_key("x-content-type-options"));

    let resp = client()
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to call readiness");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_product_listing_shape() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/api/products?limit=5&sortBy=price-low"))
        .send()
        .await
        .expect("Failed to list products");
    let body = expect_json(resp, StatusCode::OK).await;

    let data = body["data"].as_array().expect("data is an array");
    assert!(data.len() <= 5);
    assert_eq!(body["meta"]["limit"], 5);
    assert_eq!(body["meta"]["page"], 1);
    for product in data {
        assert_eq!(product["status"], "active");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_listing_clamps_limit() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/api/products?limit=5000"))
        .send()
        .await
        .expect("Failed to list products");
    let body = expect_json(resp, StatusCode::OK).await;
    assert!(body["meta"]["limit"].as_u64().expect("limit") <= 50);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_section_type_validation() {
    let base_url = storefront_base_url();

    let resp = client()
        .get(format!("{base_url}/api/products/section?type=bargains"))
        .send()
        .await
        .expect("Failed to call section products");
    let body = expect_json(resp, StatusCode::BAD_REQUEST).await;
    assert!(body["error"].is_string());

    let resp = client()
        .get(format!("{base_url}/api/products/section?type=best-sellers&limit=3"))
        .send()
        .await
        .expect("Failed to call section products");
    let body = expect_json(resp, StatusCode::OK).await;
    assert_eq!(body["sectionType"], "best-sellers");
    assert!(body["count"].as_u64().expect("count") <= 3);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_sections_report_failures_separately() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/api/sections?all=true"))
        .send()
        .await
        .expect("Failed to list sections");
    let body = expect_json(resp, StatusCode::OK).await;

    assert!(body["data"].is_array());
    assert!(body["errors"].is_array());
    assert!(body["meta"]["total"].is_number());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_not_found() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/api/products/no-such-product-anywhere"))
        .send()
        .await
        .expect("Failed to get product");
    expect_json(resp, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_search_requires_query() {
    let base_url = storefront_base_url();
    let resp = client()
        .get(format!("{base_url}/api/products/search?q=%20"))
        .send()
        .await
        .expect("Failed to search");
    expect_json(resp, StatusCode::BAD_REQUEST).await;
}
