//! Integration tests for Emporium.
//!
//! These tests talk HTTP to running servers and are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! emporium migrate
//! cargo run -p emporium-storefront &
//! cargo run -p emporium-admin &
//! cargo test -p emporium-integration-tests -- --ignored
//! ```
//!
//! Set `STOREFRONT_BASE_URL` and `ADMIN_BASE_URL` to target other hosts.
//! Set `STOREFRONT_SECTION_CACHE_TTL_SECS=0` on the storefront so section
//! changes show up immediately.

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Base URL for the admin API.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// HTTP client for tests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

/// A suffix that keeps names and slugs from colliding across runs.
#[must_use]
pub fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(12).collect()
}

/// A user id unlikely to collide with other runs.
#[must_use]
pub fn unique_user_id() -> i32 {
    i32::try_from(uuid::Uuid::new_v4().as_fields().0 >> 1).unwrap_or(i32::MAX)
}

/// Assert the status and return the JSON body.
///
/// # Panics
///
/// Panics if the status differs or the body is not JSON.
pub async fn expect_json(resp: Response, status: StatusCode) -> Value {
    let actual = resp.status();
    let body = resp.text().await.expect("Failed to read response");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    serde_json::from_str(&body).expect("Response is not JSON")
}
