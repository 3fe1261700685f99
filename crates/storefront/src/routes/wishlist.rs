//! Wishlist route handlers.
//!
//! The caller identifies the user with a `userId` field; authentication is
//! handled upstream.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::wishlist::{Wishlist, WishlistItem};
use emporium_core::{ProductId, UserId};

use super::{json_body, query_params};
use crate::error::{AppError, Result};
use crate::services::wishlist::{AnonymousItem, WishlistReconciler};
use crate::state::AppState;

/// Wishlist response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistResponse {
    pub user_id: UserId,
    pub items: Vec<WishlistItem>,
    pub count: usize,
}

impl From<Wishlist> for WishlistResponse {
    fn from(wishlist: Wishlist) -> Self {
        Self {
            user_id: wishlist.user_id,
            count: wishlist.items.len(),
            items: wishlist.items,
        }
    }
}

fn require_user(user_id: Option<UserId>) -> Result<UserId> {
    user_id.ok_or_else(|| AppError::BadRequest("userId is required".to_string()))
}

fn require_product(product_id: Option<ProductId>) -> Result<ProductId> {
    product_id.ok_or_else(|| AppError::BadRequest("productId is required".to_string()))
}

/// Query parameters for reading a wishlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistQuery {
    pub user_id: Option<UserId>,
}

/// Body for adding or removing one product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistMutation {
    pub user_id: Option<UserId>,
    pub product_id: Option<ProductId>,
}

/// One item of an anonymous wishlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeItem {
    pub product_id: ProductId,
    pub added_at: Option<DateTime<Utc>>,
}

/// Body for merging an anonymous wishlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub items: Vec<MergeItem>,
}

/// Get a user's wishlist.
#[tracing::instrument(skip(state, query))]
pub async fn show(
    State(state): State<AppState>,
    query: std::result::Result<Query<WishlistQuery>, QueryRejection>,
) -> Result<Json<WishlistResponse>> {
    let user_id = require_user(query_params(query)?.user_id)?;

    let catalog = state.catalog();
    let store = state.wishlists();
    let wishlist = WishlistReconciler::new(&catalog, &store).get(user_id).await?;
    Ok(Json(wishlist.into()))
}

/// Add a product to a user's wishlist.
#[tracing::instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    body: std::result::Result<Json<WishlistMutation>, JsonRejection>,
) -> Result<Json<WishlistResponse>> {
    let body = json_body(body)?;
    let user_id = require_user(body.user_id)?;
    let product_id = require_product(body.product_id)?;

    let catalog = state.catalog();
    let store = state.wishlists();
    let wishlist = WishlistReconciler::new(&catalog, &store)
        .add(user_id, product_id)
        .await?;
    Ok(Json(wishlist.into()))
}

/// Remove a product from a user's wishlist.
#[tracing::instrument(skip(state, body))]
pub async fn remove(
    State(state): State<AppState>,
    body: std::result::Result<Json<WishlistMutation>, JsonRejection>,
) -> Result<Json<WishlistResponse>> {
    let body = json_body(body)?;
    let user_id = require_user(body.user_id)?;
    let product_id = require_product(body.product_id)?;

    let catalog = state.catalog();
    let store = state.wishlists();
    let wishlist = WishlistReconciler::new(&catalog, &store)
        .remove(user_id, product_id)
        .await?;
    Ok(Json(wishlist.into()))
}

/// Merge the anonymous wishlist sent on login.
#[tracing::instrument(skip(state, body))]
pub async fn merge(
    State(state): State<AppState>,
    body: std::result::Result<Json<MergeRequest>, JsonRejection>,
) -> Result<Json<WishlistResponse>> {
    let body = json_body(body)?;
    let user_id = require_user(body.user_id)?;
    let items: Vec<AnonymousItem> = body
        .items
        .into_iter()
        .map(|i| AnonymousItem {
            product_id: i.product_id,
            added_at: i.added_at,
        })
        .collect();

    let catalog = state.catalog();
    let store = state.wishlists();
    let wishlist = WishlistReconciler::new(&catalog, &store)
        .reconcile(user_id, &items)
        .await?;
    Ok(Json(wishlist.into()))
}
