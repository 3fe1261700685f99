//! Coupon administration handlers.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
};

use emporium_core::CouponId;
use emporium_core::coupon::Coupon;

use super::{json_body, or_not_found};
use crate::error::Result;
use crate::normalize::{self, CouponInput};
use crate::state::AppState;

/// List coupons, newest first.
#[tracing::instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(state.coupons().list().await?))
}

/// Create a coupon. The code is stored uppercase.
#[tracing::instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<CouponInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = normalize::coupon(json_body(body)?)?;
    let created = state.coupons().create(&coupon).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a coupon's terms.
#[tracing::instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
    body: std::result::Result<Json<CouponInput>, JsonRejection>,
) -> Result<Json<Coupon>> {
    let coupon = normalize::coupon(json_body(body)?)?;
    let updated = state
        .coupons()
        .update(id, &coupon)
        .await
        .map_err(or_not_found(format!("coupon {id}")))?;
    Ok(Json(updated))
}

/// Delete a coupon.
#[tracing::instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
) -> Result<StatusCode> {
    state
        .coupons()
        .delete(id)
        .await
        .map_err(or_not_found(format!("coupon {id}")))?;
    Ok(StatusCode::NO_CONTENT)
}
