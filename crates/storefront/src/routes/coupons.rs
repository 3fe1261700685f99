//! Coupon confirmation at checkout.

use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use emporium_core::coupon::{AppliedDiscount, CouponError, normalize_code};

use super::json_body;
use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Body for validating a coupon.
#[derive(Debug, Deserialize)]
pub struct ValidateCoupon {
    pub code: Option<String>,
    pub subtotal: Option<Decimal>,
}

/// Look up a coupon by code and apply it to `subtotal`.
async fn confirm<S>(store: &S, raw: &str, subtotal: Decimal) -> Result<AppliedDiscount>
where
    S: CatalogStore + ?Sized,
{
    let code = normalize_code(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let coupon = store
        .coupon_by_code(&code)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("coupon {code}")))?;

    coupon
        .apply(subtotal, Utc::now())
        .map_err(|e| match e {
            CouponError::NegativeSubtotal | CouponError::InvalidCode => {
                AppError::BadRequest(e.to_string())
            }
            _ => AppError::Unprocessable(e.to_string()),
        })
}

/// Check a coupon code against an order subtotal.
///
/// Unknown codes are 404; codes that exist but cannot be applied (inactive,
/// outside their window, used up, subtotal too low) are 422 with the reason.
#[tracing::instrument(skip(state, body))]
pub async fn validate(
    State(state): State<AppState>,
    body: std::result::Result<Json<ValidateCoupon>, JsonRejection>,
) -> Result<Json<AppliedDiscount>> {
    let body = json_body(body)?;
    let raw = body
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("code is required".to_string()))?;
    let subtotal = body
        .subtotal
        .ok_or_else(|| AppError::BadRequest("subtotal is required".to_string()))?;

    Ok(Json(confirm(&state.catalog(), &raw, subtotal).await?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use emporium_core::CouponId;
    use emporium_core::coupon::{Coupon, DiscountKind};

    use super::*;
    use crate::services::testing::InMemoryStore;

    fn coupon(code: &str, kind: DiscountKind, value: Decimal) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: code.to_string(),
            description: None,
            kind,
            value,
            minimum_subtotal: None,
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_confirm_normalizes_code() {
        let store = InMemoryStore::default();
        store.add_coupon(coupon("SPRING10", DiscountKind::Percentage, Decimal::from(10)));

        let applied = confirm(&store, " spring10 ", Decimal::new(5000, 2)).await.unwrap();
        assert_eq!(applied.code, "SPRING10");
        assert_eq!(applied.discount, Decimal::new(500, 2));
        assert_eq!(applied.total, Decimal::new(4500, 2));
    }

    #[tokio::test]
    async fn test_confirm_unknown_code_is_not_found() {
        let store = InMemoryStore::default();
        assert!(matches!(
            confirm(&store, "NOPE123", Decimal::from(10)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_reports_unusable_coupon() {
        let store = InMemoryStore::default();
        let mut expired = coupon("OLD-DEAL", DiscountKind::Fixed, Decimal::from(5));
        expired.expires_at = Some(Utc::now() - Duration::days(1));
        store.add_coupon(expired);
        let mut limited = coupon("BIGSPEND", DiscountKind::Fixed, Decimal::from(5));
        limited.minimum_subtotal = Some(Decimal::from(100));
        store.add_coupon(limited);

        assert!(matches!(
            confirm(&store, "old-deal", Decimal::from(20)).await,
            Err(AppError::Unprocessable(_))
        ));
        assert!(matches!(
            confirm(&store, "bigspend", Decimal::from(20)).await,
            Err(AppError::Unprocessable(_))
        ));
        assert!(matches!(
            confirm(&store, "x", Decimal::from(20)).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
