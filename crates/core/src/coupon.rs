//! Coupons and the discount rule applied at checkout confirmation.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::CouponId;

/// Shortest accepted coupon code.
pub const MIN_CODE_LENGTH: usize = 3;
/// Longest accepted coupon code.
pub const MAX_CODE_LENGTH: usize = 32;

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    /// `value` percent off, `0 < value <= 100`.
    Percentage,
    /// `value` off in store currency, never below zero.
    Fixed,
}

impl DiscountKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }
}

impl std::str::FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            _ => Err(format!("invalid discount kind: {s}")),
        }
    }
}

/// A discount coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    /// Uppercase code, see [`normalize_code`].
    pub code: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub minimum_subtotal: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponError {
    #[error("coupon code must be 3-32 characters of A-Z, 0-9, '-' or '_'")]
    InvalidCode,
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotStarted,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageExhausted,
    #[error("order subtotal must be at least {minimum}")]
    BelowMinimum { minimum: Decimal },
    #[error("order subtotal cannot be negative")]
    NegativeSubtotal,
}

/// Result of applying a coupon to a subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub code: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Normalize a user-typed coupon code: trim and uppercase, then validate.
///
/// # Errors
///
/// Returns [`CouponError::InvalidCode`] for empty, overlong or non
/// `[A-Z0-9_-]` codes.
pub fn normalize_code(raw: &str) -> Result<String, CouponError> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = (MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if valid { Ok(code) } else { Err(CouponError::InvalidCode) }
}

impl Coupon {
    /// Check eligibility at `now` and compute the discount for `subtotal`.
    ///
    /// Percentage discounts are rounded half-away-from-zero to cents; fixed
    /// discounts are capped at the subtotal.
    ///
    /// # Errors
    ///
    /// Returns the first eligibility rule the coupon fails.
    pub fn apply(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<AppliedDiscount, CouponError> {
        if subtotal.is_sign_negative() {
            return Err(CouponError::NegativeSubtotal);
        }
        if !self.is_active {
            return Err(CouponError::Inactive);
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Err(CouponError::NotStarted);
        }
        if self.expires_at.is_some_and(|end| now >= end) {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponError::UsageExhausted);
        }
        if let Some(minimum) = self.minimum_subtotal
            && subtotal < minimum
        {
            return Err(CouponError::BelowMinimum { minimum });
        }

        let discount = match self.kind {
            DiscountKind::Percentage => (subtotal * self.value / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            DiscountKind::Fixed => self.value,
        }
        .min(subtotal);

        Ok(AppliedDiscount {
            code: self.code.clone(),
            subtotal,
            discount,
            total: subtotal - discount,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(kind: DiscountKind, value: Decimal) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "SUMMER10".to_string(),
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

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  summer-10 ").unwrap(), "SUMMER-10");
        assert_eq!(normalize_code("ab"), Err(CouponError::InvalidCode));
        assert_eq!(normalize_code("no spaces"), Err(CouponError::InvalidCode));
        assert_eq!(normalize_code(&"A".repeat(33)), Err(CouponError::InvalidCode));
    }

    #[test]
    fn test_percentage_discount_rounds_to_cents() {
        let c = coupon(DiscountKind::Percentage, Decimal::from(15));
        let applied = c.apply(Decimal::new(3333, 2), Utc::now()).unwrap();
        // 15% of 33.33 = 4.9995
        assert_eq!(applied.discount, Decimal::new(500, 2));
        assert_eq!(applied.total, Decimal::new(2833, 2));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let c = coupon(DiscountKind::Fixed, Decimal::from(50));
        let applied = c.apply(Decimal::from(20), Utc::now()).unwrap();
        assert_eq!(applied.discount, Decimal::from(20));
        assert_eq!(applied.total, Decimal::ZERO);
    }

    #[test]
    fn test_window_and_usage_rules() {
        let now = Utc::now();
        let mut c = coupon(DiscountKind::Fixed, Decimal::from(5));

        c.starts_at = Some(now + Duration::hours(1));
        assert_eq!(c.apply(Decimal::from(10), now), Err(CouponError::NotStarted));

        c.starts_at = None;
        c.expires_at = Some(now);
        assert_eq!(c.apply(Decimal::from(10), now), Err(CouponError::Expired));

        c.expires_at = None;
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert_eq!(
            c.apply(Decimal::from(10), now),
            Err(CouponError::UsageExhausted)
        );

        c.usage_limit = None;
        c.is_active = false;
        assert_eq!(c.apply(Decimal::from(10), now), Err(CouponError::Inactive));
    }

    #[test]
    fn test_minimum_subtotal() {
        let mut c = coupon(DiscountKind::Fixed, Decimal::from(5));
        c.minimum_subtotal = Some(Decimal::from(30));
        assert_eq!(
            c.apply(Decimal::from(29), Utc::now()),
            Err(CouponError::BelowMinimum {
                minimum: Decimal::from(30)
            })
        );
        assert!(c.apply(Decimal::from(30), Utc::now()).is_ok());
    }

    #[test]
    fn test_negative_subtotal_rejected() {
        let c = coupon(DiscountKind::Fixed, Decimal::from(5));
        assert_eq!(
            c.apply(Decimal::from(-1), Utc::now()),
            Err(CouponError::NegativeSubtotal)
        );
    }
}
