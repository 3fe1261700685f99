//! Coupon writes.

use std::time::Duration;

use sqlx::PgPool;

use emporium_core::CouponId;
use emporium_core::coupon::Coupon;
use emporium_core::rows::{COUPON_COLUMNS, CouponRow};

use super::{RepositoryError, bounded, write_error};
use crate::normalize::NewCoupon;

fn into_coupon(row: CouponRow) -> Result<Coupon, RepositoryError> {
    Ok(Coupon::try_from(row)?)
}

/// Repository for coupon writes.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!("SELECT {COUPON_COLUMNS} FROM catalog.coupon ORDER BY created_at DESC, id DESC");
            let rows = sqlx::query_as::<_, CouponRow>(&sql)
                .fetch_all(self.pool)
                .await?;
            rows.into_iter().map(into_coupon).collect()
        })
        .await
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: &NewCoupon) -> Result<Coupon, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!(
                r"
                INSERT INTO catalog.coupon (
                    code, description, discount_kind, discount_value, minimum_subtotal,
                    usage_limit, starts_at, expires_at, is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {COUPON_COLUMNS}
                "
            );
            let row = sqlx::query_as::<_, CouponRow>(&sql)
                .bind(&input.code)
                .bind(&input.description)
                .bind(input.kind.as_str())
                .bind(input.value)
                .bind(input.minimum_subtotal)
                .bind(input.usage_limit)
                .bind(input.starts_at)
                .bind(input.expires_at)
                .bind(input.is_active)
                .fetch_one(self.pool)
                .await
                .map_err(|e| write_error(e, "coupon"))?;

            let coupon = into_coupon(row)?;
            tracing::info!(coupon_id = %coupon.id, "Coupon created");
            Ok(coupon)
        })
        .await
    }

    /// Replace a coupon's terms. The usage count is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist and
    /// `RepositoryError::Conflict` if the code is taken.
    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn update(&self, id: CouponId, input: &NewCoupon) -> Result<Coupon, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!(
                r"
                UPDATE catalog.coupon
                SET code = $2, description = $3, discount_kind = $4, discount_value = $5,
                    minimum_subtotal = $6, usage_limit = $7, starts_at = $8, expires_at = $9,
                    is_active = $10
                WHERE id = $1
                RETURNING {COUPON_COLUMNS}
                "
            );
            let row = sqlx::query_as::<_, CouponRow>(&sql)
                .bind(id.as_i32())
                .bind(&input.code)
                .bind(&input.description)
                .bind(input.kind.as_str())
                .bind(input.value)
                .bind(input.minimum_subtotal)
                .bind(input.usage_limit)
                .bind(input.starts_at)
                .bind(input.expires_at)
                .bind(input.is_active)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| write_error(e, "coupon"))?
                .ok_or(RepositoryError::NotFound)?;

            into_coupon(row)
        })
        .await
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        bounded(self.timeout, async {
            let result = sqlx::query("DELETE FROM catalog.coupon WHERE id = $1")
                .bind(id.as_i32())
                .execute(self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            tracing::info!(coupon_id = %id, "Coupon deleted");
            Ok(())
        })
        .await
    }
}
