//! Product writes and the any-status admin listing.

use std::time::Duration;

use sqlx::{PgPool, Postgres, QueryBuilder};

use emporium_core::catalog::{CategoryRef, Product};
use emporium_core::rows::{PRODUCT_COLUMNS, ProductRow, like_pattern};
use emporium_core::{ProductId, ProductStatus};

use super::categories::resolve_ref;
use super::{RepositoryError, bounded, write_error};
use crate::normalize::NewProduct;

/// Filters for the admin product list. Unlike the storefront, any status is
/// visible.
#[derive(Debug, Clone, Default)]
pub struct ProductListFilter {
    pub status: Option<ProductStatus>,
    pub category: Option<CategoryRef>,
    /// Case-insensitive substring over name and slug.
    pub q: Option<String>,
}

/// Append `WHERE ...` for an admin filter over `catalog.product p`.
fn push_list_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductListFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    match &filter.category {
        Some(CategoryRef::Id(id)) => {
            qb.push(" AND p.category_id = ").push_bind(id.as_i32());
        }
        Some(CategoryRef::Slug(slug)) => {
            qb.push(" AND p.category_id = (SELECT c.id FROM catalog.category c WHERE c.slug = ")
                .push_bind(slug.clone())
                .push(")");
        }
        None => {}
    }
    if let Some(term) = filter.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.slug ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn into_product(row: ProductRow) -> Result<Product, RepositoryError> {
    Ok(Product::try_from(row)?)
}

/// Repository for product writes.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// One page of products, newest first, with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductListFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        bounded(self.timeout, async {
            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.product p");
            push_list_filter(&mut count, filter);
            let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

            let mut qb =
                QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p"));
            push_list_filter(&mut qb, filter);
            qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
                .push_bind(i64::from(limit))
                .push(" OFFSET ")
                .push_bind(i64::from(offset));
            let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool).await?;

            let products = rows.into_iter().map(into_product).collect::<Result<_, _>>()?;
            Ok((products, total))
        })
        .await
    }

    /// Get a product by ID in any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = $1");
            let row = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;
            row.map(into_product).transpose()
        })
        .await
    }

    /// Resolve the category reference of a product being written.
    async fn category_id(&self, category: Option<&CategoryRef>) -> Result<Option<i32>, RepositoryError> {
        let Some(reference) = category else {
            return Ok(None);
        };
        resolve_ref(self.pool, reference)
            .await?
            .map(|id| Some(id.as_i32()))
            .ok_or_else(|| RepositoryError::UnknownReference(format!("category {reference}")))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownReference` for an unknown category and
    /// `RepositoryError::Conflict` if the slug is taken.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        bounded(self.timeout, async {
            let category_id = self.category_id(input.category.as_ref()).await?;
            let sql = format!(
                r"
                INSERT INTO catalog.product AS p (
                    name, slug, description, price, original_price, category_id, tags,
                    status, featured, is_new, is_sale, rating_average, rating_count,
                    sales_count, sales_revenue
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                RETURNING {PRODUCT_COLUMNS}
                "
            );
            let row = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(&input.name)
                .bind(input.slug.as_str())
                .bind(&input.description)
                .bind(input.price)
                .bind(input.original_price)
                .bind(category_id)
                .bind(&input.tags)
                .bind(input.status)
                .bind(input.featured)
                .bind(input.is_new)
                .bind(input.is_sale)
                .bind(input.rating.average)
                .bind(input.rating.count)
                .bind(input.sales.count)
                .bind(input.sales.revenue)
                .fetch_one(self.pool)
                .await
                .map_err(|e| write_error(e, "product"))?;

            let product = into_product(row)?;
            tracing::info!(product_id = %product.id, "Product created");
            Ok(product)
        })
        .await
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist,
    /// `RepositoryError::UnknownReference` for an unknown category and
    /// `RepositoryError::Conflict` if the slug is taken.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(&self, id: ProductId, input: &NewProduct) -> Result<Product, RepositoryError> {
        bounded(self.timeout, async {
            let category_id = self.category_id(input.category.as_ref()).await?;
            let sql = format!(
                r"
                UPDATE catalog.product AS p
                SET name = $2, slug = $3, description = $4, price = $5, original_price = $6,
                    category_id = $7, tags = $8, status = $9, featured = $10, is_new = $11,
                    is_sale = $12, rating_average = $13, rating_count = $14,
                    sales_count = $15, sales_revenue = $16, updated_at = NOW()
                WHERE p.id = $1
                RETURNING {PRODUCT_COLUMNS}
                "
            );
            let row = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(id.as_i32())
                .bind(&input.name)
                .bind(input.slug.as_str())
                .bind(&input.description)
                .bind(input.price)
                .bind(input.original_price)
                .bind(category_id)
                .bind(&input.tags)
                .bind(input.status)
                .bind(input.featured)
                .bind(input.is_new)
                .bind(input.is_sale)
                .bind(input.rating.average)
                .bind(input.rating.count)
                .bind(input.sales.count)
                .bind(input.sales.revenue)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| write_error(e, "product"))?
                .ok_or(RepositoryError::NotFound)?;

            into_product(row)
        })
        .await
    }

    /// Move a product to a new status. Deleting a product is a move to
    /// `inactive`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: ProductId,
        status: ProductStatus,
    ) -> Result<Product, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!(
                "UPDATE catalog.product AS p SET status = $2, updated_at = NOW() \
                 WHERE p.id = $1 RETURNING {PRODUCT_COLUMNS}"
            );
            let row = sqlx::query_as::<_, ProductRow>(&sql)
                .bind(id.as_i32())
                .bind(status)
                .fetch_optional(self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;

            tracing::info!(product_id = %id, status = %status, "Product status changed");
            into_product(row)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use emporium_core::CategoryId;

    use super::*;

    fn list_sql(filter: &ProductListFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT p.id FROM catalog.product p");
        push_list_filter(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn test_unfiltered_list_sees_every_status() {
        assert_eq!(
            list_sql(&ProductListFilter::default()),
            "SELECT p.id FROM catalog.product p WHERE TRUE"
        );
    }

    #[test]
    fn test_list_filters() {
        let filter = ProductListFilter {
            status: Some(ProductStatus::Draft),
            category: Some(CategoryRef::Id(CategoryId::new(3))),
            q: Some(" dress ".to_string()),
        };
        assert_eq!(
            list_sql(&filter),
            "SELECT p.id FROM catalog.product p WHERE TRUE AND p.status = $1 \
             AND p.category_id = $2 AND (p.name ILIKE $3 OR p.slug ILIKE $4)"
        );
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let filter = ProductListFilter {
            q: Some("   ".to_string()),
            ..ProductListFilter::default()
        };
        assert!(!list_sql(&filter).contains("ILIKE"));
    }
}
