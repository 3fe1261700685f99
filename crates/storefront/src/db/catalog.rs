//! Catalog reads: products, categories, sections and coupons.
//!
//! Typed [`ProductQuery`] values are turned into SQL here and nowhere else.
//! Column names in ORDER BY come from a closed enum; every user-supplied value
//! is bound.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use emporium_core::catalog::{Category, CategoryRef, Product};
use emporium_core::coupon::Coupon;
use emporium_core::rows::{
    CATEGORY_COLUMNS, COUPON_COLUMNS, CategoryRow, CouponRow, PRODUCT_COLUMNS, ProductRow,
    SECTION_COLUMNS, SectionRow, like_pattern,
};
use emporium_core::section::ProductSection;
use emporium_core::selection::{
    ProductFilter, ProductQuery, SectionPredicate, SortDirection, SortField, SortSpec,
};
use emporium_core::{ProductId, Slug};

use super::{CatalogStore, RepositoryError, SectionStore, bounded};

/// Repository for catalog reads.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

/// Append `WHERE ...` for a product filter over `catalog.product p`.
pub(crate) fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE p.status = ").push_bind(filter.status);

    match filter.predicate {
        Some(SectionPredicate::Featured) => {
            qb.push(" AND p.featured");
        }
        Some(SectionPredicate::IsNew) => {
            qb.push(" AND p.is_new");
        }
        Some(SectionPredicate::HasSales) => {
            qb.push(" AND p.sales_count > 0");
        }
        Some(SectionPredicate::OnSale) => {
            qb.push(" AND p.is_sale");
        }
        Some(SectionPredicate::MinRating(min)) => {
            qb.push(" AND p.rating_average >= ").push_bind(min);
        }
        None => {}
    }

    match &filter.category {
        Some(CategoryRef::Id(id)) => {
            qb.push(" AND p.category_id = ").push_bind(id.as_i32());
        }
        Some(CategoryRef::Slug(slug)) => {
            // An unknown slug yields NULL, which matches nothing
            qb.push(" AND p.category_id = (SELECT c.id FROM catalog.category c WHERE c.slug = ")
                .push_bind(slug.clone())
                .push(")");
        }
        None => {}
    }

    if !filter.tags.is_empty() {
        // Stored tags are lowercase and filter tags are normalized the same way
        qb.push(" AND p.tags && ").push_bind(filter.tags.clone());
    }

    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(p.tags) t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }

    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(exclude) = filter.exclude {
        qb.push(" AND p.id <> ").push_bind(exclude.as_i32());
    }
}

/// Append `ORDER BY ...` with the id tiebreak.
pub(crate) fn push_sort(qb: &mut QueryBuilder<'_, Postgres>, sort: SortSpec) {
    let column = match sort.field {
        SortField::CreatedAt => "p.created_at",
        SortField::Price => "p.price",
        SortField::RatingAverage => "p.rating_average",
        SortField::SalesCount => "p.sales_count",
        SortField::Name => "p.name",
    };
    let direction = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    qb.push(format_args!(" ORDER BY {column} {direction}, p.id DESC"));
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter()
        .map(|row| Product::try_from(row).map_err(RepositoryError::from))
        .collect()
}

#[async_trait]
impl CatalogStore for CatalogRepository<'_> {
    #[tracing::instrument(skip_all, fields(limit = query.limit, offset = query.offset))]
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.product p"
        ));
        push_filter(&mut qb, &query.filter);
        push_sort(&mut qb, query.sort);
        qb.push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset));

        let rows = bounded(
            self.timeout,
            qb.build_query_as::<ProductRow>().fetch_all(self.pool),
        )
        .await?;
        into_products(rows)
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.product p");
        push_filter(&mut qb, filter);

        bounded(
            self.timeout,
            qb.build_query_scalar::<i64>().fetch_one(self.pool),
        )
        .await
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = ANY($1)");

        let rows = bounded(
            self.timeout,
            sqlx::query_as::<_, ProductRow>(&sql)
                .bind(&ids)
                .fetch_all(self.pool),
        )
        .await?;
        into_products(rows)
    }

    async fn product_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.slug = $1");

        let row = bounded(
            self.timeout,
            sqlx::query_as::<_, ProductRow>(&sql)
                .bind(slug.as_str())
                .fetch_optional(self.pool),
        )
        .await?;
        row.map(Product::try_from).transpose().map_err(Into::into)
    }

    async fn existing_product_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashSet<ProductId>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let found = bounded(
            self.timeout,
            sqlx::query_scalar::<_, i32>("SELECT id FROM catalog.product WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(self.pool),
        )
        .await?;
        Ok(found.into_iter().map(ProductId::new).collect())
    }

    async fn active_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM catalog.category c \
             WHERE c.is_active ORDER BY c.sort_order, c.name"
        );

        let rows = bounded(
            self.timeout,
            sqlx::query_as::<_, CategoryRow>(&sql).fetch_all(self.pool),
        )
        .await?;
        rows.into_iter()
            .map(|row| Category::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM catalog.coupon WHERE code = $1");

        let row = bounded(
            self.timeout,
            sqlx::query_as::<_, CouponRow>(&sql)
                .bind(code)
                .fetch_optional(self.pool),
        )
        .await?;
        row.map(Coupon::try_from).transpose().map_err(Into::into)
    }
}

#[async_trait]
impl SectionStore for CatalogRepository<'_> {
    async fn active_sections(
        &self,
        page: Option<(u32, u32)>,
    ) -> Result<Vec<ProductSection>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SECTION_COLUMNS} FROM catalog.product_section s \
             WHERE s.is_active ORDER BY s.sort_order ASC, s.created_at DESC, s.id DESC"
        ));
        if let Some((limit, offset)) = page {
            qb.push(" LIMIT ")
                .push_bind(i64::from(limit))
                .push(" OFFSET ")
                .push_bind(i64::from(offset));
        }

        let rows = bounded(
            self.timeout,
            qb.build_query_as::<SectionRow>().fetch_all(self.pool),
        )
        .await?;
        rows.into_iter()
            .map(|row| ProductSection::try_from(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn count_active_sections(&self) -> Result<i64, RepositoryError> {
        bounded(
            self.timeout,
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM catalog.product_section WHERE is_active",
            )
            .fetch_one(self.pool),
        )
        .await
    }

    async fn active_section_by_slug(
        &self,
        slug: &Slug,
    ) -> Result<Option<ProductSection>, RepositoryError> {
        let sql = format!(
            "SELECT {SECTION_COLUMNS} FROM catalog.product_section s \
             WHERE s.slug = $1 AND s.is_active"
        );

        let row = bounded(
            self.timeout,
            sqlx::query_as::<_, SectionRow>(&sql)
                .bind(slug.as_str())
                .fetch_optional(self.pool),
        )
        .await?;
        row.map(ProductSection::try_from)
            .transpose()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use emporium_core::section::{SectionType, SortBy};
    use emporium_core::selection::{SelectionOverrides, evaluate};

    use super::*;

    fn sql_for(query: &ProductQuery) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT p.id FROM catalog.product p");
        push_filter(&mut qb, &query.filter);
        push_sort(&mut qb, query.sort);
        qb.sql().to_string()
    }

    #[test]
    fn test_best_sellers_sql() {
        let overrides = SelectionOverrides {
            category: Some(CategoryRef::Slug("dresses".to_string())),
            ..SelectionOverrides::default()
        };
        let sql = sql_for(&evaluate(SectionType::BestSellers, &overrides));
        assert_eq!(
            sql,
            "SELECT p.id FROM catalog.product p WHERE p.status = $1 AND p.sales_count > 0 \
             AND p.category_id = (SELECT c.id FROM catalog.category c WHERE c.slug = $2) \
             ORDER BY p.sales_count DESC, p.id DESC"
        );
    }

    #[test]
    fn test_trending_binds_rating_and_tags() {
        let overrides = SelectionOverrides {
            tags: vec!["Linen".to_string()],
            sort_by: Some(SortBy::PriceLow),
            ..SelectionOverrides::default()
        };
        let sql = sql_for(&evaluate(SectionType::Trending, &overrides));
        assert_eq!(
            sql,
            "SELECT p.id FROM catalog.product p WHERE p.status = $1 \
             AND p.rating_average >= $2 AND p.tags && $3 \
             ORDER BY p.price ASC, p.id DESC"
        );
    }

    #[test]
    fn test_search_filter_sql() {
        let filter = ProductFilter {
            search: Some("silk".to_string()),
            exclude: Some(ProductId::new(3)),
            ..ProductFilter::active()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.product p");
        push_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM catalog.product p WHERE p.status = $1 \
             AND (p.name ILIKE $2 OR p.description ILIKE $3 \
             OR EXISTS (SELECT 1 FROM unnest(p.tags) t WHERE t ILIKE $4)) AND p.id <> $5"
        );
    }
}
