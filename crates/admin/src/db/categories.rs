//! Category writes and the hierarchy checks that guard them.

use std::collections::HashMap;
use std::time::Duration;

use sqlx::{PgConnection, PgExecutor, PgPool};

use emporium_core::CategoryId;
use emporium_core::catalog::{Category, CategoryRef, creates_cycle};
use emporium_core::rows::{CATEGORY_COLUMNS, CategoryRow};

use super::{RepositoryError, bounded, write_error};
use crate::normalize::NewCategory;

/// Look up a category reference, returning `None` when nothing matches.
pub(crate) async fn resolve_ref<'e, E>(
    executor: E,
    reference: &CategoryRef,
) -> Result<Option<CategoryId>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let id: Option<i32> = match reference {
        CategoryRef::Id(id) => {
            sqlx::query_scalar("SELECT id FROM catalog.category WHERE id = $1")
                .bind(id.as_i32())
                .fetch_optional(executor)
                .await?
        }
        CategoryRef::Slug(slug) => {
            sqlx::query_scalar("SELECT id FROM catalog.category WHERE slug = $1")
                .bind(slug)
                .fetch_optional(executor)
                .await?
        }
    };
    Ok(id.map(CategoryId::new))
}

async fn fetch_category(
    conn: &mut PgConnection,
    id: CategoryId,
) -> Result<Option<Category>, RepositoryError> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM catalog.category c WHERE c.id = $1");
    let row = sqlx::query_as::<_, CategoryRow>(&sql)
        .bind(id.as_i32())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Category::try_from).transpose()?)
}

/// Resolve the parent reference of a category being written.
async fn resolve_parent(
    conn: &mut PgConnection,
    parent: Option<&CategoryRef>,
) -> Result<Option<CategoryId>, RepositoryError> {
    let Some(parent) = parent else {
        return Ok(None);
    };
    resolve_ref(&mut *conn, parent)
        .await?
        .map(Some)
        .ok_or_else(|| RepositoryError::Conflict(format!("parent category {parent} does not exist")))
}

/// Repository for category writes.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// All categories, active or not, ordered by sort order then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!(
                "SELECT {CATEGORY_COLUMNS} FROM catalog.category c ORDER BY c.sort_order, c.name"
            );
            let rows = sqlx::query_as::<_, CategoryRow>(&sql)
                .fetch_all(self.pool)
                .await?;
            rows.into_iter()
                .map(|row| Category::try_from(row).map_err(RepositoryError::from))
                .collect()
        })
        .await
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        bounded(self.timeout, async {
            let mut conn = self.pool.acquire().await?;
            fetch_category(&mut conn, id).await
        })
        .await
    }

    /// Look up a category id by reference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn resolve(&self, reference: &CategoryRef) -> Result<Option<CategoryId>, RepositoryError> {
        bounded(self.timeout, async { Ok(resolve_ref(self.pool, reference).await?) }).await
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug is taken or the
    /// parent does not exist.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &NewCategory) -> Result<Category, RepositoryError> {
        bounded(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let parent_id = resolve_parent(&mut tx, input.parent.as_ref()).await?;

            let id: i32 = sqlx::query_scalar(
                r"
                INSERT INTO catalog.category (name, slug, description, parent_id, is_active, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                ",
            )
            .bind(&input.name)
            .bind(input.slug.as_str())
            .bind(&input.description)
            .bind(parent_id.map(|p| p.as_i32()))
            .bind(input.is_active)
            .bind(input.sort_order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| write_error(e, "category"))?;

            let category = fetch_category(&mut tx, CategoryId::new(id))
                .await?
                .ok_or(RepositoryError::NotFound)?;
            tx.commit().await?;

            tracing::info!(category_id = id, "Category created");
            Ok(category)
        })
        .await
    }

    /// Replace a category's fields, re-parenting it if requested.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Conflict` if the new parent is missing, is the category
    /// itself, or is one of its descendants.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(
        &self,
        id: CategoryId,
        input: &NewCategory,
    ) -> Result<Category, RepositoryError> {
        bounded(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            // One hierarchy change at a time
            sqlx::query("LOCK TABLE catalog.category IN SHARE ROW EXCLUSIVE MODE")
                .execute(&mut *tx)
                .await?;

            let parents: HashMap<CategoryId, Option<CategoryId>> =
                sqlx::query_as::<_, (i32, Option<i32>)>("SELECT id, parent_id FROM catalog.category")
                    .fetch_all(&mut *tx)
                    .await?
                    .into_iter()
                    .map(|(id, parent)| (CategoryId::new(id), parent.map(CategoryId::new)))
                    .collect();
            if !parents.contains_key(&id) {
                return Err(RepositoryError::NotFound);
            }

            let parent_id = resolve_parent(&mut tx, input.parent.as_ref()).await?;
            if let Some(parent) = parent_id
                && creates_cycle(&parents, id, parent)
            {
                return Err(RepositoryError::Conflict(format!(
                    "category {parent} cannot be the parent of {id}: it would create a cycle"
                )));
            }

            sqlx::query(
                r"
                UPDATE catalog.category
                SET name = $2, slug = $3, description = $4, parent_id = $5,
                    is_active = $6, sort_order = $7
                WHERE id = $1
                ",
            )
            .bind(id.as_i32())
            .bind(&input.name)
            .bind(input.slug.as_str())
            .bind(&input.description)
            .bind(parent_id.map(|p| p.as_i32()))
            .bind(input.is_active)
            .bind(input.sort_order)
            .execute(&mut *tx)
            .await
            .map_err(|e| write_error(e, "category"))?;

            let category = fetch_category(&mut tx, id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            tx.commit().await?;
            Ok(category)
        })
        .await
    }

    /// Delete a category. Children become roots and products become
    /// uncategorized; sections referencing it simply stop matching.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        bounded(self.timeout, async {
            let result = sqlx::query("DELETE FROM catalog.category WHERE id = $1")
                .bind(id.as_i32())
                .execute(self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            tracing::info!(category_id = %id, "Category deleted");
            Ok(())
        })
        .await
    }
}
