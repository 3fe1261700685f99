//! Product section writes.
//!
//! Curated product ids and the criteria category are weak references: they
//! are stored as plain integers and may outlive the rows they point at. A
//! category given by slug is resolved to its id when the section is saved.

use std::time::Duration;

use sqlx::PgPool;

use emporium_core::SectionId;
use emporium_core::rows::{SECTION_COLUMNS, SectionRow};
use emporium_core::section::ProductSection;

use super::categories::resolve_ref;
use super::{RepositoryError, bounded, write_error};
use crate::normalize::NewSection;

const INSERT_SECTION: &str = r"
    INSERT INTO catalog.product_section AS s (
        name, slug, title, description, section_type, selection_method, product_ids,
        criteria_category_id, criteria_tags, criteria_sort_by, criteria_limit,
        display_settings, sort_order, is_active
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
";

const UPDATE_SECTION: &str = r"
    UPDATE catalog.product_section AS s
    SET name = $1, slug = $2, title = $3, description = $4, section_type = $5,
        selection_method = $6, product_ids = $7, criteria_category_id = $8,
        criteria_tags = $9, criteria_sort_by = $10, criteria_limit = $11,
        display_settings = $12, sort_order = $13, is_active = $14, updated_at = NOW()
    WHERE s.id = $15
";

fn into_section(row: SectionRow) -> Result<ProductSection, RepositoryError> {
    Ok(ProductSection::try_from(row)?)
}

/// Repository for product section writes.
pub struct SectionRepository<'a> {
    pool: &'a PgPool,
    timeout: Duration,
}

impl<'a> SectionRepository<'a> {
    /// Create a new section repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// All sections, active or not, in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ProductSection>, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!(
                "SELECT {SECTION_COLUMNS} FROM catalog.product_section s \
                 ORDER BY s.sort_order ASC, s.created_at DESC"
            );
            let rows = sqlx::query_as::<_, SectionRow>(&sql)
                .fetch_all(self.pool)
                .await?;
            rows.into_iter().map(into_section).collect()
        })
        .await
    }

    /// Get a section by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: SectionId) -> Result<Option<ProductSection>, RepositoryError> {
        bounded(self.timeout, async {
            let sql = format!("SELECT {SECTION_COLUMNS} FROM catalog.product_section s WHERE s.id = $1");
            let row = sqlx::query_as::<_, SectionRow>(&sql)
                .bind(id.as_i32())
                .fetch_optional(self.pool)
                .await?;
            row.map(into_section).transpose()
        })
        .await
    }

    /// Insert or update a section; `id` selects the row to update.
    async fn write(
        &self,
        id: Option<SectionId>,
        input: &NewSection,
    ) -> Result<Option<ProductSection>, RepositoryError> {
        let criteria = &input.selection.criteria;
        let category_id = match &criteria.category {
            Some(reference) => Some(
                resolve_ref(self.pool, reference)
                    .await?
                    .ok_or_else(|| RepositoryError::UnknownReference(format!("category {reference}")))?
                    .as_i32(),
            ),
            None => None,
        };
        let product_ids: Vec<i32> = input
            .selection
            .product_ids
            .iter()
            .map(|id| id.as_i32())
            .collect();

        let sql = match id {
            None => format!("{INSERT_SECTION} RETURNING {SECTION_COLUMNS}"),
            Some(_) => format!("{UPDATE_SECTION} RETURNING {SECTION_COLUMNS}"),
        };
        let mut query = sqlx::query_as::<_, SectionRow>(&sql)
            .bind(&input.name)
            .bind(input.slug.as_str())
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.section_type.as_str())
            .bind(input.selection.method.as_str())
            .bind(product_ids)
            .bind(category_id)
            .bind(&criteria.tags)
            .bind(criteria.sort_by.map(|s| s.as_str()))
            .bind(criteria.limit.and_then(|l| i32::try_from(l).ok()))
            .bind(&input.display_settings)
            .bind(input.sort_order)
            .bind(input.is_active);
        if let Some(id) = id {
            query = query.bind(id.as_i32());
        }

        let row = query
            .fetch_optional(self.pool)
            .await
            .map_err(|e| write_error(e, "section"))?;
        row.map(into_section).transpose()
    }

    /// Create a section.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::UnknownReference` for an unknown criteria
    /// category and `RepositoryError::Conflict` if the slug is taken.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &NewSection) -> Result<ProductSection, RepositoryError> {
        bounded(self.timeout, async {
            let section = self.write(None, input).await?.ok_or(RepositoryError::NotFound)?;
            tracing::info!(section_id = %section.id, "Section created");
            Ok(section)
        })
        .await
    }

    /// Replace a section's configuration.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist,
    /// `RepositoryError::UnknownReference` for an unknown criteria category
    /// and `RepositoryError::Conflict` if the slug is taken.
    #[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(
        &self,
        id: SectionId,
        input: &NewSection,
    ) -> Result<ProductSection, RepositoryError> {
        bounded(self.timeout, async {
            self.write(Some(id), input).await?.ok_or(RepositoryError::NotFound)
        })
        .await
    }

    /// Delete a section.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the section does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: SectionId) -> Result<(), RepositoryError> {
        bounded(self.timeout, async {
            let result = sqlx::query("DELETE FROM catalog.product_section WHERE id = $1")
                .bind(id.as_i32())
                .execute(self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(RepositoryError::NotFound);
            }
            tracing::info!(section_id = %id, "Section deleted");
            Ok(())
        })
        .await
    }
}
