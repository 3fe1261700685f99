//! Seed the catalog from a YAML file.
//!
//! Every entry goes through the same normalization and repositories as the
//! admin API, so a seeded catalog obeys the same rules as one built by hand.
//! Entries are written in dependency order: categories (parents before
//! children, in file order), products, sections, coupons. The first failing
//! entry stops the run; seed into an empty catalog.
//!
//! Manual sections name their products by slug under `products`; the slugs are
//! resolved against the products written earlier in the same run.
//!
//! ```yaml
//! categories:
//!   - name: Dresses
//! products:
//!   - name: Linen Dress
//!     price: "89.00"
//!     category: dresses
//! sections:
//!   - name: Staff Picks
//!     type: featured
//!     productSelection: { method: manual }
//!     products: [linen-dress]
//! coupons:
//!   - code: WELCOME10
//!     kind: percentage
//!     value: "10"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use emporium_admin::config::{AdminConfig, ConfigError};
use emporium_admin::db::{
    self, CategoryRepository, CouponRepository, ProductRepository, RepositoryError,
    SectionRepository,
};
use emporium_admin::normalize::{
    self, CategoryInput, CouponInput, NormalizeError, ProductInput, SectionInput,
};
use emporium_core::ProductId;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("{entity} '{name}': {source}")]
    Invalid {
        entity: &'static str,
        name: String,
        source: NormalizeError,
    },

    #[error("{entity} '{name}': {source}")]
    Write {
        entity: &'static str,
        name: String,
        source: RepositoryError,
    },

    #[error("section '{section}' lists unknown product '{product}'")]
    UnknownProduct { section: String, product: String },
}

/// A catalog seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub categories: Vec<CategoryInput>,
    pub products: Vec<ProductInput>,
    pub sections: Vec<SeedSection>,
    pub coupons: Vec<CouponInput>,
}

/// A section entry, with manual products named by slug.
#[derive(Debug, Deserialize)]
pub struct SeedSection {
    #[serde(flatten)]
    pub section: SectionInput,
    #[serde(default)]
    pub products: Vec<String>,
}

/// Counts of written entries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub sections: usize,
    pub coupons: usize,
}

impl CatalogSeed {
    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` if the YAML does not match the seed shape.
    pub fn parse(content: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Append the products a section names by slug to its product ids.
fn attach_products(
    entry: SeedSection,
    written: &HashMap<String, ProductId>,
) -> Result<SectionInput, SeedError> {
    let SeedSection {
        mut section,
        products,
    } = entry;
    for slug in products {
        let id = written
            .get(slug.trim())
            .copied()
            .ok_or_else(|| SeedError::UnknownProduct {
                section: section.name.clone(),
                product: slug.clone(),
            })?;
        section.product_selection.product_ids.push(id);
    }
    Ok(section)
}

fn invalid(entity: &'static str, name: &str) -> impl FnOnce(NormalizeError) -> SeedError {
    let name = name.to_string();
    move |source| SeedError::Invalid {
        entity,
        name,
        source,
    }
}

fn write_failed(entity: &'static str, name: &str) -> impl FnOnce(RepositoryError) -> SeedError {
    let name = name.to_string();
    move |source| SeedError::Write {
        entity,
        name,
        source,
    }
}

/// Load a catalog seed file into the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database is
/// unreachable, or any entry is rejected.
pub async fn catalog(file_path: &str) -> Result<SeedSummary, SeedError> {
    dotenvy::dotenv().ok();
    let config = AdminConfig::from_env()?;

    let path = Path::new(file_path);
    info!(path = %file_path, "Loading catalog seed");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: file_path.to_string(),
            source,
        })?;
    let seed = CatalogSeed::parse(&content)?;
    info!(
        categories = seed.categories.len(),
        products = seed.products.len(),
        sections = seed.sections.len(),
        coupons = seed.coupons.len(),
        "Parsed seed file"
    );

    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to database");

    let timeout = config.store_timeout;
    let mut summary = SeedSummary::default();

    let categories = CategoryRepository::new(&pool, timeout);
    for input in seed.categories {
        let name = input.name.clone();
        let new = normalize::category(input).map_err(invalid("category", &name))?;
        let created = categories
            .create(&new)
            .await
            .map_err(write_failed("category", &name))?;
        info!(id = %created.id, slug = %created.slug, "Created category");
        summary.categories += 1;
    }

    let products = ProductRepository::new(&pool, timeout);
    let mut written = HashMap::new();
    for input in seed.products {
        let name = input.name.clone();
        let new = normalize::product(input).map_err(invalid("product", &name))?;
        let created = products
            .create(&new)
            .await
            .map_err(write_failed("product", &name))?;
        info!(id = %created.id, slug = %created.slug, "Created product");
        written.insert(created.slug.as_str().to_string(), created.id);
        summary.products += 1;
    }

    let sections = SectionRepository::new(&pool, timeout);
    for entry in seed.sections {
        let input = attach_products(entry, &written)?;
        let name = input.name.clone();
        let new = normalize::section(input).map_err(invalid("section", &name))?;
        let created = sections
            .create(&new)
            .await
            .map_err(write_failed("section", &name))?;
        info!(id = %created.id, slug = %created.slug, "Created section");
        summary.sections += 1;
    }

    let coupons = CouponRepository::new(&pool, timeout);
    for input in seed.coupons {
        let code = input.code.clone();
        let new = normalize::coupon(input).map_err(invalid("coupon", &code))?;
        let created = coupons
            .create(&new)
            .await
            .map_err(write_failed("coupon", &code))?;
        info!(code = %created.code, "Created coupon");
        summary.coupons += 1;
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use emporium_core::section::SelectionMethod;

    use super::*;

    const DEMO: &str = include_str!("../../../../demos/catalog.yaml");

    #[test]
    fn test_demo_catalog_normalizes() {
        let seed = CatalogSeed::parse(DEMO).unwrap();
        assert!(!seed.categories.is_empty());
        assert!(!seed.products.is_empty());

        for input in &seed.categories {
            normalize::category(input.clone()).unwrap();
        }
        let mut written = HashMap::new();
        for (i, input) in seed.products.iter().enumerate() {
            let new = normalize::product(input.clone()).unwrap();
            written.insert(
                new.slug.as_str().to_string(),
                ProductId::new(i32::try_from(i).unwrap() + 1),
            );
        }
        for entry in seed.sections {
            let input = attach_products(entry, &written).unwrap();
            normalize::section(input).unwrap();
        }
        for input in seed.coupons {
            normalize::coupon(input).unwrap();
        }
    }

    #[test]
    fn test_empty_document_is_empty_seed() {
        let seed = CatalogSeed::parse("{}").unwrap();
        assert!(seed.categories.is_empty());
        assert!(seed.coupons.is_empty());
    }

    #[test]
    fn test_attach_products_by_slug() {
        let seed = CatalogSeed::parse(
            "sections:\n  - name: Picks\n    type: featured\n    productSelection:\n      method: manual\n    products: [b, a]\n",
        )
        .unwrap();
        let written = HashMap::from([
            ("a".to_string(), ProductId::new(1)),
            ("b".to_string(), ProductId::new(2)),
        ]);

        let entry = seed.sections.into_iter().next().unwrap();
        let input = attach_products(entry, &written).unwrap();
        assert_eq!(input.product_selection.method, SelectionMethod::Manual);
        assert_eq!(
            input.product_selection.product_ids,
            vec![ProductId::new(2), ProductId::new(1)]
        );
    }

    #[test]
    fn test_attach_products_rejects_unknown_slug() {
        let seed = CatalogSeed::parse(
            "sections:\n  - name: Picks\n    type: featured\n    products: [missing]\n",
        )
        .unwrap();
        let entry = seed.sections.into_iter().next().unwrap();
        assert!(matches!(
            attach_products(entry, &HashMap::new()),
            Err(SeedError::UnknownProduct { .. })
        ));
    }
}
