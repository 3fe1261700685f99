//! Section Resolver and Page-Section Aggregator.
//!
//! A manual section lists its curated products in stored order, dropping any
//! that were removed or are no longer active. An automatic section runs the
//! query the selection evaluator builds from its type and criteria.
//!
//! The aggregator resolves every active section for a landing page. One
//! section failing to resolve does not fail the page: the section is left out
//! and reported in [`AggregatedSections::failures`].

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use serde::Serialize;

use emporium_core::catalog::Product;
use emporium_core::section::{MAX_MANUAL_PRODUCTS, ProductSection, SelectionMethod};
use emporium_core::selection::{LimitPolicy, SelectionOverrides, evaluate};
use emporium_core::{ProductId, SectionId, Slug};

use crate::db::{CatalogStore, RepositoryError, SectionStore};

/// Which sections of the landing page to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionPage {
    /// Every active section.
    All,
    /// One page of sections. `page` is 1-based, `limit` already clamped.
    Page { page: u32, limit: u32 },
}

impl SectionPage {
    /// Build a page request from raw query values.
    ///
    /// `all=true` wins over paging. Pages below 1 are treated as 1 and the
    /// limit is clamped to the section page policy.
    #[must_use]
    pub fn from_params(all: bool, page: Option<i64>, limit: Option<i64>) -> Self {
        if all {
            return Self::All;
        }
        let page = page
            .map_or(1, |p| p.clamp(1, i64::from(u32::MAX)))
            .try_into()
            .unwrap_or(1);
        Self::Page {
            page,
            limit: LimitPolicy::SECTION_PAGE.clamp(limit),
        }
    }
}

/// A section together with the products it currently resolves to.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSection {
    pub section: ProductSection,
    pub products: Vec<Product>,
}

/// A section left out of the page because it failed to resolve.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionFailure {
    pub section_id: SectionId,
    pub slug: Slug,
    pub message: String,
}

/// The sections of a landing page.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedSections {
    pub sections: Vec<ResolvedSection>,
    pub failures: Vec<SectionFailure>,
    /// Number of active sections overall.
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Resolve one section to its ordered product list.
///
/// # Errors
///
/// Propagates store failures unchanged; there is no retry.
pub async fn resolve_section<S>(
    store: &S,
    section: &ProductSection,
) -> Result<Vec<Product>, RepositoryError>
where
    S: CatalogStore + ?Sized,
{
    let selection = &section.product_selection;
    match selection.method {
        SelectionMethod::Manual => resolve_manual(store, &selection.product_ids).await,
        SelectionMethod::Automatic => {
            let query = evaluate(
                section.section_type,
                &SelectionOverrides::from(&selection.criteria),
            );
            store.find_products(&query).await
        }
    }
}

async fn resolve_manual<S>(store: &S, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>
where
    S: CatalogStore + ?Sized,
{
    let mut seen = HashSet::new();
    let wanted: Vec<ProductId> = ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .take(MAX_MANUAL_PRODUCTS)
        .collect();

    let mut by_id: HashMap<ProductId, Product> = store
        .products_by_ids(&wanted)
        .await?
        .into_iter()
        .filter(Product::is_active)
        .map(|p| (p.id, p))
        .collect();

    Ok(wanted.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Resolve the active sections of a landing page.
///
/// # Errors
///
/// Fails only if the sections themselves cannot be listed or counted.
/// Per-section resolution failures are logged and reported in the result.
#[tracing::instrument(skip(store))]
pub async fn aggregate_sections<S>(
    store: &S,
    request: SectionPage,
) -> Result<AggregatedSections, RepositoryError>
where
    S: CatalogStore + SectionStore + ?Sized,
{
    let total = store.count_active_sections().await?;
    let (sections, page, limit) = match request {
        SectionPage::All => {
            let sections = store.active_sections(None).await?;
            let limit = u32::try_from(sections.len()).unwrap_or(u32::MAX);
            (sections, 1, limit)
        }
        SectionPage::Page { page, limit } => {
            let offset = page.saturating_sub(1).saturating_mul(limit);
            let sections = store.active_sections(Some((limit, offset))).await?;
            (sections, page, limit)
        }
    };

    let outcomes = join_all(sections.iter().map(|s| resolve_section(store, s))).await;

    let mut resolved = Vec::with_capacity(sections.len());
    let mut failures = Vec::new();
    for (section, outcome) in sections.into_iter().zip(outcomes) {
        match outcome {
            Ok(products) => resolved.push(ResolvedSection { section, products }),
            Err(e) => {
                tracing::warn!(
                    section_id = %section.id,
                    slug = %section.slug,
                    error = %e,
                    "Skipping section that failed to resolve"
                );
                failures.push(SectionFailure {
                    section_id: section.id,
                    slug: section.slug,
                    message: "section could not be loaded".to_string(),
                });
            }
        }
    }

    Ok(AggregatedSections {
        sections: resolved,
        failures,
        total,
        page,
        limit,
    })
}
