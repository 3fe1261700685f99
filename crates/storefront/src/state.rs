//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CatalogRepository, WishlistRepository};
use crate::services::sections::{AggregatedSections, SectionPage};

/// Upper bound on distinct section pages kept in the cache.
const SECTION_CACHE_CAPACITY: u64 = 256;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    section_cache: Option<Cache<SectionPage, Arc<AggregatedSections>>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let section_cache = (!config.section_cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(SECTION_CACHE_CAPACITY)
                .time_to_live(config.section_cache_ttl)
                .build()
        });

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                section_cache,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Catalog reads bounded by the configured store timeout.
    #[must_use]
    pub fn catalog(&self) -> CatalogRepository<'_> {
        CatalogRepository::new(&self.inner.pool, self.inner.config.store_timeout)
    }

    /// Wishlist persistence bounded by the configured store timeout.
    #[must_use]
    pub fn wishlists(&self) -> WishlistRepository<'_> {
        WishlistRepository::new(&self.inner.pool, self.inner.config.store_timeout)
    }

    /// Cache of aggregated section pages, if enabled.
    #[must_use]
    pub fn section_cache(&self) -> Option<&Cache<SectionPage, Arc<AggregatedSections>>> {
        self.inner.section_cache.as_ref()
    }
}
