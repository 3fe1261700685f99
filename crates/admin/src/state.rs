//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::{CategoryRepository, CouponRepository, ProductRepository, SectionRepository};

/// Application state shared across all handlers.
///
/// Cheaply cloneable; repositories are built per request from the shared pool
/// and carry the configured store timeout.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.inner.pool, self.inner.config.store_timeout)
    }

    #[must_use]
    pub fn categories(&self) -> CategoryRepository<'_> {
        CategoryRepository::new(&self.inner.pool, self.inner.config.store_timeout)
    }

    #[must_use]
    pub fn sections(&self) -> SectionRepository<'_> {
        SectionRepository::new(&self.inner.pool, self.inner.config.store_timeout)
    }

    #[must_use]
    pub fn coupons(&self) -> CouponRepository<'_> {
        CouponRepository::new(&self.inner.pool, self.inner.config.store_timeout)
    }
}
