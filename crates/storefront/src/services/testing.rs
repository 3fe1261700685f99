//! In-memory stores for service tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use emporium_core::catalog::{Category, CategoryRef, Product, Rating, Sales};
use emporium_core::coupon::Coupon;
use emporium_core::section::{ProductSection, ProductSelection, SectionType};
use emporium_core::selection::{ProductFilter, ProductQuery, SectionPredicate};
use emporium_core::wishlist::WishlistItem;
use emporium_core::{CategoryId, ProductId, ProductStatus, SectionId, Slug, UserId};

use crate::db::{CatalogStore, RepositoryError, SectionStore, WishlistStore};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .unwrap()
}

/// An active product created `id` minutes after a fixed instant.
pub fn product(id: i32) -> Product {
    let created = base_time() + Duration::minutes(i64::from(id));
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        slug: Slug::parse(&format!("product-{id}")).unwrap(),
        description: String::new(),
        price: Decimal::from(10),
        original_price: None,
        category_id: None,
        tags: Vec::new(),
        status: ProductStatus::Active,
        featured: false,
        is_new: false,
        is_sale: false,
        rating: Rating::default(),
        sales: Sales::default(),
        created_at: created,
        updated_at: created,
    }
}

pub fn category(id: i32, slug: &str) -> Category {
    Category {
        id: CategoryId::new(id),
        name: slug.to_string(),
        slug: Slug::parse(slug).unwrap(),
        description: None,
        parent_id: None,
        children: Vec::new(),
        is_active: true,
        sort_order: 0,
        created_at: base_time(),
    }
}

/// An active automatic section with empty criteria.
pub fn section(id: i32, slug: &str, section_type: SectionType) -> ProductSection {
    ProductSection {
        id: SectionId::new(id),
        name: slug.to_string(),
        slug: Slug::parse(slug).unwrap(),
        title: slug.to_string(),
        description: None,
        section_type,
        product_selection: ProductSelection::default(),
        display_settings: serde_json::json!({}),
        sort_order: 0,
        is_active: true,
        created_at: base_time(),
        updated_at: base_time(),
    }
}

#[derive(Default)]
struct State {
    products: Vec<Product>,
    categories: Vec<Category>,
    sections: Vec<ProductSection>,
    coupons: Vec<Coupon>,
    wishlist: Vec<(UserId, WishlistItem)>,
    failing_predicate: Option<SectionPredicate>,
}

/// A catalog, section and wishlist store backed by vectors.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add_product(&self, product: Product) {
        self.with(|s| s.products.push(product));
    }

    pub fn add_category(&self, category: Category) {
        self.with(|s| s.categories.push(category));
    }

    pub fn add_section(&self, section: ProductSection) {
        self.with(|s| s.sections.push(section));
    }

    pub fn add_coupon(&self, coupon: Coupon) {
        self.with(|s| s.coupons.push(coupon));
    }

    /// Make product queries for this section type fail.
    pub fn fail_queries_for(&self, section_type: SectionType) {
        self.with(|s| s.failing_predicate = Some(SectionPredicate::for_type(section_type)));
    }

    fn resolver(categories: &[Category]) -> impl Fn(&CategoryRef) -> Option<CategoryId> + '_ {
        move |r| match r {
            CategoryRef::Id(id) => Some(*id),
            CategoryRef::Slug(slug) => categories
                .iter()
                .find(|c| c.slug.as_str() == slug)
                .map(|c| c.id),
        }
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn find_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        self.with(|s| {
            if s.failing_predicate.is_some() && s.failing_predicate == query.filter.predicate {
                return Err(RepositoryError::Timeout(std::time::Duration::from_millis(1)));
            }
            Ok(query.apply(&s.products, Self::resolver(&s.categories)))
        })
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        self.with(|s| {
            let resolve = Self::resolver(&s.categories);
            let n = s.products.iter().filter(|p| filter.matches(p, &resolve)).count();
            Ok(i64::try_from(n).unwrap_or(i64::MAX))
        })
    }

    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.with(|s| {
            Ok(s.products
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        })
    }

    async fn product_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        self.with(|s| Ok(s.products.iter().find(|p| &p.slug == slug).cloned()))
    }

    async fn existing_product_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashSet<ProductId>, RepositoryError> {
        self.with(|s| {
            Ok(s.products
                .iter()
                .map(|p| p.id)
                .filter(|id| ids.contains(id))
                .collect())
        })
    }

    async fn active_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        self.with(|s| {
            let mut categories: Vec<Category> =
                s.categories.iter().filter(|c| c.is_active).cloned().collect();
            categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
            Ok(categories)
        })
    }

    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        self.with(|s| Ok(s.coupons.iter().find(|c| c.code == code).cloned()))
    }
}

#[async_trait]
impl SectionStore for InMemoryStore {
    async fn active_sections(
        &self,
        page: Option<(u32, u32)>,
    ) -> Result<Vec<ProductSection>, RepositoryError> {
        self.with(|s| {
            let mut sections: Vec<ProductSection> =
                s.sections.iter().filter(|x| x.is_active).cloned().collect();
            sections.sort_by(|a, b| {
                a.sort_order
                    .cmp(&b.sort_order)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(b.id.cmp(&a.id))
            });
            Ok(match page {
                Some((limit, offset)) => sections
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect(),
                None => sections,
            })
        })
    }

    async fn count_active_sections(&self) -> Result<i64, RepositoryError> {
        self.with(|s| {
            let n = s.sections.iter().filter(|x| x.is_active).count();
            Ok(i64::try_from(n).unwrap_or(i64::MAX))
        })
    }

    async fn active_section_by_slug(
        &self,
        slug: &Slug,
    ) -> Result<Option<ProductSection>, RepositoryError> {
        self.with(|s| {
            Ok(s.sections
                .iter()
                .find(|x| x.is_active && &x.slug == slug)
                .cloned())
        })
    }
}

#[async_trait]
impl WishlistStore for InMemoryStore {
    async fn items(&self, user_id: UserId) -> Result<Vec<WishlistItem>, RepositoryError> {
        self.with(|s| {
            Ok(s.wishlist
                .iter()
                .filter(|(u, _)| *u == user_id)
                .map(|(_, item)| *item)
                .collect())
        })
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        added_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.with(|s| {
            let exists = s
                .wishlist
                .iter()
                .any(|(u, i)| *u == user_id && i.product_id == product_id);
            if !exists {
                s.wishlist.push((
                    user_id,
                    WishlistItem {
                        product_id,
                        added_at,
                    },
                ));
            }
            Ok(())
        })
    }

    async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), RepositoryError> {
        self.with(|s| {
            s.wishlist
                .retain(|(u, i)| !(*u == user_id && i.product_id == product_id));
            Ok(())
        })
    }

    async fn merge_items(
        &self,
        user_id: UserId,
        items: &[WishlistItem],
    ) -> Result<(), RepositoryError> {
        self.with(|s| {
            for incoming in items {
                let existing = s
                    .wishlist
                    .iter_mut()
                    .find(|(u, i)| *u == user_id && i.product_id == incoming.product_id);
                match existing {
                    Some((_, item)) => item.added_at = item.added_at.min(incoming.added_at),
                    None => s.wishlist.push((user_id, *incoming)),
                }
            }
            Ok(())
        })
    }
}
