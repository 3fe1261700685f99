//! Emporium Core - Shared catalog types and selection rules.
//!
//! This crate provides the domain types and pure rules used by all Emporium
//! components:
//! - `storefront` - Public catalog, product sections, wishlist
//! - `admin` - Catalog and content administration API
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure functions - no I/O, no
//! database access, no HTTP. Anything that needs a store receives the data it
//! works on, or expresses its request as a typed value (see
//! [`selection::ProductQuery`]) that the repository layer turns into SQL.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, slugs and status enums
//! - [`catalog`] - Products, categories, tag normalization, hierarchy checks
//! - [`section`] - Product section configuration
//! - [`selection`] - Selection Criteria Evaluator
//! - [`wishlist`] - Wishlist items and the merge-on-login rule
//! - [`coupon`] - Coupons and the discount rule
//! - `rows` - Database row shapes (with the `postgres` feature)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod coupon;
#[cfg(feature = "postgres")]
pub mod rows;
pub mod section;
pub mod selection;
pub mod types;
pub mod wishlist;

pub use types::*;
