//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`sections`] - Section Resolver and Page-Section Aggregator
//! - [`wishlist`] - Wishlist Reconciler
//!
//! Services are generic over the store traits in [`crate::db`]; route
//! handlers pass in the Postgres repositories.

pub mod sections;
pub mod wishlist;

#[cfg(test)]
pub(crate) mod testing;
