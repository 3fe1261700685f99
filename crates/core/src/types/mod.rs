//! Core types for Emporium.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod slug;
pub mod status;

pub use id::*;
pub use slug::{Slug, SlugError};
pub use status::*;
