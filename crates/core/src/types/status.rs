//! Status enums for catalog entities.

use serde::{Deserialize, Serialize};

/// Product lifecycle status.
///
/// Products are never hard-deleted in normal flow; they move between these
/// states instead. Only `Active` products are visible on the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "catalog.product_status", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    /// Being prepared by an admin, not visible.
    #[default]
    Draft,
    /// Visible and purchasable.
    Active,
    /// Withdrawn from sale.
    Inactive,
    /// Visible in admin only until restocked.
    OutOfStock,
}

impl ProductStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Draft, Self::Active, Self::Inactive, Self::OutOfStock];

    /// The wire/database name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::OutOfStock => "out-of-stock",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "out-of-stock" => Ok(Self::OutOfStock),
            _ => Err(format!("invalid product status: {s}")),
        }
    }
}
