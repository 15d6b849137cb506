//! Catalog product types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as served by the EazyBuy API.
///
/// Products are read-only from the storefront's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price. The API sends this as a decimal string.
    pub price: Decimal,
    /// Absolute image URL, if the product has one.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Unit price in the shop currency.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }
}

/// Sort order for product listings.
///
/// Maps onto the API's `ordering` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductSort {
    /// Most recently added first (the API default).
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// All sort orders, in the order they are offered to shoppers.
    pub const ALL: [Self; 4] = [Self::Newest, Self::PriceAsc, Self::PriceDesc, Self::Name];

    /// Value for the API `ordering` parameter.
    #[must_use]
    pub const fn ordering(&self) -> &'static str {
        match self {
            Self::Newest => "-created_at",
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::Name => "name",
        }
    }

    /// Short key used in storefront URLs and CLI flags.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Name => "name",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::Name => "Name",
        }
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.key() == s)
            .ok_or_else(|| format!("unknown sort order: {s}"))
    }
}
