//! Cart types.
//!
//! A [`Cart`] is always the server's view of the cart. Line totals and the
//! cart total are computed by the API and trusted as-is; the only derived
//! value computed locally is the item count.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartId, CartItemId, ProductId};
use super::price::Price;
use super::product::Product;

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: Product,
    pub quantity: u32,
    /// Line total (price x quantity), server computed.
    pub total: Decimal,
}

impl CartItem {
    /// Line total in the shop currency.
    #[must_use]
    pub fn line_total(&self) -> Price {
        Price::usd(self.total)
    }
}

/// A session-scoped shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    /// Sum of the line totals, server computed.
    pub total: Decimal,
}

impl Cart {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }

    /// Cart total in the shop currency.
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::usd(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CART_JSON: &str = r#"{
        "id": 12,
        "items": [
            {
                "id": 1,
                "product": {"id": 1, "name": "Smart Watch Series 7", "price": "399.00", "image": null},
                "quantity": 2,
                "total": 798.0
            },
            {
                "id": 2,
                "product": {"id": 4, "name": "Nike Metcon X Shoes", "price": "120.00", "image": null},
                "quantity": 1,
                "total": 120.0
            }
        ],
        "total": 918.0
    }"#;

    fn cart() -> Cart {
        serde_json::from_str(CART_JSON).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_item_count_sums_quantities() {
        assert_eq!(cart().item_count(), 3);
    }

    #[test]
    fn test_empty_cart_counts_zero() {
        let cart: Cart = serde_json::from_str(r#"{"id": 1, "items": [], "total": 0.0}"#)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total_price().display(), "$0.00");
    }

    #[test]
    fn test_numeric_totals_are_trusted() {
        let cart = cart();
        assert_eq!(cart.total_price().display(), "$918.00");
        let line = cart.line(ProductId::new(1)).map(CartItem::line_total);
        assert_eq!(line.map(|p| p.display()).as_deref(), Some("$798.00"));
    }

    #[test]
    fn test_line_lookup_misses_absent_product() {
        assert!(cart().line(ProductId::new(99)).is_none());
    }
}
