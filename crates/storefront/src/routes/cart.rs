//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Every mutation answers with fresh markup rendered from the cart the API
//! returned, plus an `HX-Trigger` header carrying `cart-updated` and a
//! notification.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    response::{IntoResponse, Response},
};
use eazybuy_core::{Cart, CartItem, ProductId, Quantity};
use serde::Deserialize;
use tracing::instrument;

use super::notify::{Notice, hx_trigger};
use super::products::QuantitySelectorTemplate;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::CurrentCart;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    /// Quantity the minus button asks for; never below one.
    pub decrement: u32,
    pub increment: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub total: String,
    pub item_count: u64,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: "$0.00".to_string(),
            total: "$0.00".to_string(),
            item_count: 0,
        }
    }

    /// View of an optional snapshot; no snapshot renders as empty.
    #[must_use]
    pub fn from_snapshot(snapshot: Option<&Cart>) -> Self {
        snapshot.map_or_else(Self::empty, Self::from)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Type Conversions
// =============================================================================

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        // No shipping or tax, so subtotal and total agree
        let total = cart.total_price().display();
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            subtotal: total.clone(),
            total,
            item_count: cart.item_count(),
        }
    }
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product.id,
            name: item.product.name.clone(),
            image: item.product.image.clone(),
            quantity: item.quantity,
            decrement: item.quantity.saturating_sub(1).max(1),
            increment: item.quantity.saturating_add(1),
            price: item.product.unit_price().display(),
            line_price: item.line_total().display(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<i64>,
    /// `detail` when submitted from the product page.
    pub view: Option<String>,
}

impl AddToCartForm {
    fn from_detail(&self) -> bool {
        self.view.as_deref() == Some("detail")
    }
}

/// Update cart form data.
///
/// Quantities below one are clamped to one before reaching the API.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
///
/// Re-fetches the cart first; if that fails the last snapshot is shown.
#[instrument(skip(cart))]
pub async fn show(cart: CurrentCart) -> CartShowTemplate {
    let snapshot = cart.store.refresh().await;
    CartShowTemplate {
        cart: CartView::from_snapshot(snapshot.as_ref()),
    }
}

/// Add item to cart (HTMX).
///
/// Responds with the product page's quantity selector reset to one. Cards
/// ignore the body and only react to the trigger.
#[instrument(skip(cart))]
pub async fn add(cart: CurrentCart, Form(form): Form<AddToCartForm>) -> Response {
    let quantity = Quantity::clamped(form.quantity.unwrap_or(1));
    let product_id = form.product_id;

    match cart.store.add_item(product_id, quantity).await {
        Ok(_) => {
            cart.persist().await;
            let id = product_id.to_string();
            let units = quantity.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", id.as_str()), ("quantity", units.as_str())]),
            );

            let message = if form.from_detail() {
                format!("{quantity} item(s) added to cart!")
            } else {
                "Product added to cart!".to_string()
            };

            (
                hx_trigger(Some(&Notice::success(message)), true),
                QuantitySelectorTemplate {
                    product_id,
                    quantity: Quantity::ONE,
                },
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %product_id, "Failed to add item to cart");
            (
                hx_trigger(Some(&Notice::error("Failed to add to cart")), false),
                QuantitySelectorTemplate {
                    product_id,
                    quantity,
                },
            )
                .into_response()
        }
    }
}

/// Update cart item quantity (HTMX).
#[instrument(skip(cart))]
pub async fn update(cart: CurrentCart, Form(form): Form<UpdateCartForm>) -> Response {
    let quantity = Quantity::clamped(form.quantity);
    let result = cart.store.update_item(form.product_id, quantity).await;
    items_response(&cart, result, "Failed to update cart").await
}

/// Remove item from cart (HTMX).
#[instrument(skip(cart))]
pub async fn remove(cart: CurrentCart, Form(form): Form<RemoveFromCartForm>) -> Response {
    let result = cart.store.remove_item(form.product_id).await;
    items_response(&cart, result, "Failed to remove item").await
}

/// Empty the cart (HTMX).
#[instrument(skip(cart))]
pub async fn clear(cart: CurrentCart) -> Response {
    let result = cart.store.clear().await;
    items_response(&cart, result, "Failed to clear cart").await
}

/// Get cart count badge (HTMX).
pub async fn count(cart: CurrentCart) -> CartCountTemplate {
    CartCountTemplate {
        count: cart.store.count(),
    }
}

/// Render the cart items fragment after a mutation.
///
/// On failure the unchanged snapshot is rendered with an error notice.
async fn items_response(
    cart: &CurrentCart,
    result: Result<Cart, crate::api::RequestError>,
    failure: &str,
) -> Response {
    match result {
        Ok(updated) => {
            cart.persist().await;
            (
                hx_trigger(None, true),
                CartItemsTemplate {
                    cart: CartView::from(&updated),
                },
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "{failure}");
            // Surface the API's own wording when it gave one
            let message = if e.status().is_some() {
                format!("{failure}: {}", e.user_message())
            } else {
                failure.to_string()
            };
            (
                hx_trigger(Some(&Notice::error(message)), false),
                CartItemsTemplate {
                    cart: CartView::from_snapshot(cart.store.snapshot().as_ref()),
                },
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        serde_json::from_str(
            r#"{
                "id": 1,
                "items": [
                    {"id": 1, "product": {"id": 5, "name": "Sony XM4 Headphones", "price": "299.00"},
                     "quantity": 2, "total": 598.0},
                    {"id": 2, "product": {"id": 2, "name": "Urban Explorer Backpack", "price": "89.50"},
                     "quantity": 1, "total": 89.5}
                ],
                "total": 687.5
            }"#,
        )
        .unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_cart_view_formats_prices() {
        let view = CartView::from(&cart());

        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal, "$687.50");
        assert_eq!(view.total, "$687.50");

        let first = view.items.first().unwrap_or_else(|| panic!("no items"));
        assert_eq!(first.price, "$299.00");
        assert_eq!(first.line_price, "$598.00");
        assert_eq!((first.decrement, first.increment), (1, 3));

        let last = view.items.last().unwrap_or_else(|| panic!("no items"));
        assert_eq!(last.decrement, 1);
    }

    #[test]
    fn test_missing_snapshot_renders_empty() {
        let view = CartView::from_snapshot(None);
        assert!(view.is_empty());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total, "$0.00");
    }

    #[test]
    fn test_add_form_detects_detail_view() {
        let form: AddToCartForm =
            serde_json::from_value(serde_json::json!({"product_id": 1, "view": "detail"}))
                .unwrap_or_else(|e| panic!("{e}"));
        assert!(form.from_detail());
        assert_eq!(form.quantity, None);
    }
}
