//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Product listing (home)
//! GET  /health                   - Health check
//! GET  /health/ready             - Readiness (API reachable)
//!
//! # Products
//! GET  /products                 - Product listing (?q=, ?sort=)
//! GET  /products/{id}            - Product detail
//! GET  /products/{id}/quantity   - Quantity selector fragment (HTMX)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                     - Cart page
//! POST /cart/add                 - Add to cart (returns quantity selector, triggers cart-updated)
//! POST /cart/update              - Update quantity (returns cart_items fragment)
//! POST /cart/remove              - Remove item (returns cart_items fragment)
//! POST /cart/clear               - Empty cart (returns cart_items fragment)
//! GET  /cart/count               - Cart count badge (fragment)
//! ```

pub mod cart;
pub mod notify;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
        .route("/{id}/quantity", get(products::quantity))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
}
