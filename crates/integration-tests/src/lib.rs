//! Integration test support for EazyBuy.
//!
//! [`FakeApi`] is an in-process, stateful stand-in for the EazyBuy REST API.
//! It keeps carts per `sessionid` cookie and follows the real API's rules:
//!
//! - adding a product already in the cart merges quantities (201 Created)
//! - updating to a quantity of zero or less deletes the line
//! - updating or removing a product that is not in the cart is a 404
//! - adding an unknown product is a 404
//! - error bodies are `{"error": "..."}`
//!
//! # Example
//!
//! ```rust,ignore
//! let api = FakeApi::spawn().await;
//! let config = ApiConfig::new(api.url());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{Duration, TimeZone, Utc};
use eazybuy_core::{Product, ProductId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Cookie the fake API scopes carts by.
pub const SESSION_COOKIE: &str = "sessionid";

/// Sample catalog served on startup: name and price in cents.
pub const CATALOG: [(&str, i64); 6] = [
    ("Smart Watch Series 7", 399_00),
    ("Urban Explorer Backpack", 89_50),
    ("Instax Mini 11 Camera", 69_00),
    ("Nike Metcon X Shoes", 120_00),
    ("Sony XM4 Headphones", 299_00),
    ("Leather Satchel Bag", 150_00),
];

struct Line {
    id: i64,
    product_id: ProductId,
    quantity: i64,
}

#[derive(Default)]
struct FakeCart {
    id: i64,
    lines: Vec<Line>,
}

#[derive(Default)]
struct Shop {
    products: Vec<Product>,
    carts: HashMap<String, FakeCart>,
    next_cart_id: i64,
    next_line_id: i64,
    next_product_id: i64,
    session_headers: Vec<String>,
    cart_outage: bool,
}

type SharedShop = Arc<Mutex<Shop>>;

impl Shop {
    fn seeded() -> Self {
        let mut shop = Self::default();
        for (name, cents) in CATALOG {
            shop.create_product(name, Decimal::new(cents, 2));
        }
        shop
    }

    fn create_product(&mut self, name: &str, price: Decimal) -> Product {
        self.next_product_id += 1;
        let id = self.next_product_id;
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single();
        let product = Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price,
            image: None,
            created_at: base.map(|t| t + Duration::minutes(id)),
        };
        self.products.push(product.clone());
        product
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Resolve the caller's cart, opening a session if the cookie is absent
    /// or unknown. Returns the session key and a `Set-Cookie` for new ones.
    fn session(&mut self, headers: &HeaderMap) -> (String, Option<HeaderValue>) {
        if let Some(token) = headers.get("x-session-id").and_then(|v| v.to_str().ok()) {
            self.session_headers.push(token.to_string());
        }

        let existing = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.to_string())
            .filter(|key| self.carts.contains_key(key));

        if let Some(key) = existing {
            return (key, None);
        }

        let key = uuid::Uuid::new_v4().simple().to_string();
        self.next_cart_id += 1;
        self.carts.insert(
            key.clone(),
            FakeCart {
                id: self.next_cart_id,
                lines: Vec::new(),
            },
        );
        let cookie = HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={key}; Path=/; HttpOnly; SameSite=Lax"
        ))
        .ok();
        (key, cookie)
    }

    fn cart_json(&self, key: &str) -> Value {
        let Some(cart) = self.carts.get(key) else {
            return json!({"id": 0, "items": [], "total": 0.0});
        };

        let mut total = Decimal::ZERO;
        let items: Vec<Value> = cart
            .lines
            .iter()
            .filter_map(|line| {
                let product = self.product(line.product_id)?;
                let line_total = product.price * Decimal::from(line.quantity);
                total += line_total;
                Some(json!({
                    "id": line.id,
                    "product": product,
                    "quantity": line.quantity,
                    "total": line_total.to_f64().unwrap_or_default(),
                }))
            })
            .collect();

        json!({
            "id": cart.id,
            "items": items,
            "total": total.to_f64().unwrap_or_default(),
        })
    }
}

/// Handle to a running fake API.
#[derive(Clone)]
pub struct FakeApi {
    url: Url,
    shop: SharedShop,
}

impl FakeApi {
    /// Start the fake API on an ephemeral port with the sample catalog.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let shop: SharedShop = Arc::new(Mutex::new(Shop::seeded()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap_or_else(|e| panic!("Failed to bind fake API: {e}"));
        let addr = listener
            .local_addr()
            .unwrap_or_else(|e| panic!("Failed to read fake API address: {e}"));

        let app = router(Arc::clone(&shop));
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let url = Url::parse(&format!("http://{addr}/api/"))
            .unwrap_or_else(|e| panic!("Invalid fake API URL: {e}"));
        Self { url, shop }
    }

    /// API root, ending in `/`.
    #[must_use]
    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// `X-Session-ID` values seen on cart requests, in order.
    #[must_use]
    pub fn session_headers(&self) -> Vec<String> {
        self.shop.lock().session_headers.clone()
    }

    /// Number of server-side carts opened so far.
    #[must_use]
    pub fn cart_sessions(&self) -> usize {
        self.shop.lock().carts.len()
    }

    /// Make every cart endpoint answer 503 until switched back.
    pub fn set_cart_outage(&self, outage: bool) {
        self.shop.lock().cart_outage = outage;
    }

    /// Price of a sample product.
    #[must_use]
    pub fn price(&self, id: ProductId) -> Option<Decimal> {
        self.shop.lock().product(id).map(|p| p.price)
    }
}

fn router(shop: SharedShop) -> Router {
    Router::new()
        .route("/api/", get(api_root))
        .route("/api/products/", get(list_products).post(create_product))
        .route("/api/products/popular/", get(popular_products))
        .route("/api/products/{id}/", get(get_product))
        .route("/api/cart/get_cart/", get(get_cart))
        .route("/api/cart/add_item/", post(add_item))
        .route("/api/cart/update_item/", put(update_item))
        .route("/api/cart/remove_item/", delete(remove_item))
        .route("/api/cart/clear_cart/", delete(clear_cart))
        .with_state(shop)
}

// =============================================================================
// Catalog
// =============================================================================

async fn api_root() -> Json<Value> {
    Json(json!({"products": "/api/products/", "cart": "/api/cart/"}))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
    ordering: Option<String>,
}

async fn list_products(
    State(shop): State<SharedShop>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Product>> {
    let shop = shop.lock();
    let needle = query.search.unwrap_or_default().to_lowercase();
    let mut products: Vec<Product> = shop
        .products
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    match query.ordering.as_deref().unwrap_or("-created_at") {
        "price" => products.sort_by(|a, b| a.price.cmp(&b.price)),
        "-price" => products.sort_by(|a, b| b.price.cmp(&a.price)),
        "name" => products.sort_by(|a, b| a.name.cmp(&b.name)),
        "created_at" => products.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        _ => products.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }

    Json(products)
}

async fn popular_products(State(shop): State<SharedShop>) -> Json<Vec<Product>> {
    Json(shop.lock().products.iter().take(8).cloned().collect())
}

async fn get_product(State(shop): State<SharedShop>, Path(id): Path<i64>) -> Response {
    match shop.lock().product(ProductId::new(id)) {
        Some(product) => Json(product.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

async fn create_product(State(shop): State<SharedShop>, mut form: Multipart) -> Response {
    let mut name = None;
    let mut price = None;

    while let Ok(Some(field)) = form.next_field().await {
        let field_name = field.name().map(str::to_owned);
        let Ok(text) = field.text().await else {
            continue;
        };
        match field_name.as_deref() {
            Some("name") => name = Some(text),
            Some("price") => price = text.parse::<Decimal>().ok(),
            _ => {}
        }
    }

    match (name, price) {
        (Some(name), Some(price)) if !name.is_empty() => {
            let product = shop.lock().create_product(&name, price);
            (StatusCode::CREATED, Json(product)).into_response()
        }
        _ => error(StatusCode::BAD_REQUEST, "name and price are required"),
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
struct LineBody {
    product_id: Option<i64>,
    quantity: Option<i64>,
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn with_cookie(cookie: Option<HeaderValue>, response: Response) -> Response {
    let mut response = response;
    if let Some(cookie) = cookie {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Run a cart action for the caller's session.
fn cart_action<F>(shop: &SharedShop, headers: &HeaderMap, action: F) -> Response
where
    F: FnOnce(&mut Shop, &str) -> Result<StatusCode, Response>,
{
    let mut shop = shop.lock();
    if shop.cart_outage {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Cart service unavailable");
    }

    let (key, cookie) = shop.session(headers);
    let response = match action(&mut shop, &key) {
        Ok(status) => (status, Json(shop.cart_json(&key))).into_response(),
        Err(response) => response,
    };
    with_cookie(cookie, response)
}

async fn get_cart(State(shop): State<SharedShop>, headers: HeaderMap) -> Response {
    cart_action(&shop, &headers, |_, _| Ok(StatusCode::OK))
}

async fn add_item(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Response {
    cart_action(&shop, &headers, |shop, key| {
        let product_id = body
            .product_id
            .map(ProductId::new)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, "product_id is required"))?;
        if shop.product(product_id).is_none() {
            return Err(error(StatusCode::NOT_FOUND, "Product not found"));
        }
        let quantity = body.quantity.unwrap_or(1);

        shop.next_line_id += 1;
        let line_id = shop.next_line_id;
        let cart = shop.carts.entry(key.to_string()).or_default();
        match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity += quantity,
            None => cart.lines.push(Line {
                id: line_id,
                product_id,
                quantity,
            }),
        }
        Ok(StatusCode::CREATED)
    })
}

async fn update_item(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    Json(body): Json<LineBody>,
) -> Response {
    cart_action(&shop, &headers, |shop, key| {
        let product_id = body
            .product_id
            .map(ProductId::new)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, "product_id is required"))?;
        let quantity = body.quantity.unwrap_or(1);

        let cart = shop.carts.entry(key.to_string()).or_default();
        let index = cart
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or_else(|| error(StatusCode::NOT_FOUND, "Item not in cart"))?;

        if quantity <= 0 {
            cart.lines.remove(index);
        } else if let Some(line) = cart.lines.get_mut(index) {
            line.quantity = quantity;
        }
        Ok(StatusCode::OK)
    })
}

async fn remove_item(
    State(shop): State<SharedShop>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    cart_action(&shop, &headers, |shop, key| {
        let product_id = query
            .get("product_id")
            .and_then(|id| id.parse::<i64>().ok())
            .map(ProductId::new)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, "product_id is required"))?;

        let cart = shop.carts.entry(key.to_string()).or_default();
        let before = cart.lines.len();
        cart.lines.retain(|l| l.product_id != product_id);
        if cart.lines.len() == before {
            return Err(error(StatusCode::NOT_FOUND, "Item not in cart"));
        }
        Ok(StatusCode::OK)
    })
}

async fn clear_cart(State(shop): State<SharedShop>, headers: HeaderMap) -> Response {
    cart_action(&shop, &headers, |shop, key| {
        if let Some(cart) = shop.carts.get_mut(key) {
            cart.lines.clear();
        }
        Ok(StatusCode::OK)
    })
}
