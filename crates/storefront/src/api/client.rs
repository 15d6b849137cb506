//! EazyBuy API client implementation.
//!
//! Catalog lookups are cached using `moka`; cart calls always hit the API.

use std::sync::Arc;

use eazybuy_core::{Cart, Product, ProductId, ProductSort, Quantity, SessionToken};
use moka::future::Cache;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use super::RequestError;
use super::cache::{CacheKey, CacheValue};
use crate::config::ApiConfig;

/// Header carrying the client's session token on cart requests.
pub const SESSION_HEADER: &str = "x-session-id";

/// How much of an unexpected body to keep in logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// CartSession
// =============================================================================

/// Per-client state sent with every cart request.
///
/// Cloning shares the cookie jar.
#[derive(Clone)]
pub struct CartSession {
    token: SessionToken,
    jar: Arc<Jar>,
}

impl CartSession {
    /// Start a session with an empty cookie jar.
    #[must_use]
    pub fn new(token: SessionToken) -> Self {
        Self {
            token,
            jar: Arc::new(Jar::default()),
        }
    }

    /// The client session token.
    #[must_use]
    pub const fn token(&self) -> &SessionToken {
        &self.token
    }
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

/// Body of add and update calls.
#[derive(Debug, Serialize)]
struct LineRequest {
    product_id: ProductId,
    quantity: Quantity,
}

/// Product listings come back either bare or wrapped by the API paginator.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProductList {
    Page { results: Vec<Product> },
    Plain(Vec<Product>),
}

impl From<ProductList> for Vec<Product> {
    fn from(list: ProductList) -> Self {
        match list {
            ProductList::Page { results } => results,
            ProductList::Plain(products) => products,
        }
    }
}

/// Error payloads: `{"error": "..."}` from cart actions, `{"detail": "..."}`
/// from the framework itself.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

/// Extract a readable message from an error response body.
fn error_message(body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    parsed
        .error
        .or(parsed.detail)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Catalog listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive name search.
    pub search: Option<String>,
    pub sort: ProductSort,
}

impl ProductQuery {
    /// Normalized search term: trimmed, `None` when blank.
    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the EazyBuy REST API.
///
/// Cheap to clone; all clones share the HTTP connection pool and the
/// catalog cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    #[must_use]
    pub fn new(config: &ApiConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                token: config.token.clone(),
                cache,
            }),
        }
    }

    /// The API root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build a request for an endpoint relative to the API root.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RequestError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and decode the JSON response.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        session: Option<&CartSession>,
    ) -> Result<T, RequestError> {
        let mut request = request.header(ACCEPT, "application/json");

        if let Some(token) = &self.inner.token {
            request = request.header(AUTHORIZATION, format!("Token {}", token.expose_secret()));
        }

        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session.token.as_str());
            if let Some(cookies) = session.jar.cookies(&self.inner.base_url) {
                request = request.header(COOKIE, cookies);
            }
        }

        let response = request.send().await?;
        let status = response.status();

        // Keep whatever session cookie the API hands out, even on errors
        if let Some(session) = session {
            let mut set_cookies = response.headers().get_all(SET_COOKIE).iter();
            session.jar.set_cookies(&mut set_cookies, &self.inner.base_url);
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "EazyBuy API returned non-success status"
            );
            return Err(RequestError::Status {
                status,
                message: error_message(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse EazyBuy API response"
            );
            RequestError::Parse(e)
        })
    }

    // =========================================================================
    // Session Cookies
    // =========================================================================

    /// The `Cookie` header value the session would send, if any.
    #[must_use]
    pub fn session_cookies(&self, session: &CartSession) -> Option<String> {
        session
            .jar
            .cookies(&self.inner.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_owned))
            .filter(|value| !value.is_empty())
    }

    /// Load cookies previously returned by [`Self::session_cookies`].
    pub fn restore_session_cookies(&self, session: &CartSession, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            session.jar.add_cookie_str(pair, &self.inner.base_url);
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::NotFound` if the API has no such product, or
    /// another error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, RequestError> {
        let cache_key = CacheKey::Product(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self.request(Method::GET, &format!("products/{id}/"))?;
        let product: Product = match self.execute(request, None).await {
            Ok(product) => product,
            Err(e) if e.is_not_found() => {
                return Err(RequestError::NotFound(format!("Product not found: {id}")));
            }
            Err(e) => return Err(e),
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List products, optionally filtered by a name search.
    ///
    /// Unfiltered listings are cached per sort order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RequestError> {
        let search = query.search_term();
        let cache_key = CacheKey::Products { sort: query.sort };

        if search.is_none()
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let mut url = self.inner.base_url.join("products/")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ordering", query.sort.ordering());
            if let Some(term) = search {
                pairs.append_pair("search", term);
            }
        }

        let list: ProductList = self
            .execute(self.inner.client.get(url), None)
            .await?;
        let products: Vec<Product> = list.into();

        if search.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    /// Get the featured product selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn popular_products(&self) -> Result<Vec<Product>, RequestError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Popular).await
        {
            debug!("Cache hit for popular products");
            return Ok(products);
        }

        let request = self.request(Method::GET, "products/popular/")?;
        let list: ProductList = self.execute(request, None).await?;
        let products: Vec<Product> = list.into();

        self.inner
            .cache
            .insert(CacheKey::Popular, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Create a product (used for seeding a fresh shop).
    ///
    /// Drops cached listings so the new product shows up immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the product or the request fails.
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        name: &str,
        price: Decimal,
    ) -> Result<Product, RequestError> {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_owned())
            .text("price", price.to_string());

        let request = self.request(Method::POST, "products/")?.multipart(form);
        let product: Product = self.execute(request, None).await?;

        self.invalidate_listings().await;
        Ok(product)
    }

    /// Drop cached listings, keeping cached product details.
    pub async fn invalidate_listings(&self) {
        for sort in ProductSort::ALL {
            self.inner
                .cache
                .invalidate(&CacheKey::Products { sort })
                .await;
        }
        self.inner.cache.invalidate(&CacheKey::Popular).await;
    }

    /// Check that the API root answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the API is unreachable or unhealthy.
    pub async fn ping(&self) -> Result<(), RequestError> {
        let response = self
            .inner
            .client
            .get(self.inner.base_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RequestError::Status {
                status,
                message: "API health check failed".to_string(),
            })
        }
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the session's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(session = %session.token))]
    pub async fn get_cart(&self, session: &CartSession) -> Result<Cart, RequestError> {
        let request = self.request(Method::GET, "cart/get_cart/")?;
        self.execute(request, Some(session)).await
    }

    /// Add units of a product; the API merges into an existing line.
    ///
    /// # Errors
    ///
    /// Returns an error if the product does not exist or the request fails.
    #[instrument(skip(self, session), fields(session = %session.token))]
    pub async fn add_item(
        &self,
        session: &CartSession,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RequestError> {
        let request = self
            .request(Method::POST, "cart/add_item/")?
            .json(&LineRequest {
                product_id,
                quantity,
            });
        self.execute(request, Some(session)).await
    }

    /// Set the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not in the cart or the request fails.
    #[instrument(skip(self, session), fields(session = %session.token))]
    pub async fn update_item(
        &self,
        session: &CartSession,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RequestError> {
        let request = self
            .request(Method::PUT, "cart/update_item/")?
            .json(&LineRequest {
                product_id,
                quantity,
            });
        self.execute(request, Some(session)).await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not in the cart or the request fails.
    #[instrument(skip(self, session), fields(session = %session.token))]
    pub async fn remove_item(
        &self,
        session: &CartSession,
        product_id: ProductId,
    ) -> Result<Cart, RequestError> {
        let mut url = self.inner.base_url.join("cart/remove_item/")?;
        url.query_pairs_mut()
            .append_pair("product_id", &product_id.to_string());
        self.execute(self.inner.client.delete(url), Some(session))
            .await
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session), fields(session = %session.token))]
    pub async fn clear_cart(&self, session: &CartSession) -> Result<Cart, RequestError> {
        let request = self.request(Method::DELETE, "cart/clear_cart/")?;
        self.execute(request, Some(session)).await
    }
}
