//! Cart commands.
//!
//! Every invocation attaches a cart store to the state file, runs one
//! operation and disposes the store, which saves the API session cookie for
//! the next run.

use std::path::Path;

use eazybuy_core::{Cart, ProductId, Quantity};
use eazybuy_storefront::api::{ApiClient, RequestError};
use eazybuy_storefront::cart::CartStore;
use eazybuy_storefront::config::ApiConfig;
use eazybuy_storefront::storage::FileStorage;
use tracing::warn;

use crate::output;

/// Runs cart operations against a file-backed session.
pub struct CartCommand {
    store: CartStore,
    storage: FileStorage,
}

impl CartCommand {
    pub fn new(config: &ApiConfig, state: &Path) -> Self {
        Self {
            store: CartStore::new(ApiClient::new(config)),
            storage: FileStorage::new(state),
        }
    }

    /// Print the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be fetched.
    pub async fn show(&self) -> Result<(), Box<dyn std::error::Error>> {
        // initialize already fetched the cart
        self.session(|_| async { Ok(None) }).await?;
        let cart = self.store.snapshot().ok_or("Could not load cart")?;
        output::cart(&cart);
        Ok(())
    }

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the change.
    pub async fn add(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let quantity = clamp(quantity);
        let cart = self
            .session(|store| async move { store.add_item(product_id, quantity).await.map(Some) })
            .await?;
        if let Some(cart) = cart {
            output::added(quantity);
            output::cart(&cart);
        }
        Ok(())
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not in the cart or the API fails.
    pub async fn update(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let quantity = clamp(quantity);
        let cart = self
            .session(|store| async move { store.update_item(product_id, quantity).await.map(Some) })
            .await?;
        if let Some(cart) = cart {
            output::cart(&cart);
        }
        Ok(())
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not in the cart or the API fails.
    pub async fn remove(&self, product_id: ProductId) -> Result<(), Box<dyn std::error::Error>> {
        let cart = self
            .session(|store| async move { store.remove_item(product_id).await.map(Some) })
            .await?;
        if let Some(cart) = cart {
            output::cart(&cart);
        }
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API fails.
    pub async fn clear(&self) -> Result<(), Box<dyn std::error::Error>> {
        let cart = self
            .session(|store| async move { store.clear().await.map(Some) })
            .await?;
        if let Some(cart) = cart {
            output::cart(&cart);
        }
        Ok(())
    }

    /// Print the number of units in the cart.
    ///
    /// An unreachable API counts as an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be used.
    pub async fn count(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.session(|_| async { Ok(None) }).await?;
        output::count(self.store.count());
        Ok(())
    }

    /// Initialize the store, run `operation`, then dispose.
    ///
    /// The store is disposed even when the operation fails so the session
    /// cookie is never lost.
    async fn session<F, Fut>(&self, operation: F) -> Result<Option<Cart>, Box<dyn std::error::Error>>
    where
        F: FnOnce(CartStore) -> Fut,
        Fut: std::future::Future<Output = Result<Option<Cart>, RequestError>>,
    {
        self.store.initialize(&self.storage).await?;
        let result = operation(self.store.clone()).await;

        if let Err(e) = self.store.dispose(&self.storage).await {
            warn!(error = %e, path = %self.storage.path().display(), "Failed to save cart session");
        }

        Ok(result?)
    }
}

fn clamp(quantity: i64) -> Quantity {
    let clamped = Quantity::clamped(quantity);
    if i64::from(clamped.get()) != quantity {
        warn!(requested = quantity, used = %clamped, "Quantity adjusted");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use eazybuy_storefront::config::parse_api_url;
    use eazybuy_storefront::storage::{KeyValueStorage, keys};
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn cart_json(quantity: u32) -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "items": [{
                "id": 1,
                "product": {"id": 4, "name": "Nike Metcon X Shoes", "price": "120.00"},
                "quantity": quantity,
                "total": 120.0 * f64::from(quantity)
            }],
            "total": 120.0 * f64::from(quantity)
        })
    }

    async fn command(server: &MockServer, state: &Path) -> CartCommand {
        let url = parse_api_url(&format!("{}/api", server.uri())).unwrap_or_else(|e| panic!("{e}"));
        CartCommand::new(&ApiConfig::new(url), state)
    }

    #[test]
    fn test_clamp_never_below_one() {
        assert_eq!(clamp(0).get(), 1);
        assert_eq!(clamp(-4).get(), 1);
        assert_eq!(clamp(7).get(), 7);
    }

    #[tokio::test]
    async fn test_update_clamps_and_saves_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart/get_cart/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "sessionid=abc123; Path=/")
                    .set_body_json(cart_json(2)),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/cart/update_item/"))
            .and(header_exists("x-session-id"))
            .and(body_json(serde_json::json!({"product_id": 4, "quantity": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(1)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let state = dir.path().join("session.json");
        let cmd = command(&server, &state).await;

        cmd.update(ProductId::new(4), 0)
            .await
            .unwrap_or_else(|e| panic!("{e}"));

        let storage = FileStorage::new(&state);
        assert!(storage.get(keys::SESSION_ID).await.ok().flatten().is_some());
        assert_eq!(
            storage
                .get(keys::API_SESSION_COOKIE)
                .await
                .ok()
                .flatten()
                .as_deref(),
            Some("sessionid=abc123")
        );
    }

    #[tokio::test]
    async fn test_failed_add_still_saves_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart/get_cart/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "sessionid=xyz; Path=/")
                    .set_body_json(serde_json::json!({"id": 1, "items": [], "total": 0.0})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/cart/add_item/"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "Product not found"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let state = dir.path().join("session.json");
        let cmd = command(&server, &state).await;

        let result = cmd.add(ProductId::new(99), 1).await;

        let err = result.err().unwrap_or_else(|| panic!("add should fail"));
        assert!(err.to_string().contains("Product not found"));
        assert_eq!(
            FileStorage::new(&state)
                .get(keys::API_SESSION_COOKIE)
                .await
                .ok()
                .flatten()
                .as_deref(),
            Some("sessionid=xyz")
        );
    }
}
