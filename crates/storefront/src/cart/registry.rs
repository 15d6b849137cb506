//! Live cart stores, one per client session.

use std::sync::Arc;
use std::time::Duration;

use eazybuy_core::SessionToken;
use moka::future::Cache;

use super::{CartStore, ensure_session_token};
use crate::api::ApiClient;
use crate::storage::{KeyValueStorage, StorageError};

/// Stores idle longer than this are dropped; the next request rebuilds them
/// from storage.
const STORE_IDLE_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const MAX_STORES: u64 = 10_000;

/// Hands out the [`CartStore`] for a client, initializing it on first use.
#[derive(Clone)]
pub struct CartRegistry {
    api: ApiClient,
    stores: Cache<SessionToken, CartStore>,
}

impl CartRegistry {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let stores = Cache::builder()
            .max_capacity(MAX_STORES)
            .time_to_idle(STORE_IDLE_TIMEOUT)
            .build();
        Self { api, stores }
    }

    /// The store for the client whose durable values live in `storage`.
    ///
    /// Concurrent first requests for the same client share one
    /// initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn open<S: KeyValueStorage>(
        &self,
        storage: &S,
    ) -> Result<CartStore, Arc<StorageError>> {
        let token = ensure_session_token(storage).await.map_err(Arc::new)?;

        self.stores
            .try_get_with(token, async {
                let store = CartStore::new(self.api.clone());
                store.initialize(storage).await?;
                Ok::<_, StorageError>(store)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::MemoryStorage;

    fn registry() -> CartRegistry {
        let url = Url::parse("http://127.0.0.1:9/api").unwrap_or_else(|e| panic!("{e}"));
        CartRegistry::new(ApiClient::new(&ApiConfig::new(url)))
    }

    #[tokio::test]
    async fn test_open_reuses_store_for_same_client() {
        let registry = registry();
        let storage = MemoryStorage::new();

        let first = registry.open(&storage).await.unwrap_or_else(|e| panic!("{e}"));
        let second = registry.open(&storage).await.unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(first.session_token(), second.session_token());
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
    }

    #[tokio::test]
    async fn test_open_separates_clients() {
        let registry = registry();

        let a = MemoryStorage::new();
        a.set(crate::storage::keys::SESSION_ID, "session_1").await.ok();
        let b = MemoryStorage::new();
        b.set(crate::storage::keys::SESSION_ID, "session_2").await.ok();

        let store_a = registry.open(&a).await.unwrap_or_else(|e| panic!("{e}"));
        let store_b = registry.open(&b).await.unwrap_or_else(|e| panic!("{e}"));

        assert_ne!(store_a.session_token(), store_b.session_token());
        assert!(!Arc::ptr_eq(&store_a.inner, &store_b.inner));
    }

    #[tokio::test]
    async fn test_simultaneous_new_clients_get_own_stores() {
        let registry = registry();

        for _ in 0..20 {
            let a = MemoryStorage::new();
            let b = MemoryStorage::new();

            let (store_a, store_b) = tokio::join!(registry.open(&a), registry.open(&b));
            let store_a = store_a.unwrap_or_else(|e| panic!("{e}"));
            let store_b = store_b.unwrap_or_else(|e| panic!("{e}"));

            assert_ne!(store_a.session_token(), store_b.session_token());
            assert!(!Arc::ptr_eq(&store_a.inner, &store_b.inner));
        }
    }
}
