//! Session-scoped cart store.
//!
//! A [`CartStore`] is a thin cache of one server-owned [`Cart`]. It never
//! merges or predicts: every successful API call replaces the snapshot with
//! the cart the API returned, and a failed call leaves the snapshot exactly
//! as it was.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Loading --> Ready
//!                    Ready --mutation--> Loading --> Ready   (success or failure)
//!                    Ready --dispose--> Disposed
//! ```
//!
//! Overlapping calls are not coordinated. Whichever response lands last
//! becomes the snapshot.

mod registry;

pub use registry::CartRegistry;

use std::future::Future;
use std::sync::Arc;

use eazybuy_core::{Cart, ProductId, Quantity, SessionToken};
use parking_lot::RwLock;
use tracing::instrument;

use crate::api::{ApiClient, CartSession, RequestError};
use crate::storage::{KeyValueStorage, StorageError, keys};

/// Observable state of a [`CartStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    /// `initialize` has not run yet.
    Uninitialized,
    /// At least one API call is in flight.
    Loading,
    /// Idle. The snapshot may still be absent if the first fetch failed.
    Ready,
    /// `dispose` has run; cart calls are refused.
    Disposed,
}

#[derive(Default)]
struct StoreState {
    session: Option<CartSession>,
    snapshot: Option<Cart>,
    in_flight: usize,
    generation: u64,
    disposed: bool,
}

struct CartStoreInner {
    api: ApiClient,
    state: RwLock<StoreState>,
}

/// Holder of the current cart snapshot for one client session.
///
/// Cheap to clone; clones share the snapshot.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

/// Marks the store busy for as long as it is alive.
struct BusyGuard(Arc<CartStoreInner>);

impl BusyGuard {
    fn new(inner: &Arc<CartStoreInner>) -> Self {
        inner.state.write().in_flight += 1;
        Self(Arc::clone(inner))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let mut state = self.0.state.write();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Read the session token from storage, creating and persisting one if
/// absent or unreadable.
///
/// # Errors
///
/// Returns an error if storage cannot be read or written.
pub async fn ensure_session_token<S: KeyValueStorage>(
    storage: &S,
) -> Result<SessionToken, StorageError> {
    if let Some(raw) = storage.get(keys::SESSION_ID).await? {
        match SessionToken::parse(&raw) {
            Ok(token) => return Ok(token),
            Err(e) => tracing::warn!(error = %e, "Discarding unreadable session token"),
        }
    }

    let token = SessionToken::generate();
    storage.set(keys::SESSION_ID, token.as_str()).await?;
    tracing::info!(session = %token, "Created new session token");
    Ok(token)
}

impl CartStore {
    /// Create an uninitialized store.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                state: RwLock::new(StoreState::default()),
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Attach the store to the client's durable storage and load the cart.
    ///
    /// Ensures a session token exists (creating and persisting one if
    /// needed), restores the API session cookie if one was saved, then
    /// [`refresh`](Self::refresh)es. A failed fetch is tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error only if storage fails.
    #[instrument(skip(self, storage))]
    pub async fn initialize<S: KeyValueStorage>(
        &self,
        storage: &S,
    ) -> Result<SessionToken, StorageError> {
        let token = ensure_session_token(storage).await?;
        let session = CartSession::new(token.clone());

        if let Some(cookies) = storage.get(keys::API_SESSION_COOKIE).await? {
            self.inner.api.restore_session_cookies(&session, &cookies);
        }

        {
            let mut state = self.inner.state.write();
            state.session = Some(session);
            state.disposed = false;
        }

        self.refresh().await;
        Ok(token)
    }

    /// Save the API session cookie so a later `initialize` resumes the same
    /// server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn persist_session<S: KeyValueStorage>(&self, storage: &S) -> Result<(), StorageError> {
        let cookies = {
            let state = self.inner.state.read();
            state
                .session
                .as_ref()
                .and_then(|session| self.inner.api.session_cookies(session))
        };

        match cookies {
            Some(cookies) => storage.set(keys::API_SESSION_COOKIE, &cookies).await,
            None => Ok(()),
        }
    }

    /// Persist the session and stop accepting cart calls.
    ///
    /// The last snapshot stays readable.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails; the store is disposed regardless.
    #[instrument(skip(self, storage))]
    pub async fn dispose<S: KeyValueStorage>(&self, storage: &S) -> Result<(), StorageError> {
        let result = self.persist_session(storage).await;
        self.inner.state.write().disposed = true;
        result
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Total units in the current snapshot; 0 when there is none.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.inner
            .state
            .read()
            .snapshot
            .as_ref()
            .map_or(0, Cart::item_count)
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<Cart> {
        self.inner.state.read().snapshot.clone()
    }

    /// Returns true while any API call is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.state.read().in_flight > 0
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> StorePhase {
        let state = self.inner.state.read();
        if state.disposed {
            StorePhase::Disposed
        } else if state.in_flight > 0 {
            StorePhase::Loading
        } else if state.session.is_some() {
            StorePhase::Ready
        } else {
            StorePhase::Uninitialized
        }
    }

    /// Number of times the snapshot has been replaced.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.state.read().generation
    }

    /// The session token, once initialized.
    #[must_use]
    pub fn session_token(&self) -> Option<SessionToken> {
        self.inner
            .state
            .read()
            .session
            .as_ref()
            .map(|session| session.token().clone())
    }

    // =========================================================================
    // Server Round Trips
    // =========================================================================

    /// Re-fetch the cart from the API.
    ///
    /// On failure the error is logged and the previous snapshot (if any) is
    /// kept. Returns the snapshot after the call.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Option<Cart> {
        let session = match self.session() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping cart refresh");
                return self.snapshot();
            }
        };

        let _busy = BusyGuard::new(&self.inner);
        match self.inner.api.get_cart(&session).await {
            Ok(cart) => {
                self.replace(cart.clone());
                Some(cart)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch cart");
                self.snapshot()
            }
        }
    }

    /// Add units of a product. The API merges them into an existing line.
    ///
    /// # Errors
    ///
    /// Returns the API error; the snapshot is left unchanged.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RequestError> {
        self.mutate("add_item", |api, session| async move {
            api.add_item(&session, product_id, quantity).await
        })
        .await
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns the API error; the snapshot is left unchanged.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RequestError> {
        self.mutate("update_item", |api, session| async move {
            api.update_item(&session, product_id, quantity).await
        })
        .await
    }

    /// Remove a product's line. Presence is not checked locally.
    ///
    /// # Errors
    ///
    /// Returns the API error; the snapshot is left unchanged.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<Cart, RequestError> {
        self.mutate("remove_item", |api, session| async move {
            api.remove_item(&session, product_id).await
        })
        .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns the API error; the snapshot is left unchanged.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Cart, RequestError> {
        self.mutate("clear_cart", |api, session| async move {
            api.clear_cart(&session).await
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn session(&self) -> Result<CartSession, RequestError> {
        let state = self.inner.state.read();
        if state.disposed {
            return Err(RequestError::Disposed);
        }
        state.session.clone().ok_or(RequestError::NotInitialized)
    }

    fn replace(&self, cart: Cart) {
        let mut state = self.inner.state.write();
        state.snapshot = Some(cart);
        state.generation += 1;
    }

    async fn mutate<F, Fut>(&self, operation: &'static str, call: F) -> Result<Cart, RequestError>
    where
        F: FnOnce(ApiClient, CartSession) -> Fut,
        Fut: Future<Output = Result<Cart, RequestError>>,
    {
        let session = self.session()?;
        let _busy = BusyGuard::new(&self.inner);

        match call(self.inner.api.clone(), session).await {
            Ok(cart) => {
                self.replace(cart.clone());
                tracing::debug!(operation, items = cart.item_count(), "Cart updated");
                Ok(cart)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "Cart update failed");
                Err(e)
            }
        }
    }
}
