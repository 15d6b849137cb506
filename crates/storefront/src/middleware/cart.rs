//! Cart extractor.
//!
//! Resolves the shopper's [`CartStore`] from their browser session so
//! handlers never touch session keys directly.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::cart::CartStore;
use crate::error::AppError;
use crate::state::AppState;

/// The current shopper's cart store plus the session it is persisted in.
///
/// # Example
///
/// ```rust,ignore
/// async fn badge(cart: CurrentCart) -> String {
///     cart.store.count().to_string()
/// }
/// ```
pub struct CurrentCart {
    pub store: CartStore,
    pub session: Session,
}

impl CurrentCart {
    /// Save the API session cookie after a mutation.
    ///
    /// Failures are logged; the mutation itself already happened.
    pub async fn persist(&self) {
        if let Err(e) = self.store.persist_session(&self.session).await {
            tracing::error!(error = %e, "Failed to persist cart session");
        }
    }
}

impl FromRequestParts<AppState> for CurrentCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("Session layer missing".to_string()))?;

        let store = state.carts().open(&session).await?;

        Ok(Self { store, session })
    }
}
