//! Session middleware configuration.
//!
//! Browser sessions live in process memory via tower-sessions. The session
//! doubles as the durable storage for a shopper's cart token and API cookie.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::storage::{KeyValueStorage, StorageError};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "eazybuy_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

impl KeyValueStorage for Session {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::get::<String>(self, key)
            .await
            .map_err(|e| StorageError::Session(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value)
            .await
            .map_err(|e| StorageError::Session(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::remove::<String>(self, key)
            .await
            .map(drop)
            .map_err(|e| StorageError::Session(e.to_string()))
    }
}
