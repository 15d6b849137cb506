//! EazyBuy REST API client.
//!
//! # Architecture
//!
//! - Plain JSON over HTTP with `reqwest`
//! - The API is source of truth - NO local merging, every cart call returns
//!   the full cart which replaces whatever the caller held before
//! - One attempt per call: no retries, no backoff, no timeouts
//! - In-memory caching via `moka` for catalog responses (cart calls are
//!   never cached)
//!
//! # Sessions
//!
//! Anonymous carts are keyed by the API's own session cookie. Each
//! [`CartSession`] owns a cookie jar that is replayed on every cart request,
//! and carries the client's [`SessionToken`](eazybuy_core::SessionToken) in
//! the `X-Session-ID` header.
//!
//! # Example
//!
//! ```rust,ignore
//! use eazybuy_storefront::api::{ApiClient, CartSession};
//!
//! let client = ApiClient::new(&config.api);
//! let session = CartSession::new(SessionToken::generate());
//!
//! let product = client.get_product(ProductId::new(1)).await?;
//! let cart = client.add_item(&session, product.id, Quantity::ONE).await?;
//! ```

mod cache;
mod client;

pub use client::{ApiClient, CartSession, ProductQuery, SESSION_HEADER};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when calling the EazyBuy API.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Transport failure (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API returned {status}: {message}")]
    Status {
        /// Response status.
        status: StatusCode,
        /// Message extracted from the error body.
        message: String,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Cart call made before the store was initialized.
    #[error("Cart store is not initialized")]
    NotInitialized,

    /// Cart call made after the store was disposed.
    #[error("Cart store has been disposed")]
    Disposed,
}

impl RequestError {
    /// HTTP status of the failure, when the API produced one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND),
            _ => None,
        }
    }

    /// Returns true if the API reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message,
            Self::NotFound(_) => "Not found",
            Self::Http(_) => "The shop is unreachable right now",
            _ => "Something went wrong",
        }
    }
}
