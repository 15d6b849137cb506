//! Core types for EazyBuy.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;
pub mod quantity;
pub mod session;

pub use cart::{Cart, CartItem};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductSort};
pub use quantity::Quantity;
pub use session::{SessionToken, SessionTokenError};
