//! EazyBuy Core - Shared types library.
//!
//! This crate provides the types used across all EazyBuy components:
//! - `storefront` - Server-rendered shop front (product listing, detail, cart)
//! - `cli` - Terminal client for browsing products and managing a cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. The
//! EazyBuy API is the source of truth for everything modelled here; these
//! types mirror its JSON payloads and add the small amount of derived
//! behaviour the clients need (counting items, formatting prices, clamping
//! quantities).
//!
//! # Modules
//!
//! - [`types`] - Product, cart, price, quantity and session token types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
