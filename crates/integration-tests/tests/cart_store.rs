//! Cart store behaviour against a live fake EazyBuy API.
//!
//! Each test spawns its own fake API, so carts never leak between tests.

use eazybuy_core::{ProductId, Quantity};
use eazybuy_integration_tests::FakeApi;
use eazybuy_storefront::api::{ApiClient, RequestError};
use eazybuy_storefront::cart::{CartStore, StorePhase};
use eazybuy_storefront::config::ApiConfig;
use eazybuy_storefront::storage::{KeyValueStorage, MemoryStorage, keys};
use rust_decimal::Decimal;

const WATCH: ProductId = ProductId::new(1);
const BACKPACK: ProductId = ProductId::new(2);
const CAMERA: ProductId = ProductId::new(3);

fn qty(n: u32) -> Quantity {
    Quantity::new(n).unwrap_or_else(|| panic!("quantity must be positive"))
}

async fn open_store(api: &FakeApi, storage: &MemoryStorage) -> CartStore {
    let store = CartStore::new(ApiClient::new(&ApiConfig::new(api.url())));
    store
        .initialize(storage)
        .await
        .unwrap_or_else(|e| panic!("initialize failed: {e}"));
    store
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_initialize_loads_empty_cart() {
    let api = FakeApi::spawn().await;
    let storage = MemoryStorage::new();

    let store = open_store(&api, &storage).await;

    assert_eq!(store.phase(), StorePhase::Ready);
    assert!(!store.is_busy());
    let cart = store.snapshot().unwrap_or_else(|| panic!("no snapshot"));
    assert!(cart.is_empty());
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn test_session_token_sent_with_cart_calls() {
    let api = FakeApi::spawn().await;
    let storage = MemoryStorage::new();

    let store = open_store(&api, &storage).await;
    store
        .add_item(WATCH, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    let token = store
        .session_token()
        .unwrap_or_else(|| panic!("no session token"));
    let seen = api.session_headers();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|header| header == token.as_str()));
    assert_eq!(
        storage.get(keys::SESSION_ID).await.ok().flatten().as_deref(),
        Some(token.as_str())
    );
}

#[tokio::test]
async fn test_disposed_store_resumes_cart_from_storage() {
    let api = FakeApi::spawn().await;
    let storage = MemoryStorage::new();

    let first = open_store(&api, &storage).await;
    first
        .add_item(CAMERA, qty(2))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    first
        .dispose(&storage)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(matches!(
        first.add_item(CAMERA, Quantity::ONE).await,
        Err(RequestError::Disposed)
    ));

    // A fresh store over the same storage sees the same server-side cart
    let second = open_store(&api, &storage).await;
    assert_eq!(second.count(), 2);
    assert_eq!(api.cart_sessions(), 1);
}

#[tokio::test]
async fn test_separate_clients_get_separate_carts() {
    let api = FakeApi::spawn().await;

    let alice = open_store(&api, &MemoryStorage::new()).await;
    let bob = open_store(&api, &MemoryStorage::new()).await;

    alice
        .add_item(WATCH, qty(3))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    bob.refresh().await;

    assert_eq!(alice.count(), 3);
    assert_eq!(bob.count(), 0);
    assert_ne!(alice.session_token(), bob.session_token());
}

// =============================================================================
// Mutations
// =============================================================================

#[tokio::test]
async fn test_add_merges_into_existing_line() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;
    let price = api.price(WATCH).unwrap_or_else(|| panic!("no price"));

    let cart = store
        .add_item(WATCH, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(cart.items.len(), 1);
    let line = cart.line(WATCH).unwrap_or_else(|| panic!("no line"));
    assert_eq!(line.quantity, 1);
    assert_eq!(cart.total, price);

    let cart = store
        .add_item(WATCH, qty(2))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(cart.items.len(), 1);
    let line = cart.line(WATCH).unwrap_or_else(|| panic!("no line"));
    assert_eq!(line.quantity, 3);
    assert_eq!(line.total, price * Decimal::from(3));
    assert_eq!(cart.total, price * Decimal::from(3));
    assert_eq!(store.count(), 3);
}

#[tokio::test]
async fn test_update_then_refresh_shows_new_quantity() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;

    store
        .add_item(BACKPACK, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    store
        .update_item(BACKPACK, qty(4))
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    let cart = store.refresh().await.unwrap_or_else(|| panic!("no cart"));
    let line = cart.line(BACKPACK).unwrap_or_else(|| panic!("no line"));
    assert_eq!(line.quantity, 4);
}

#[tokio::test]
async fn test_count_sums_all_lines() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;

    store
        .add_item(WATCH, qty(2))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    store
        .add_item(BACKPACK, qty(5))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    store
        .add_item(CAMERA, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert_eq!(store.count(), 8);
}

#[tokio::test]
async fn test_clear_then_count_is_zero() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;

    store
        .add_item(WATCH, qty(2))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let cart = store.clear().await.unwrap_or_else(|e| panic!("{e}"));

    assert!(cart.is_empty());
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn test_remove_deletes_line() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;

    store
        .add_item(WATCH, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    store
        .add_item(CAMERA, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let cart = store
        .remove_item(WATCH)
        .await
        .unwrap_or_else(|e| panic!("{e}"));

    assert!(cart.line(WATCH).is_none());
    assert!(cart.line(CAMERA).is_some());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_remove_absent_product_surfaces_server_error() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;
    store
        .add_item(WATCH, Quantity::ONE)
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let generation = store.generation();

    let err = store
        .remove_item(CAMERA)
        .await
        .err()
        .unwrap_or_else(|| panic!("remove should fail"));

    assert!(err.is_not_found());
    assert_eq!(err.user_message(), "Item not in cart");
    assert_eq!(store.generation(), generation);
    assert_eq!(store.count(), 1);
}

#[tokio::test]
async fn test_add_unknown_product_is_rejected() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;

    let err = store
        .add_item(ProductId::new(999), Quantity::ONE)
        .await
        .err()
        .unwrap_or_else(|| panic!("add should fail"));

    assert_eq!(err.user_message(), "Product not found");
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn test_failed_add_leaves_snapshot_unchanged() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;
    store
        .add_item(WATCH, qty(2))
        .await
        .unwrap_or_else(|e| panic!("{e}"));
    let before = store.snapshot();

    api.set_cart_outage(true);
    let result = store.add_item(BACKPACK, Quantity::ONE).await;

    assert!(matches!(result, Err(RequestError::Status { .. })));
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.count(), 2);
    assert!(!store.is_busy());

    // Refresh failures are tolerated and keep the snapshot too
    assert_eq!(store.refresh().await, before);
}

#[tokio::test]
async fn test_overlapping_mutations_all_settle() {
    let api = FakeApi::spawn().await;
    let store = open_store(&api, &MemoryStorage::new()).await;
    let generation = store.generation();

    let (a, b) = tokio::join!(
        store.add_item(WATCH, Quantity::ONE),
        store.add_item(BACKPACK, Quantity::ONE)
    );
    assert!(a.is_ok() && b.is_ok());

    assert!(!store.is_busy());
    assert_eq!(store.generation(), generation + 2);
    // Whichever response landed last is the snapshot; a refresh agrees with the server
    let cart = store.refresh().await.unwrap_or_else(|| panic!("no cart"));
    assert_eq!(cart.item_count(), 2);
}
