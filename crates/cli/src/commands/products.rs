//! Catalog commands.
//!
//! # Usage
//!
//! ```bash
//! eazybuy products list --search bag
//! eazybuy products show 2
//! eazybuy products popular
//! eazybuy products seed
//! ```

use eazybuy_core::{ProductId, ProductSort};
use eazybuy_storefront::api::{ApiClient, ProductQuery};
use eazybuy_storefront::config::ApiConfig;
use rust_decimal::Decimal;
use tracing::info;

use crate::output;

/// The sample catalog: name and price in cents.
pub const SAMPLE_PRODUCTS: [(&str, i64); 6] = [
    ("Smart Watch Series 7", 399_00),
    ("Urban Explorer Backpack", 89_50),
    ("Instax Mini 11 Camera", 69_00),
    ("Nike Metcon X Shoes", 120_00),
    ("Sony XM4 Headphones", 299_00),
    ("Leather Satchel Bag", 150_00),
];

/// Outcome of seeding one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Created(ProductId),
    AlreadyExists,
}

/// List products.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn list(
    config: &ApiConfig,
    search: Option<String>,
    sort: ProductSort,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(config);
    let products = client.list_products(&ProductQuery { search, sort }).await?;
    output::products(&products);
    Ok(())
}

/// Show one product.
///
/// # Errors
///
/// Returns an error if the product does not exist or the request fails.
pub async fn show(config: &ApiConfig, id: ProductId) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(config);
    let product = client.get_product(id).await?;
    output::product(&product);
    Ok(())
}

/// List the featured selection.
///
/// # Errors
///
/// Returns an error if the API request fails.
pub async fn popular(config: &ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(config);
    let products = client.popular_products().await?;
    output::products(&products);
    Ok(())
}

/// Create the sample catalog.
///
/// Products whose exact name already exists are left alone, so the command
/// can be run repeatedly.
///
/// # Errors
///
/// Returns an error if any API request fails.
pub async fn seed(config: &ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = ApiClient::new(config);
    let outcomes = seed_catalog(&client).await?;

    for (name, outcome) in &outcomes {
        output::seed_outcome(name, outcome);
    }

    let created = outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, SeedOutcome::Created(_)))
        .count();
    info!(created, total = outcomes.len(), "Seeding complete");
    Ok(())
}

/// Create every missing sample product.
///
/// # Errors
///
/// Returns an error if any API request fails.
pub async fn seed_catalog(
    client: &ApiClient,
) -> Result<Vec<(&'static str, SeedOutcome)>, eazybuy_storefront::api::RequestError> {
    let mut outcomes = Vec::with_capacity(SAMPLE_PRODUCTS.len());

    for (name, cents) in SAMPLE_PRODUCTS {
        let existing = client
            .list_products(&ProductQuery {
                search: Some(name.to_string()),
                sort: ProductSort::default(),
            })
            .await?;

        if existing.iter().any(|product| product.name == name) {
            outcomes.push((name, SeedOutcome::AlreadyExists));
            continue;
        }

        let product = client.create_product(name, Decimal::new(cents, 2)).await?;
        info!(id = %product.id, name, "Created product");
        outcomes.push((name, SeedOutcome::Created(product.id)));
    }

    Ok(outcomes)
}
