//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use eazybuy_core::{Product, ProductId, ProductSort, Quantity};
use serde::Deserialize;
use tracing::instrument;

use crate::api::ProductQuery;
use crate::error::{AppError, Result};
use crate::filters;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.unit_price().display(),
            image: product.image.clone(),
        }
    }
}

/// Sort option for the listing's select box.
pub struct SortOption {
    pub key: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub sort: Option<String>,
}

impl ListingQuery {
    /// Unknown sort keys fall back to newest first.
    fn sort(&self) -> ProductSort {
        self.sort
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

/// Quantity selector query parameters.
#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub quantity: i64,
    #[serde(default)]
    pub change: i64,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductView>,
    pub search: String,
    pub sort_options: Vec<SortOption>,
    pub error: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub quantity: Quantity,
}

/// Quantity selector fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/quantity_selector.html")]
pub struct QuantitySelectorTemplate {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Display product listing page.
///
/// A failed fetch renders the page with an error banner instead of failing
/// the request.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let sort = query.sort();
    let search = query.q.clone().unwrap_or_default();

    let api_query = ProductQuery {
        search: Some(search.clone()),
        sort,
    };

    let (products, error) = match state.api().list_products(&api_query).await {
        Ok(products) => (products.iter().map(ProductView::from).collect(), None),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load products");
            (Vec::new(), Some("Failed to load products".to_string()))
        }
    };

    let sort_options = ProductSort::ALL
        .into_iter()
        .map(|option| SortOption {
            key: option.key(),
            label: option.label(),
            selected: option == sort,
        })
        .collect();

    ProductsIndexTemplate {
        products,
        search,
        sort_options,
        error,
    }
}

/// Display product detail page.
#[instrument(skip(state), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<ProductShowTemplate> {
    let product = state.api().get_product(id).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound("Product not found".to_string())
        } else {
            AppError::Upstream(e)
        }
    })?;

    Ok(ProductShowTemplate {
        product: ProductView::from(&product),
        quantity: Quantity::ONE,
    })
}

/// Step the detail page's quantity selector (HTMX).
///
/// Never goes below one.
pub async fn quantity(
    Path(id): Path<ProductId>,
    Query(query): Query<QuantityQuery>,
) -> QuantitySelectorTemplate {
    QuantitySelectorTemplate {
        product_id: id,
        quantity: Quantity::clamped(query.quantity.saturating_add(query.change)),
    }
}
