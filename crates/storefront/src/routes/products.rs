//! Product route handlers.
//!
//! Listing and categories read the cached catalog; the detail page reads
//! the database so stock is current.

use axum::extract::State;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::models::page::Page;
use crate::models::product::{CategoryCount, ProductView};
use crate::services::catalog::{ProductQuery, categories};
use crate::state::AppState;

/// Search, filter, sort and paginate active products.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductView>>> {
    let products = state.catalog().active_products(state.pool()).await?;
    let page = query.apply(&products)?;

    let config = state.config();
    Ok(Json(page.map(|p| {
        ProductView::new(&p, config.currency, &config.asset_base_url)
    })))
}

/// GET /api/products/{slug}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let config = state.config();
    Ok(Json(ProductView::new(
        &product,
        config.currency,
        &config.asset_base_url,
    )))
}

/// GET /api/categories
#[instrument(skip(state))]
pub async fn categories_index(State(state): State<AppState>) -> Result<Json<Vec<CategoryCount>>> {
    let products = state.catalog().active_products(state.pool()).await?;
    Ok(Json(categories(&products)))
}
