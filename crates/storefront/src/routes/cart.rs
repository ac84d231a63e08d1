//! Cart route handlers.
//!
//! Every mutation answers with the refreshed cart so clients never have to
//! re-fetch it.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use cartwheel_core::{CartItemId, ProductId};

use crate::error::{Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::cart::{CartLine, CartView};
use crate::services::StoreError;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

/// Select-all request body.
#[derive(Debug, Deserialize)]
pub struct SelectAllRequest {
    pub selected: bool,
}

/// Render cart lines with the store's currency, shipping and image base.
pub(crate) fn cart_view(state: &AppState, lines: &[CartLine]) -> Result<Json<CartView>> {
    let config = state.config();
    let view = CartView::build(
        lines,
        config.currency,
        &config.shipping,
        &config.asset_base_url,
    )
    .map_err(StoreError::from)?;
    Ok(Json(view))
}

/// GET /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool()).lines(user.id).await?;
    cart_view(&state, &lines)
}

/// POST /api/cart/items
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool())
        .add(user.id, body.product_id, body.quantity)
        .await?;
    let product_id = body.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product_id.as_str())]),
    );
    cart_view(&state, &lines)
}

/// PATCH /api/cart/items/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn set_quantity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
    Json(body): Json<SetQuantityRequest>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool())
        .set_quantity(user.id, id, body.quantity)
        .await?;
    cart_view(&state, &lines)
}

/// POST /api/cart/items/{id}/increment
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn increment(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool()).increment(user.id, id).await?;
    cart_view(&state, &lines)
}

/// POST /api/cart/items/{id}/decrement
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn decrement(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool()).decrement(user.id, id).await?;
    cart_view(&state, &lines)
}

/// POST /api/cart/items/{id}/toggle
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool()).toggle(user.id, id).await?;
    cart_view(&state, &lines)
}

/// POST /api/cart/select
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn select_all(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<SelectAllRequest>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool())
        .select_all(user.id, body.selected)
        .await?;
    cart_view(&state, &lines)
}

/// DELETE /api/cart/items/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let lines = CartService::new(state.pool()).remove(user.id, id).await?;
    cart_view(&state, &lines)
}

/// DELETE /api/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<StatusCode> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
