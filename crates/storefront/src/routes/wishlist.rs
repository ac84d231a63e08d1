//! Wishlist route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use cartwheel_core::ProductId;

use super::cart::cart_view;
use crate::error::Result;
use crate::extract::{Json, Path};
use crate::middleware::RequireAuth;
use crate::models::cart::CartView;
use crate::models::wishlist::{WishlistEntryView, WishlistToggle};
use crate::services::cart::CartService;
use crate::services::wishlist::WishlistService;
use crate::state::AppState;

/// Toggle request body.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub product_id: ProductId,
}

/// GET /api/wishlist
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<WishlistEntryView>>> {
    let entries = WishlistService::new(state.pool()).list(user.id).await?;
    let config = state.config();
    Ok(Json(
        entries
            .iter()
            .map(|e| WishlistEntryView::new(e, config.currency, &config.asset_base_url))
            .collect(),
    ))
}

/// POST /api/wishlist/toggle
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<WishlistToggle>> {
    let toggled = WishlistService::new(state.pool())
        .toggle(user.id, body.product_id)
        .await?;
    Ok(Json(toggled))
}

/// DELETE /api/wishlist/{product_id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    WishlistService::new(state.pool())
        .remove(user.id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move a saved product into the cart; answers with the cart.
///
/// POST /api/wishlist/{product_id}/move-to-cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn move_to_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    WishlistService::new(state.pool())
        .move_to_cart(user.id, product_id)
        .await?;
    let lines = CartService::new(state.pool()).lines(user.id).await?;
    cart_view(&state, &lines)
}
