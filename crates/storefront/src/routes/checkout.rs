//! Checkout route handlers.
//!
//! The draft lives in the session so a half-finished checkout survives page
//! reloads; placing an order clears it.

use axum::{extract::State, http::StatusCode};
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::{Result, add_breadcrumb};
use crate::extract::Json;
use crate::middleware::RequireAuth;
use crate::models::checkout::{CheckoutDraft, CheckoutPreview};
use crate::models::order::OrderView;
use crate::models::session::keys;
use crate::services::StoreError;
use crate::services::cart::CartService;
use crate::services::checkout::{CheckoutService, ResolvedCheckout};
use crate::state::AppState;

async fn saved_draft(session: &Session) -> Result<CheckoutDraft> {
    Ok(session
        .get::<CheckoutDraft>(keys::CHECKOUT_DRAFT)
        .await?
        .unwrap_or_default())
}

/// GET /api/checkout/draft
#[instrument(skip(session, user), fields(user_id = %user.id))]
pub async fn draft(session: Session, RequireAuth(user): RequireAuth) -> Result<Json<CheckoutDraft>> {
    Ok(Json(saved_draft(&session).await?))
}

/// Replace the saved draft. Partial drafts are fine.
///
/// PUT /api/checkout/draft
#[instrument(skip(session, user, draft), fields(user_id = %user.id))]
pub async fn save_draft(
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(draft): Json<CheckoutDraft>,
) -> Result<Json<CheckoutDraft>> {
    draft.validate()?;
    session.insert(keys::CHECKOUT_DRAFT, &draft).await?;
    Ok(Json(draft))
}

/// DELETE /api/checkout/draft
#[instrument(skip(session, user), fields(user_id = %user.id))]
pub async fn clear_draft(session: Session, RequireAuth(user): RequireAuth) -> Result<StatusCode> {
    session.remove::<CheckoutDraft>(keys::CHECKOUT_DRAFT).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/checkout/preview
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn preview(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CheckoutPreview>> {
    let lines = CartService::new(state.pool()).lines(user.id).await?;
    let draft = saved_draft(&session).await?;

    let config = state.config();
    let preview = CheckoutPreview::build(
        &lines,
        draft,
        config.currency,
        &config.shipping,
        &config.asset_base_url,
    )
    .map_err(StoreError::from)?;
    Ok(Json(preview))
}

/// Place an order for the selected cart lines.
///
/// Fields missing from the body fall back to the saved draft.
///
/// POST /api/checkout
#[instrument(skip(state, session, user, request), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CheckoutDraft>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let checkout = ResolvedCheckout::new(request, saved_draft(&session).await?)?;

    let config = state.config();
    let (order, items) = CheckoutService::new(state.pool(), config.currency, config.shipping)
        .place_order(user.id, &checkout)
        .await?;

    session.remove::<CheckoutDraft>(keys::CHECKOUT_DRAFT).await?;
    // Stock changed
    state.catalog().invalidate_all().await;

    info!(order_number = %order.order_number, total = %order.total, "Order placed");
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(OrderView::new(order, &items, config.currency)),
    ))
}
