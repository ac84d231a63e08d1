//! Order history route handlers.

use axum::extract::State;
use tracing::instrument;

use cartwheel_core::OrderId;

use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::middleware::RequireAuth;
use crate::models::order::{OrderSummaryView, OrderView};
use crate::models::page::{Page, PageRequest};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// GET /api/orders
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(request): Query<PageRequest>,
) -> Result<Json<Page<OrderSummaryView>>> {
    let pagination = request.resolve()?;
    let page = OrderService::new(state.pool())
        .list(user.id, pagination)
        .await?;

    let currency = state.config().currency;
    Ok(Json(page.map(|(order, item_count)| {
        OrderSummaryView::new(&order, item_count, currency)
    })))
}

/// GET /api/orders/{id}
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let (order, items) = OrderService::new(state.pool()).get(user.id, id).await?;
    Ok(Json(OrderView::new(order, &items, state.config().currency)))
}

/// Cancel a pending or processing order and restock its items.
///
/// POST /api/orders/{id}/cancel
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let (order, items) = OrderService::new(state.pool()).cancel(user.id, id).await?;
    state.catalog().invalidate_all().await;
    Ok(Json(OrderView::new(order, &items, state.config().currency)))
}
