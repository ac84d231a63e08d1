//! Order history and cancellation.

use sqlx::PgPool;
use tracing::{info, instrument};

use cartwheel_core::{OrderId, OrderStatus, UserId};

use super::StoreError;
use crate::db::{OrderRepository, orders, products};
use crate::models::order::{Order, OrderItem};
use crate::models::page::{Page, Pagination};

/// Why an order in `status` can't be cancelled, or `None` if it can.
fn cancel_refusal(order_number: &str, status: OrderStatus) -> Option<StoreError> {
    if status.is_cancellable() {
        return None;
    }
    let reason = if status.is_terminal() {
        format!("order {order_number} is already {status}")
    } else {
        format!("order {order_number} has {status} and can no longer be cancelled")
    };
    Some(StoreError::InvalidState(reason))
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of the user's orders with their unit counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if a query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        pagination: Pagination,
    ) -> Result<Page<(Order, u32)>, StoreError> {
        let repo = OrderRepository::new(self.pool);
        let total = repo.count(user_id).await?;
        let limit = i64::from(pagination.per_page);
        let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);
        let rows = repo.list(user_id, limit, offset).await?;
        Ok(pagination.page_of(rows, total))
    }

    /// One of the user's orders with its lines.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order isn't the user's.
    pub async fn get(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<(Order, Vec<OrderItem>), StoreError> {
        OrderRepository::new(self.pool)
            .get(user_id, id)
            .await?
            .ok_or(StoreError::NotFound("order"))
    }

    /// Cancel an order and put its items back in stock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order isn't the user's and
    /// `StoreError::InvalidState` once it has shipped or was already cancelled.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %id))]
    pub async fn cancel(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<(Order, Vec<OrderItem>), StoreError> {
        let mut tx = self.pool.begin().await?;

        let order = orders::order_for_update(&mut tx, user_id, id)
            .await?
            .ok_or(StoreError::NotFound("order"))?;
        if let Some(refusal) = cancel_refusal(&order.order_number, order.status) {
            return Err(refusal);
        }

        let items = orders::items_of(&mut tx, id).await?;
        for item in &items {
            // Deleted products have nothing to restock
            if let Some(product_id) = item.product_id {
                products::adjust_stock(&mut tx, product_id, item.quantity).await?;
            }
        }
        let order = orders::set_status(&mut tx, id, OrderStatus::Cancelled).await?;

        tx.commit().await?;

        info!(order_number = %order.order_number, "Order cancelled");
        Ok((order, items))
    }
}
