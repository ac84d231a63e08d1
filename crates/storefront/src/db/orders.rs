//! Order repository.
//!
//! Orders are only ever written inside the checkout and cancellation
//! transactions, so the write helpers take a `PgConnection`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use cartwheel_core::{OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId, UserId};

use super::RepositoryError;
use crate::models::address::ShippingAddress;
use crate::models::order::{Order, OrderItem};

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_method, shipping_address, \
                             note, subtotal, shipping_fee, total, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    status: OrderStatus,
    payment_method: PaymentMethod,
    shipping_address: Json<ShippingAddress>,
    note: Option<String>,
    subtotal: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(r: OrderRow) -> Self {
        Self {
            id: r.id,
            order_number: r.order_number,
            user_id: r.user_id,
            status: r.status,
            payment_method: r.payment_method,
            shipping_address: r.shipping_address.0,
            note: r.note,
            subtotal: r.subtotal,
            shipping_fee: r.shipping_fee,
            total: r.total,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderListRow {
    #[sqlx(flatten)]
    order: OrderRow,
    item_count: i64,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: Option<ProductId>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            product_name: r.product_name,
            unit_price: r.unit_price,
            quantity: r.quantity,
        }
    }
}

/// Fields of a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub shipping_address: &'a ShippingAddress,
    pub note: Option<&'a str>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

/// One line of a new order.
#[derive(Debug, Clone)]
pub struct NewOrderItem<'a> {
    pub product_id: ProductId,
    pub product_name: &'a str,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Repository for placed orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of a user's orders, newest first, with their unit counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<(Order, u32)>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderListRow>(
            r"
            SELECT o.id, o.order_number, o.user_id, o.status, o.payment_method,
                   o.shipping_address, o.note, o.subtotal, o.shipping_fee, o.total,
                   o.created_at, o.updated_at,
                   COALESCE((SELECT SUM(i.quantity) FROM storefront.order_item i
                             WHERE i.order_id = o.id), 0)::BIGINT AS item_count
            FROM storefront.order o
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.order.into(), u32::try_from(r.item_count).unwrap_or(u32::MAX)))
            .collect())
    }

    /// Number of orders a user has placed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.order WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// One of the user's orders with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderItem>)>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.order WHERE user_id = $1 AND id = $2"
        ))
        .bind(user_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => {
                let items = items_of(&mut conn, id).await?;
                Ok(Some((row.into(), items)))
            }
            None => Ok(None),
        }
    }
}

/// Insert an order header.
///
/// Returns `RepositoryError::Conflict` when the order number is taken.
pub(crate) async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO storefront.order \
           (order_number, user_id, status, payment_method, shipping_address, note, \
            subtotal, shipping_fee, total) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(OrderStatus::Pending)
    .bind(order.payment_method)
    .bind(Json(order.shipping_address))
    .bind(order.note)
    .bind(order.subtotal)
    .bind(order.shipping_fee)
    .bind(order.total)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::unique_or_database(e, "order number already exists"))?;
    Ok(row.into())
}

/// Insert the lines of an order.
pub(crate) async fn insert_items(
    conn: &mut PgConnection,
    order_id: OrderId,
    items: &[NewOrderItem<'_>],
) -> Result<Vec<OrderItem>, RepositoryError> {
    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let row = sqlx::query_as::<_, OrderItemRow>(
            r"
            INSERT INTO storefront.order_item (order_id, product_id, product_name, unit_price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, product_id, product_name, unit_price, quantity
            ",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.product_name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .fetch_one(&mut *conn)
        .await?;
        inserted.push(row.into());
    }
    Ok(inserted)
}

/// The lines of an order.
pub(crate) async fn items_of(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r"
        SELECT id, order_id, product_id, product_name, unit_price, quantity
        FROM storefront.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

/// One of the user's orders, locked for the rest of the transaction.
pub(crate) async fn order_for_update(
    conn: &mut PgConnection,
    user_id: UserId,
    id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM storefront.order \
         WHERE user_id = $1 AND id = $2 FOR UPDATE"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Order::from))
}

/// Change an order's status.
pub(crate) async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "UPDATE storefront.order SET status = $2, updated_at = NOW() \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}
