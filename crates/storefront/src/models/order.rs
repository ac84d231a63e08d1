//! Order domain types.

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::Serialize;

use cartwheel_core::{
    CurrencyCode, Money, OrderId, OrderItemId, OrderStatus, PaymentMethod, ProductId, UserId,
};

use super::address::ShippingAddress;

/// Prefix on every order number.
pub const ORDER_NUMBER_PREFIX: &str = "CW-";

/// Random characters after the prefix.
const ORDER_NUMBER_LENGTH: usize = 8;

/// Uppercase letters and digits without look-alikes (0/O, 1/I/L).
const ORDER_NUMBER_ALPHABET: &[u8] = b"23456789ABCDEFGHJKMNPQRSTUVWXYZ";

/// Generate a customer-facing order number such as `CW-7KQ2M9XD`.
///
/// Uniqueness is enforced by the database; callers retry on conflict.
#[must_use]
pub fn generate_order_number() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_NUMBER_LENGTH)
        .filter_map(|_| ORDER_NUMBER_ALPHABET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect();
    format!("{ORDER_NUMBER_PREFIX}{suffix}")
}

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub note: Option<String>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One purchased line, priced at the moment of purchase.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Summary row for the order history list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummaryView {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub total: Money,
    pub total_display: String,
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
}

impl OrderSummaryView {
    #[must_use]
    pub fn new(order: &Order, item_count: u32, currency: CurrencyCode) -> Self {
        let total = Money::new(order.total, currency);
        Self {
            id: order.id,
            order_number: order.order_number.clone(),
            status: order.status,
            total_display: total.display(),
            total,
            item_count,
            created_at: order.created_at,
        }
    }
}

/// Order line as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemView {
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// Full order as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub shipping_address: ShippingAddress,
    pub note: Option<String>,
    pub items: Vec<OrderItemView>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub cancellable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    /// Build the detail view of an order and its lines.
    #[must_use]
    pub fn new(order: Order, items: &[OrderItem], currency: CurrencyCode) -> Self {
        let items = items
            .iter()
            .map(|item| {
                let quantity = u32::try_from(item.quantity).unwrap_or(0);
                let unit_price = Money::new(item.unit_price, currency);
                OrderItemView {
                    product_id: item.product_id,
                    product_name: item.product_name.clone(),
                    line_total: Money::new(item.unit_price * Decimal::from(quantity), currency),
                    unit_price,
                    quantity,
                }
            })
            .collect();

        Self {
            id: order.id,
            order_number: order.order_number,
            status: order.status,
            payment_method: order.payment_method,
            shipping_address: order.shipping_address,
            note: order.note,
            items,
            subtotal: Money::new(order.subtotal, currency),
            shipping_fee: Money::new(order.shipping_fee, currency),
            total: Money::new(order.total, currency),
            cancellable: order.status.is_cancellable(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        let suffix = number.strip_prefix(ORDER_NUMBER_PREFIX).unwrap();
        assert_eq!(suffix.len(), ORDER_NUMBER_LENGTH);
        assert!(suffix.bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_order_numbers_differ() {
        assert_ne!(generate_order_number(), generate_order_number());
    }

    #[test]
    fn test_view_line_totals_and_cancellable() {
        let order = Order {
            id: OrderId::new(1),
            order_number: "CW-ABCDEFGH".to_string(),
            user_id: UserId::new(1),
            status: OrderStatus::Shipped,
            payment_method: PaymentMethod::CashOnDelivery,
            shipping_address: ShippingAddress {
                full_name: "Ada".to_string(),
                phone: "555".to_string(),
                line1: "1 Main".to_string(),
                line2: None,
                city: "Town".to_string(),
                region: None,
                postal_code: "1000".to_string(),
                country_code: "US".to_string(),
            },
            note: None,
            subtotal: Decimal::new(900, 2),
            shipping_fee: Decimal::new(499, 2),
            total: Decimal::new(1399, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = [OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            product_id: None,
            product_name: "Mug".to_string(),
            unit_price: Decimal::new(300, 2),
            quantity: 3,
        }];
        let view = OrderView::new(order, &items, CurrencyCode::USD);
        assert!(!view.cancellable);
        assert_eq!(view.items.first().unwrap().line_total.amount, Decimal::new(900, 2));
        assert_eq!(view.total.display(), "$13.99");
    }
}
