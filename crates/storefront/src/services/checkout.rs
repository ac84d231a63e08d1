//! Order placement.
//!
//! `place_order` runs in a single transaction: the user's cart rows and then
//! the product rows are locked, stock is checked and decremented, the order
//! is written and the purchased cart lines are removed. Any failure rolls all
//! of it back.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use cartwheel_core::{CurrencyCode, Money, PaymentMethod, ProductId, UserId};

use super::StoreError;
use crate::db::RepositoryError;
use crate::db::orders::{self, NewOrder, NewOrderItem};
use crate::db::products::{self, LockedProduct};
use crate::db::{addresses, cart};
use crate::models::address::ShippingAddress;
use crate::models::cart::CartLine;
use crate::models::checkout::{CheckoutDraft, ShippingPolicy, validate_note};
use crate::models::non_blank;
use crate::models::order::{Order, OrderItem, generate_order_number};

/// Order numbers tried before giving up on collisions.
const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

/// A priced line about to be ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Totals and lines of an order before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub items: Vec<PlannedItem>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

/// Price the selected lines against freshly locked product rows.
///
/// Prices come from the locked rows, not the cart, so the order reflects the
/// price at the moment of purchase.
///
/// # Errors
///
/// Returns `StoreError::EmptySelection` when nothing is selected and
/// `StoreError::OutOfStock` for the first line that can't be fulfilled.
pub fn plan_order(
    lines: &[CartLine],
    locked: &[LockedProduct],
    currency: CurrencyCode,
    shipping: &ShippingPolicy,
) -> Result<OrderPlan, StoreError> {
    let selected: Vec<&CartLine> = lines.iter().filter(|l| l.selected).collect();
    if selected.is_empty() {
        return Err(StoreError::EmptySelection);
    }

    let mut items = Vec::with_capacity(selected.len());
    let mut line_totals = Vec::with_capacity(selected.len());
    for line in selected {
        let product = locked.iter().find(|p| p.id == line.product_id);
        let Some(product) = product.filter(|p| p.is_active && p.stock >= line.quantity) else {
            return Err(StoreError::OutOfStock {
                product: line.name.clone(),
                available: product.filter(|p| p.is_active).map_or(0, |p| p.stock),
            });
        };

        let quantity = u32::try_from(line.quantity)
            .map_err(|_| StoreError::InvalidQuantity("quantity must be at least 1".to_owned()))?;
        line_totals.push(Money::new(product.price, currency).times(quantity)?);
        items.push(PlannedItem {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: line.quantity,
        });
    }

    let subtotal = Money::sum(currency, &line_totals)?.rounded();
    let shipping_fee = Money::new(shipping.fee_for(subtotal.amount), currency);
    let total = subtotal.checked_add(&shipping_fee)?;

    Ok(OrderPlan {
        items,
        subtotal,
        shipping_fee,
        total,
    })
}

/// A checkout request after falling back to the saved draft.
#[derive(Debug, Clone)]
pub struct ResolvedCheckout {
    pub draft: CheckoutDraft,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
}

impl ResolvedCheckout {
    /// Merge an explicit request with the saved draft and validate it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` when no payment method is given or
    /// the note is too long.
    pub fn new(request: CheckoutDraft, saved: CheckoutDraft) -> Result<Self, StoreError> {
        let draft = request.or(saved);
        validate_note(draft.note.as_deref())?;
        let payment_method = draft.payment_method.ok_or_else(|| {
            crate::models::ValidationError::new("payment_method is required")
        })?;
        let note = non_blank(draft.note.as_deref());
        Ok(Self {
            draft,
            payment_method,
            note,
        })
    }
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    currency: CurrencyCode,
    shipping: ShippingPolicy,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, currency: CurrencyCode, shipping: ShippingPolicy) -> Self {
        Self {
            pool,
            currency,
            shipping,
        }
    }

    /// Place an order for the selected cart lines.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::MissingShippingAddress` or `StoreError::NotFound`
    /// when no usable address resolves, `StoreError::EmptySelection` when
    /// nothing is selected, and `StoreError::OutOfStock` when a selected line
    /// exceeds stock. Nothing is written in any of these cases.
    #[instrument(skip(self, checkout), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        checkout: &ResolvedCheckout,
    ) -> Result<(Order, Vec<OrderItem>), StoreError> {
        let mut tx = self.pool.begin().await?;

        let address = resolve_address(&mut tx, user_id, &checkout.draft).await?;

        // Quantities can't change between planning and deleting the lines
        let lines = cart::lines_for_update(&mut tx, user_id).await?;
        let selected: Vec<&CartLine> = lines.iter().filter(|l| l.selected).collect();
        if selected.is_empty() {
            return Err(StoreError::EmptySelection);
        }
        let product_ids: Vec<ProductId> = selected.iter().map(|l| l.product_id).collect();
        let locked = products::lock_for_update(&mut tx, &product_ids).await?;

        let plan = plan_order(&lines, &locked, self.currency, &self.shipping)?;

        for item in &plan.items {
            products::adjust_stock(&mut tx, item.product_id, -item.quantity).await?;
        }

        let order = insert_with_fresh_number(
            &mut tx,
            user_id,
            checkout.payment_method,
            &address,
            checkout.note.as_deref(),
            &plan,
        )
        .await?;

        let new_items: Vec<NewOrderItem<'_>> = plan
            .items
            .iter()
            .map(|item| NewOrderItem {
                product_id: item.product_id,
                product_name: &item.product_name,
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect();
        let items = orders::insert_items(&mut tx, order.id, &new_items).await?;

        let purchased: Vec<_> = selected.iter().map(|l| l.id).collect();
        cart::delete_lines(&mut tx, user_id, &purchased).await?;

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total = %plan.total,
            items = items.len(),
            "Order placed"
        );
        Ok((order, items))
    }
}

/// Inline address first, then a saved one by ID, then the user's default.
async fn resolve_address(
    conn: &mut PgConnection,
    user_id: UserId,
    draft: &CheckoutDraft,
) -> Result<ShippingAddress, StoreError> {
    if let Some(inline) = &draft.shipping_address {
        return Ok(inline.validate()?);
    }
    if let Some(id) = draft.address_id {
        return addresses::fetch_owned(conn, user_id, id)
            .await?
            .map(|a| a.to_shipping())
            .ok_or(StoreError::NotFound("address"));
    }
    addresses::fetch_default(conn, user_id)
        .await?
        .map(|a| a.to_shipping())
        .ok_or(StoreError::MissingShippingAddress)
}

/// Insert the order header, retrying under a savepoint if the number is taken.
async fn insert_with_fresh_number(
    conn: &mut PgConnection,
    user_id: UserId,
    payment_method: PaymentMethod,
    address: &ShippingAddress,
    note: Option<&str>,
    plan: &OrderPlan,
) -> Result<Order, StoreError> {
    for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
        let order_number = generate_order_number();
        let new_order = NewOrder {
            order_number: &order_number,
            user_id,
            payment_method,
            shipping_address: address,
            note,
            subtotal: plan.subtotal.amount,
            shipping_fee: plan.shipping_fee.amount,
            total: plan.total.amount,
        };

        let mut savepoint = sqlx::Acquire::begin(&mut *conn).await?;
        match orders::insert_order(&mut savepoint, &new_order).await {
            Ok(order) => {
                savepoint.commit().await?;
                return Ok(order);
            }
            Err(RepositoryError::Conflict(_)) => {
                savepoint.rollback().await?;
                warn!(attempt, "Order number collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(StoreError::Repository(RepositoryError::Conflict(
        "could not allocate an order number".to_owned(),
    )))
}
