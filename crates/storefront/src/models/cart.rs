//! Cart domain types and totals.
//!
//! Only lines that are selected AND in stock count toward the subtotal.
//! A selected line whose quantity now exceeds stock stays selected in the
//! database but is reported as `in_stock: false` and is excluded from totals
//! until the customer fixes the quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use url::Url;

use cartwheel_core::{CartItemId, CurrencyCode, Money, MoneyError, ProductId};

use super::checkout::ShippingPolicy;
use super::product::image_url;

/// A cart line joined with the product it refers to.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image_path: Option<String>,
    pub unit_price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub quantity: i32,
    pub selected: bool,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Whether the full quantity of this line can be fulfilled.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.is_active && self.quantity >= 1 && self.stock >= self.quantity
    }

    /// Whether this line will be bought at checkout.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.selected && self.in_stock()
    }

    /// Quantity as an unsigned count.
    #[must_use]
    pub fn quantity_u32(&self) -> u32 {
        u32::try_from(self.quantity).unwrap_or(0)
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` on arithmetic overflow.
    pub fn line_total(&self, currency: CurrencyCode) -> Result<Money, MoneyError> {
        Money::new(self.unit_price, currency).times(self.quantity_u32())
    }
}

/// Totals over a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Sum of quantities over every line.
    pub item_count: u32,
    /// Sum of quantities over purchasable lines.
    pub selected_count: u32,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    /// Every in-stock line is selected (false for an empty cart).
    pub all_selected: bool,
}

impl CartSummary {
    /// Compute totals for a set of lines.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` on arithmetic overflow.
    pub fn compute(
        lines: &[CartLine],
        currency: CurrencyCode,
        shipping: &ShippingPolicy,
    ) -> Result<Self, MoneyError> {
        let purchasable: Vec<&CartLine> = lines.iter().filter(|l| l.is_purchasable()).collect();

        let line_totals = purchasable
            .iter()
            .map(|l| l.line_total(currency))
            .collect::<Result<Vec<_>, _>>()?;
        let subtotal = Money::sum(currency, &line_totals)?.rounded();
        let shipping_fee = Money::new(shipping.fee_for(subtotal.amount), currency);
        let total = subtotal.checked_add(&shipping_fee)?;

        let in_stock: Vec<&CartLine> = lines.iter().filter(|l| l.in_stock()).collect();

        Ok(Self {
            item_count: lines.iter().map(CartLine::quantity_u32).sum(),
            selected_count: purchasable.iter().map(|l| l.quantity_u32()).sum(),
            subtotal,
            shipping_fee,
            total,
            all_selected: !in_stock.is_empty() && in_stock.iter().all(|l| l.selected),
        })
    }
}

/// Cart line as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub line_total: Money,
    pub quantity: u32,
    pub stock: u32,
    pub in_stock: bool,
    pub selected: bool,
    pub added_at: DateTime<Utc>,
}

/// Cart as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub summary: CartSummary,
}

impl CartView {
    /// Build the cart view.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` on arithmetic overflow.
    pub fn build(
        lines: &[CartLine],
        currency: CurrencyCode,
        shipping: &ShippingPolicy,
        asset_base: &Url,
    ) -> Result<Self, MoneyError> {
        let summary = CartSummary::compute(lines, currency, shipping)?;
        let lines = lines
            .iter()
            .map(|line| {
                Ok(CartLineView {
                    id: line.id,
                    product_id: line.product_id,
                    slug: line.slug.clone(),
                    name: line.name.clone(),
                    image_url: image_url(asset_base, line.image_path.as_deref()),
                    unit_price: Money::new(line.unit_price, currency),
                    line_total: line.line_total(currency)?,
                    quantity: line.quantity_u32(),
                    stock: u32::try_from(line.stock).unwrap_or(0),
                    in_stock: line.in_stock(),
                    selected: line.selected,
                    added_at: line.added_at,
                })
            })
            .collect::<Result<Vec<_>, MoneyError>>()?;

        Ok(Self { lines, summary })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A cart line for tests.
    #[allow(clippy::unwrap_used)]
    pub fn line(id: i32, price: &str, quantity: i32, stock: i32, selected: bool) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            product_id: ProductId::new(100 + id),
            slug: format!("product-{id}"),
            name: format!("Product {id}"),
            image_path: None,
            unit_price: price.parse().unwrap(),
            stock,
            is_active: true,
            quantity,
            selected,
            added_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::line;
    use super::*;

    fn policy() -> ShippingPolicy {
        ShippingPolicy {
            free_threshold: "50.00".parse().unwrap(),
            flat_fee: "4.99".parse().unwrap(),
        }
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_summary_counts_only_selected_in_stock_lines() {
        let lines = vec![
            line(1, "10.00", 2, 5, true),
            line(2, "3.50", 1, 5, false),
            line(3, "8.00", 4, 2, true), // selected but over stock
        ];
        let summary = CartSummary::compute(&lines, CurrencyCode::USD, &policy()).unwrap();
        assert_eq!(summary.item_count, 7);
        assert_eq!(summary.selected_count, 2);
        assert_eq!(summary.subtotal.amount, dec("20.00"));
        assert_eq!(summary.shipping_fee.amount, dec("4.99"));
        assert_eq!(summary.total.amount, dec("24.99"));
        assert!(!summary.all_selected);
    }

    #[test]
    fn test_summary_free_shipping_at_threshold() {
        let lines = vec![line(1, "25.00", 2, 5, true)];
        let summary = CartSummary::compute(&lines, CurrencyCode::USD, &policy()).unwrap();
        assert_eq!(summary.subtotal.amount, dec("50.00"));
        assert!(summary.shipping_fee.is_zero());
        assert_eq!(summary.total.amount, dec("50.00"));
        assert!(summary.all_selected);
    }

    #[test]
    fn test_empty_cart_has_no_shipping() {
        let summary = CartSummary::compute(&[], CurrencyCode::USD, &policy()).unwrap();
        assert!(summary.subtotal.is_zero());
        assert!(summary.shipping_fee.is_zero());
        assert!(!summary.all_selected);
    }

    #[test]
    fn test_all_selected_ignores_out_of_stock_lines() {
        let lines = vec![line(1, "1.00", 1, 5, true), line(2, "1.00", 3, 1, false)];
        let summary = CartSummary::compute(&lines, CurrencyCode::USD, &policy()).unwrap();
        assert!(summary.all_selected);
    }

    #[test]
    fn test_inactive_product_is_not_in_stock() {
        let mut l = line(1, "1.00", 1, 5, true);
        l.is_active = false;
        assert!(!l.in_stock());
        assert!(!l.is_purchasable());
    }

    #[test]
    fn test_view_reports_line_totals() {
        let base = Url::parse("https://cdn.example.net/").unwrap();
        let view = CartView::build(
            &[line(1, "2.25", 3, 10, true)],
            CurrencyCode::USD,
            &policy(),
            &base,
        )
        .unwrap();
        let first = view.lines.first().unwrap();
        assert_eq!(first.line_total.amount, dec("6.75"));
        assert_eq!(first.quantity, 3);
        assert!(first.in_stock);
    }
}
