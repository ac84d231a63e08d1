//! Checkout draft and shipping rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use cartwheel_core::{AddressId, CurrencyCode, MoneyError, PaymentMethod};

use super::ValidationError;
use super::address::AddressInput;
use super::cart::{CartLine, CartLineView, CartSummary, CartView};

/// Longest accepted order note.
pub const MAX_NOTE_LENGTH: usize = 500;

/// Shipping fee rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Subtotals at or above this ship free.
    pub free_threshold: Decimal,
    /// Fee charged below the threshold.
    pub flat_fee: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            free_threshold: Decimal::new(5000, 2),
            flat_fee: Decimal::new(499, 2),
        }
    }
}

impl ShippingPolicy {
    /// Shipping fee for a subtotal. Nothing to ship costs nothing.
    #[must_use]
    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal <= Decimal::ZERO || subtotal >= self.free_threshold {
            Decimal::ZERO
        } else {
            self.flat_fee
        }
    }
}

/// An in-progress checkout kept in the session between requests.
///
/// Every field is optional so a client can save partial progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<AddressInput>,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
}

impl CheckoutDraft {
    /// Validate the parts of the draft that are present.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an over-long note. An inline address is
    /// only checked when the order is placed, so half-typed addresses can be
    /// saved.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_note(self.note.as_deref())
    }

    /// Fill every missing field of `self` from `fallback`.
    ///
    /// The address is one choice: if `self` names either a saved address or
    /// an inline one, neither is taken from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        let (address_id, shipping_address) =
            if self.address_id.is_some() || self.shipping_address.is_some() {
                (self.address_id, self.shipping_address)
            } else {
                (fallback.address_id, fallback.shipping_address)
            };
        Self {
            address_id,
            shipping_address,
            payment_method: self.payment_method.or(fallback.payment_method),
            note: self.note.or(fallback.note),
        }
    }
}

/// Reject notes longer than [`MAX_NOTE_LENGTH`] characters.
///
/// # Errors
///
/// Returns `ValidationError` when the note is too long.
pub fn validate_note(note: Option<&str>) -> Result<(), ValidationError> {
    if note.is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH) {
        return Err(ValidationError::new(format!(
            "note must be at most {MAX_NOTE_LENGTH} characters"
        )));
    }
    Ok(())
}

/// What would be ordered right now.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutPreview {
    /// Selected lines that will be bought.
    pub lines: Vec<CartLineView>,
    /// Selected lines whose quantity exceeds stock; checkout fails until fixed.
    pub unavailable: Vec<CartLineView>,
    pub summary: CartSummary,
    pub draft: CheckoutDraft,
}

impl CheckoutPreview {
    /// Build the preview from the current cart and saved draft.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` on arithmetic overflow.
    pub fn build(
        lines: &[CartLine],
        draft: CheckoutDraft,
        currency: CurrencyCode,
        shipping: &ShippingPolicy,
        asset_base: &Url,
    ) -> Result<Self, MoneyError> {
        let cart = CartView::build(lines, currency, shipping, asset_base)?;
        let (lines, unavailable): (Vec<_>, Vec<_>) = cart
            .lines
            .into_iter()
            .filter(|l| l.selected)
            .partition(|l| l.in_stock);
        Ok(Self {
            lines,
            unavailable,
            summary: cart.summary,
            draft,
        })
    }
}
