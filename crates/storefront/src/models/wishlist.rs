//! Wishlist types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use cartwheel_core::{CurrencyCode, ProductId, WishlistItemId};

use super::product::{Product, ProductView};

/// A saved product.
#[derive(Debug, Clone)]
pub struct WishlistEntry {
    pub id: WishlistItemId,
    pub product: Product,
    pub added_at: DateTime<Utc>,
}

/// Wishlist entry as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistEntryView {
    pub id: WishlistItemId,
    pub product: ProductView,
    pub added_at: DateTime<Utc>,
}

impl WishlistEntryView {
    #[must_use]
    pub fn new(entry: &WishlistEntry, currency: CurrencyCode, asset_base: &Url) -> Self {
        Self {
            id: entry.id,
            product: ProductView::new(&entry.product, currency, asset_base),
            added_at: entry.added_at,
        }
    }
}

/// Result of toggling a product on the wishlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WishlistToggle {
    pub product_id: ProductId,
    pub wishlisted: bool,
}
