//! Product domain types and their JSON view.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;

use cartwheel_core::{CurrencyCode, Money, ProductId};

use super::ValidationError;

/// A catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub image_path: Option<String>,
    pub rating: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be bought.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.is_active && self.stock > 0
    }

    /// Whether a compare-at price above the current price is set.
    #[must_use]
    pub fn on_sale(&self) -> bool {
        self.compare_at_price.is_some_and(|c| c > self.price)
    }
}

/// Resolve an image path against the asset base URL.
///
/// Absolute URLs stored in the catalog are returned unchanged.
#[must_use]
pub fn image_url(asset_base: &Url, image_path: Option<&str>) -> Option<String> {
    let path = image_path?.trim();
    if path.is_empty() {
        return None;
    }
    asset_base
        .join(path.trim_start_matches('/'))
        .ok()
        .map(String::from)
}

/// Product as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub price_display: String,
    pub compare_at_price: Option<Money>,
    pub on_sale: bool,
    pub stock: u32,
    pub in_stock: bool,
    pub image_url: Option<String>,
    pub rating: Decimal,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    /// Build the view for one product.
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode, asset_base: &Url) -> Self {
        let price = Money::new(product.price, currency);
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price_display: price.display(),
            price,
            compare_at_price: product
                .compare_at_price
                .map(|amount| Money::new(amount, currency)),
            on_sale: product.on_sale(),
            stock: u32::try_from(product.stock).unwrap_or(0),
            in_stock: product.in_stock(),
            image_url: image_url(asset_base, product.image_path.as_deref()),
            rating: product.rating,
            created_at: product.created_at,
        }
    }
}

/// A category with the number of active products in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub product_count: u64,
}

/// A catalog entry as written in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSeed {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub rating: Decimal,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl ProductSeed {
    /// Check the entry against the catalog constraints.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let slug_ok = !self.slug.is_empty()
            && self
                .slug
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !slug_ok {
            return Err(ValidationError::new(format!(
                "slug {:?} must be lowercase letters, digits and dashes",
                self.slug
            )));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::new(format!("{}: name is required", self.slug)));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::new(format!(
                "{}: category is required",
                self.slug
            )));
        }
        if self.price.is_sign_negative() {
            return Err(ValidationError::new(format!(
                "{}: price must not be negative",
                self.slug
            )));
        }
        if self.stock < 0 {
            return Err(ValidationError::new(format!(
                "{}: stock must not be negative",
                self.slug
            )));
        }
        if self.rating < Decimal::ZERO || self.rating > Decimal::from(5) {
            return Err(ValidationError::new(format!(
                "{}: rating must be between 0 and 5",
                self.slug
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A product with sensible defaults for tests.
    #[allow(clippy::unwrap_used)]
    pub fn product(id: i32, name: &str, price: &str, stock: i32) -> Product {
        let created_at = DateTime::from_timestamp(1_700_000_000 + i64::from(id) * 60, 0).unwrap();
        Product {
            id: ProductId::new(id),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            description: format!("{name} description"),
            category: "General".to_string(),
            price: price.parse().unwrap(),
            compare_at_price: None,
            stock,
            image_path: None,
            rating: Decimal::ZERO,
            is_active: true,
            created_at,
            updated_at: created_at,
        }
    }
}
