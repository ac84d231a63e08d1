//! Domain models for the storefront.
//!
//! These are validated domain types, separate from the `sqlx` row structs in
//! [`crate::db`]. Route handlers build their JSON views from them.

pub mod address;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod page;
pub mod product;
pub mod session;
pub mod user;
pub mod wishlist;

pub use session::{CurrentUser, keys as session_keys};

/// Input rejected before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Create a validation error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Trim a string, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
