//! Errors shared by the cart, wishlist, checkout and order services.

use thiserror::Error;

use cartwheel_core::MoneyError;

use crate::db::RepositoryError;
use crate::models::ValidationError;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The entity does not exist or belongs to someone else.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requested quantity exceeds what is available.
    #[error("{product} is out of stock ({available} available)")]
    OutOfStock { product: String, available: i32 },

    /// A quantity outside the accepted range.
    #[error("{0}")]
    InvalidQuantity(String),

    /// Checkout with nothing selected.
    #[error("no items selected")]
    EmptySelection,

    /// Checkout without an address to ship to.
    #[error("a shipping address is required")]
    MissingShippingAddress,

    /// An order status change that is not allowed.
    #[error("{0}")]
    InvalidState(String),

    /// Invalid client input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Arithmetic on money failed.
    #[error("money error: {0}")]
    Money(#[from] MoneyError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

impl StoreError {
    /// Map `RepositoryError::NotFound` to a named `NotFound`.
    pub(crate) fn not_found_as(what: &'static str) -> impl FnOnce(RepositoryError) -> Self {
        move |e| match e {
            RepositoryError::NotFound => Self::NotFound(what),
            other => Self::Repository(other),
        }
    }
}
