//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration, login, profile and password changes
//! - `catalog` - Cached active catalog with search, filters and sorting
//! - `cart` - Cart lines with stock checks
//! - `wishlist` - Saved products and move-to-cart
//! - `checkout` - Transactional order placement
//! - `orders` - Order history and cancellation

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod orders;
pub mod wishlist;

pub use error::StoreError;
