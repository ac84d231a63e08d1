//! Wishlist operations.

use sqlx::PgPool;
use tracing::instrument;

use cartwheel_core::{ProductId, UserId};

use super::StoreError;
use super::cart::add_in;
use crate::db::{ProductRepository, WishlistRepository, wishlist};
use crate::models::wishlist::{WishlistEntry, WishlistToggle};

/// Wishlist service.
pub struct WishlistService<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Saved products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, StoreError> {
        Ok(WishlistRepository::new(self.pool).list(user_id).await?)
    }

    /// Save the product if it isn't saved yet, otherwise remove it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown or inactive product.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn toggle(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<WishlistToggle, StoreError> {
        ProductRepository::new(self.pool)
            .get_by_id(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(StoreError::NotFound("product"))?;

        let wishlisted = WishlistRepository::new(self.pool)
            .toggle(user_id, product_id)
            .await?;
        Ok(WishlistToggle {
            product_id,
            wishlisted,
        })
    }

    /// Remove a saved product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product wasn't saved.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), StoreError> {
        WishlistRepository::new(self.pool)
            .delete(user_id, product_id)
            .await
            .map_err(StoreError::not_found_as("wishlist item"))
    }

    /// Put one unit of a saved product in the cart and drop it from the wishlist.
    ///
    /// Both happen or neither does.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product wasn't saved and
    /// `StoreError::OutOfStock` if it can't be added to the cart.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn move_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if !wishlist::remove(&mut tx, user_id, product_id).await? {
            return Err(StoreError::NotFound("wishlist item"));
        }
        add_in(&mut tx, user_id, product_id, 1).await?;

        tx.commit().await?;
        Ok(())
    }
}
