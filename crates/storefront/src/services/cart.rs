//! Cart operations.
//!
//! Every stock-dependent change locks the cart row and then the product row,
//! checks the resulting quantity against stock and writes inside one
//! transaction. Checkout takes its locks in the same order. A failed check
//! drops the transaction, leaving the cart exactly as it was.

use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use cartwheel_core::{CartItemId, ProductId, UserId};

use super::StoreError;
use crate::db::products::{self, LockedProduct};
use crate::db::{CartRepository, cart};
use crate::models::cart::CartLine;

/// Reject quantities that can't be stored or are below one.
fn to_quantity(quantity: u32) -> Result<i32, StoreError> {
    if quantity == 0 {
        return Err(StoreError::InvalidQuantity(
            "quantity must be at least 1".to_owned(),
        ));
    }
    i32::try_from(quantity)
        .map_err(|_| StoreError::InvalidQuantity("quantity is too large".to_owned()))
}

/// Fail unless `requested` units of an active product are available.
fn ensure_available(
    name: &str,
    is_active: bool,
    stock: i32,
    requested: i32,
) -> Result<(), StoreError> {
    if !is_active || requested > stock {
        return Err(StoreError::OutOfStock {
            product: name.to_owned(),
            available: if is_active { stock.max(0) } else { 0 },
        });
    }
    Ok(())
}

/// Add `quantity` of a product to the cart on an open transaction.
///
/// An existing line is incremented; the result must fit in stock.
pub(crate) async fn add_in(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
    quantity: u32,
) -> Result<CartItemId, StoreError> {
    let quantity = to_quantity(quantity)?;

    let existing = cart::quantity_of(&mut *conn, user_id, product_id)
        .await?
        .unwrap_or(0);
    if existing.checked_add(quantity).is_none() {
        return Err(StoreError::InvalidQuantity("quantity is too large".to_owned()));
    }

    let product = lock_product(&mut *conn, product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or(StoreError::NotFound("product"))?;

    let (id, total) = cart::add_quantity(conn, user_id, product_id, quantity).await?;
    ensure_available(&product.name, product.is_active, product.stock, total)?;
    Ok(id)
}

async fn lock_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Option<LockedProduct>, StoreError> {
    Ok(products::lock_for_update(conn, &[product_id])
        .await?
        .into_iter()
        .next())
}

pub struct CartService<'a> {
    pool: &'a PgPool,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart lines.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, StoreError> {
        Ok(CartRepository::new(self.pool).list(user_id).await?)
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for a missing or inactive product,
    /// `StoreError::InvalidQuantity` for a zero quantity, and
    /// `StoreError::OutOfStock` if the cart would hold more than is in stock.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Vec<CartLine>, StoreError> {
        let mut tx = self.pool.begin().await?;
        add_in(&mut tx, user_id, product_id, quantity).await?;
        tx.commit().await?;
        self.lines(user_id).await
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidQuantity` for zero, `StoreError::NotFound`
    /// for someone else's line and `StoreError::OutOfStock` above stock.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id))]
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        quantity: u32,
    ) -> Result<Vec<CartLine>, StoreError> {
        let quantity = to_quantity(quantity)?;
        self.change_quantity(user_id, id, true, |_| Ok(quantity)).await
    }

    /// Add one unit to a line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::OutOfStock` if no more units are available.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id))]
    pub async fn increment(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<Vec<CartLine>, StoreError> {
        self.change_quantity(user_id, id, true, |current| {
            current
                .checked_add(1)
                .ok_or_else(|| StoreError::InvalidQuantity("quantity is too large".to_owned()))
        })
        .await
    }

    /// Remove one unit from a line. A line never drops below one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidQuantity` when the line holds one unit.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id))]
    pub async fn decrement(
        &self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<Vec<CartLine>, StoreError> {
        self.change_quantity(user_id, id, false, |current| {
            if current <= 1 {
                return Err(StoreError::InvalidQuantity(
                    "quantity cannot go below 1; remove the item instead".to_owned(),
                ));
            }
            Ok(current - 1)
        })
        .await
    }

    async fn change_quantity(
        &self,
        user_id: UserId,
        id: CartItemId,
        check_stock: bool,
        next: impl FnOnce(i32) -> Result<i32, StoreError>,
    ) -> Result<Vec<CartLine>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let line = cart::line_for_update(&mut tx, user_id, id)
            .await?
            .ok_or(StoreError::NotFound("cart item"))?;
        let quantity = next(line.quantity)?;
        // Decrementing stays allowed so an over-stock line can be brought back down
        if check_stock {
            let (is_active, stock) = lock_product(&mut tx, line.product_id)
                .await?
                .map_or((false, 0), |p| (p.is_active, p.stock));
            ensure_available(&line.name, is_active, stock, quantity)?;
        }
        cart::set_quantity(&mut tx, id, quantity).await?;

        tx.commit().await?;
        self.lines(user_id).await
    }

    /// Flip the selection of a line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::OutOfStock` when selecting a line whose quantity
    /// exceeds stock. Deselecting always succeeds.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id))]
    pub async fn toggle(&self, user_id: UserId, id: CartItemId) -> Result<Vec<CartLine>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let line = cart::line_for_update(&mut tx, user_id, id)
            .await?
            .ok_or(StoreError::NotFound("cart item"))?;
        let selecting = !line.selected;
        if selecting {
            let (is_active, stock) = lock_product(&mut tx, line.product_id)
                .await?
                .map_or((false, 0), |p| (p.is_active, p.stock));
            ensure_available(&line.name, is_active, stock, line.quantity)?;
        }
        cart::set_selected(&mut tx, id, selecting).await?;

        tx.commit().await?;
        self.lines(user_id).await
    }

    /// Select every in-stock line, or deselect every line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the update fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn select_all(
        &self,
        user_id: UserId,
        selected: bool,
    ) -> Result<Vec<CartLine>, StoreError> {
        CartRepository::new(self.pool)
            .set_all_selected(user_id, selected)
            .await?;
        self.lines(user_id).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for someone else's line.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id))]
    pub async fn remove(&self, user_id: UserId, id: CartItemId) -> Result<Vec<CartLine>, StoreError> {
        CartRepository::new(self.pool)
            .delete(user_id, id)
            .await
            .map_err(StoreError::not_found_as("cart item"))?;
        self.lines(user_id).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Repository` if the delete fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), StoreError> {
        CartRepository::new(self.pool).clear(user_id).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_quantity_is_invalid() {
        assert!(matches!(
            to_quantity(0),
            Err(StoreError::InvalidQuantity(_))
        ));
        assert_eq!(to_quantity(3).unwrap(), 3);
    }

    #[test]
    fn test_quantity_must_fit_in_i32() {
        assert!(to_quantity(u32::MAX).is_err());
    }

    #[test]
    fn test_available_up_to_stock() {
        assert!(ensure_available("Mug", true, 3, 3).is_ok());
        match ensure_available("Mug", true, 3, 4) {
            Err(StoreError::OutOfStock { product, available }) => {
                assert_eq!(product, "Mug");
                assert_eq!(available, 3);
            }
            other => panic!("expected out of stock, got {other:?}"),
        }
    }

    #[test]
    fn test_inactive_product_has_nothing_available() {
        match ensure_available("Mug", false, 10, 1) {
            Err(StoreError::OutOfStock { available, .. }) => assert_eq!(available, 0),
            other => panic!("expected out of stock, got {other:?}"),
        }
    }
}
