//! Cart repository.
//!
//! Mutations that depend on stock run on a caller-supplied transaction so
//! the product row lock and the cart write commit together. Cart rows are
//! always locked before product rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cartwheel_core::{CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::CartLine;

const LINE_SELECT: &str = r"
    SELECT c.id, c.product_id, p.slug, p.name, p.image_path, p.price AS unit_price,
           p.stock, p.is_active, c.quantity, c.selected, c.added_at
    FROM storefront.cart_item c
    JOIN storefront.product p ON p.id = c.product_id
";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: CartItemId,
    product_id: ProductId,
    slug: String,
    name: String,
    image_path: Option<String>,
    unit_price: Decimal,
    stock: i32,
    is_active: bool,
    quantity: i32,
    selected: bool,
    added_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self {
        Self {
            id: r.id,
            product_id: r.product_id,
            slug: r.slug,
            name: r.name,
            image_path: r.image_path,
            unit_price: r.unit_price,
            stock: r.stock,
            is_active: r.is_active,
            quantity: r.quantity,
            selected: r.selected,
            added_at: r.added_at,
        }
    }
}

/// Repository for cart lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every line in the user's cart, most recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        list_lines(&mut conn, user_id).await
    }

    /// Select every in-stock line, or deselect every line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_all_selected(
        &self,
        user_id: UserId,
        selected: bool,
    ) -> Result<(), RepositoryError> {
        if selected {
            sqlx::query(
                r"
                UPDATE storefront.cart_item c SET selected = TRUE
                FROM storefront.product p
                WHERE p.id = c.product_id
                  AND c.user_id = $1
                  AND p.is_active
                  AND p.stock >= c.quantity
                ",
            )
            .bind(user_id)
            .execute(self.pool)
            .await?;
        } else {
            sqlx::query("UPDATE storefront.cart_item SET selected = FALSE WHERE user_id = $1")
                .bind(user_id)
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not the user's.
    pub async fn delete(&self, user_id: UserId, id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Every line of a user's cart on an existing connection.
async fn list_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(&format!(
        "{LINE_SELECT} WHERE c.user_id = $1 ORDER BY c.added_at DESC, c.id DESC"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

/// Every line of a user's cart, locked for the rest of the transaction.
///
/// Product columns are read without a lock; callers lock the products next.
pub(crate) async fn lines_for_update(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(&format!(
        "{LINE_SELECT} WHERE c.user_id = $1 ORDER BY c.added_at DESC, c.id DESC FOR UPDATE OF c"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(CartLine::from).collect())
}

/// One cart line, locked for the rest of the transaction.
///
/// Product columns are read without a lock; callers lock the product next.
pub(crate) async fn line_for_update(
    conn: &mut PgConnection,
    user_id: UserId,
    id: CartItemId,
) -> Result<Option<CartLine>, RepositoryError> {
    let row = sqlx::query_as::<_, CartLineRow>(&format!(
        "{LINE_SELECT} WHERE c.user_id = $1 AND c.id = $2 FOR UPDATE OF c"
    ))
    .bind(user_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(CartLine::from))
}

/// Current quantity of a product in the cart, if it is there.
pub(crate) async fn quantity_of(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
) -> Result<Option<i32>, RepositoryError> {
    let quantity = sqlx::query_scalar::<_, i32>(
        "SELECT quantity FROM storefront.cart_item \
         WHERE user_id = $1 AND product_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(quantity)
}

/// Insert a line or add to the quantity of the existing one, returning the
/// line and its new quantity.
///
/// The line is left selected; the caller checks the new quantity against
/// stock before committing.
pub(crate) async fn add_quantity(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
    quantity: i32,
) -> Result<(CartItemId, i32), RepositoryError> {
    let row = sqlx::query_as::<_, (CartItemId, i32)>(
        r"
        INSERT INTO storefront.cart_item (user_id, product_id, quantity, selected)
        VALUES ($1, $2, $3, TRUE)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = storefront.cart_item.quantity + EXCLUDED.quantity,
                      selected = TRUE
        RETURNING id, quantity
        ",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Set the selection flag of a line.
pub(crate) async fn set_selected(
    conn: &mut PgConnection,
    id: CartItemId,
    selected: bool,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.cart_item SET selected = $2 WHERE id = $1")
        .bind(id)
        .bind(selected)
        .execute(conn)
        .await?;
    Ok(())
}

/// Set the quantity of a line.
pub(crate) async fn set_quantity(
    conn: &mut PgConnection,
    id: CartItemId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.cart_item SET quantity = $2 WHERE id = $1")
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete the given lines.
pub(crate) async fn delete_lines(
    conn: &mut PgConnection,
    user_id: UserId,
    ids: &[CartItemId],
) -> Result<(), RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(CartItemId::as_i32).collect();
    sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1 AND id = ANY($2)")
        .bind(user_id)
        .bind(&ids)
        .execute(conn)
        .await?;
    Ok(())
}
