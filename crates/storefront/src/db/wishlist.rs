//! Wishlist repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cartwheel_core::{ProductId, UserId, WishlistItemId};

use super::RepositoryError;
use crate::models::product::Product;
use crate::models::wishlist::WishlistEntry;

#[derive(sqlx::FromRow)]
struct WishlistRow {
    wishlist_id: WishlistItemId,
    added_at: DateTime<Utc>,
    id: ProductId,
    slug: String,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    compare_at_price: Option<Decimal>,
    stock: i32,
    image_path: Option<String>,
    rating: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(r: WishlistRow) -> Self {
        Self {
            id: r.wishlist_id,
            added_at: r.added_at,
            product: Product {
                id: r.id,
                slug: r.slug,
                name: r.name,
                description: r.description,
                category: r.category,
                price: r.price,
                compare_at_price: r.compare_at_price,
                stock: r.stock,
                image_path: r.image_path,
                rating: r.rating,
                is_active: r.is_active,
                created_at: r.created_at,
                updated_at: r.updated_at,
            },
        }
    }
}

/// Repository for wishlist entries.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's saved products that are still active, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, WishlistRow>(
            r"
            SELECT w.id AS wishlist_id, w.added_at,
                   p.id, p.slug, p.name, p.description, p.category, p.price,
                   p.compare_at_price, p.stock, p.image_path, p.rating, p.is_active,
                   p.created_at, p.updated_at
            FROM storefront.wishlist_item w
            JOIN storefront.product p ON p.id = w.product_id
            WHERE w.user_id = $1 AND p.is_active
            ORDER BY w.added_at DESC, w.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }

    /// Add the product if absent, remove it if present.
    ///
    /// Returns whether the product is on the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn toggle(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = remove(&mut tx, user_id, product_id).await?;
        if !removed {
            sqlx::query(
                r"
                INSERT INTO storefront.wishlist_item (user_id, product_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, product_id) DO NOTHING
                ",
            )
            .bind(user_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(!removed)
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product was not saved.
    pub async fn delete(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        if remove(&mut conn, user_id, product_id).await? {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

/// Delete an entry on an existing connection, returning whether one existed.
pub(crate) async fn remove(
    conn: &mut PgConnection,
    user_id: UserId,
    product_id: ProductId,
) -> Result<bool, RepositoryError> {
    let result =
        sqlx::query("DELETE FROM storefront.wishlist_item WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}
