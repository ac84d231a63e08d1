//! Product repository.
//!
//! Listing, filtering and sorting happen in memory over the cached active
//! catalog (see [`crate::services::catalog`]); this module only loads rows
//! and handles the stock mutations that checkout and cancellation need.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use cartwheel_core::ProductId;

use super::RepositoryError;
use crate::models::product::{Product, ProductSeed};

const PRODUCT_COLUMNS: &str = "id, slug, name, description, category, price, compare_at_price, \
                               stock, image_path, rating, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
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

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
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
        }
    }
}

/// Outcome of an upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every active product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product \
             WHERE is_active \
             ORDER BY created_at DESC, id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// An active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    /// A product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Product::from))
    }
}

/// Insert a product or update the one with the same slug.
///
/// Runs on the caller's connection so a whole seed file can be applied in
/// one transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn upsert_by_slug(
    conn: &mut PgConnection,
    seed: &ProductSeed,
) -> Result<UpsertOutcome, RepositoryError> {
    // xmax is 0 only for freshly inserted tuples
    let inserted: bool = sqlx::query_scalar(
        r"
        INSERT INTO storefront.product
            (slug, name, description, category, price, compare_at_price,
             stock, image_path, rating, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (slug) DO UPDATE SET
            name = EXCLUDED.name,
            description = EXCLUDED.description,
            category = EXCLUDED.category,
            price = EXCLUDED.price,
            compare_at_price = EXCLUDED.compare_at_price,
            stock = EXCLUDED.stock,
            image_path = EXCLUDED.image_path,
            rating = EXCLUDED.rating,
            is_active = EXCLUDED.is_active,
            updated_at = NOW()
        RETURNING (xmax = 0)
        ",
    )
    .bind(&seed.slug)
    .bind(seed.name.trim())
    .bind(&seed.description)
    .bind(seed.category.trim())
    .bind(seed.price)
    .bind(seed.compare_at_price)
    .bind(seed.stock)
    .bind(&seed.image_path)
    .bind(seed.rating)
    .bind(seed.is_active)
    .fetch_one(conn)
    .await?;

    Ok(if inserted {
        UpsertOutcome::Inserted
    } else {
        UpsertOutcome::Updated
    })
}

/// Deactivate every active product whose slug is not in `keep`.
///
/// Returns the number of products deactivated.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn deactivate_missing(
    conn: &mut PgConnection,
    keep: &[String],
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.product SET is_active = FALSE, updated_at = NOW()
        WHERE is_active AND NOT (slug = ANY($1))
        ",
    )
    .bind(keep)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Stock and price of a product, read under a row lock.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
}

/// Lock the given products for the rest of the transaction.
///
/// Rows are locked in ID order so concurrent checkouts cannot deadlock.
pub(crate) async fn lock_for_update(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<LockedProduct>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let rows = sqlx::query_as::<_, LockedProduct>(
        r"
        SELECT id, name, price, stock, is_active
        FROM storefront.product
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(&ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Add `delta` (which may be negative) to a product's stock.
///
/// The `stock >= 0` check constraint rejects an oversell.
pub(crate) async fn adjust_stock(
    conn: &mut PgConnection,
    id: ProductId,
    delta: i32,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.product SET stock = stock + $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(delta)
    .execute(conn)
    .await?;
    Ok(())
}
