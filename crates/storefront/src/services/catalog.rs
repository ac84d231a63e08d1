//! Product catalog: cached active products with in-memory search.
//!
//! The active catalog is loaded in one query and cached in `moka` for the
//! configured TTL. Filtering, sorting and pagination run over the cached
//! list, which keeps them deterministic and testable without a database.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::ValidationError;
use crate::models::page::{Page, PageRequest};
use crate::models::product::{CategoryCount, Product};

/// Cache key for catalog data.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CatalogKey {
    ActiveProducts,
}

/// Shared cache of the active catalog.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CatalogKey, Arc<Vec<Product>>>,
}

impl CatalogCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(16).time_to_live(ttl).build(),
        }
    }

    /// The active catalog, loading it on a miss.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if loading fails.
    #[instrument(skip(self, pool))]
    pub async fn active_products(&self, pool: &PgPool) -> Result<Arc<Vec<Product>>, RepositoryError> {
        self.active_products_with(ProductRepository::new(pool).list_active())
            .await
    }

    /// Concurrent misses wait on a single `load`; a failed load isn't cached.
    async fn active_products_with<F>(&self, load: F) -> Result<Arc<Vec<Product>>, RepositoryError>
    where
        F: Future<Output = Result<Vec<Product>, RepositoryError>>,
    {
        self.cache
            .try_get_with(CatalogKey::ActiveProducts, async {
                let products = load.await?;
                debug!(count = products.len(), "Loaded active products");
                Ok(Arc::new(products))
            })
            .await
            .map_err(|err: Arc<RepositoryError>| {
                Arc::try_unwrap(err)
                    .unwrap_or_else(|shared| RepositoryError::DataCorruption(shared.to_string()))
            })
    }

    /// Drop everything cached, e.g. after stock changed.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Sort orders accepted by the product listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    Rating,
}

impl FromStr for ProductSort {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "rating" => Ok(Self::Rating),
            other => Err(ValidationError::new(format!("unknown sort: {other}"))),
        }
    }
}

impl ProductSort {
    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
            Self::Rating => b.rating.cmp(&a.rating),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// Query string of the product listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    /// Filter, sort and paginate `products`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an unknown sort, an inverted price
    /// range, or out-of-range pagination.
    pub fn apply(&self, products: &[Product]) -> Result<Page<Product>, ValidationError> {
        let sort = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProductSort::from_str)
            .transpose()?
            .unwrap_or_default();

        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(ValidationError::new(
                "min_price must not be greater than max_price",
            ));
        }

        let pagination = PageRequest {
            page: self.page,
            per_page: self.per_page,
        }
        .resolve()?;

        let needle = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| {
                needle.as_deref().is_none_or(|n| {
                    p.name.to_lowercase().contains(n)
                        || p.description.to_lowercase().contains(n)
                        || p.category.to_lowercase().contains(n)
                })
            })
            .filter(|p| {
                category
                    .as_deref()
                    .is_none_or(|c| p.category.to_lowercase() == c)
            })
            .filter(|p| self.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| self.max_price.is_none_or(|max| p.price <= max))
            .filter(|p| self.in_stock != Some(true) || p.stock > 0)
            .cloned()
            .collect();

        matched.sort_by(|a, b| sort.compare(a, b));

        Ok(pagination.slice(&matched))
    }
}

/// Distinct categories of active products with their counts, sorted by name.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for product in products.iter().filter(|p| p.is_active) {
        *counts.entry(product.category.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, product_count)| CategoryCount {
            name: name.to_owned(),
            product_count,
        })
        .collect()
}
