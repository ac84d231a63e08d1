//! Catalog seeding from a YAML file.
//!
//! # Usage
//!
//! ```bash
//! cw-cli seed products seeds/products.yaml
//! cw-cli seed products seeds/products.yaml --deactivate-missing
//! ```
//!
//! The file is a list of products keyed by slug. Existing products are
//! updated in place, so re-running a seed is safe. With
//! `--deactivate-missing`, active products absent from the file are hidden.
//! Running storefronts pick the changes up when their catalog cache expires.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use cartwheel_storefront::db::products::{self as catalog, UpsertOutcome};
use cartwheel_storefront::db::{self, RepositoryError};
use cartwheel_storefront::models::product::ProductSeed;

use super::{MissingDatabaseUrl, database_url};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Counts reported after a seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deactivated: u64,
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns `SeedError::Parse` for malformed YAML or missing fields.
pub fn parse_products(content: &str) -> Result<Vec<ProductSeed>, SeedError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Every problem with the seed list: invalid entries and duplicate slugs.
#[must_use]
pub fn validate_products(products: &[ProductSeed]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, product) in products.iter().enumerate() {
        if let Err(e) = product.validate() {
            errors.push(format!("entry {}: {e}", index + 1));
        }
        if !seen.insert(product.slug.as_str()) {
            errors.push(format!(
                "entry {}: duplicate slug {:?}",
                index + 1,
                product.slug
            ));
        }
    }

    errors
}

/// Seed products from a YAML file.
///
/// Validation runs before connecting, so a bad file never touches the
/// database.
///
/// # Errors
///
/// Returns `SeedError` if the file can't be read or parsed, any entry is
/// invalid, or a database operation fails.
pub async fn products(file_path: &Path, deactivate_missing: bool) -> Result<SeedSummary, SeedError> {
    info!(path = %file_path.display(), "Loading products");
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| SeedError::Read {
            path: file_path.display().to_string(),
            source,
        })?;
    let products = parse_products(&content)?;
    info!(count = products.len(), "Parsed seed file");

    let errors = validate_products(&products);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;

    // All or nothing: a failure part way leaves the catalog untouched
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();
    for product in &products {
        match catalog::upsert_by_slug(&mut tx, product).await? {
            UpsertOutcome::Inserted => summary.inserted += 1,
            UpsertOutcome::Updated => summary.updated += 1,
        }
    }

    if deactivate_missing {
        let keep: Vec<String> = products.iter().map(|p| p.slug.clone()).collect();
        summary.deactivated = catalog::deactivate_missing(&mut tx, &keep).await?;
    }
    tx.commit().await?;

    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        deactivated = summary.deactivated,
        "Seeding complete"
    );
    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r#"
- slug: enamel-mug
  name: Enamel Mug
  category: Kitchen
  price: "12.50"
  stock: 40
  rating: "4.5"
- slug: linen-apron
  name: Linen Apron
  description: Stonewashed linen.
  category: Kitchen
  price: "34.00"
  compare_at_price: "40.00"
  stock: 8
"#;

    #[test]
    fn test_parse_products() {
        let products = parse_products(SEED).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].slug, "linen-apron");
        assert!(products[1].compare_at_price.is_some());
        assert!(products[0].is_active);
    }

    #[test]
    fn test_valid_seed_has_no_errors() {
        assert!(validate_products(&parse_products(SEED).unwrap()).is_empty());
    }

    #[test]
    fn test_duplicate_slugs_are_reported() {
        let mut products = parse_products(SEED).unwrap();
        products[1].slug = "enamel-mug".to_string();
        let errors = validate_products(&products);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate slug"));
    }

    #[test]
    fn test_invalid_entries_are_all_reported() {
        let mut products = parse_products(SEED).unwrap();
        products[0].stock = -1;
        products[1].slug = "Linen Apron".to_string();
        assert_eq!(validate_products(&products).len(), 2);
    }

    #[test]
    fn test_missing_price_is_a_parse_error() {
        let yaml = "- slug: x\n  name: X\n  category: Misc\n";
        assert!(matches!(parse_products(yaml), Err(SeedError::Parse(_))));
    }

    #[tokio::test]
    #[ignore = "Requires a migrated database in STOREFRONT_DATABASE_URL"]
    async fn test_failed_seed_writes_nothing() {
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let slug = format!("rollback-check-{nonce}");
        // The second price overflows NUMERIC(12, 2) after the first row is written
        let yaml = format!(
            "- slug: {slug}\n  name: Rollback Check\n  category: Misc\n  price: \"1.00\"\n\
             - slug: {slug}-too-big\n  name: Too Big\n  category: Misc\n  price: \"100000000000.00\"\n"
        );
        let path = std::env::temp_dir().join(format!("{slug}.yaml"));
        std::fs::write(&path, yaml).unwrap();

        let result = products(&path, false).await;
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());

        let pool = db::create_pool(&database_url().unwrap()).await.unwrap();
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storefront.product WHERE slug LIKE $1")
                .bind(format!("{slug}%"))
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 0);
    }
}
