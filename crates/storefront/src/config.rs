//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront API
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_ASSET_BASE_URL` - CDN base for product images (default: `{base_url}/static/`)
//! - `STOREFRONT_STATIC_DIR` - Directory served under `/static` (default: crates/storefront/static)
//! - `STOREFRONT_ALLOWED_ORIGINS` - Comma-separated origins allowed by CORS
//! - `STOREFRONT_CURRENCY` - Store currency (default: USD)
//! - `STOREFRONT_FREE_SHIPPING_THRESHOLD` - Subtotal that ships free (default: 50.00)
//! - `STOREFRONT_FLAT_SHIPPING_FEE` - Fee below the threshold (default: 4.99)
//! - `STOREFRONT_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `STOREFRONT_TRUST_PROXY_HEADERS` - Rate limit by `X-Forwarded-For` and friends (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use cartwheel_core::CurrencyCode;

use crate::models::checkout::ShippingPolicy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Base URL product image paths are resolved against
    pub asset_base_url: Url,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
    /// Currency every price in the catalog is denominated in
    pub currency: CurrencyCode,
    /// Shipping fee rules applied at checkout
    pub shipping: ShippingPolicy,
    /// How long the active catalog stays cached
    pub catalog_cache_ttl: Duration,
    /// Whether client IP headers set by a reverse proxy can be believed
    pub trust_proxy_headers: bool,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment tag (e.g. "production")
    pub environment: Option<String>,
    /// Fraction of errors to send
    pub sample_rate: f32,
    /// Fraction of transactions to trace
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", &get_env_or_default("STOREFRONT_HOST", "127.0.0.1"))?;
        let port = parse_env("STOREFRONT_PORT", &get_env_or_default("STOREFRONT_PORT", "3000"))?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let asset_base_url = asset_base_url(
            &base_url,
            get_optional_env("STOREFRONT_ASSET_BASE_URL").as_deref(),
        )?;
        let static_dir = PathBuf::from(get_env_or_default(
            "STOREFRONT_STATIC_DIR",
            "crates/storefront/static",
        ));
        let allowed_origins =
            parse_origins(&get_env_or_default("STOREFRONT_ALLOWED_ORIGINS", ""));
        let currency = parse_env("STOREFRONT_CURRENCY", &get_env_or_default("STOREFRONT_CURRENCY", "USD"))?;

        let shipping = ShippingPolicy {
            free_threshold: parse_env::<Decimal>(
                "STOREFRONT_FREE_SHIPPING_THRESHOLD",
                &get_env_or_default("STOREFRONT_FREE_SHIPPING_THRESHOLD", "50.00"),
            )?,
            flat_fee: parse_env::<Decimal>(
                "STOREFRONT_FLAT_SHIPPING_FEE",
                &get_env_or_default("STOREFRONT_FLAT_SHIPPING_FEE", "4.99"),
            )?,
        };
        if shipping.free_threshold.is_sign_negative() || shipping.flat_fee.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_FLAT_SHIPPING_FEE".to_string(),
                "shipping amounts must not be negative".to_string(),
            ));
        }

        let ttl_secs: u64 = parse_env(
            "STOREFRONT_CATALOG_CACHE_TTL_SECS",
            &get_env_or_default("STOREFRONT_CATALOG_CACHE_TTL_SECS", "300"),
        )?;

        let trust_proxy_headers = parse_env(
            "STOREFRONT_TRUST_PROXY_HEADERS",
            &get_env_or_default("STOREFRONT_TRUST_PROXY_HEADERS", "false"),
        )?;

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_sample_rate(
                "SENTRY_SAMPLE_RATE",
                &get_env_or_default("SENTRY_SAMPLE_RATE", "1.0"),
            )?,
            traces_sample_rate: parse_sample_rate(
                "SENTRY_TRACES_SAMPLE_RATE",
                &get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0"),
            )?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            asset_base_url,
            static_dir,
            allowed_origins,
            currency,
            shipping,
            catalog_cache_ttl: Duration::from_secs(ttl_secs),
            trust_proxy_headers,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (cookies get `Secure`).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable (empty counts as unset).
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw value, naming the variable in the error.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a Sentry sample rate, which must lie in `[0, 1]`.
fn parse_sample_rate(key: &str, raw: &str) -> Result<f32, ConfigError> {
    let rate: f32 = parse_env(key, raw)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Resolve the asset base URL, always ending in `/` so `Url::join` appends.
fn asset_base_url(base_url: &str, explicit: Option<&str>) -> Result<Url, ConfigError> {
    let (key, raw) = explicit.map_or_else(
        || {
            (
                "STOREFRONT_BASE_URL",
                format!("{}/static/", base_url.trim_end_matches('/')),
            )
        },
        |value| ("STOREFRONT_ASSET_BASE_URL", value.to_string()),
    );

    let raw = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };

    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
