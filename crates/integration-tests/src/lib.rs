//! Integration test helpers for the Cartwheel storefront.
//!
//! The tests drive a running server over HTTP, so they are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! cw-cli migrate
//! cw-cli seed products seeds/products.yaml
//! cargo run -p cartwheel-storefront &
//! cargo test -p cartwheel-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_TEST_URL` overrides the default `http://localhost:3000`.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every test account.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Attempts made when the auth rate limiter answers 429.
const AUTH_RETRIES: u32 = 5;

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A throwaway email address that no other run uses.
#[must_use]
pub fn unique_email() -> String {
    format!("test+{}@example.com", Uuid::new_v4().simple())
}

/// HTTP client with its own cookie jar, i.e. its own session.
pub struct TestClient {
    pub client: Client,
    pub base_url: String,
}

impl TestClient {
    /// Create a client with an empty session.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            base_url: base_url(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn put(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn patch(&self, path: &str, body: &Value) -> Response {
        self.client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PATCH request failed")
    }

    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request failed")
    }

    /// POST to an auth endpoint, waiting out the rate limiter if needed.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_auth(&self, path: &str, body: &Value) -> Response {
        let mut attempt = 0;
        loop {
            let response = self.post(path, body).await;
            attempt += 1;
            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= AUTH_RETRIES {
                return response;
            }
            tokio::time::sleep(Duration::from_secs(6)).await;
        }
    }

    /// Register a fresh account; the client is logged in afterwards.
    ///
    /// Returns the email address used.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&self) -> String {
        let email = unique_email();
        let response = self
            .post_auth(
                "/api/auth/register",
                &json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "password_confirm": TEST_PASSWORD,
                    "display_name": "Test Shopper",
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "registration failed");
        email
    }

    /// Save a shipping address and return it.
    ///
    /// # Panics
    ///
    /// Panics if the address is rejected.
    pub async fn add_address(&self, full_name: &str, is_default: bool) -> Value {
        let response = self
            .post(
                "/api/account/addresses",
                &json!({
                    "full_name": full_name,
                    "phone": "+1 555 0100",
                    "line1": "1 Market St",
                    "city": "Springfield",
                    "postal_code": "12345",
                    "country_code": "us",
                    "is_default": is_default,
                }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "address rejected");
        json_body(response).await
    }

    /// The cheapest in-stock product holding at least `min_stock` units.
    ///
    /// # Panics
    ///
    /// Panics if the seeded catalog has no such product.
    pub async fn product_with_stock(&self, min_stock: u64) -> Value {
        let page = json_body(
            self.get("/api/products?in_stock=true&sort=price_asc&per_page=100")
                .await,
        )
        .await;
        page["items"]
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .find(|p| p["stock"].as_u64().is_some_and(|s| s >= min_stock))
            })
            .cloned()
            .expect("no product with enough stock; seed the catalog first")
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a JSON response body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("response body is not JSON")
}
