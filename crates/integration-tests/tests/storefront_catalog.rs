//! Catalog integration tests.
//!
//! Require a running storefront with the demo catalog seeded.

use cartwheel_integration_tests::{TestClient, json_body};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = TestClient::new();

    let response = client.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    assert_eq!(client.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_product_listing_is_paginated() {
    let client = TestClient::new();
    let page = json_body(client.get("/api/products?per_page=2&page=1").await).await;

    assert_eq!(page["page"], 1);
    assert_eq!(page["per_page"], 2);
    assert!(page["items"].as_array().unwrap().len() <= 2);
    assert!(page["total"].as_u64().unwrap() >= page["items"].as_array().unwrap().len() as u64);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_page_past_the_end_is_empty() {
    let client = TestClient::new();
    let page = json_body(client.get("/api/products?page=999").await).await;

    assert!(page["items"].as_array().unwrap().is_empty());
    assert!(page["total"].as_u64().is_some());
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_price_sort_is_ascending() {
    let client = TestClient::new();
    let page = json_body(client.get("/api/products?sort=price_asc&per_page=100").await).await;

    let prices: Vec<f64> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["price"]["amount"].as_str().unwrap().parse().unwrap())
        .collect();
    assert!(prices.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_in_stock_filter() {
    let client = TestClient::new();
    let page = json_body(client.get("/api/products?in_stock=true&per_page=100").await).await;

    for product in page["items"].as_array().unwrap() {
        assert_eq!(product["in_stock"], true);
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_invalid_queries_are_rejected() {
    let client = TestClient::new();

    let response = client.get("/api/products?sort=cheapest").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("sort"));

    assert_eq!(
        client.get("/api/products?min_price=20&max_price=10").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        client.get("/api/products?per_page=101").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_product_detail_by_slug() {
    let client = TestClient::new();
    let listed = client.product_with_stock(1).await;
    let slug = listed["slug"].as_str().unwrap();

    let response = client.get(&format!("/api/products/{slug}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let product = json_body(response).await;
    assert_eq!(product["id"], listed["id"]);
    assert!(product["price_display"].as_str().unwrap().starts_with('$'));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_not_found() {
    let client = TestClient::new();
    let response = client.get("/api/products/no-such-product").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_categories_are_sorted_with_counts() {
    let client = TestClient::new();
    let categories = json_body(client.get("/api/categories").await).await;
    let categories = categories.as_array().unwrap();

    assert!(!categories.is_empty());
    let names: Vec<&str> = categories
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
    assert!(categories.iter().all(|c| c["product_count"].as_u64().unwrap() > 0));
}
