//! Cart, wishlist, checkout and order integration tests.
//!
//! Require a running storefront with the demo catalog seeded. Every test
//! registers its own account so they can run in parallel.

use cartwheel_integration_tests::{TestClient, json_body};
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn add_to_cart(client: &TestClient, product_id: &Value, quantity: u64) -> reqwest::Response {
    client
        .post(
            "/api/cart/items",
            &json!({ "product_id": product_id, "quantity": quantity }),
        )
        .await
}

fn line_for<'a>(cart: &'a Value, product_id: &Value) -> &'a Value {
    cart["lines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| &l["product_id"] == product_id)
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_guests_cannot_use_cart() {
    let client = TestClient::new();
    let response = client.get("/api/cart").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Login required");
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_add_merges_lines_and_selects() {
    let client = TestClient::new();
    client.register().await;
    let product = client.product_with_stock(3).await;

    add_to_cart(&client, &product["id"], 1).await;
    let response = add_to_cart(&client, &product["id"], 2).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cart = json_body(response).await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    let line = line_for(&cart, &product["id"]);
    assert_eq!(line["quantity"], 3);
    assert_eq!(line["selected"], true);
    assert_eq!(cart["summary"]["item_count"], 3);
    assert_eq!(cart["summary"]["all_selected"], true);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_cart_rejects_bad_quantities() {
    let client = TestClient::new();
    client.register().await;
    let product = client.product_with_stock(1).await;
    let stock = product["stock"].as_u64().unwrap();

    assert_eq!(
        add_to_cart(&client, &product["id"], 0).await.status(),
        StatusCode::BAD_REQUEST
    );
    let over = add_to_cart(&client, &product["id"], stock + 1).await;
    assert_eq!(over.status(), StatusCode::CONFLICT);

    let cart = json_body(add_to_cart(&client, &product["id"], 1).await).await;
    let id = line_for(&cart, &product["id"])["id"].clone();

    let zero = client
        .patch(&format!("/api/cart/items/{id}"), &json!({ "quantity": 0 }))
        .await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

    let negative = client
        .patch(&format!("/api/cart/items/{id}"), &json!({ "quantity": -1 }))
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);
    let body = json_body(negative).await;
    assert!(body["error"].is_string());

    let below_one = client
        .post(&format!("/api/cart/items/{id}/decrement"), &json!({}))
        .await;
    assert_eq!(below_one.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_increment_decrement_toggle_and_select_all() {
    let client = TestClient::new();
    client.register().await;
    let product = client.product_with_stock(3).await;

    let cart = json_body(add_to_cart(&client, &product["id"], 1).await).await;
    let id = line_for(&cart, &product["id"])["id"].clone();

    let cart = json_body(
        client
            .post(&format!("/api/cart/items/{id}/increment"), &json!({}))
            .await,
    )
    .await;
    assert_eq!(line_for(&cart, &product["id"])["quantity"], 2);

    let cart = json_body(
        client
            .post(&format!("/api/cart/items/{id}/decrement"), &json!({}))
            .await,
    )
    .await;
    assert_eq!(line_for(&cart, &product["id"])["quantity"], 1);

    let cart = json_body(
        client
            .post(&format!("/api/cart/items/{id}/toggle"), &json!({}))
            .await,
    )
    .await;
    assert_eq!(line_for(&cart, &product["id"])["selected"], false);
    assert_eq!(cart["summary"]["selected_count"], 0);

    let cart = json_body(
        client
            .post("/api/cart/select", &json!({ "selected": true }))
            .await,
    )
    .await;
    assert_eq!(cart["summary"]["all_selected"], true);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_remove_and_clear() {
    let client = TestClient::new();
    client.register().await;
    let product = client.product_with_stock(1).await;

    let cart = json_body(add_to_cart(&client, &product["id"], 1).await).await;
    let id = line_for(&cart, &product["id"])["id"].clone();

    let cart = json_body(client.delete(&format!("/api/cart/items/{id}")).await).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
    assert_eq!(
        client.delete(&format!("/api/cart/items/{id}")).await.status(),
        StatusCode::NOT_FOUND
    );

    add_to_cart(&client, &product["id"], 1).await;
    assert_eq!(client.delete("/api/cart").await.status(), StatusCode::NO_CONTENT);
    let cart = json_body(client.get("/api/cart").await).await;
    assert_eq!(cart["summary"]["item_count"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_wishlist_toggle_and_move_to_cart() {
    let client = TestClient::new();
    client.register().await;
    let product = client.product_with_stock(1).await;

    let toggled = json_body(
        client
            .post("/api/wishlist/toggle", &json!({ "product_id": product["id"] }))
            .await,
    )
    .await;
    assert_eq!(toggled["wishlisted"], true);

    let list = json_body(client.get("/api/wishlist").await).await;
    assert_eq!(list[0]["product"]["id"], product["id"]);

    let path = format!("/api/wishlist/{}/move-to-cart", product["id"]);
    let cart = json_body(client.post(&path, &json!({})).await).await;
    assert_eq!(line_for(&cart, &product["id"])["quantity"], 1);

    let list = json_body(client.get("/api/wishlist").await).await;
    assert!(list.as_array().unwrap().is_empty());
    assert_eq!(
        client.post(&path, &json!({})).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_wishlist_toggle_twice_removes() {
    let client = TestClient::new();
    client.register().await;
    let product = client.product_with_stock(1).await;
    let body = json!({ "product_id": product["id"] });

    client.post("/api/wishlist/toggle", &body).await;
    let toggled = json_body(client.post("/api/wishlist/toggle", &body).await).await;
    assert_eq!(toggled["wishlisted"], false);

    let path = format!("/api/wishlist/{}", product["id"]);
    assert_eq!(client.delete(&path).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_draft_round_trip() {
    let client = TestClient::new();
    client.register().await;

    let empty = json_body(client.get("/api/checkout/draft").await).await;
    assert!(empty["payment_method"].is_null());

    let saved = client
        .put(
            "/api/checkout/draft",
            &json!({ "payment_method": "card", "note": "Ring twice" }),
        )
        .await;
    assert_eq!(saved.status(), StatusCode::OK);

    let draft = json_body(client.get("/api/checkout/draft").await).await;
    assert_eq!(draft["payment_method"], "card");
    assert_eq!(draft["note"], "Ring twice");

    let too_long = client
        .put("/api/checkout/draft", &json!({ "note": "x".repeat(501) }))
        .await;
    assert_eq!(too_long.status(), StatusCode::BAD_REQUEST);

    assert_eq!(
        client.delete("/api/checkout/draft").await.status(),
        StatusCode::NO_CONTENT
    );
    let draft = json_body(client.get("/api/checkout/draft").await).await;
    assert!(draft["note"].is_null());
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_checkout_requires_selection_and_address() {
    let client = TestClient::new();
    client.register().await;

    let no_address = client
        .post("/api/checkout", &json!({ "payment_method": "card" }))
        .await;
    assert_eq!(no_address.status(), StatusCode::BAD_REQUEST);

    client.add_address("Ada Shopper", true).await;
    let nothing_selected = client
        .post("/api/checkout", &json!({ "payment_method": "card" }))
        .await;
    assert_eq!(nothing_selected.status(), StatusCode::BAD_REQUEST);

    let product = client.product_with_stock(1).await;
    add_to_cart(&client, &product["id"], 1).await;
    let no_payment = client.post("/api/checkout", &json!({})).await;
    assert_eq!(no_payment.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_place_order_and_cancel_restocks() {
    let client = TestClient::new();
    client.register().await;
    client.add_address("Ada Shopper", true).await;
    client
        .put("/api/checkout/draft", &json!({ "payment_method": "cash_on_delivery" }))
        .await;

    // Other tests buy the cheapest products; stay clear of them
    let products = json_body(
        client
            .get("/api/products?in_stock=true&sort=price_desc&per_page=100")
            .await,
    )
    .await;
    let product = products["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["stock"].as_u64().unwrap() >= 2)
        .unwrap()
        .clone();
    let slug = product["slug"].as_str().unwrap().to_string();
    let stock_before = json_body(client.get(&format!("/api/products/{slug}")).await).await
        ["stock"]
        .as_u64()
        .unwrap();
    add_to_cart(&client, &product["id"], 2).await;

    let preview = json_body(client.get("/api/checkout/preview").await).await;
    assert_eq!(preview["lines"].as_array().unwrap().len(), 1);
    assert!(preview["unavailable"].as_array().unwrap().is_empty());
    assert_eq!(preview["draft"]["payment_method"], "cash_on_delivery");

    let response = client
        .post("/api/checkout", &json!({ "note": "Leave at the door" }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = json_body(response).await;
    assert!(order["order_number"].as_str().unwrap().starts_with("CW-"));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_method"], "cash_on_delivery");
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["cancellable"], true);

    // Purchased lines leave the cart and the draft is cleared
    let cart = json_body(client.get("/api/cart").await).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());
    let draft = json_body(client.get("/api/checkout/draft").await).await;
    assert!(draft["payment_method"].is_null());

    let detail = json_body(client.get(&format!("/api/products/{slug}")).await).await;
    assert_eq!(detail["stock"].as_u64().unwrap(), stock_before - 2);

    let orders = json_body(client.get("/api/orders").await).await;
    assert_eq!(orders["total"], 1);
    assert_eq!(orders["items"][0]["order_number"], order["order_number"]);
    assert_eq!(orders["items"][0]["item_count"], 2);

    let path = format!("/api/orders/{}/cancel", order["id"]);
    let cancelled = json_body(client.post(&path, &json!({})).await).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancellable"], false);

    let detail = json_body(client.get(&format!("/api/products/{slug}")).await).await;
    assert_eq!(detail["stock"].as_u64().unwrap(), stock_before);

    assert_eq!(
        client.post(&path, &json!({})).await.status(),
        StatusCode::CONFLICT
    );
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_quantity_change_racing_checkout_is_never_lost() {
    let client = TestClient::new();
    client.register().await;
    client.add_address("Race Shopper", true).await;

    let products = json_body(
        client
            .get("/api/products?in_stock=true&sort=price_desc&per_page=100")
            .await,
    )
    .await;
    let product = products["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["stock"].as_u64().unwrap() >= 6)
        .unwrap()
        .clone();

    for _ in 0..3 {
        let cart = json_body(add_to_cart(&client, &product["id"], 1).await).await;
        let id = line_for(&cart, &product["id"])["id"].clone();

        let checkout_body = json!({ "payment_method": "card" });
        let quantity_body = json!({ "quantity": 3 });
        let quantity_path = format!("/api/cart/items/{id}");
        let (placed, changed) = tokio::join!(
            client.post("/api/checkout", &checkout_body),
            client.patch(&quantity_path, &quantity_body),
        );
        assert_eq!(placed.status(), StatusCode::CREATED);
        let order = json_body(placed).await;

        // Either the change landed first and was bought, or the line was gone
        let ordered = order["items"][0]["quantity"].as_u64().unwrap();
        match changed.status() {
            StatusCode::OK => assert_eq!(ordered, 3),
            StatusCode::NOT_FOUND => assert_eq!(ordered, 1),
            other => panic!("unexpected quantity change status {other}"),
        }

        let cart = json_body(client.get("/api/cart").await).await;
        assert!(cart["lines"].as_array().unwrap().is_empty());

        let path = format!("/api/orders/{}/cancel", order["id"]);
        assert_eq!(client.post(&path, &json!({})).await.status(), StatusCode::OK);
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server and seeded catalog"]
async fn test_unselected_lines_stay_in_cart() {
    let client = TestClient::new();
    client.register().await;
    client.add_address("Ada Shopper", true).await;

    let products = json_body(
        client
            .get("/api/products?in_stock=true&sort=price_asc&per_page=2")
            .await,
    )
    .await;
    let first = products["items"][0]["id"].clone();
    let second = products["items"][1]["id"].clone();

    add_to_cart(&client, &first, 1).await;
    let cart = json_body(add_to_cart(&client, &second, 1).await).await;
    let second_line = line_for(&cart, &second)["id"].clone();
    client
        .post(&format!("/api/cart/items/{second_line}/toggle"), &json!({}))
        .await;

    let response = client
        .post("/api/checkout", &json!({ "payment_method": "card" }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cart = json_body(client.get("/api/cart").await).await;
    let lines = cart["lines"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product_id"], second);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_orders_of_others_are_hidden() {
    let client = TestClient::new();
    client.register().await;

    assert_eq!(
        client.get("/api/orders/2147483647").await.status(),
        StatusCode::NOT_FOUND
    );
    let orders = json_body(client.get("/api/orders").await).await;
    assert_eq!(orders["total"], 0);
}
