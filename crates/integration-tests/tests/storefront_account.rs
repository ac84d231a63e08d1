//! Account integration tests: registration, login and addresses.

use cartwheel_integration_tests::{TEST_PASSWORD, TestClient, json_body, unique_email};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_logs_in() {
    let client = TestClient::new();
    let email = client.register().await;

    let me = json_body(client.get("/api/account").await).await;
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["display_name"], "Test Shopper");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_duplicate_email_conflicts() {
    let client = TestClient::new();
    let email = client.register().await;

    let again = TestClient::new()
        .post_auth(
            "/api/auth/register",
            &json!({
                "email": email.to_uppercase(),
                "password": TEST_PASSWORD,
                "password_confirm": TEST_PASSWORD,
            }),
        )
        .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_rejects_bad_input() {
    let client = TestClient::new();

    let short = client
        .post_auth(
            "/api/auth/register",
            &json!({
                "email": unique_email(),
                "password": "short",
                "password_confirm": "short",
            }),
        )
        .await;
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);

    let mismatch = client
        .post_auth(
            "/api/auth/register",
            &json!({
                "email": unique_email(),
                "password": TEST_PASSWORD,
                "password_confirm": "something-else",
            }),
        )
        .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_login_logout_cycle() {
    let client = TestClient::new();
    let email = client.register().await;

    let logout = client.post("/api/auth/logout", &json!({})).await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);
    assert_eq!(client.get("/api/account").await.status(), StatusCode::UNAUTHORIZED);

    let wrong = client
        .post_auth(
            "/api/auth/login",
            &json!({ "email": email, "password": "not-the-password" }),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong).await["error"], "Invalid credentials");

    let unknown = client
        .post_auth(
            "/api/auth/login",
            &json!({ "email": unique_email(), "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(json_body(unknown).await["error"], "Invalid credentials");

    let login = client
        .post_auth(
            "/api/auth/login",
            &json!({ "email": email, "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
    assert_eq!(client.get("/api/account").await.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_profile_update_and_clear() {
    let client = TestClient::new();
    client.register().await;

    let updated = json_body(
        client
            .patch("/api/account", &json!({ "phone": "+1 555 0199" }))
            .await,
    )
    .await;
    assert_eq!(updated["phone"], "+1 555 0199");
    assert_eq!(updated["display_name"], "Test Shopper");

    let cleared = json_body(client.patch("/api/account", &json!({ "display_name": "" })).await).await;
    assert!(cleared["display_name"].is_null());
    assert_eq!(cleared["phone"], "+1 555 0199");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_change_password() {
    let client = TestClient::new();
    let email = client.register().await;

    let wrong = client
        .post(
            "/api/account/password",
            &json!({ "current_password": "nope-nope-nope", "new_password": "new-password-123" }),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = client
        .post(
            "/api/account/password",
            &json!({ "current_password": TEST_PASSWORD, "new_password": "new-password-123" }),
        )
        .await;
    assert_eq!(ok.status(), StatusCode::NO_CONTENT);

    let fresh = TestClient::new();
    let login = fresh
        .post_auth(
            "/api/auth/login",
            &json!({ "email": email, "password": "new-password-123" }),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_first_address_becomes_default() {
    let client = TestClient::new();
    client.register().await;

    let first = client.add_address("Ada Shopper", false).await;
    assert_eq!(first["is_default"], true);
    assert_eq!(first["country_code"], "US");

    let second = client.add_address("Ada at Work", false).await;
    assert_eq!(second["is_default"], false);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_single_default_address() {
    let client = TestClient::new();
    client.register().await;

    let first = client.add_address("Home", false).await;
    let second = client.add_address("Work", true).await;

    let list = json_body(client.get("/api/account/addresses").await).await;
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second["id"]);
    assert_eq!(list.iter().filter(|a| a["is_default"] == true).count(), 1);

    let path = format!("/api/account/addresses/{}/default", first["id"]);
    let promoted = json_body(client.post(&path, &json!({})).await).await;
    assert_eq!(promoted["is_default"], true);

    let list = json_body(client.get("/api/account/addresses").await).await;
    assert_eq!(list[0]["id"], first["id"]);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_deleting_default_promotes_newest() {
    let client = TestClient::new();
    client.register().await;

    let first = client.add_address("Home", false).await;
    let _second = client.add_address("Cabin", false).await;
    let third = client.add_address("Office", false).await;

    let path = format!("/api/account/addresses/{}", first["id"]);
    assert_eq!(client.delete(&path).await.status(), StatusCode::NO_CONTENT);

    let list = json_body(client.get("/api/account/addresses").await).await;
    assert_eq!(list[0]["id"], third["id"]);
    assert_eq!(list[0]["is_default"], true);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_other_users_addresses_are_hidden() {
    let owner = TestClient::new();
    owner.register().await;
    let address = owner.add_address("Private", false).await;

    let stranger = TestClient::new();
    stranger.register().await;
    let path = format!("/api/account/addresses/{}", address["id"]);
    assert_eq!(stranger.delete(&path).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_invalid_address_is_rejected() {
    let client = TestClient::new();
    client.register().await;

    let response = client
        .post(
            "/api/account/addresses",
            &json!({
                "full_name": "  ",
                "phone": "1",
                "line1": "x",
                "city": "y",
                "postal_code": "z",
                "country_code": "USA",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
