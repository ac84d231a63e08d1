//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                               - Liveness
//! GET    /health/ready                         - Readiness (database reachable)
//!
//! # Auth (rate limited per client IP)
//! POST   /api/auth/register                    - Create account and log in
//! POST   /api/auth/login                       - Log in
//! POST   /api/auth/logout                      - Log out
//!
//! # Account (requires auth)
//! GET    /api/account                          - Profile
//! PATCH  /api/account                          - Update profile
//! POST   /api/account/password                 - Change password
//! GET    /api/account/addresses                - Saved addresses
//! POST   /api/account/addresses                - Add address
//! PUT    /api/account/addresses/{id}           - Replace address
//! DELETE /api/account/addresses/{id}           - Delete address
//! POST   /api/account/addresses/{id}/default   - Make default
//!
//! # Catalog
//! GET    /api/products                         - Search, filter, sort, paginate
//! GET    /api/products/{slug}                  - Product detail
//! GET    /api/categories                       - Categories with counts
//!
//! # Cart (requires auth)
//! GET    /api/cart                             - Cart with totals
//! DELETE /api/cart                             - Empty cart
//! POST   /api/cart/items                       - Add product
//! PATCH  /api/cart/items/{id}                  - Set quantity
//! DELETE /api/cart/items/{id}                  - Remove line
//! POST   /api/cart/items/{id}/increment        - One more
//! POST   /api/cart/items/{id}/decrement        - One fewer
//! POST   /api/cart/items/{id}/toggle           - Flip selection
//! POST   /api/cart/select                      - Select or deselect all
//!
//! # Wishlist (requires auth)
//! GET    /api/wishlist                         - Saved products
//! POST   /api/wishlist/toggle                  - Save or unsave
//! DELETE /api/wishlist/{product_id}            - Unsave
//! POST   /api/wishlist/{product_id}/move-to-cart
//!
//! # Checkout (requires auth)
//! GET    /api/checkout/draft                   - Saved draft
//! PUT    /api/checkout/draft                   - Save draft
//! DELETE /api/checkout/draft                   - Discard draft
//! GET    /api/checkout/preview                 - What would be ordered
//! POST   /api/checkout                         - Place order
//!
//! # Orders (requires auth)
//! GET    /api/orders                           - Order history
//! GET    /api/orders/{id}                      - Order detail
//! POST   /api/orders/{id}/cancel               - Cancel and restock
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod wishlist;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};

use crate::config::StorefrontConfig;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter(config.trust_proxy_headers))
}

/// Create the account routes router.
pub fn account_routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/", get(account::show).patch(account::update))
        .route(
            "/password",
            post(account::change_password)
                .layer(auth_rate_limiter(config.trust_proxy_headers)),
        )
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route("/addresses/{id}/default", post(account::set_default_address))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(products::categories_index))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route("/items/{id}", patch(cart::set_quantity).delete(cart::remove))
        .route("/items/{id}/increment", post(cart::increment))
        .route("/items/{id}/decrement", post(cart::decrement))
        .route("/items/{id}/toggle", post(cart::toggle))
        .route("/select", post(cart::select_all))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index))
        .route("/toggle", post(wishlist::toggle))
        .route("/{product_id}", delete(wishlist::remove))
        .route("/{product_id}/move-to-cart", post(wishlist::move_to_cart))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::place_order))
        .route(
            "/draft",
            get(checkout::draft)
                .put(checkout::save_draft)
                .delete(checkout::clear_draft),
        )
        .route("/preview", get(checkout::preview))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all `/api` routes.
pub fn api_routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(config))
        .nest("/account", account_routes(config))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
}

/// Create all routes for the storefront.
pub fn routes(config: &StorefrontConfig) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes(config))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
