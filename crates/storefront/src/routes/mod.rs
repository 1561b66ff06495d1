//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Redirect by role
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (pings the ERP)
//!
//! # Auth (form posts are rate limited)
//! GET  /auth/login             - Login page (?expired=1 after a rejected token)
//! POST /auth/login             - Login action
//! GET  /auth/register          - Register page
//! POST /auth/register          - Register action
//! GET  /auth/reset-password    - Reset password page
//! POST /auth/reset-password    - Reset password action
//! POST /auth/logout            - Logout action
//!
//! # Catalog
//! GET  /catalog                - Catalog page (?q=, ?show= without JavaScript)
//! GET  /catalog/more           - Product card fragment (?q=&offset=)
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a product at a bid
//! POST /cart/update            - Change a line's quantity
//! POST /cart/remove            - Remove a line
//! GET  /cart/count             - Cart count badge (fragment)
//! POST /cart/checkout          - Place the order
//!
//! # Orders
//! GET  /orders                 - Order history (?open=ID)
//! POST /orders/{id}/status     - Update status (sales representatives)
//! POST /orders/{id}/payments   - Record a payment (sales representatives)
//!
//! # Profile
//! GET  /profile                - Profile (?edit=1 to edit)
//! POST /profile                - Save profile
//!
//! # Customers (sales representatives)
//! GET  /customers              - Customer list (?q=)
//! POST /customers/select       - Act for a customer
//! POST /customers/clear        - Stop acting for a customer
//!
//! # PWA
//! GET  /manifest.json          - Web app manifest
//! GET  /sw.js                  - Service worker
//! GET  /offline                - Offline shell
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod customers;
pub mod health;
pub mod home;
pub mod layout;
pub mod orders;
pub mod profile;
pub mod pwa;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Credential-bearing posts share one per-IP rate limiter.
pub fn auth_routes(rate_burst: u32) -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/reset-password", post(auth::reset_password))
        .route_layer(auth_rate_limiter(rate_burst));

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/reset-password", get(auth::reset_password_page))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/more", get(catalog::more))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
        .route("/checkout", post(cart::checkout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}/status", post(orders::update_status))
        .route("/{id}/payments", post(orders::record_payment))
}

/// Create the customer selection routes router.
pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(customers::index))
        .route("/select", post(customers::select))
        .route("/clear", post(customers::clear))
}

/// Create the installable-app routes router.
pub fn pwa_routes() -> Router<AppState> {
    Router::new()
        .route("/manifest.json", get(pwa::manifest))
        .route("/sw.js", get(pwa::service_worker))
        .route("/offline", get(pwa::offline))
}

/// Create all routes for the storefront.
pub fn routes(auth_rate_burst: u32) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes(auth_rate_burst))
        .nest("/catalog", catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .route("/profile", get(profile::show).post(profile::update))
        .nest("/customers", customer_routes())
        .merge(pwa_routes())
}
