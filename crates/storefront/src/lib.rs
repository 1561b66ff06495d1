//! Ok Distributor storefront library.
//!
//! Customers browse the catalog, place bid-priced orders and track them.
//! Sales representatives pick a customer and do the same on their behalf.
//! All business data lives in the ERP; this crate renders pages, keeps the
//! session and talks to the ERP over REST.
//!
//! The binary wires [`app`] to a listener; the integration tests build the
//! same router against a mock ERP.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod erp;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod pwa;
pub mod routes;
pub mod state;

use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, header},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the complete application router.
///
/// # Middleware order (outermost first)
///
/// 1. Sentry hub and transaction
/// 2. `TraceLayer` span with a `request_id` field
/// 3. Request ID
/// 4. Security headers
/// 5. Session
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let auth_rate_burst = state.config().auth_rate_burst;

    let static_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400"),
        ))
        .service(ServeDir::new(STATIC_DIR));

    Router::new()
        .merge(routes::routes(auth_rate_burst))
        .nest_service("/static", static_files)
        .layer(session_layer)
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
