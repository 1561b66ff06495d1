//! Installable app endpoints: manifest, service worker and offline shell.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::State,
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};

use crate::filters;
use crate::pwa::WebManifest;
use crate::routes::layout::Layout;
use crate::state::AppState;

const SERVICE_WORKER_ALLOWED: HeaderName = HeaderName::from_static("service-worker-allowed");

/// Serve the web app manifest.
pub async fn manifest() -> Response {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        Json(WebManifest::default()),
    )
        .into_response()
}

/// Serve the service worker rendered at startup.
///
/// Served from the root with `no-cache` so the browser always checks for a
/// new version and the worker controls the whole origin.
pub async fn service_worker(State(state): State<AppState>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
            (SERVICE_WORKER_ALLOWED, "/"),
        ],
        state.service_worker().to_owned(),
    )
        .into_response()
}

/// Offline shell template.
#[derive(Template, WebTemplate)]
#[template(path = "offline.html")]
pub struct OfflineTemplate {
    pub layout: Layout,
}

/// Page the service worker falls back to when a navigation fails offline.
pub async fn offline() -> OfflineTemplate {
    OfflineTemplate {
        layout: Layout::anonymous(),
    }
}
