//! Service worker, manifest, offline shell and operational endpoints.

#![allow(clippy::unwrap_used)]

use ok_distributor_integration_tests::TestContext;

#[tokio::test]
async fn test_service_worker_headers_and_rules() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/sw.js").await;
    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/javascript")
    );
    assert_eq!(headers["service-worker-allowed"], "/");
    assert_eq!(headers["cache-control"], "no-cache");

    let script = response.text().await.unwrap();
    assert!(script.contains("const CACHE_NAME = \"ok-distributor-v5\";"));
    assert!(script.contains("const SPLIT_BY_KIND = true;"));
    assert!(script.contains("\"/offline\""));
}

#[tokio::test]
async fn test_service_worker_fallback_strategy_and_version() {
    let ctx = TestContext::spawn_with(&[
        ("STOREFRONT_SW_STRATEGY", "network-fallback-all"),
        ("STOREFRONT_CACHE_VERSION", "v6"),
    ])
    .await;

    let script = ctx.get("/sw.js").await.text().await.unwrap();
    assert!(script.contains("const SPLIT_BY_KIND = false;"));
    assert!(script.contains("\"ok-distributor-v6\""));
}

#[tokio::test]
async fn test_manifest() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/manifest.json").await;
    assert_eq!(response.headers()["content-type"], "application/manifest+json");
    let manifest: serde_json::Value = response.json().await.unwrap();
    assert_eq!(manifest["name"], "Ok Distributor");
    assert_eq!(manifest["display"], "standalone");
    assert_eq!(manifest["start_url"], "/");
    assert_eq!(manifest["icons"][0]["src"], "/static/icons/app-icon.svg");
}

#[tokio::test]
async fn test_offline_shell_and_precached_assets() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/offline").await;
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("You are offline"));

    let response = ctx.get("/static/icons/app-icon.svg").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/health").await;
    assert_eq!(response.text().await.unwrap(), "ok");

    let response = ctx.get("/health/ready").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/auth/login").await;
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(
        headers["content-security-policy"]
            .to_str()
            .unwrap()
            .contains("script-src 'self'")
    );
    assert_eq!(headers["cache-control"], "no-store, max-age=0");
    assert!(headers.contains_key("x-request-id"));
}
