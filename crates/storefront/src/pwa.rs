//! Installable app support: service worker caching rules and manifest.
//!
//! The storefront ships one of two service-worker strategies:
//!
//! - [`SwStrategy::NetworkFirstApi`] splits requests by kind. Non-GET
//!   requests are never intercepted. API and auth routes go to the network
//!   and fall back to the cache. Navigations go to the network, cache any 200
//!   response and fall back to the cached page or the offline shell.
//!   Same-origin static assets and the manifest are served cache-first and
//!   cached on a 200 `basic` response. Other same-origin GETs, such as the
//!   cart badge and catalog fragments, go to the network first.
//! - [`SwStrategy::NetworkFallbackAll`] sends every GET to the network and
//!   falls back to whatever the cache holds.
//!
//! [`classify`] is the reference for the rules; the rendered worker script
//! embeds the same prefixes and branches.

use std::fmt;
use std::str::FromStr;

use askama::Template;
use serde::Serialize;

/// Path prefixes that are always fetched network-first.
pub const NETWORK_FIRST_PREFIXES: [&str; 2] = ["/api/", "/auth/"];

/// Same-origin path prefixes served cache-first. Only immutable or
/// versioned assets belong here; dynamic fragments must not.
pub const CACHE_FIRST_PREFIXES: [&str; 2] = ["/static/", "/manifest.json"];

/// Page served to navigations when both network and cache miss.
pub const OFFLINE_SHELL: &str = "/offline";

/// Which caching strategy the service worker uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwStrategy {
    #[default]
    NetworkFirstApi,
    NetworkFallbackAll,
}

impl SwStrategy {
    /// Configuration value for this strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkFirstApi => "network-first-api",
            Self::NetworkFallbackAll => "network-fallback-all",
        }
    }
}

impl fmt::Display for SwStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network-first-api" => Ok(Self::NetworkFirstApi),
            "network-fallback-all" => Ok(Self::NetworkFallbackAll),
            other => Err(format!(
                "unknown service worker strategy '{other}' (expected network-first-api or network-fallback-all)"
            )),
        }
    }
}

/// How the service worker answers a particular request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Not intercepted; the browser handles it.
    Bypass,
    /// Network, falling back to a cached copy of the same request.
    NetworkThenCache,
    /// Network (caching 200s), falling back to a cached copy and then the
    /// offline shell.
    NavigationNetworkThenShell,
    /// Cache, falling back to network (caching 200s).
    CacheFirst,
}

/// What the service worker knows about an intercepted request.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub is_navigation: bool,
    pub same_origin: bool,
}

/// Decide how a request is answered under `strategy`.
#[must_use]
pub fn classify(strategy: SwStrategy, request: &RequestInfo<'_>) -> CacheStrategy {
    if !request.method.eq_ignore_ascii_case("GET") {
        return CacheStrategy::Bypass;
    }

    match strategy {
        SwStrategy::NetworkFallbackAll => CacheStrategy::NetworkThenCache,
        SwStrategy::NetworkFirstApi => {
            if NETWORK_FIRST_PREFIXES
                .iter()
                .any(|prefix| request.path.starts_with(prefix))
            {
                CacheStrategy::NetworkThenCache
            } else if request.is_navigation {
                CacheStrategy::NavigationNetworkThenShell
            } else if !request.same_origin {
                CacheStrategy::Bypass
            } else if CACHE_FIRST_PREFIXES
                .iter()
                .any(|prefix| request.path.starts_with(prefix))
            {
                CacheStrategy::CacheFirst
            } else {
                CacheStrategy::NetworkThenCache
            }
        }
    }
}

/// URLs fetched into the cache when the worker installs.
#[must_use]
pub fn precache_urls() -> Vec<String> {
    vec![
        OFFLINE_SHELL.to_string(),
        "/manifest.json".to_string(),
        format!("/static/css/derived/main.{}.css", env!("CSS_HASH")),
        format!("/static/js/derived/app.{}.js", env!("JS_HASH")),
        "/static/icons/app-icon.svg".to_string(),
    ]
}

/// Service worker script template.
#[derive(Template)]
#[template(path = "pwa/sw.js", escape = "none")]
pub struct ServiceWorkerTemplate {
    /// JSON string literal of the versioned cache name
    pub cache_name_json: String,
    /// JSON array literal of URLs to pre-cache
    pub precache_json: String,
    /// JSON array literal of network-first prefixes
    pub network_first_json: String,
    /// JSON array literal of cache-first prefixes
    pub cache_first_json: String,
    /// JSON string literal of the offline shell path
    pub offline_shell_json: String,
    pub split_by_kind: bool,
}

impl ServiceWorkerTemplate {
    /// Build the worker for a strategy and versioned cache name.
    #[must_use]
    pub fn new(strategy: SwStrategy, cache_name: String) -> Self {
        Self {
            cache_name_json: json_literal(&cache_name),
            precache_json: json_literal(&precache_urls()),
            network_first_json: json_literal(&NETWORK_FIRST_PREFIXES),
            cache_first_json: json_literal(&CACHE_FIRST_PREFIXES),
            offline_shell_json: json_literal(&OFFLINE_SHELL),
            split_by_kind: strategy == SwStrategy::NetworkFirstApi,
        }
    }
}

/// Serialize a value for embedding in the worker script.
fn json_literal<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

/// Web app manifest.
#[derive(Debug, Clone, Serialize)]
pub struct WebManifest {
    pub name: &'static str,
    pub short_name: &'static str,
    pub description: &'static str,
    pub start_url: &'static str,
    pub scope: &'static str,
    pub display: &'static str,
    pub theme_color: &'static str,
    pub background_color: &'static str,
    pub icons: Vec<ManifestIcon>,
}

/// Icon entry of the web app manifest.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestIcon {
    pub src: &'static str,
    pub sizes: &'static str,
    #[serde(rename = "type")]
    pub mime_type: &'static str,
    pub purpose: &'static str,
}

impl Default for WebManifest {
    fn default() -> Self {
        Self {
            name: "Ok Distributor",
            short_name: "Ok Distributor",
            description: "Customer App",
            start_url: "/",
            scope: "/",
            display: "standalone",
            theme_color: "#0f766e",
            background_color: "#f8fafc",
            icons: vec![ManifestIcon {
                src: "/static/icons/app-icon.svg",
                sizes: "any",
                mime_type: "image/svg+xml",
                purpose: "any maskable",
            }],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get(path: &str, is_navigation: bool, same_origin: bool) -> RequestInfo<'_> {
        RequestInfo {
            method: "GET",
            path,
            is_navigation,
            same_origin,
        }
    }

    #[test]
    fn test_non_get_is_never_intercepted() {
        let post = RequestInfo {
            method: "POST",
            path: "/cart/add",
            is_navigation: false,
            same_origin: true,
        };
        assert_eq!(classify(SwStrategy::NetworkFirstApi, &post), CacheStrategy::Bypass);
        assert_eq!(classify(SwStrategy::NetworkFallbackAll, &post), CacheStrategy::Bypass);
    }

    #[test]
    fn test_api_and_auth_are_network_first() {
        for path in ["/api/orders", "/auth/login"] {
            assert_eq!(
                classify(SwStrategy::NetworkFirstApi, &get(path, true, true)),
                CacheStrategy::NetworkThenCache
            );
        }
    }

    #[test]
    fn test_navigation_falls_back_to_shell() {
        assert_eq!(
            classify(SwStrategy::NetworkFirstApi, &get("/catalog", true, true)),
            CacheStrategy::NavigationNetworkThenShell
        );
    }

    #[test]
    fn test_static_assets_are_cache_first_only_same_origin() {
        assert_eq!(
            classify(SwStrategy::NetworkFirstApi, &get("/static/js/app.js", false, true)),
            CacheStrategy::CacheFirst
        );
        assert_eq!(
            classify(
                SwStrategy::NetworkFirstApi,
                &get("/seed/PainAway/400/300", false, false)
            ),
            CacheStrategy::Bypass
        );
    }

    #[test]
    fn test_dynamic_fragments_are_never_cache_first() {
        for path in ["/cart/count", "/catalog/more?q=&offset=8", "/health/ready"] {
            assert_eq!(
                classify(SwStrategy::NetworkFirstApi, &get(path, false, true)),
                CacheStrategy::NetworkThenCache,
                "for {path}"
            );
        }
        assert_eq!(
            classify(SwStrategy::NetworkFirstApi, &get("/manifest.json", false, true)),
            CacheStrategy::CacheFirst
        );
    }

    #[test]
    fn test_fallback_all_treats_every_get_alike() {
        for request in [
            get("/auth/login", true, true),
            get("/catalog", true, true),
            get("/static/css/main.css", false, true),
            get("/image.png", false, false),
        ] {
            assert_eq!(
                classify(SwStrategy::NetworkFallbackAll, &request),
                CacheStrategy::NetworkThenCache
            );
        }
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(
            "network-fallback-all".parse::<SwStrategy>().unwrap(),
            SwStrategy::NetworkFallbackAll
        );
        assert!("cache-everything".parse::<SwStrategy>().is_err());
    }

    #[test]
    fn test_rendered_worker_embeds_rules() {
        let script = ServiceWorkerTemplate::new(
            SwStrategy::NetworkFirstApi,
            "ok-distributor-v5".to_string(),
        )
        .render()
        .unwrap();

        assert!(script.contains("\"ok-distributor-v5\""));
        assert!(script.contains(r#"["/api/","/auth/"]"#));
        assert!(script.contains(r#"const CACHE_FIRST_PREFIXES = ["/static/","/manifest.json"];"#));
        assert!(script.contains("\"/offline\""));
        assert!(script.contains("skipWaiting"));
        assert!(script.contains("clients.claim"));
        assert!(script.contains("const SPLIT_BY_KIND = true;"));
    }

    #[test]
    fn test_rendered_fallback_worker() {
        let script = ServiceWorkerTemplate::new(
            SwStrategy::NetworkFallbackAll,
            "ok-distributor-v6".to_string(),
        )
        .render()
        .unwrap();
        assert!(script.contains("const SPLIT_BY_KIND = false;"));
        assert!(script.contains("\"ok-distributor-v6\""));
    }

    #[test]
    fn test_manifest_shape() {
        let json = serde_json::to_value(WebManifest::default()).unwrap();
        assert_eq!(json["name"], "Ok Distributor");
        assert_eq!(json["display"], "standalone");
        assert_eq!(json["icons"][0]["type"], "image/svg+xml");
    }
}
