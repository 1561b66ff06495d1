//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_AUTH_RATE_BURST` - Auth POST burst per client IP (default: 5)
//! - `STOREFRONT_SW_STRATEGY` - `network-first-api` (default) or `network-fallback-all`
//! - `STOREFRONT_CACHE_VERSION` - Service worker cache version (default: v5)
//! - `ERP_API_BASE_URL` - ERP REST API root (default: <http://127.0.0.1:8000>)
//! - `ERP_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `CATALOG_CACHE_TTL_SECS` - Product list cache TTL (default: 300)
//! - `LOG_FORMAT` - `json` for JSON logs, anything else for human-readable
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::pwa::SwStrategy;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Burst size for the auth endpoint rate limiter
    pub auth_rate_burst: u32,
    /// ERP REST API configuration
    pub erp: ErpConfig,
    /// Installable app configuration
    pub pwa: PwaConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// ERP REST API configuration.
#[derive(Debug, Clone)]
pub struct ErpConfig {
    /// API root, always ending in `/` so relative paths join beneath it
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long the product list is cached
    pub catalog_cache_ttl: Duration,
}

/// Service worker and manifest configuration.
#[derive(Debug, Clone)]
pub struct PwaConfig {
    /// Which caching strategy the service worker uses
    pub strategy: SwStrategy,
    /// Version suffix of the cache name; bump to evict old caches
    pub cache_version: String,
}

impl PwaConfig {
    /// Versioned cache name, e.g. `ok-distributor-v5`.
    #[must_use]
    pub fn cache_name(&self) -> String {
        format!("ok-distributor-{}", self.cache_version)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// DSN; Sentry stays disabled when absent
    pub dsn: Option<SecretString>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Transaction sample rate
    pub traces_sample_rate: f32,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.parse_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parse_or("STOREFRONT_PORT", "3000")?;
        let base_url = env.required("STOREFRONT_BASE_URL")?;
        Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let auth_rate_burst: u32 = env.parse_or("STOREFRONT_AUTH_RATE_BURST", "5")?;
        if auth_rate_burst == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_AUTH_RATE_BURST".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let erp = ErpConfig {
            base_url: normalize_api_root(&env.or_default("ERP_API_BASE_URL", "http://127.0.0.1:8000"))?,
            timeout: Duration::from_secs(env.parse_or("ERP_REQUEST_TIMEOUT_SECS", "15")?),
            catalog_cache_ttl: Duration::from_secs(env.parse_or("CATALOG_CACHE_TTL_SECS", "300")?),
        };

        let pwa = PwaConfig {
            strategy: env.parse_or("STOREFRONT_SW_STRATEGY", "network-first-api")?,
            cache_version: env.or_default("STOREFRONT_CACHE_VERSION", "v5"),
        };

        let log_format = match env.optional("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            environment: env.optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.parse_or("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: env.parse_or("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            host,
            port,
            base_url,
            auth_rate_burst,
            erp,
            pwa,
            log_format,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (enables secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with typed accessors.
struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable, treating blank values as absent.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default literal.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

/// Parse the ERP API root and make sure it ends with `/`.
///
/// Without the trailing slash `Url::join` would replace the last path
/// segment instead of appending to it.
fn normalize_api_root(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("ERP_API_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "ERP_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("STOREFRONT_BASE_URL", "http://localhost:3000")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.erp.base_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.erp.timeout, Duration::from_secs(15));
        assert_eq!(config.erp.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.pwa.strategy, SwStrategy::NetworkFirstApi);
        assert_eq!(config.pwa.cache_name(), "ok-distributor-v5");
        assert_eq!(config.auth_rate_burst, 5);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.sentry.dsn.is_none());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_base_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
            ("STOREFRONT_PORT", "  "),
        ])
        .unwrap();
        assert_eq!(config.port, 3000);
        assert!(config.is_secure());
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_api_root_keeps_path_prefix() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("ERP_API_BASE_URL", "https://erp.example.com/api/v2"),
        ])
        .unwrap();
        assert_eq!(config.erp.base_url.as_str(), "https://erp.example.com/api/v2/");
        assert_eq!(
            config.erp.base_url.join("orders/").unwrap().as_str(),
            "https://erp.example.com/api/v2/orders/"
        );
    }

    #[test]
    fn test_api_root_rejects_other_schemes() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("ERP_API_BASE_URL", "ftp://erp.example.com"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "ERP_API_BASE_URL"));
    }

    #[test]
    fn test_sw_strategy_and_sentry() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_SW_STRATEGY", "network-fallback-all"),
            ("STOREFRONT_CACHE_VERSION", "v6"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.pwa.strategy, SwStrategy::NetworkFallbackAll);
        assert_eq!(config.pwa.cache_name(), "ok-distributor-v6");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.sentry.dsn.as_ref().unwrap().expose_secret(),
            "https://key@sentry.example.com/1"
        );
    }

    #[test]
    fn test_zero_rate_burst_rejected() {
        let err = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_AUTH_RATE_BURST", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_debug_redacts_sentry_dsn() {
        let config = load(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("SENTRY_DSN", "https://supersecretkey@sentry.example.com/1"),
        ])
        .unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("supersecretkey"));
    }
}
