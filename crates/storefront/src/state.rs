//! Application state shared across handlers.

use std::sync::Arc;

use askama::Template;

use crate::config::StorefrontConfig;
use crate::erp::{ErpClient, ErpError};
use crate::pwa::ServiceWorkerTemplate;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("ERP client error: {0}")]
    Erp(#[from] ErpError),
    #[error("service worker render error: {0}")]
    ServiceWorker(#[from] askama::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the configuration, the ERP client and the pre-rendered service worker.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    erp: ErpClient,
    service_worker: String,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the ERP client cannot be built or the service
    /// worker template fails to render.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let erp = ErpClient::new(&config.erp)?;
        let service_worker =
            ServiceWorkerTemplate::new(config.pwa.strategy, config.pwa.cache_name()).render()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                erp,
                service_worker,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the ERP client.
    #[must_use]
    pub fn erp(&self) -> &ErpClient {
        &self.inner.erp
    }

    /// The rendered service worker script.
    #[must_use]
    pub fn service_worker(&self) -> &str {
        &self.inner.service_worker
    }
}
