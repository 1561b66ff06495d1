//! ERP REST client implementation.
//!
//! Uses `reqwest` 0.13 for HTTP. Caches the product list using `moka`.

use std::sync::Arc;

use moka::future::Cache;
use ok_distributor_core::{OrderId, OrderStatus, PartyId};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::ErpError;
use super::types::{
    ApiToken, AuthenticatedParty, Listing, LoginRequest, MessageResponse, NewOrder, NewPayment,
    Order, Party, PasswordResetRequest, Product, Profile, RegistrationRequest, StatusUpdate,
};
use crate::config::ErpConfig;

/// Upper bound on `next` links followed for one listing.
const MAX_PAGES: usize = 50;

const PRODUCTS_KEY: &str = "products";

/// Client for the ERP REST API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct ErpClient {
    inner: Arc<ErpClientInner>,
}

struct ErpClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<&'static str, Arc<Vec<Product>>>,
}

impl ErpClient {
    /// Create a new ERP client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ErpConfig) -> Result<Self, ErpError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("ok-distributor-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let products = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ErpClientInner {
                client,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// Root URL of the ERP API.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&ApiToken>,
    ) -> Result<RequestBuilder, ErpError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self.request_url(method, url, token))
    }

    fn request_url(&self, method: Method, url: Url, token: Option<&ApiToken>) -> RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.header(AUTHORIZATION, format!("Token {}", token.expose_secret())),
            None => builder,
        }
    }

    /// Send a request and decode a successful JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ErpError> {
        self.send_with(request, ErpError::from_response).await
    }

    /// Like [`Self::send`], with a custom mapping for unsuccessful responses.
    async fn send_with<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        to_error: fn(StatusCode, &str) -> ErpError,
    ) -> Result<T, ErpError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let error = to_error(status, &body);
            if error.is_upstream_failure() {
                warn!(status = status.as_u16(), "ERP request failed");
            } else {
                debug!(status = status.as_u16(), error = %error, "ERP rejected request");
            }
            return Err(error);
        }

        // Some acknowledgements come back as 204 with no body.
        let body = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(body).map_err(|e| {
            warn!(error = %e, "Failed to decode ERP response");
            ErpError::Parse(e)
        })
    }

    /// Collect every page of a list endpoint.
    async fn list<T: DeserializeOwned>(
        &self,
        first: RequestBuilder,
        token: &ApiToken,
    ) -> Result<Vec<T>, ErpError> {
        let mut items = Vec::new();
        let mut request = first;

        for _ in 0..MAX_PAGES {
            match self.send::<Listing<T>>(request).await? {
                Listing::Bare(page) => {
                    items.extend(page);
                    return Ok(items);
                }
                Listing::Paged { results, next } => {
                    items.extend(results);
                    let Some(next) = next else {
                        return Ok(items);
                    };
                    let url = self.inner.base_url.join(&next)?;
                    request = self.request_url(Method::GET, url, Some(token));
                }
            }
        }

        warn!(pages = MAX_PAGES, "Stopped following ERP pagination");
        Ok(items)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Log in with an email (sent as `username`) and password.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError::Validation`] for rejected credentials.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<AuthenticatedParty, ErpError> {
        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };
        let request = self
            .request(Method::POST, "user/auth/login/", None)?
            .json(&body);
        self.send_with(request, ErpError::from_login_response).await
    }

    /// Register a new customer. Returns the ERP's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError::Validation`] listing every rejected field.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &RegistrationRequest,
    ) -> Result<Option<String>, ErpError> {
        let request = self
            .request(Method::POST, "user/auth/register/", None)?
            .json(registration);
        let response: Option<MessageResponse> = self.send(request).await?;
        Ok(response.and_then(MessageResponse::into_text))
    }

    /// Reset the password of the account registered under `email`.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError::NotFound`] when no account uses the email.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        email: &str,
        new_password: &SecretString,
    ) -> Result<Option<String>, ErpError> {
        let body = PasswordResetRequest {
            email,
            new_password: new_password.expose_secret(),
        };
        let request = self
            .request(Method::POST, "user/auth/password-reset/", None)?
            .json(&body);
        let response: Option<MessageResponse> = self.send(request).await?;
        Ok(response.and_then(MessageResponse::into_text))
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Fetch the logged-in party's profile.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn profile(&self, token: &ApiToken) -> Result<Profile, ErpError> {
        let request = self.request(Method::GET, "user/profile/", Some(token))?;
        self.send(request).await
    }

    /// Update the logged-in party's profile.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or a field is rejected.
    #[instrument(skip(self, token, profile))]
    pub async fn update_profile(
        &self,
        token: &ApiToken,
        profile: &Profile,
    ) -> Result<Profile, ErpError> {
        let request = self
            .request(Method::PATCH, "user/profile/", Some(token))?
            .json(profile);
        self.send(request).await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// All products, served from cache while fresh.
    ///
    /// # Errors
    ///
    /// Returns error if the cache is cold and the API request fails.
    #[instrument(skip(self, token))]
    pub async fn products(&self, token: &ApiToken) -> Result<Arc<Vec<Product>>, ErpError> {
        if let Some(products) = self.inner.products.get(PRODUCTS_KEY).await {
            debug!(count = products.len(), "Product cache hit");
            return Ok(products);
        }

        let request = self.request(Method::GET, "inventory/products/", Some(token))?;
        let products = Arc::new(self.list::<Product>(request, token).await?);
        debug!(count = products.len(), "Fetched products from ERP");

        self.inner
            .products
            .insert(PRODUCTS_KEY, Arc::clone(&products))
            .await;
        Ok(products)
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Customers visible to a sales representative, optionally filtered.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError::Unauthorized`] for parties that are not sales
    /// representatives.
    #[instrument(skip(self, token))]
    pub async fn customers(
        &self,
        token: &ApiToken,
        search: Option<&str>,
    ) -> Result<Vec<Party>, ErpError> {
        let mut request = self.request(Method::GET, "user/customers/", Some(token))?;
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            request = request.query(&[("search", search)]);
        }
        self.list(request, token).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the order is rejected.
    #[instrument(skip(self, token, order), fields(party_id = %order.party_id, lines = order.items.len()))]
    pub async fn place_order(&self, token: &ApiToken, order: &NewOrder) -> Result<Order, ErpError> {
        let request = self
            .request(Method::POST, "orders/", Some(token))?
            .json(order);
        self.send(request).await
    }

    /// Orders for a party, or for the caller when `party_id` is `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self, token))]
    pub async fn orders(
        &self,
        token: &ApiToken,
        party_id: Option<PartyId>,
    ) -> Result<Vec<Order>, ErpError> {
        let mut request = self.request(Method::GET, "orders/", Some(token))?;
        if let Some(party_id) = party_id {
            request = request.query(&[("party_id", party_id.as_i64())]);
        }
        self.list(request, token).await
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns [`ErpError::NotFound`] if the order does not exist or is not
    /// visible to the caller.
    #[instrument(skip(self, token))]
    pub async fn order(&self, token: &ApiToken, id: OrderId) -> Result<Order, ErpError> {
        let request = self.request(Method::GET, &format!("orders/{id}/"), Some(token))?;
        self.send(request).await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the ERP refuses the change.
    #[instrument(skip(self, token))]
    pub async fn update_order_status(
        &self,
        token: &ApiToken,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ErpError> {
        let request = self
            .request(Method::PATCH, &format!("orders/{id}/status/"), Some(token))?
            .json(&StatusUpdate { status });
        self.send(request).await
    }

    /// Record a payment against an order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the payment is rejected.
    #[instrument(skip(self, token, payment), fields(amount = %payment.amount, mode = %payment.mode))]
    pub async fn record_payment(
        &self,
        token: &ApiToken,
        id: OrderId,
        payment: &NewPayment,
    ) -> Result<Order, ErpError> {
        let request = self
            .request(Method::POST, &format!("orders/{id}/payments/"), Some(token))?
            .json(payment);
        self.send(request).await
    }

    /// Whether the ERP answers at all. Any HTTP response counts.
    pub async fn ping(&self) -> bool {
        self.inner
            .client
            .get(self.inner.base_url.clone())
            .send()
            .await
            .is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(base: &str) -> ErpClient {
        ErpClient::new(&ErpConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(5),
            catalog_cache_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    #[test]
    fn test_paths_join_under_api_root() {
        let erp = client("https://erp.example.com/api/");
        let request = erp
            .request(Method::GET, "orders/41/", None)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "https://erp.example.com/api/orders/41/");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_token_header() {
        let erp = client("http://127.0.0.1:8000/");
        let token = ApiToken::new("abc123".to_string());
        let request = erp
            .request(Method::GET, "user/profile/", Some(&token))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            "Token abc123"
        );
    }

    #[test]
    fn test_absolute_next_link_replaces_base() {
        let erp = client("http://127.0.0.1:8000/");
        let next = erp
            .base_url()
            .join("http://127.0.0.1:8000/inventory/products/?page=2")
            .unwrap();
        assert_eq!(next.query(), Some("page=2"));
    }
}
