//! End-to-end test harness for the Ok Distributor storefront.
//!
//! [`TestContext::spawn`] starts an in-process mock of the ERP REST API and
//! the real storefront router, each on an ephemeral port, and hands back a
//! cookie-keeping `reqwest` client pointed at the storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ok-distributor-integration-tests
//! ```
//!
//! # Mock accounts
//!
//! | Email                  | Password  | Role                 |
//! |------------------------|-----------|----------------------|
//! | `customer@okd.example` | `pass123` | customer, party 1    |
//! | `rep@okd.example`      | `pass123` | sales rep, party 7   |

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use ok_distributor_storefront::app;
use ok_distributor_storefront::config::StorefrontConfig;
use ok_distributor_storefront::state::AppState;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const CUSTOMER_EMAIL: &str = "customer@okd.example";
pub const REP_EMAIL: &str = "rep@okd.example";
pub const PASSWORD: &str = "pass123";

const CUSTOMER_TOKEN: &str = "customer-token";
const REP_TOKEN: &str = "rep-token";

/// Products served by the mock, in catalog order.
pub const PRODUCT_NAMES: [&str; 10] = [
    "PainAway 500mg",
    "Cough Syrup",
    "Vitamin C 1000",
    "Antacid Tablets",
    "Zinc Supplement",
    "Bandage Roll",
    "Digital Thermometer",
    "ORS Sachet",
    "Antiseptic Liquid",
    "Cold Rub",
];

// =============================================================================
// Mock ERP
// =============================================================================

/// What the mock ERP has been told, for assertions.
#[derive(Debug, Default)]
pub struct ErpData {
    pub orders: Vec<Value>,
    pub registered: Vec<Value>,
    pub password_resets: Vec<String>,
    pub profile: Value,
    /// Tokens the mock now rejects with 401.
    pub revoked: HashSet<String>,
    /// Answer status changes with 403, as for a rep without that permission.
    pub forbid_status_changes: bool,
    next_payment_id: i64,
}

/// Shared handle on the mock ERP's state.
#[derive(Clone, Default)]
pub struct MockErp {
    data: Arc<Mutex<ErpData>>,
}

impl MockErp {
    fn new() -> Self {
        let data = ErpData {
            profile: json!({
                "name": "City Pharmacy",
                "proprietor": "Anita Rao",
                "phone": "9876543210",
                "address": "12 MG Road, Bengaluru",
                "license_no": "KA-20B-1234",
                "license_expiry": "2027-03-31",
                "email": CUSTOMER_EMAIL,
            }),
            next_payment_id: 1,
            ..ErpData::default()
        };
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Lock the recorded state.
    pub fn data(&self) -> MutexGuard<'_, ErpData> {
        self.data.lock().expect("mock ERP state poisoned")
    }

    /// Make the ERP reject the customer's token from now on.
    pub fn revoke_customer_token(&self) {
        self.data().revoked.insert(CUSTOMER_TOKEN.to_string());
    }

    fn router(self) -> Router {
        Router::new()
            .route("/user/auth/login/", post(login))
            .route("/user/auth/register/", post(register))
            .route("/user/auth/password-reset/", post(reset_password))
            .route("/user/profile/", get(profile).patch(update_profile))
            .route("/inventory/products/", get(products))
            .route("/user/customers/", get(customers))
            .route("/orders/", get(list_orders).post(create_order))
            .route("/orders/{id}/", get(order))
            .route("/orders/{id}/status/", patch(update_status))
            .route("/orders/{id}/payments/", post(record_payment))
            .with_state(self)
    }
}

fn party_for_token(erp: &MockErp, headers: &HeaderMap) -> Result<i64, Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Token "))
        .unwrap_or_default();
    if erp.data().revoked.contains(token) {
        return Err(unauthorized());
    }
    match token {
        CUSTOMER_TOKEN => Ok(1),
        REP_TOKEN => Ok(7),
        _ => Err(unauthorized()),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Invalid token."})),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

fn customer_parties() -> Value {
    json!([
        {"id": 1, "name": "City Pharmacy", "proprietor": "Anita Rao", "phone": "9876543210", "address": "12 MG Road, Bengaluru"},
        {"id": 2, "name": "Green Cross Chemists", "proprietor": "Vikram Shah", "phone": "9123456780", "address": "4 Park Street, Kolkata"}
    ])
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

async fn login(Json(body): Json<Credentials>) -> Response {
    let party = match (body.username.as_str(), body.password.as_str()) {
        (CUSTOMER_EMAIL, PASSWORD) => json!({
            "token": CUSTOMER_TOKEN,
            "party": {"id": 1, "name": "City Pharmacy", "email": CUSTOMER_EMAIL, "role": "customer"}
        }),
        (REP_EMAIL, PASSWORD) => json!({
            "token": REP_TOKEN,
            "party": {"id": 7, "name": "Ravi Kumar", "email": REP_EMAIL, "role": "salesman"}
        }),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"non_field_errors": ["Unable to log in with provided credentials."]})),
            )
                .into_response();
        }
    };
    Json(party).into_response()
}

async fn register(State(erp): State<MockErp>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email == CUSTOMER_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"email": ["party with this email already exists."]})),
        )
            .into_response();
    }
    erp.data().registered.push(body);
    (
        StatusCode::CREATED,
        Json(json!({"message": "Registration successful! Please log in."})),
    )
        .into_response()
}

async fn reset_password(State(erp): State<MockErp>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if email != CUSTOMER_EMAIL && email != REP_EMAIL {
        return not_found();
    }
    erp.data().password_resets.push(email.to_string());
    Json(json!({"message": "Password has been reset successfully. Please log in with your new password."}))
        .into_response()
}

async fn profile(State(erp): State<MockErp>, headers: HeaderMap) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    Json(erp.data().profile.clone()).into_response()
}

async fn update_profile(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    let mut data = erp.data();
    if let (Some(profile), Some(changes)) = (data.profile.as_object_mut(), body.as_object()) {
        for (key, value) in changes {
            profile.insert(key.clone(), value.clone());
        }
    }
    Json(data.profile.clone()).into_response()
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

/// Products are served six per page to exercise `next` links.
async fn products(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    let all: Vec<Value> = PRODUCT_NAMES
        .iter()
        .zip(1_i64..)
        .map(|(name, id)| {
            json!({
                "id": id,
                "name": name,
                "description": format!("{name} for retail sale"),
                "price": format!("{}.50", id + 9),
                "image": format!("https://images.okd.example/{id}.png"),
            })
        })
        .collect();

    let page = query.page.unwrap_or(1);
    let results: Vec<Value> = all.iter().skip((page - 1) * 6).take(6).cloned().collect();
    let next = (page * 6 < all.len()).then(|| format!("inventory/products/?page={}", page + 1));
    Json(json!({"results": results, "next": next})).into_response()
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

async fn customers(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> Response {
    match party_for_token(&erp, &headers) {
        Ok(7) => {}
        Ok(_) => return (StatusCode::FORBIDDEN, Json(json!({"detail": "Forbidden."}))).into_response(),
        Err(rejection) => return rejection,
    }
    let needle = query.search.unwrap_or_default().to_lowercase();
    let parties: Vec<Value> = customer_parties()
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|party| {
            party["name"]
                .as_str()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .collect();
    Json(parties).into_response()
}

#[derive(Deserialize)]
struct OrdersQuery {
    party_id: Option<i64>,
}

async fn list_orders(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Query(query): Query<OrdersQuery>,
) -> Response {
    let caller = match party_for_token(&erp, &headers) {
        Ok(caller) => caller,
        Err(rejection) => return rejection,
    };
    let party_id = if caller == 7 { query.party_id } else { Some(caller) };
    let orders: Vec<Value> = erp
        .data()
        .orders
        .iter()
        .filter(|order| party_id.is_none_or(|id| order["party_id"] == id))
        .cloned()
        .collect();
    Json(orders).into_response()
}

async fn create_order(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    let items: Vec<Value> = body["items"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|mut item| {
            let name = item["product_id"]
                .as_i64()
                .and_then(|id| usize::try_from(id - 1).ok())
                .and_then(|index| PRODUCT_NAMES.get(index))
                .copied()
                .unwrap_or("Unknown");
            item["name"] = json!(name);
            item
        })
        .collect();

    let mut data = erp.data();
    let order = json!({
        "id": data.orders.len() + 1,
        "party_id": body["party_id"],
        "created_at": "2026-10-19T09:30:00Z",
        "delivery_address": body["delivery_address"],
        "status": "pending",
        "items": items,
        "payments": [],
    });
    data.orders.push(order.clone());
    (StatusCode::CREATED, Json(order)).into_response()
}

fn order_index(data: &ErpData, id: i64) -> Option<usize> {
    data.orders.iter().position(|order| order["id"] == id)
}

async fn order(State(erp): State<MockErp>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    let data = erp.data();
    match order_index(&data, id).and_then(|index| data.orders.get(index)) {
        Some(order) => Json(order.clone()).into_response(),
        None => not_found(),
    }
}

async fn update_status(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    let mut data = erp.data();
    if data.forbid_status_changes {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"detail": "You do not have permission to perform this action."})),
        )
            .into_response();
    }
    let Some(order) = order_index(&data, id).and_then(|index| data.orders.get_mut(index)) else {
        return not_found();
    };
    order["status"] = body["status"].clone();
    Json(order.clone()).into_response()
}

async fn record_payment(
    State(erp): State<MockErp>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = party_for_token(&erp, &headers) {
        return rejection;
    }
    let mut data = erp.data();
    let payment_id = data.next_payment_id;
    data.next_payment_id += 1;
    let Some(order) = order_index(&data, id).and_then(|index| data.orders.get_mut(index)) else {
        return not_found();
    };
    let payment = json!({
        "id": payment_id,
        "amount": body["amount"],
        "mode": body["mode"],
        "reference": body.get("reference").cloned().unwrap_or(Value::Null),
        "recorded_at": "2026-10-19T10:00:00Z",
    });
    if let Some(payments) = order["payments"].as_array_mut() {
        payments.push(payment);
    }
    (StatusCode::CREATED, Json(order.clone())).into_response()
}

// =============================================================================
// Test Context
// =============================================================================

/// A running mock ERP plus storefront.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub erp: MockErp,
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

impl TestContext {
    /// Start both servers with the default service worker strategy.
    pub async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    /// Start both servers, overriding storefront environment variables.
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Self {
        let erp = MockErp::new();
        let erp_addr = serve(erp.clone().router()).await;
        let erp_url = format!("http://{erp_addr}/");

        let config = StorefrontConfig::from_lookup(|key| {
            if let Some((_, value)) = overrides.iter().find(|(name, _)| *name == key) {
                return Some((*value).to_string());
            }
            match key {
                "STOREFRONT_BASE_URL" => Some("http://127.0.0.1".to_string()),
                "ERP_API_BASE_URL" => Some(erp_url.clone()),
                "STOREFRONT_AUTH_RATE_BURST" => Some("1000".to_string()),
                _ => None,
            }
        })
        .unwrap();
        let state = AppState::new(config).unwrap();
        let storefront_addr = serve(app(state)).await;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap();

        Self {
            client,
            base_url: format!("http://{storefront_addr}"),
            erp,
        }
    }

    /// Absolute storefront URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    /// Submit a form, following the redirect that answers it.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Log in and return the page the storefront lands on.
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_form("/auth/login", &[("email", email), ("password", password)])
            .await
    }

    /// Log in as a sales representative and select City Pharmacy.
    pub async fn login_rep_for_city_pharmacy(&self) {
        self.login(REP_EMAIL, PASSWORD).await;
        self.post_form("/customers/select", &[("party_id", "1")])
            .await;
    }
}

/// Path of a response's final URL, after redirects.
#[must_use]
pub fn final_path(response: &reqwest::Response) -> String {
    let url = response.url();
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}
