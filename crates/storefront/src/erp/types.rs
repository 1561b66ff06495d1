//! Request and response bodies exchanged with the ERP.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use ok_distributor_core::cart::ProductSnapshot;
use ok_distributor_core::catalog::Searchable;
use ok_distributor_core::order::OrderTotals;
use ok_distributor_core::{OrderId, OrderStatus, PartyId, PaymentId, PaymentMode, Price, ProductId, Role};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// Auth
// =============================================================================

/// Token issued by the ERP at login.
///
/// Kept in the server-side session. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken([REDACTED])")
    }
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedParty {
    pub token: ApiToken,
    pub party: PartySummary,
}

/// The logged-in party as described by the login response.
#[derive(Debug, Clone, Deserialize)]
pub struct PartySummary {
    pub id: PartyId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

/// New customer registration.
#[derive(Debug, Serialize)]
pub struct RegistrationRequest {
    /// Business name.
    pub name: String,
    /// Proprietor's name.
    pub proprietor: String,
    pub phone: String,
    pub email: String,
    /// Drug license number.
    pub license_no: String,
    pub license_expiry: NaiveDate,
    #[serde(serialize_with = "serialize_secret")]
    pub password: SecretString,
    pub address: String,
}

#[derive(Serialize)]
pub(crate) struct PasswordResetRequest<'a> {
    pub email: &'a str,
    pub new_password: &'a str,
}

/// `{"message": "..."}` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl MessageResponse {
    /// The message text, preferring `message` over `detail`.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        self.message
            .or(self.detail)
            .filter(|text| !text.trim().is_empty())
    }
}

fn serialize_secret<S, T>(secret: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: ExposeSecret<str>,
{
    serializer.serialize_str(secret.expose_secret())
}

// =============================================================================
// Profile
// =============================================================================

/// The logged-in party's business profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "name", default)]
    pub business_name: String,
    #[serde(rename = "proprietor", default)]
    pub proprietor_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub license_no: String,
    #[serde(default)]
    pub license_expiry: Option<NaiveDate>,
    #[serde(default, skip_serializing)]
    pub email: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as listed by `GET /inventory/products/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Standard unit price.
    pub price: Price,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

impl Product {
    /// What the cart keeps about this product.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            standard_price: self.price,
        }
    }
}

impl Searchable for Product {
    fn search_text(&self) -> &str {
        &self.name
    }
}

/// A list endpoint body: either a bare array or a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paged {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
    Bare(Vec<T>),
}

// =============================================================================
// Customers
// =============================================================================

/// A customer as listed for sales representatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
    #[serde(default)]
    pub proprietor: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /orders/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrder {
    pub party_id: PartyId,
    pub delivery_address: String,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub bid_price: Price,
}

/// An order with its lines and payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub party_id: PartyId,
    #[serde(default)]
    pub party_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery_address: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl Order {
    /// Total, paid and outstanding amounts, `None` if they overflow.
    #[must_use]
    pub fn totals(&self) -> Option<OrderTotals> {
        OrderTotals::compute(
            self.items.iter().map(|item| (item.bid_price, item.quantity)),
            self.payments.iter().map(|payment| payment.amount),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub quantity: u32,
    pub bid_price: Price,
}

impl OrderItem {
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        self.bid_price.checked_mul(self.quantity)
    }
}

/// A payment recorded against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub amount: Price,
    pub mode: PaymentMode,
    #[serde(default)]
    pub reference: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Body of `POST /orders/{id}/payments/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPayment {
    pub amount: Price,
    pub mode: PaymentMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// Body of `PATCH /orders/{id}/status/`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = ApiToken::new("9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b".to_string());
        assert_eq!(format!("{token:?}"), "ApiToken([REDACTED])");
        assert_eq!(
            serde_json::to_string(&token).unwrap(),
            "\"9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b\""
        );
    }

    #[test]
    fn test_login_response() {
        let body = r#"{
            "token": "abc123",
            "party": {"id": 7, "name": "Ravi Kumar", "email": "ravi@okd.example", "role": "salesman"}
        }"#;
        let auth: AuthenticatedParty = serde_json::from_str(body).unwrap();
        assert_eq!(auth.token.expose_secret(), "abc123");
        assert_eq!(auth.party.id, PartyId::new(7));
        assert_eq!(auth.party.role, Role::SalesRep);
    }

    #[test]
    fn test_role_defaults_to_customer() {
        let body = r#"{"token": "t", "party": {"id": 1, "name": "City Pharmacy"}}"#;
        let auth: AuthenticatedParty = serde_json::from_str(body).unwrap();
        assert_eq!(auth.party.role, Role::Customer);
    }

    #[test]
    fn test_registration_serializes_password() {
        let request = RegistrationRequest {
            name: "City Pharmacy".to_string(),
            proprietor: "Anita Rao".to_string(),
            phone: "9876543210".to_string(),
            email: "anita@citypharmacy.example".to_string(),
            license_no: "KA-20B-1234".to_string(),
            license_expiry: NaiveDate::from_ymd_opt(2027, 3, 31).unwrap(),
            password: SecretString::from("s3cret-pass"),
            address: "12 MG Road, Bengaluru".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["password"], "s3cret-pass");
        assert_eq!(json["license_expiry"], "2027-03-31");
        assert!(!format!("{request:?}").contains("s3cret-pass"));
    }

    #[test]
    fn test_listing_accepts_both_shapes() {
        let bare: Listing<Party> =
            serde_json::from_str(r#"[{"id": 1, "name": "City Pharmacy"}]"#).unwrap();
        assert!(matches!(bare, Listing::Bare(ref items) if items.len() == 1));

        let paged: Listing<Party> = serde_json::from_str(
            r#"{"count": 3, "next": "http://erp/user/customers/?page=2", "results": [{"id": 2, "name": "Sunrise Medicals"}]}"#,
        )
        .unwrap();
        assert!(matches!(paged, Listing::Paged { next: Some(_), .. }));
    }

    #[test]
    fn test_product_accepts_string_and_number_prices() {
        let product: Product = serde_json::from_str(
            r#"{"id": 1, "name": "PainAway", "price": "9.99", "image": "https://img.example/p.png"}"#,
        )
        .unwrap();
        assert_eq!(product.price, Price::from_cents(999));
        assert_eq!(product.image_url.as_deref(), Some("https://img.example/p.png"));

        let product: Product =
            serde_json::from_str(r#"{"id": 2, "name": "CoughCalm", "price": 11.25}"#).unwrap();
        assert_eq!(product.price, Price::from_cents(1125));
        assert_eq!(product.snapshot().standard_price, Price::from_cents(1125));
    }

    #[test]
    fn test_order_totals() {
        let order: Order = serde_json::from_str(
            r#"{
                "id": 41, "party_id": 3, "created_at": "2026-10-01T09:30:00Z",
                "delivery_address": "12 MG Road", "status": "confirmed",
                "items": [
                    {"product_id": 1, "name": "PainAway", "quantity": 2, "bid_price": "9.50"},
                    {"product_id": 3, "name": "CoughCalm", "quantity": 3, "bid_price": "11.00"}
                ],
                "payments": [
                    {"id": 1, "amount": "20.00", "mode": "upi", "recorded_at": "2026-10-02T10:00:00Z"}
                ]
            }"#,
        )
        .unwrap();
        let totals = order.totals().unwrap();
        assert_eq!(totals.total, Price::from_cents(5200));
        assert_eq!(totals.balance, Price::from_cents(3200));
        assert_eq!(order.items[1].subtotal(), Some(Price::from_cents(3300)));
    }

    #[test]
    fn test_profile_patch_omits_email() {
        let profile = Profile {
            business_name: "City Pharmacy".to_string(),
            email: Some("anita@citypharmacy.example".to_string()),
            ..Profile::default()
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["name"], "City Pharmacy");
        assert!(json.get("email").is_none());
    }
}
