//! Session-related types.
//!
//! Types stored in the session for authentication state.

use ok_distributor_core::{PartyId, Role};
use serde::{Deserialize, Serialize};

use crate::erp::{ApiToken, AuthenticatedParty, Party};

/// Session-stored identity of the logged-in party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// ERP party ID.
    pub party_id: PartyId,
    /// Display name; the proprietor name once the profile has been saved.
    pub name: String,
    /// Email the party logged in with.
    pub email: String,
    pub role: Role,
    /// ERP token sent with every call.
    pub token: ApiToken,
}

impl CurrentUser {
    /// Build the session identity from a login response.
    ///
    /// `login_email` is used when the ERP does not echo the email back.
    #[must_use]
    pub fn from_login(auth: AuthenticatedParty, login_email: &str) -> Self {
        Self {
            party_id: auth.party.id,
            name: auth.party.name,
            email: auth
                .party
                .email
                .unwrap_or_else(|| login_email.trim().to_string()),
            role: auth.party.role,
            token: auth.token,
        }
    }

    /// Whether this party orders on behalf of customers.
    #[must_use]
    pub const fn is_sales_rep(&self) -> bool {
        self.role.acts_for_customers()
    }
}

/// The customer a sales representative is currently acting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedCustomer {
    pub party_id: PartyId,
    pub name: String,
    pub address: String,
}

impl From<&Party> for SelectedCustomer {
    fn from(party: &Party) -> Self {
        Self {
            party_id: party.id,
            name: party.name.clone(),
            address: party.address.clone(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in party.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the bid-priced cart.
    pub const CART: &str = "cart";

    /// Key for the customer a sales representative acts for.
    pub const SELECTED_CUSTOMER: &str = "selected_customer";

    /// Key for pending toast messages.
    pub const FLASHES: &str = "flashes";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn login_response(email: Option<&str>, role: &str) -> AuthenticatedParty {
        serde_json::from_value(serde_json::json!({
            "token": "abc123",
            "party": {"id": 12, "name": "City Pharmacy", "email": email, "role": role}
        }))
        .unwrap()
    }

    #[test]
    fn test_from_login_prefers_erp_email() {
        let user = CurrentUser::from_login(
            login_response(Some("owner@citypharmacy.example"), "customer"),
            "typed@example.com",
        );
        assert_eq!(user.email, "owner@citypharmacy.example");
        assert!(!user.is_sales_rep());
    }

    #[test]
    fn test_from_login_falls_back_to_typed_email() {
        let user = CurrentUser::from_login(login_response(None, "sales_rep"), " rep@okd.example ");
        assert_eq!(user.email, "rep@okd.example");
        assert!(user.is_sales_rep());
    }

    #[test]
    fn test_debug_hides_token() {
        let user = CurrentUser::from_login(login_response(None, "customer"), "a@b.example");
        assert!(!format!("{user:?}").contains("abc123"));
    }
}
