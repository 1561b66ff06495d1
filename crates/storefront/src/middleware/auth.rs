//! Authentication extractors.
//!
//! The ERP owns authentication; the storefront only remembers who logged in.
//! These extractors read that identity from the session and decide where a
//! visitor without the right role or context is sent.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use ok_distributor_core::PartyId;
use tower_sessions::Session;

use crate::models::{CurrentUser, SelectedCustomer, session_keys};

/// Header `app.js` sets on background fetches.
pub const FETCH_HEADER: &str = "x-requested-with";

/// Extractor that requires a logged-in party.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Why an extractor refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for page requests).
    RedirectToLogin,
    /// Unauthorized response (for background fetches).
    Unauthorized,
    /// Logged in, but the page needs a different role or context.
    RedirectTo(&'static str),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::RedirectTo(path) => Redirect::to(path).into_response(),
        }
    }
}

fn is_background_fetch(parts: &Parts) -> bool {
    parts
        .headers
        .get(FETCH_HEADER)
        .is_some_and(|value| value == "fetch")
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts).await.map(Self).ok_or_else(|| {
            if is_background_fetch(parts) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        })
    }
}

/// Extractor that optionally gets the current party.
///
/// Unlike `RequireAuth`, this does not reject anonymous visitors.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a logged-in sales representative.
///
/// Customers are sent back to the catalog.
pub struct RequireSalesRep(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireSalesRep
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if user.is_sales_rep() {
            Ok(Self(user))
        } else if is_background_fetch(parts) {
            Err(AuthRejection::Unauthorized)
        } else {
            Err(AuthRejection::RedirectTo("/catalog"))
        }
    }
}

/// The logged-in party plus the party orders are placed for.
///
/// Customers act for themselves. Sales representatives act for the customer
/// they selected; without one they are sent to customer selection.
pub struct ActingFor {
    pub user: CurrentUser,
    pub party_id: PartyId,
    pub party_name: String,
    /// Address on file for the selected customer, used to prefill checkout.
    pub address: Option<String>,
}

impl ActingFor {
    /// Resolve the acting party for `user`.
    #[must_use]
    pub fn resolve(user: CurrentUser, selected: Option<SelectedCustomer>) -> Option<Self> {
        if !user.is_sales_rep() {
            return Some(Self {
                party_id: user.party_id,
                party_name: user.name.clone(),
                address: None,
                user,
            });
        }
        selected.map(|customer| Self {
            party_id: customer.party_id,
            party_name: customer.name,
            address: Some(customer.address).filter(|a| !a.trim().is_empty()),
            user,
        })
    }

    /// Whether the order is placed on someone else's behalf.
    #[must_use]
    pub const fn on_behalf(&self) -> bool {
        self.user.is_sales_rep()
    }
}

impl<S> FromRequestParts<S> for ActingFor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        let selected = match parts.extensions.get::<Session>() {
            Some(session) if user.is_sales_rep() => session
                .get::<SelectedCustomer>(session_keys::SELECTED_CUSTOMER)
                .await
                .ok()
                .flatten(),
            _ => None,
        };

        let background = is_background_fetch(parts);
        Self::resolve(user, selected).ok_or(if background {
            AuthRejection::Unauthorized
        } else {
            AuthRejection::RedirectTo("/customers")
        })
    }
}

/// Helper to set the current party in the session.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current party and everything tied to it (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ok_distributor_core::Role;

    use super::*;
    use crate::erp::ApiToken;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            party_id: PartyId::new(5),
            name: "Ravi Kumar".to_string(),
            email: "ravi@okd.example".to_string(),
            role,
            token: ApiToken::new("t".to_string()),
        }
    }

    fn selected() -> SelectedCustomer {
        SelectedCustomer {
            party_id: PartyId::new(42),
            name: "City Pharmacy".to_string(),
            address: "12 MG Road".to_string(),
        }
    }

    #[test]
    fn test_customer_acts_for_self() {
        let acting = ActingFor::resolve(user(Role::Customer), Some(selected())).unwrap();
        assert_eq!(acting.party_id, PartyId::new(5));
        assert!(!acting.on_behalf());
        assert!(acting.address.is_none());
    }

    #[test]
    fn test_sales_rep_needs_selection() {
        assert!(ActingFor::resolve(user(Role::SalesRep), None).is_none());

        let acting = ActingFor::resolve(user(Role::SalesRep), Some(selected())).unwrap();
        assert_eq!(acting.party_id, PartyId::new(42));
        assert_eq!(acting.party_name, "City Pharmacy");
        assert_eq!(acting.address.as_deref(), Some("12 MG Road"));
        assert!(acting.on_behalf());
    }

    #[test]
    fn test_rejection_responses() {
        let response = AuthRejection::RedirectTo("/customers").into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/customers");
        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
