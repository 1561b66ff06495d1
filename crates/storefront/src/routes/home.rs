//! Landing redirect.

use axum::response::Redirect;

use crate::middleware::OptionalAuth;

/// Send visitors where their role starts: anonymous visitors to login,
/// customers to the catalog, sales representatives to customer selection.
pub async fn home(OptionalAuth(user): OptionalAuth) -> Redirect {
    match user {
        None => Redirect::to("/auth/login"),
        Some(user) if user.is_sales_rep() => Redirect::to("/customers"),
        Some(_) => Redirect::to("/catalog"),
    }
}
