//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Page handlers that can recover turn ERP
//! failures into toasts instead; everything else returns `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::erp::ErpError;

/// Where a visitor is sent when the ERP rejects their token.
pub const SESSION_EXPIRED_PATH: &str = "/auth/login?expired=1";

/// Shown when the ERP refuses an action without saying why.
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to do that.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// ERP call failed.
    #[error("ERP error: {0}")]
    Erp(#[from] ErpError),

    /// Session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is our fault (or the ERP's) rather than the client's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Erp(err) => err.is_upstream_failure(),
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => true,
            Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Erp(err) => match err {
                ErpError::Unauthorized => return Redirect::to(SESSION_EXPIRED_PATH).into_response(),
                ErpError::Forbidden(_) => StatusCode::FORBIDDEN,
                ErpError::NotFound => StatusCode::NOT_FOUND,
                ErpError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ErpError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ErpError::Http(_)
                | ErpError::InvalidUrl(_)
                | ErpError::Status { .. }
                | ErpError::Parse(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Erp(ErpError::Validation(messages) | ErpError::Forbidden(messages))
                if !messages.is_empty() =>
            {
                messages.join("\n")
            }
            Self::Erp(ErpError::Forbidden(_)) => FORBIDDEN_MESSAGE.to_string(),
            Self::Erp(ErpError::NotFound) => "Not found".to_string(),
            Self::Erp(ErpError::RateLimited) => "Too many requests, please try again".to_string(),
            Self::Erp(_) => "The ordering service is unavailable. Please try again.".to_string(),
            Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(why) => why.clone(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
