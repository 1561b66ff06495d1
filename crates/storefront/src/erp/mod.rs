//! REST client for the distributor ERP.
//!
//! # Architecture
//!
//! - The ERP is the source of truth for parties, products and orders. The
//!   storefront keeps nothing but the visitor's session.
//! - Every call after login carries `Authorization: Token <token>`.
//! - The product list is cached in memory via `moka`.
//! - Error bodies follow the Django REST framework shape: either
//!   `{"detail": "..."}` or a map of field name to a list of messages.
//!
//! # Example
//!
//! ```rust,ignore
//! use ok_distributor_storefront::erp::ErpClient;
//!
//! let erp = ErpClient::new(&config.erp)?;
//! let session = erp.login("owner@pharmacy.example", &password).await?;
//! let products = erp.products(&session.token).await?;
//! ```

mod client;
pub mod types;

pub use client::ErpClient;
pub use types::*;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to the ERP.
#[derive(Debug, Error)]
pub enum ErpError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Token missing, expired or rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Valid token, but the ERP refuses this action for the party.
    #[error("Forbidden: {}", .0.join("; "))]
    Forbidden(Vec<String>),

    /// The ERP rejected the request body.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Resource not found.
    #[error("Not found")]
    NotFound,

    /// Too many requests.
    #[error("Rate limited")]
    RateLimited,

    /// Any other unsuccessful status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ErpError {
    /// Build the error for an unsuccessful response.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden(body_messages(body)),
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Self::Validation(body_messages(body))
            }
            _ => Self::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            },
        }
    }

    /// Build the error for an unsuccessful login.
    ///
    /// Rejected credentials are reported in `non_field_errors`; field errors
    /// on a login form are not shown, so only those messages are kept.
    #[must_use]
    pub fn from_login_response(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let mut messages = Vec::new();
                if let Some(errors) = serde_json::from_str::<Value>(body)
                    .ok()
                    .as_ref()
                    .and_then(|value| value.get("non_field_errors"))
                {
                    collect(errors, &mut messages);
                }
                Self::Validation(messages)
            }
            _ => Self::from_response(status, body),
        }
    }

    /// Messages the ERP attached to a rejection, joined for display, or
    /// `None` for other errors.
    #[must_use]
    pub fn validation_message(&self) -> Option<String> {
        match self {
            Self::Validation(messages) | Self::Forbidden(messages) if !messages.is_empty() => {
                Some(messages.join("\n"))
            }
            _ => None,
        }
    }

    /// The first validation message, if any.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        match self {
            Self::Validation(messages) => messages.first().map(String::as_str),
            _ => None,
        }
    }

    /// Whether the failure came from the ERP being unreachable or broken.
    #[must_use]
    pub const fn is_upstream_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::InvalidUrl(_) | Self::Status { .. } | Self::Parse(_)
        )
    }
}

fn body_messages(body: &str) -> Vec<String> {
    serde_json::from_str::<Value>(body)
        .map(|value| flatten_messages(&value))
        .unwrap_or_default()
}

/// Flatten an error body into display messages.
///
/// `detail` comes first, then `non_field_errors`, then every other field in
/// key order. Nested lists and objects are walked depth first.
#[must_use]
pub fn flatten_messages(body: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    match body {
        Value::Object(map) => {
            for key in ["detail", "non_field_errors"] {
                if let Some(value) = map.get(key) {
                    collect(value, &mut messages);
                }
            }
            let mut fields: Vec<_> = map
                .iter()
                .filter(|(key, _)| *key != "detail" && *key != "non_field_errors")
                .collect();
            fields.sort_by_key(|(key, _)| *key);
            for (_, value) in fields {
                collect(value, &mut messages);
            }
        }
        other => collect(other, &mut messages),
    }
    messages
}

fn collect(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect(item, out)),
        Value::Number(n) => out.push(n.to_string()),
        _ => {}
    }
}
