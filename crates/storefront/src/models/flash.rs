//! One-shot toast messages carried across a redirect.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

/// Toast styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// A toast shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// CSS modifier class for the toast.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "toast--success",
            FlashKind::Error => "toast--error",
        }
    }

    /// Message split into lines, for multi-line validation errors.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.message.lines().filter(|line| !line.trim().is_empty())
    }
}

/// Queue a toast for the next page render.
pub async fn push(session: &Session, flash: Flash) {
    let mut pending = session
        .get::<Vec<Flash>>(keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);
    if let Err(e) = session.insert(keys::FLASHES, pending).await {
        tracing::error!("Failed to store flash message: {e}");
    }
}

/// Take every queued toast, leaving none behind.
pub async fn take(session: &Session) -> Vec<Flash> {
    session
        .remove::<Vec<Flash>>(keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
