//! Per-page chrome shared by every full-page template.

use tower_sessions::Session;

use crate::models::{CurrentUser, Flash, SelectedCustomer, flash, session_keys};
use crate::routes::cart::load_cart;

/// Data `base.html` needs: who is logged in, pending toasts, the cart badge
/// and (for sales representatives) the customer being served.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    pub cart_count: u32,
    pub acting_for: Option<SelectedCustomer>,
}

impl Layout {
    /// Build the layout, consuming any queued toasts.
    pub async fn load(session: &Session, user: Option<CurrentUser>) -> Self {
        let flashes = flash::take(session).await;

        let Some(user) = user else {
            return Self {
                flashes,
                ..Self::default()
            };
        };

        let acting_for = if user.is_sales_rep() {
            session
                .get::<SelectedCustomer>(session_keys::SELECTED_CUSTOMER)
                .await
                .ok()
                .flatten()
        } else {
            None
        };

        Self {
            cart_count: load_cart(session).await.item_count(),
            user: Some(user),
            flashes,
            acting_for,
        }
    }

    /// Layout for pages rendered without a session, such as the offline shell.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn is_sales_rep(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_sales_rep)
    }

    /// Whether ordering pages (catalog, cart) are reachable.
    #[must_use]
    pub fn can_order(&self) -> bool {
        self.user.is_some() && (!self.is_sales_rep() || self.acting_for.is_some())
    }

    /// Name shown in the header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.name.as_str())
    }
}
