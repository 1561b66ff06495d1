//! Customer selection for sales representatives.
//!
//! A sales representative picks the customer they are ordering for; the
//! choice is kept in the session and every catalog, cart and order page acts
//! for that customer until it is cleared or replaced.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use ok_distributor_core::PartyId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::erp::Party;
use crate::error::Result;
use crate::filters;
use crate::middleware::RequireSalesRep;
use crate::models::{Flash, SelectedCustomer, flash, session_keys};
use crate::routes::cart::clear_cart;
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Customer search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CustomersQuery {
    pub q: Option<String>,
}

/// Select customer form data.
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub party_id: PartyId,
}

/// Customers page template.
#[derive(Template, WebTemplate)]
#[template(path = "customers/index.html")]
pub struct CustomersTemplate {
    pub layout: Layout,
    pub query: String,
    pub customers: Vec<Party>,
    pub selected: Option<PartyId>,
}

impl CustomersTemplate {
    /// Whether `party` is the customer currently being served.
    #[must_use]
    pub fn is_selected(&self, party: &Party) -> bool {
        self.selected == Some(party.id)
    }
}

async fn selected_customer(session: &Session) -> Option<SelectedCustomer> {
    session
        .get::<SelectedCustomer>(session_keys::SELECTED_CUSTOMER)
        .await
        .ok()
        .flatten()
}

/// List or search customers.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireSalesRep(user): RequireSalesRep,
    Query(query): Query<CustomersQuery>,
) -> Result<CustomersTemplate> {
    let q = query.q.unwrap_or_default();
    let search = Some(q.trim()).filter(|q| !q.is_empty());
    let mut customers = state.erp().customers(&user.token, search).await?;
    customers.sort_by_key(|party| party.name.to_lowercase());

    Ok(CustomersTemplate {
        selected: selected_customer(&session).await.map(|c| c.party_id),
        layout: Layout::load(&session, Some(user)).await,
        query: q,
        customers,
    })
}

/// Start acting for a customer.
///
/// The cart belongs to whoever was selected before, so switching to a
/// different customer empties it.
#[instrument(skip(state, session, user))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    RequireSalesRep(user): RequireSalesRep,
    Form(form): Form<SelectForm>,
) -> Result<Redirect> {
    let customers = state.erp().customers(&user.token, None).await?;
    let Some(party) = customers.iter().find(|party| party.id == form.party_id) else {
        flash::push(&session, Flash::error("Customer not found.")).await;
        return Ok(Redirect::to("/customers"));
    };

    let previous = selected_customer(&session).await;
    if previous.is_some_and(|c| c.party_id != party.id) {
        clear_cart(&session).await?;
    }

    let selected = SelectedCustomer::from(party);
    session
        .insert(session_keys::SELECTED_CUSTOMER, &selected)
        .await?;
    tracing::info!(customer_id = %selected.party_id, "Acting for customer");
    flash::push(
        &session,
        Flash::success(format!("Now ordering for {}.", selected.name)),
    )
    .await;
    Ok(Redirect::to("/catalog"))
}

/// Stop acting for the selected customer.
#[instrument(skip(session, _user))]
pub async fn clear(session: Session, RequireSalesRep(_user): RequireSalesRep) -> Result<Redirect> {
    session
        .remove::<SelectedCustomer>(session_keys::SELECTED_CUSTOMER)
        .await?;
    clear_cart(&session).await?;
    Ok(Redirect::to("/customers"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use ok_distributor_core::Role;

    use super::*;
    use crate::erp::ApiToken;
    use crate::models::CurrentUser;

    fn party(id: i64, name: &str) -> Party {
        Party {
            id: PartyId::new(id),
            name: name.to_string(),
            proprietor: String::new(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
        }
    }

    fn rep_layout() -> Layout {
        Layout {
            user: Some(CurrentUser {
                party_id: PartyId::new(7),
                name: "Ravi Kumar".to_string(),
                email: "rep@okd.example".to_string(),
                role: Role::SalesRep,
                token: ApiToken::new("rep-token".to_string()),
            }),
            ..Layout::anonymous()
        }
    }

    #[test]
    fn test_selected_customer_is_marked() {
        let page = CustomersTemplate {
            layout: rep_layout(),
            query: String::new(),
            customers: vec![party(1, "City Pharmacy"), party(2, "Green Cross Chemists")],
            selected: Some(PartyId::new(2)),
        };
        assert!(!page.is_selected(&party(1, "City Pharmacy")));
        assert!(page.is_selected(&party(2, "Green Cross Chemists")));

        let html = page.render().unwrap();
        assert_eq!(html.matches("customer--selected").count(), 1);
        let marked = html.find("customer--selected").unwrap();
        assert!(html[marked..].contains("Green Cross Chemists"));
        assert!(!html[marked..].contains("City Pharmacy"));
        assert!(html.contains("<span class=\"site-user\">Ravi Kumar</span>"));
    }

    #[test]
    fn test_nothing_marked_without_selection() {
        let html = CustomersTemplate {
            layout: rep_layout(),
            query: "green".to_string(),
            customers: vec![party(2, "Green Cross Chemists")],
            selected: None,
        }
        .render()
        .unwrap();
        assert!(!html.contains("customer--selected"));
        assert!(html.contains("value=\"green\""));
    }
}
