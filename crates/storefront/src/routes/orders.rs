//! Order history and sales-representative order management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use ok_distributor_core::order::OrderTotals;
use ok_distributor_core::{OrderId, OrderStatus, PaymentMode, Price};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::erp::{ErpError, NewPayment, Order, OrderItem, Payment};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{ActingFor, RequireSalesRep};
use crate::models::{Flash, flash};
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Order display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub date: String,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub items: Vec<OrderItem>,
    pub payments: Vec<PaymentView>,
    /// Missing when the ERP's amounts overflow.
    pub totals: Option<OrderTotals>,
    /// Statuses a sales representative may move this order to.
    pub next_statuses: Vec<OrderStatus>,
    pub accepts_payment: bool,
    /// Render the details expanded.
    pub open: bool,
}

#[derive(Debug, Clone)]
pub struct PaymentView {
    pub date: String,
    pub amount: Price,
    pub mode: PaymentMode,
    pub reference: String,
}

impl From<&Payment> for PaymentView {
    fn from(payment: &Payment) -> Self {
        Self {
            date: payment.recorded_at.format("%d %b %Y").to_string(),
            amount: payment.amount,
            mode: payment.mode,
            reference: payment.reference.clone().unwrap_or_default(),
        }
    }
}

impl OrderView {
    fn new(order: Order, open: Option<OrderId>) -> Self {
        let totals = order.totals();
        if totals.is_none() {
            tracing::warn!(order_id = %order.id, "Order amounts overflow");
        }
        Self {
            id: order.id,
            date: order.created_at.format("%d %b %Y").to_string(),
            status: order.status,
            delivery_address: order.delivery_address,
            payments: order.payments.iter().map(PaymentView::from).collect(),
            items: order.items,
            totals,
            next_statuses: order.status.next_statuses(),
            accepts_payment: totals.is_some_and(|t| !t.is_settled())
                && order.status != OrderStatus::Cancelled,
            open: open == Some(order.id),
        }
    }

    /// Outstanding balance for the payment input's `max`.
    #[must_use]
    pub fn balance_input(&self) -> String {
        self.totals
            .map(|totals| totals.balance.to_input_value())
            .unwrap_or_default()
    }

    /// CSS modifier for the status badge.
    #[must_use]
    pub const fn status_class(&self) -> &'static str {
        self.status.as_str()
    }
}

/// Newest first, by order ID.
fn order_views(mut orders: Vec<Order>, open: Option<OrderId>) -> Vec<OrderView> {
    orders.sort_by(|a, b| b.id.cmp(&a.id));
    orders
        .into_iter()
        .map(|order| OrderView::new(order, open))
        .collect()
}

/// Orders page query parameters.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    /// Order to show expanded.
    pub open: Option<OrderId>,
}

/// Status update form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Payment form data.
#[derive(Debug, Deserialize)]
pub struct PaymentForm {
    pub amount: String,
    pub mode: String,
    #[serde(default)]
    pub reference: String,
}

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderView>,
    pub party_name: String,
    pub manage: bool,
    pub payment_modes: [PaymentMode; 4],
}

/// List orders for the acting party.
#[instrument(skip(state, session, acting), fields(party_id = %acting.party_id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    acting: ActingFor,
    Query(query): Query<OrdersQuery>,
) -> Result<OrdersTemplate> {
    let party_filter = acting.on_behalf().then_some(acting.party_id);
    let orders = state
        .erp()
        .orders(&acting.user.token, party_filter)
        .await?;

    let manage = acting.on_behalf();
    Ok(OrdersTemplate {
        orders: order_views(orders, query.open),
        party_name: acting.party_name,
        manage,
        payment_modes: PaymentMode::ALL,
        layout: Layout::load(&session, Some(acting.user)).await,
    })
}

fn back_to(id: OrderId) -> Redirect {
    Redirect::to(&format!("/orders?open={id}"))
}

/// Move an order to a new status.
#[instrument(skip(state, session, user))]
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireSalesRep(user): RequireSalesRep,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let Ok(next) = form.status.parse::<OrderStatus>() else {
        flash::push(&session, Flash::error("Please choose a valid status.")).await;
        return Ok(back_to(id));
    };

    let order = state.erp().order(&user.token, id).await?;
    if !order.status.can_transition_to(next) {
        flash::push(
            &session,
            Flash::error(format!(
                "Order #{id} is {} and cannot be marked {}.",
                order.status.label(),
                next.label()
            )),
        )
        .await;
        return Ok(back_to(id));
    }

    match state.erp().update_order_status(&user.token, id, next).await {
        Ok(updated) => {
            tracing::info!(order_id = %id, status = %updated.status, "Order status updated");
            flash::push(
                &session,
                Flash::success(format!("Order #{id} marked {}.", updated.status.label())),
            )
            .await;
        }
        Err(e) => flash_erp_failure(&session, e, "Could not update the order status.").await?,
    }
    Ok(back_to(id))
}

/// Record a payment against an order.
#[instrument(skip(state, session, user))]
pub async fn record_payment(
    State(state): State<AppState>,
    session: Session,
    RequireSalesRep(user): RequireSalesRep,
    Path(id): Path<OrderId>,
    Form(form): Form<PaymentForm>,
) -> Result<Redirect> {
    let Ok(amount) = Price::parse(&form.amount) else {
        flash::push(&session, Flash::error("Please enter a valid payment amount.")).await;
        return Ok(back_to(id));
    };
    let Ok(mode) = form.mode.parse::<PaymentMode>() else {
        flash::push(&session, Flash::error("Please choose a payment mode.")).await;
        return Ok(back_to(id));
    };

    let order = state.erp().order(&user.token, id).await?;
    let Some(totals) = order.totals() else {
        flash::push(
            &session,
            Flash::error(format!("Order #{id} amounts are too large to take payments.")),
        )
        .await;
        return Ok(back_to(id));
    };
    if let Err(e) = totals.validate_payment(amount) {
        flash::push(&session, Flash::error(e.to_string())).await;
        return Ok(back_to(id));
    }

    let reference = form.reference.trim();
    let payment = NewPayment {
        amount,
        mode,
        reference: (!reference.is_empty()).then(|| reference.to_string()),
    };

    match state.erp().record_payment(&user.token, id, &payment).await {
        Ok(_) => {
            tracing::info!(order_id = %id, "Payment recorded");
            flash::push(
                &session,
                Flash::success(format!("Payment of {amount} recorded for order #{id}.")),
            )
            .await;
        }
        Err(e) => flash_erp_failure(&session, e, "Could not record the payment.").await?,
    }
    Ok(back_to(id))
}

/// Toast a rejected change; expired sessions and outages still propagate.
async fn flash_erp_failure(
    session: &Session,
    error: ErpError,
    fallback: &str,
) -> std::result::Result<(), AppError> {
    match error {
        ErpError::Validation(_) | ErpError::Forbidden(_) | ErpError::NotFound => {
            let message = error
                .validation_message()
                .unwrap_or_else(|| fallback.to_string());
            flash::push(session, Flash::error(message)).await;
            Ok(())
        }
        other => Err(other.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(id: i64, status: &str, paid: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "party_id": 3,
            "created_at": "2026-10-01T09:30:00Z",
            "delivery_address": "12 MG Road",
            "status": status,
            "items": [{"product_id": 1, "name": "PainAway", "quantity": 2, "bid_price": "9.50"}],
            "payments": [{"id": 1, "amount": paid, "mode": "cash", "recorded_at": "2026-10-02T10:00:00Z"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_newest_first_and_open_flag() {
        let views = order_views(
            vec![order(3, "pending", "0.00"), order(9, "confirmed", "0.00")],
            Some(OrderId::new(3)),
        );
        assert_eq!(views.iter().map(|v| v.id.as_i64()).collect::<Vec<_>>(), vec![9, 3]);
        assert!(!views.first().unwrap().open);
        assert!(views.last().unwrap().open);
    }

    #[test]
    fn test_view_totals_and_actions() {
        let view = OrderView::new(order(4, "dispatched", "5.00"), None);
        let totals = view.totals.unwrap();
        assert_eq!(totals.total, Price::from_cents(1900));
        assert_eq!(totals.balance, Price::from_cents(1400));
        assert_eq!(view.balance_input(), "14.00");
        assert_eq!(view.date, "01 Oct 2026");
        assert!(view.accepts_payment);
        assert!(view.next_statuses.contains(&OrderStatus::Delivered));

        let settled = OrderView::new(order(5, "delivered", "19.00"), None);
        assert!(!settled.accepts_payment);
        assert!(settled.next_statuses.is_empty());
    }

    #[test]
    fn test_overflowing_amounts_render_without_totals() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 6,
            "party_id": 3,
            "created_at": "2026-10-01T09:30:00Z",
            "status": "pending",
            "items": [{"product_id": 1, "quantity": 4, "bid_price": "50000000000000000000000000000"}],
            "payments": []
        }))
        .unwrap();
        let view = OrderView::new(order, None);
        assert!(view.totals.is_none());
        assert!(!view.accepts_payment);
        assert_eq!(view.items.first().unwrap().subtotal(), None);
    }
}
