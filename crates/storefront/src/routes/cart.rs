//! Cart route handlers.
//!
//! The cart lives in the session until the order is placed. Lines are keyed
//! by product and bid, so every form posts both back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use ok_distributor_core::cart::{Cart, CartError, CartLine, INVALID_LINE_MESSAGE, MAX_BID_CENTS};
use ok_distributor_core::{Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::erp::{ErpError, NewOrder, NewOrderItem};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{ActingFor, OptionalAuth};
use crate::models::{Flash, flash, session_keys};
use crate::routes::layout::Layout;
use crate::state::AppState;

const BLANK_ADDRESS: &str = "Please enter a delivery address.";
const EMPTY_CART: &str = "Your cart is empty.";

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub standard_price: Price,
    pub bid_price: Price,
    /// Bid as posted back by the line's forms.
    pub bid_value: String,
    pub quantity: u32,
    /// Missing only if the line's amount cannot be represented.
    pub subtotal: Option<Price>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product.product_id,
            name: line.product.name.clone(),
            image_url: line.product.image_url.clone(),
            standard_price: line.product.standard_price,
            bid_price: line.bid_price,
            bid_value: line.bid_price.to_input_value(),
            quantity: line.quantity,
            subtotal: line.subtotal(),
        }
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session, or an empty one.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Store the cart in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CART, cart).await
}

/// Remove the cart from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_cart(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Cart>(session_keys::CART).await?;
    Ok(())
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: String,
    pub bid_price: String,
    /// Catalog search to return to.
    #[serde(default)]
    pub q: String,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub bid_price: String,
    pub quantity: String,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
    pub bid_price: String,
}

/// Place order form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub delivery_address: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub lines: Vec<CartLineView>,
    pub total: Option<Price>,
    pub item_count: u32,
    /// Whose order this is, shown to sales representatives.
    pub party_name: String,
    pub on_behalf: bool,
    pub delivery_address: String,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(session, acting), fields(party_id = %acting.party_id))]
pub async fn show(session: Session, acting: ActingFor) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    let ActingFor {
        user,
        party_name,
        address,
        ..
    } = acting;
    let on_behalf = user.is_sales_rep();

    CartShowTemplate {
        layout: Layout::load(&session, Some(user)).await,
        lines: cart.lines().iter().map(CartLineView::from).collect(),
        total: cart.total(),
        item_count: cart.item_count(),
        party_name,
        on_behalf,
        delivery_address: address.unwrap_or_default(),
    }
}

/// Add a product to the cart at a bid price.
#[instrument(skip(state, session, acting))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    acting: ActingFor,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect, AppError> {
    let back = if form.q.trim().is_empty() {
        "/catalog".to_string()
    } else {
        format!("/catalog?q={}", urlencoding::encode(form.q.trim()))
    };

    let (Ok(quantity), Ok(bid)) = (
        form.quantity.trim().parse::<i64>(),
        Price::parse(&form.bid_price),
    ) else {
        flash::push(&session, Flash::error(INVALID_LINE_MESSAGE)).await;
        return Ok(Redirect::to(&back));
    };

    let products = state.erp().products(&acting.user.token).await?;
    let Some(product) = products.iter().find(|p| p.id == form.product_id) else {
        flash::push(&session, Flash::error("That product is no longer available.")).await;
        return Ok(Redirect::to(&back));
    };

    let mut cart = load_cart(&session).await;
    match cart.add(product.snapshot(), quantity, bid) {
        Ok(_) => {
            save_cart(&session, &cart).await?;
            let product_id = product.id.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            flash::push(
                &session,
                Flash::success(format!(
                    "{quantity} of {} added to cart with a bid of {bid} each!",
                    product.name
                )),
            )
            .await;
        }
        Err(CartError::BidTooLarge(_)) => {
            let max = Price::from_cents(MAX_BID_CENTS);
            flash::push(
                &session,
                Flash::error(format!("Bid price cannot be more than {max}.")),
            )
            .await;
        }
        Err(e) => {
            tracing::debug!("Rejected cart line: {e}");
            flash::push(&session, Flash::error(INVALID_LINE_MESSAGE)).await;
        }
    }

    Ok(Redirect::to(&back))
}

/// Change a line's quantity (clamped to at least 1).
#[instrument(skip(session, _acting))]
pub async fn update(
    session: Session,
    _acting: ActingFor,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    let Ok(bid) = Price::parse(&form.bid_price) else {
        return Ok(Redirect::to("/cart"));
    };
    let quantity = form.quantity.trim().parse::<i64>().unwrap_or(1);

    let mut cart = load_cart(&session).await;
    if cart.update_quantity(form.product_id, bid, quantity).is_ok() {
        save_cart(&session, &cart).await?;
    } else {
        flash::push(&session, Flash::error("That item is no longer in your cart.")).await;
    }
    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(session, _acting))]
pub async fn remove(
    session: Session,
    _acting: ActingFor,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect, AppError> {
    if let Ok(bid) = Price::parse(&form.bid_price) {
        let mut cart = load_cart(&session).await;
        if cart.remove(form.product_id, bid) {
            save_cart(&session, &cart).await?;
        }
    }
    Ok(Redirect::to("/cart"))
}

/// Cart count badge (fragment).
pub async fn count(session: Session, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    let count = match user {
        Some(_) => load_cart(&session).await.item_count(),
        None => 0,
    };
    CartCountTemplate { count }
}

/// Place the order for the acting party.
#[instrument(skip(state, session, acting, form), fields(party_id = %acting.party_id))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    acting: ActingFor,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        flash::push(&session, Flash::error(EMPTY_CART)).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let delivery_address = form.delivery_address.trim();
    if delivery_address.is_empty() {
        flash::push(&session, Flash::error(BLANK_ADDRESS)).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let order = NewOrder {
        party_id: acting.party_id,
        delivery_address: delivery_address.to_string(),
        items: cart
            .lines()
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product.product_id,
                quantity: line.quantity,
                bid_price: line.bid_price,
            })
            .collect(),
    };

    match state.erp().place_order(&acting.user.token, &order).await {
        Ok(placed) => {
            clear_cart(&session).await?;
            tracing::info!(order_id = %placed.id, "Order placed");
            flash::push(
                &session,
                Flash::success(format!(
                    "Order placed successfully! Your items will be delivered to: {delivery_address}. Thank you for your purchase!"
                )),
            )
            .await;
            Ok(Redirect::to("/orders").into_response())
        }
        Err(ErpError::Unauthorized) => Err(ErpError::Unauthorized.into()),
        Err(e) => {
            let message = e.validation_message().unwrap_or_else(|| {
                tracing::error!("Failed to place order: {e}");
                "We could not place your order. Please try again.".to_string()
            });
            flash::push(&session, Flash::error(message)).await;
            Ok(Redirect::to("/cart").into_response())
        }
    }
}
