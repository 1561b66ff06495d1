//! Catalog route handlers.
//!
//! The first page render shows the initial window of matching products.
//! `app.js` fetches `/catalog/more` as the visitor nears the end of the grid
//! and appends the returned cards; without JavaScript the same sentinel is a
//! link that re-renders the page with more products visible.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use ok_distributor_core::catalog::{LOAD_MORE_STEP, Window, filter_by_query};
use ok_distributor_core::{Price, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::erp::Product;
use crate::error::Result;
use crate::filters;
use crate::middleware::ActingFor;
use crate::routes::layout::Layout;
use crate::state::AppState;

/// Product card display data for templates.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    /// Bid field default, the standard price with two decimals.
    pub default_bid: String,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            default_bid: product.price.to_input_value(),
            image_url: product.image_url.clone(),
        }
    }
}

/// One rendered slice of the catalog plus what comes next.
#[derive(Debug, Clone)]
pub struct CardPage {
    pub cards: Vec<ProductCard>,
    /// Search query the add-to-cart forms return to.
    pub query: String,
    /// URL-encoded search query for follow-up links.
    pub query_param: String,
    /// Number of products visible once this slice is shown.
    pub next_offset: usize,
    /// `show` value of the no-JavaScript "Show more" link.
    pub show_more: usize,
    pub has_more: bool,
}

impl CardPage {
    fn build(products: &[Product], query: &str, window: impl FnOnce(usize) -> Window) -> Self {
        let filtered = filter_by_query(products, query);
        let window = window(filtered.len());
        Self {
            cards: window
                .apply(&filtered)
                .into_iter()
                .map(ProductCard::from)
                .collect(),
            query: query.trim().to_string(),
            query_param: urlencoding::encode(query.trim()).into_owned(),
            next_offset: window.visible(),
            show_more: window.visible() + LOAD_MORE_STEP,
            has_more: window.has_more(),
        }
    }
}

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    /// Products already shown when re-rendering without JavaScript.
    pub show: Option<usize>,
}

/// Load-more query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct MoreQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub offset: usize,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub layout: Layout,
    pub query: String,
    pub page: CardPage,
    pub empty_message: Option<String>,
}

/// Product cards fragment template (infinite scroll).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_cards.html")]
pub struct ProductCardsTemplate {
    pub page: CardPage,
}

/// Message shown when nothing matches.
fn empty_message(query: &str) -> String {
    let query = query.trim();
    if query.is_empty() {
        "No products available.".to_string()
    } else {
        format!("No products found for \"{query}\".")
    }
}

/// Display the catalog.
#[instrument(skip(state, session, acting), fields(party_id = %acting.party_id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    acting: ActingFor,
    Query(query): Query<CatalogQuery>,
) -> Result<CatalogTemplate> {
    let products = state.erp().products(&acting.user.token).await?;
    let q = query.q.unwrap_or_default();

    let page = CardPage::build(&products, &q, |total| match query.show {
        Some(show) => Window::first(show, total),
        None => Window::initial(total),
    });
    let empty_message = page.cards.is_empty().then(|| empty_message(&q));

    Ok(CatalogTemplate {
        layout: Layout::load(&session, Some(acting.user)).await,
        query: q,
        page,
        empty_message,
    })
}

/// Next slice of product cards (fragment).
#[instrument(skip(state, acting))]
pub async fn more(
    State(state): State<AppState>,
    acting: ActingFor,
    Query(query): Query<MoreQuery>,
) -> Result<ProductCardsTemplate> {
    let products = state.erp().products(&acting.user.token).await?;
    let q = query.q.unwrap_or_default();
    let page = CardPage::build(&products, &q, |total| Window::after(query.offset, total));
    Ok(ProductCardsTemplate { page })
}
