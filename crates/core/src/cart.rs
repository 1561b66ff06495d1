//! Bid-priced shopping cart.
//!
//! A cart line is identified by the pair `(product_id, bid_price)`: the same
//! product can sit in the cart several times at different bids. Adding a
//! product at a bid that is already present tops up that line instead.

use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Message shown when a quantity or bid fails validation.
pub const INVALID_LINE_MESSAGE: &str = "Please enter a valid quantity and bid price.";

/// Highest accepted bid, in cents ($10,000,000.00). Keeps every line
/// subtotal well inside the decimal range for any `u32` quantity.
pub const MAX_BID_CENTS: i64 = 1_000_000_000;

/// Errors raised by cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// Quantity was zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),
    /// Bid price was zero or negative.
    #[error("bid price must be greater than zero (got {0})")]
    InvalidBid(Price),
    /// Bid price above [`MAX_BID_CENTS`].
    #[error("bid price {0} is above the maximum of {max}", max = Price::from_cents(MAX_BID_CENTS))]
    BidTooLarge(Price),
    /// Quantity does not fit the cart's counter.
    #[error("quantity {0} is too large")]
    QuantityTooLarge(i64),
    /// No line with this product and bid exists.
    #[error("no cart line for product {0} at {1}")]
    LineNotFound(ProductId, Price),
}

/// The catalog data a cart line keeps about its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub standard_price: Price,
}

/// A single product at a single bid price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductSnapshot,
    pub bid_price: Price,
    pub quantity: u32,
}

impl CartLine {
    /// Bid price multiplied by quantity, `None` if not representable.
    #[must_use]
    pub fn subtotal(&self) -> Option<Price> {
        self.bid_price.checked_mul(self.quantity)
    }

    /// Whether this line has the given identity.
    #[must_use]
    pub fn is(&self, product_id: ProductId, bid_price: Price) -> bool {
        self.product.product_id == product_id && self.bid_price == bid_price
    }
}

/// Validate a requested quantity and bid before they touch the cart.
///
/// # Errors
///
/// Returns [`CartError`] when the quantity is not positive, does not fit a
/// `u32`, or the bid is not positive or above [`MAX_BID_CENTS`].
pub fn validate_line(quantity: i64, bid_price: Price) -> Result<(u32, Price), CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    let quantity = u32::try_from(quantity).map_err(|_| CartError::QuantityTooLarge(quantity))?;
    if !bid_price.is_positive() {
        return Err(CartError::InvalidBid(bid_price));
    }
    if bid_price > Price::from_cents(MAX_BID_CENTS) {
        return Err(CartError::BidTooLarge(bid_price));
    }
    Ok((quantity, bid_price))
}

/// The visitor's cart, kept in their session until the order is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` units of `product` at `bid_price`.
    ///
    /// Merges into an existing line with the same product and bid and
    /// returns that line's resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] if the quantity or bid is invalid.
    pub fn add(
        &mut self,
        product: ProductSnapshot,
        quantity: i64,
        bid_price: Price,
    ) -> Result<u32, CartError> {
        let (quantity, bid_price) = validate_line(quantity, bid_price)?;

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.is(product.product_id, bid_price))
        {
            line.quantity = line.quantity.saturating_add(quantity);
            return Ok(line.quantity);
        }

        self.lines.push(CartLine {
            product,
            bid_price,
            quantity,
        });
        Ok(quantity)
    }

    /// Set the quantity of a line, clamping anything below 1 to 1.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if no such line exists.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        bid_price: Price,
        quantity: i64,
    ) -> Result<(), CartError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| line.is(product_id, bid_price))
            .ok_or(CartError::LineNotFound(product_id, bid_price))?;
        line.quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        Ok(())
    }

    /// Remove a line. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: ProductId, bid_price: Price) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| !line.is(product_id, bid_price));
        self.lines.len() != before
    }

    /// Total number of units across all lines (the badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Sum of every line's bid subtotal, `None` if it overflows.
    #[must_use]
    pub fn total(&self) -> Option<Price> {
        self.lines
            .iter()
            .map(CartLine::subtotal)
            .try_fold(Price::ZERO, |total, subtotal| total.checked_add(subtotal?))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
