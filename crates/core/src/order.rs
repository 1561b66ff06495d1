//! Order totals and payment rules.

use crate::types::Price;

/// Errors raised when validating a payment against an order.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Amount was zero or negative.
    #[error("Payment amount must be greater than zero.")]
    NonPositive,
    /// Amount exceeds what is still owed.
    #[error("Payment of {amount} exceeds the outstanding balance of {balance}.")]
    ExceedsBalance { amount: Price, balance: Price },
    /// Order is already settled.
    #[error("This order has already been paid in full.")]
    AlreadySettled,
}

/// Totals derived from an order's lines and payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    /// Sum of bid price times quantity over all lines.
    pub total: Price,
    /// Sum of recorded payments.
    pub paid: Price,
    /// What is still owed, never below zero.
    pub balance: Price,
}

impl OrderTotals {
    /// Compute totals from `(bid_price, quantity)` lines and payment amounts.
    ///
    /// Returns `None` when a line or running sum overflows the decimal range.
    pub fn compute(
        lines: impl IntoIterator<Item = (Price, u32)>,
        payments: impl IntoIterator<Item = Price>,
    ) -> Option<Self> {
        let total = lines
            .into_iter()
            .try_fold(Price::ZERO, |total, (bid, qty)| {
                total.checked_add(bid.checked_mul(qty)?)
            })?;
        let paid = Price::checked_sum(payments)?;
        Some(Self {
            total,
            paid,
            balance: total.saturating_sub(paid),
        })
    }

    /// Whether nothing remains to be paid.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.balance.is_positive()
    }

    /// Check that `amount` can be recorded against this order.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError`] if the amount is not positive, the order is
    /// settled, or the amount is larger than the balance.
    pub fn validate_payment(&self, amount: Price) -> Result<(), PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::NonPositive);
        }
        if self.is_settled() {
            return Err(PaymentError::AlreadySettled);
        }
        if amount > self.balance {
            return Err(PaymentError::ExceedsBalance {
                amount,
                balance: self.balance,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn totals(paid: &[i64]) -> OrderTotals {
        OrderTotals::compute(
            [(Price::from_cents(950), 2), (Price::from_cents(1100), 3)],
            paid.iter().copied().map(Price::from_cents),
        )
        .unwrap()
    }

    #[test]
    fn test_compute() {
        let t = totals(&[1000, 500]);
        assert_eq!(t.total, Price::from_cents(5200));
        assert_eq!(t.paid, Price::from_cents(1500));
        assert_eq!(t.balance, Price::from_cents(3700));
        assert!(!t.is_settled());
    }

    #[test]
    fn test_overflowing_amounts_yield_none() {
        let huge = Price::parse("50000000000000000000000000000").unwrap();
        assert_eq!(OrderTotals::compute([(huge, 2)], core::iter::empty()), None);
        assert_eq!(
            OrderTotals::compute([(Price::from_cents(100), 1)], [huge, huge]),
            None
        );
    }

    #[test]
    fn test_overpaid_balance_is_zero() {
        let t = totals(&[6000]);
        assert_eq!(t.balance, Price::ZERO);
        assert!(t.is_settled());
    }

    #[test]
    fn test_validate_payment() {
        let t = totals(&[5000]);
        assert_eq!(t.validate_payment(Price::from_cents(200)), Ok(()));
        assert_eq!(t.validate_payment(Price::ZERO), Err(PaymentError::NonPositive));
        assert_eq!(
            t.validate_payment(Price::from_cents(201)),
            Err(PaymentError::ExceedsBalance {
                amount: Price::from_cents(201),
                balance: Price::from_cents(200),
            })
        );
        assert_eq!(
            totals(&[5200]).validate_payment(Price::from_cents(1)),
            Err(PaymentError::AlreadySettled)
        );
    }
}
