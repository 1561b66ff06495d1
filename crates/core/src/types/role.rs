//! Party roles as reported by the ERP at login.

use serde::{Deserialize, Serialize};

/// Who is using the storefront.
///
/// Customers order for themselves. Sales representatives pick a customer
/// first and place and manage orders on that customer's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A retail customer (pharmacy, clinic or shop).
    #[default]
    Customer,
    /// A distributor employee acting for customers.
    #[serde(alias = "salesman", alias = "sales_representative")]
    SalesRep,
}

impl Role {
    /// Whether this role acts on behalf of other parties.
    #[must_use]
    pub const fn acts_for_customers(self) -> bool {
        matches!(self, Self::SalesRep)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::SalesRep => "Sales Representative",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::SalesRep => write!(f, "sales_rep"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_aliases() {
        let role: Role = serde_json::from_str("\"salesman\"").unwrap();
        assert_eq!(role, Role::SalesRep);
        let role: Role = serde_json::from_str("\"customer\"").unwrap();
        assert_eq!(role, Role::Customer);
    }

    #[test]
    fn test_acts_for_customers() {
        assert!(Role::SalesRep.acts_for_customers());
        assert!(!Role::Customer.acts_for_customers());
    }
}
