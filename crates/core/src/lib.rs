//! Ok Distributor Core - Shared domain types.
//!
//! This crate provides the types and rules shared by the storefront and its
//! tests:
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles and statuses
//! - [`cart`] - Bid-priced cart lines and the merge rules between them
//! - [`catalog`] - Name search and the infinite-scroll product window
//! - [`order`] - Order totals, balances and payment validation
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything that talks to the ERP lives in the storefront crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod types;

pub use types::*;
