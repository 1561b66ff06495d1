//! Session-held models for the storefront.
//!
//! Nothing here is persisted by the storefront itself: every value lives in
//! the visitor's server-side session and is rebuilt from the ERP at login.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentUser, SelectedCustomer, keys as session_keys};
