//! HTTP request handlers organized by domain
//!
//! Plain CRUD goes through the generic handlers in `records`; the other
//! submodules cover routes with their own shape.

pub mod analytics;
pub mod budgets;
pub mod chat;
pub mod goals;
pub mod receipts;
pub mod records;

// Re-export all handlers for use in router
pub use analytics::*;
pub use budgets::*;
pub use chat::*;
pub use goals::*;
pub use receipts::*;
pub use records::*;
