//! Shared types for the inventory stock ledger.

mod types;

pub use types::{ProductId, UserId};
