//! Reservation engine and query service for the inventory stock ledger.
//!
//! Sits on top of a [`StockStore`](stock_store::StockStore) and exposes the
//! five stock operations (reserve, release, confirm sale, adjust, low-stock
//! listing) plus the read queries. Business rules live in [`levels`] as pure
//! transitions; [`service`] wires them into atomic optimistic commits;
//! [`replay`] folds the ledger back into counters for auditing.

pub mod error;
pub mod levels;
pub mod query;
pub mod replay;
pub mod service;
pub mod view;

pub use common::{ProductId, UserId};
pub use error::InventoryError;
pub use levels::{StockLevels, Transition};
pub use service::InventoryService;
pub use view::{StockInfo, StockOperationResult};
