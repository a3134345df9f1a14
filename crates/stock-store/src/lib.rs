//! Stock aggregate store and append-only movement ledger.
//!
//! This crate owns persistence for the inventory stock ledger:
//! - [`StockAggregate`] — the per-product mutable counters
//! - [`MovementRecord`] — the immutable audit trail of every stock change
//! - [`StockStore`] — the trait tying the two together: every counter
//!   mutation commits atomically with the ledger entry documenting it
//!
//! Two implementations are provided: [`PostgresStockStore`] for production
//! and [`InMemoryStockStore`] for tests and benchmarks.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod memory;
pub mod movement;
pub mod postgres;
pub mod store;

pub use aggregate::{NewStockAggregate, StockAggregate, Version};
pub use common::{ProductId, UserId};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryStockStore;
pub use movement::{MovementId, MovementRecord, MovementType, NewMovement, UnknownMovementType};
pub use postgres::PostgresStockStore;
pub use store::{DEFAULT_HISTORY_LIMIT, MovementStream, StockCommit, StockStore, validate_commit};
