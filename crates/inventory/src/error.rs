//! Error taxonomy for reservation engine operations.

use stock_store::StoreError;
use thiserror::Error;

use crate::ProductId;

/// Errors that can occur during inventory operations.
///
/// Business-rule failures (`InsufficientStock`, `OverRelease`, `OverConfirm`,
/// `WouldUnderflow`) reflect real state facts read inside the operation's
/// atomic unit; they are surfaced to the caller and must not be retried.
/// Only [`InventoryError::Conflict`] signals transient contention.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The referenced product has no stock aggregate.
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    /// A non-positive quantity was supplied to an operation requiring a
    /// positive one.
    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The reservation asks for more than is available.
    #[error("Insufficient stock. Available: {available}, Requested: {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// The release asks for more than is currently reserved.
    #[error("Cannot release {requested}. Only {reserved} reserved.")]
    OverRelease { reserved: i64, requested: i64 },

    /// The sale confirms more than is currently reserved. A sale only
    /// converts previously reserved units; it never deducts free stock.
    #[error("Cannot confirm sale of {requested}. Only {reserved} reserved.")]
    OverConfirm { reserved: i64, requested: i64 },

    /// The adjustment would drive on-hand stock negative.
    #[error("Cannot reduce stock below 0. Current: {current}, Adjustment: {delta}")]
    WouldUnderflow { current: i64, delta: i64 },

    /// Persistent write contention: the optimistic commit loop exhausted
    /// its attempts. Callers may retry a bounded number of times.
    #[error("Concurrent stock updates on product {product_id} exhausted {attempts} commit attempts")]
    Conflict { product_id: ProductId, attempts: u32 },

    /// An error occurred in the stock store.
    #[error("Stock store error: {0}")]
    Store(StoreError),
}

impl InventoryError {
    /// Whether the caller may retry the operation as-is.
    ///
    /// Only contention is retriable; every other failure is either a
    /// caller-input error or a true statement about the current counters.
    pub fn is_retriable(&self) -> bool {
        match self {
            InventoryError::Conflict { .. } => true,
            InventoryError::Store(e) => e.is_retriable(),
            _ => false,
        }
    }
}

impl From<StoreError> for InventoryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AggregateNotFound(product_id) => InventoryError::NotFound(product_id),
            other => InventoryError::Store(other),
        }
    }
}
