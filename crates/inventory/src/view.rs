//! Fixed result views returned by the engine and query surface. Every
//! operation returns the same explicitly typed structures.

use serde::{Deserialize, Serialize};
use stock_store::{MovementRecord, StockAggregate};

use crate::ProductId;

/// Read view of a product's stock position, with the derived fields
/// callers actually branch on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInfo {
    pub product_id: ProductId,
    pub stock: i64,
    pub reserved_stock: i64,
    pub low_stock_threshold: i64,

    /// `stock - reserved_stock`; units sellable right now.
    pub available_stock: i64,

    /// Whether available stock is at or below the reorder threshold.
    pub is_low_stock: bool,
}

impl From<&StockAggregate> for StockInfo {
    fn from(aggregate: &StockAggregate) -> Self {
        Self {
            product_id: aggregate.product_id,
            stock: aggregate.stock,
            reserved_stock: aggregate.reserved_stock,
            low_stock_threshold: aggregate.low_stock_threshold,
            available_stock: aggregate.available_stock(),
            is_low_stock: aggregate.is_low_stock(),
        }
    }
}

/// Result of a successful engine mutation: the post-commit stock view and
/// the ledger entry that documented the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockOperationResult {
    pub stock: StockInfo,
    pub movement: MovementRecord,
}
