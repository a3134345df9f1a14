use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{
    MovementRecord, NewMovement, NewStockAggregate, ProductId, Result, StockAggregate, Version,
};

/// Default number of movements returned by history reads.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One atomic unit of work against a product's counters and its ledger.
///
/// The new counter values are absolute (not deltas): the caller read the
/// aggregate at `expected_version`, validated the change against that state,
/// and the store applies it only if no other writer committed in between.
#[derive(Debug, Clone)]
pub struct StockCommit {
    /// The product whose counters are updated.
    pub product_id: ProductId,

    /// The aggregate version the caller read. The commit fails with
    /// `VersionConflict` if the row has moved on.
    pub expected_version: Version,

    /// New value for `stock`.
    pub stock: i64,

    /// New value for `reserved_stock`.
    pub reserved_stock: i64,

    /// The ledger entry documenting the change, appended in the same
    /// transaction as the counter update.
    pub movement: NewMovement,
}

/// A stream of movement records, oldest first.
pub type MovementStream = Pin<Box<dyn Stream<Item = Result<MovementRecord>> + Send>>;

/// Core trait for stock store implementations.
///
/// A stock store owns the per-product counters and the append-only movement
/// ledger, and guarantees the two change together or not at all. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Creates the aggregate row for a new product.
    ///
    /// Called by the catalog collaborator when a product is registered.
    /// Fails with `AggregateExists` if the product already has counters.
    async fn create_aggregate(&self, new: NewStockAggregate) -> Result<StockAggregate>;

    /// Reads the latest committed counters for a product.
    ///
    /// Returns None if the product has no aggregate. Never takes the
    /// mutation path's version into account; this is a plain read.
    async fn get_aggregate(&self, product_id: ProductId) -> Result<Option<StockAggregate>>;

    /// Reads the latest committed counters for every active product.
    async fn list_active_aggregates(&self) -> Result<Vec<StockAggregate>>;

    /// Atomically applies a counter update and appends its movement.
    ///
    /// Either both the aggregate mutation and the ledger append commit, or
    /// neither does. Fails with `VersionConflict` if another writer
    /// committed against the same product since the caller's read, and with
    /// `AggregateNotFound` if the row does not exist.
    ///
    /// Returns the post-commit aggregate and the persisted movement.
    async fn commit(&self, commit: StockCommit) -> Result<(StockAggregate, MovementRecord)>;

    /// Reads a product's movements, newest first, bounded by `limit`.
    async fn movements_for_product(
        &self,
        product_id: ProductId,
        limit: usize,
    ) -> Result<Vec<MovementRecord>>;

    /// Streams a product's full movement history, oldest first.
    ///
    /// Used for ledger replay; the order matches the commit order the store
    /// applied.
    async fn stream_movements(&self, product_id: ProductId) -> Result<MovementStream>;
}

/// Validates a commit before any I/O.
///
/// Rejects negative counters and a movement that references a different
/// product than the commit. It deliberately does not enforce
/// `reserved_stock <= stock`: the adjustment path can legitimately drive
/// stock below the reserved count (see the engine documentation).
pub fn validate_commit(commit: &StockCommit) -> std::result::Result<(), String> {
    if commit.stock < 0 {
        return Err(format!("stock must not be negative, got {}", commit.stock));
    }
    if commit.reserved_stock < 0 {
        return Err(format!(
            "reserved_stock must not be negative, got {}",
            commit.reserved_stock
        ));
    }
    if commit.movement.product_id != commit.product_id {
        return Err(format!(
            "movement references product {} but commit targets {}",
            commit.movement.product_id, commit.product_id
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MovementType;

    fn commit_for(product_id: ProductId, stock: i64, reserved: i64) -> StockCommit {
        StockCommit {
            product_id,
            expected_version: Version::first(),
            stock,
            reserved_stock: reserved,
            movement: NewMovement::new(product_id, MovementType::Restock, stock),
        }
    }

    #[test]
    fn valid_commit_passes() {
        let commit = commit_for(ProductId::new(), 10, 0);
        assert!(validate_commit(&commit).is_ok());
    }

    #[test]
    fn negative_stock_rejected() {
        let commit = commit_for(ProductId::new(), -1, 0);
        assert!(validate_commit(&commit).is_err());
    }

    #[test]
    fn negative_reserved_rejected() {
        let commit = commit_for(ProductId::new(), 5, -2);
        assert!(validate_commit(&commit).is_err());
    }

    #[test]
    fn mismatched_movement_product_rejected() {
        let mut commit = commit_for(ProductId::new(), 5, 0);
        commit.movement.product_id = ProductId::new();
        assert!(validate_commit(&commit).is_err());
    }

    #[test]
    fn reserved_above_stock_allowed() {
        // The adjustment path can strand reservations above on-hand stock;
        // the store does not police that invariant.
        let commit = commit_for(ProductId::new(), 2, 5);
        assert!(validate_commit(&commit).is_ok());
    }
}
