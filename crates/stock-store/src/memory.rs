use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    MovementId, MovementRecord, NewStockAggregate, ProductId, Result, StockAggregate, StoreError,
    store::{MovementStream, StockCommit, StockStore, validate_commit},
};

#[derive(Default)]
struct Inner {
    aggregates: HashMap<ProductId, StockAggregate>,
    // Append-only; insertion order is commit order.
    movements: Vec<MovementRecord>,
}

/// In-memory stock store implementation for testing.
///
/// Commits take the write lock for the whole read-validate-write unit, so
/// they are serialized exactly like the PostgreSQL implementation's
/// row-level transactions.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStockStore {
    /// Creates a new empty in-memory stock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of movements in the ledger.
    pub async fn movement_count(&self) -> usize {
        self.inner.read().await.movements.len()
    }

    /// Clears all aggregates and movements.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.aggregates.clear();
        inner.movements.clear();
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn create_aggregate(&self, new: NewStockAggregate) -> Result<StockAggregate> {
        let mut inner = self.inner.write().await;

        if inner.aggregates.contains_key(&new.product_id) {
            return Err(StoreError::AggregateExists(new.product_id));
        }

        let aggregate = StockAggregate {
            product_id: new.product_id,
            stock: new.stock,
            reserved_stock: new.reserved_stock,
            low_stock_threshold: new.low_stock_threshold,
            is_active: new.is_active,
            version: crate::Version::first(),
            updated_at: Utc::now(),
        };
        inner.aggregates.insert(new.product_id, aggregate.clone());
        Ok(aggregate)
    }

    async fn get_aggregate(&self, product_id: ProductId) -> Result<Option<StockAggregate>> {
        let inner = self.inner.read().await;
        Ok(inner.aggregates.get(&product_id).cloned())
    }

    async fn list_active_aggregates(&self) -> Result<Vec<StockAggregate>> {
        let inner = self.inner.read().await;
        Ok(inner
            .aggregates
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn commit(&self, commit: StockCommit) -> Result<(StockAggregate, MovementRecord)> {
        validate_commit(&commit).map_err(StoreError::InvalidCommit)?;

        let mut inner = self.inner.write().await;

        let aggregate = inner
            .aggregates
            .get_mut(&commit.product_id)
            .ok_or(StoreError::AggregateNotFound(commit.product_id))?;

        if aggregate.version != commit.expected_version {
            return Err(StoreError::VersionConflict {
                product_id: commit.product_id,
                expected: commit.expected_version,
                actual: aggregate.version,
            });
        }

        let now = Utc::now();
        aggregate.stock = commit.stock;
        aggregate.reserved_stock = commit.reserved_stock;
        aggregate.version = aggregate.version.next();
        aggregate.updated_at = now;
        let updated = aggregate.clone();

        let record = commit.movement.into_record(MovementId::new(), now);
        inner.movements.push(record.clone());

        Ok((updated, record))
    }

    async fn movements_for_product(
        &self,
        product_id: ProductId,
        limit: usize,
    ) -> Result<Vec<MovementRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movements
            .iter()
            .rev()
            .filter(|m| m.product_id == product_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stream_movements(&self, product_id: ProductId) -> Result<MovementStream> {
        use futures_util::stream;

        let inner = self.inner.read().await;
        let movements: Vec<_> = inner
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect();

        let stream = stream::iter(movements.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}
