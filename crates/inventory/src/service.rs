//! The reservation engine: atomic stock mutations over a [`StockStore`].

use stock_store::{MovementType, NewMovement, StockCommit, StockStore, StoreError};

use crate::error::InventoryError;
use crate::levels::{StockLevels, Transition};
use crate::view::{StockInfo, StockOperationResult};
use crate::{ProductId, UserId};

/// Upper bound on optimistic commit attempts before an operation surfaces
/// `Conflict`. Each attempt re-reads the aggregate and re-validates, so a
/// lost race reports the true business error, not the version collision.
const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Service executing stock operations against a backing store.
///
/// Each operation runs as a single atomic read-validate-write unit scoped
/// to one product: the pure transition is planned against a consistent
/// read, then committed together with its ledger entry under the
/// aggregate's version guard. Two concurrent reservations can never both
/// succeed past the available stock; the loser re-reads and observes the
/// winner's effect.
pub struct InventoryService<S: StockStore> {
    store: S,
}

impl<S: StockStore> InventoryService<S> {
    /// Creates a new inventory service with the given stock store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying stock store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Holds `quantity` units of available stock for a pending cart/order.
    ///
    /// On-hand stock is untouched; only the reservation counter moves.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        user_id: Option<UserId>,
    ) -> Result<StockOperationResult, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        self.execute(
            product_id,
            user_id,
            Some("Stock reserved for cart".to_string()),
            |levels| levels.reserve(quantity),
        )
        .await
    }

    /// Returns `quantity` previously reserved units to available stock.
    #[tracing::instrument(skip(self))]
    pub async fn release_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        user_id: Option<UserId>,
    ) -> Result<StockOperationResult, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        self.execute(
            product_id,
            user_id,
            Some("Stock released from cart".to_string()),
            |levels| levels.release(quantity),
        )
        .await
    }

    /// Converts `quantity` reserved units into a permanent stock decrease.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_sale(
        &self,
        product_id: ProductId,
        quantity: i64,
        user_id: Option<UserId>,
    ) -> Result<StockOperationResult, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        self.execute(
            product_id,
            user_id,
            Some("Order confirmed".to_string()),
            |levels| levels.confirm_sale(quantity),
        )
        .await
    }

    /// Directly adjusts on-hand stock by `delta` (positive restock,
    /// negative write-off), recording a movement of the given type.
    ///
    /// Reservations are not touched and not re-validated: a negative delta
    /// can leave `reserved_stock` above `stock`. See
    /// [`StockLevels::adjust`].
    #[tracing::instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        movement_type: MovementType,
        user_id: Option<UserId>,
        reason: Option<String>,
    ) -> Result<StockOperationResult, InventoryError> {
        self.execute(product_id, user_id, reason, |levels| {
            levels.adjust(delta, movement_type)
        })
        .await
    }

    /// Runs one operation as an optimistic read-validate-commit loop.
    ///
    /// Preconditions are evaluated against the freshly read counters on
    /// every attempt; only a version collision triggers a retry, so any
    /// business failure returned here is a fact about committed state.
    async fn execute<F>(
        &self,
        product_id: ProductId,
        user_id: Option<UserId>,
        reason: Option<String>,
        transition_fn: F,
    ) -> Result<StockOperationResult, InventoryError>
    where
        F: Fn(StockLevels) -> Result<Transition, InventoryError>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let aggregate = self
                .store
                .get_aggregate(product_id)
                .await?
                .ok_or(InventoryError::NotFound(product_id))?;

            let transition = transition_fn(StockLevels::from(&aggregate))?;

            let movement =
                NewMovement::new(product_id, transition.movement_type, transition.quantity)
                    .snapshots(transition.stock_before, transition.stock_after)
                    .maybe_reason(reason.clone())
                    .user(user_id);

            let commit = StockCommit {
                product_id,
                expected_version: aggregate.version,
                stock: transition.stock,
                reserved_stock: transition.reserved,
                movement,
            };

            match self.store.commit(commit).await {
                Ok((aggregate, movement)) => {
                    metrics::counter!("stock_operations_total").increment(1);
                    return Ok(StockOperationResult {
                        stock: StockInfo::from(&aggregate),
                        movement,
                    });
                }
                Err(StoreError::VersionConflict { .. }) if attempts < MAX_COMMIT_ATTEMPTS => {
                    metrics::counter!("stock_commit_conflicts_total").increment(1);
                    tracing::debug!(%product_id, attempts, "stock commit lost a version race, retrying");
                }
                Err(StoreError::VersionConflict { .. }) => {
                    metrics::counter!("stock_operations_failed").increment(1);
                    return Err(InventoryError::Conflict {
                        product_id,
                        attempts,
                    });
                }
                Err(e) => {
                    metrics::counter!("stock_operations_failed").increment(1);
                    return Err(e.into());
                }
            }
        }
    }
}
