//! Ledger replay: reconstructing counters from the movement history.
//!
//! The ledger is the source of truth; the aggregate row is a cached fold of
//! it. Replaying every movement for a product from a zero baseline must land
//! on the live counters. This is how the ledger is audited.

use futures_util::TryStreamExt;
use stock_store::{MovementRecord, MovementType, StockStore};

use crate::error::InventoryError;
use crate::levels::StockLevels;
use crate::ProductId;

/// Applies one movement to a counter pair.
///
/// Inverse of the transitions the engine records. Quantities carry their
/// audit sign, so reservations and releases fold with the same rule:
/// a reservation's `-q` grows the reserved counter, a release's `+q`
/// shrinks it.
pub fn apply(levels: StockLevels, movement: &MovementRecord) -> StockLevels {
    match movement.movement_type {
        MovementType::Restock | MovementType::Adjustment => StockLevels {
            stock: levels.stock + movement.quantity,
            reserved: levels.reserved,
        },
        MovementType::Reservation | MovementType::Release => StockLevels {
            stock: levels.stock,
            reserved: levels.reserved - movement.quantity,
        },
        MovementType::Sale => StockLevels {
            stock: levels.stock + movement.quantity,
            reserved: levels.reserved + movement.quantity,
        },
    }
}

/// Folds a product's full movement history, oldest first, into a counter
/// pair.
///
/// Assumes the product started at zero stock and zero reservations, which
/// holds for any product whose initial stock arrived through a recorded
/// restock. Seed-loaded aggregates with no opening movement will not
/// reconstruct.
pub async fn reconstruct<S: StockStore>(
    store: &S,
    product_id: ProductId,
) -> Result<StockLevels, InventoryError> {
    let stream = store.stream_movements(product_id).await?;
    let levels = stream
        .try_fold(StockLevels::default(), |levels, movement| async move {
            Ok(apply(levels, &movement))
        })
        .await?;
    Ok(levels)
}
