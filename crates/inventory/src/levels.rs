//! Pure stock state transitions.
//!
//! Every unit of stock is in one of three states: free (counted in `stock`
//! only), reserved (counted in `stock` and `reserved`), or sold (removed
//! from `stock`). The methods here encode the legal transitions between
//! those states as pure functions over the counter pair — no I/O, fully
//! deterministic, so the whole rule set is unit-testable without a store.

use stock_store::{MovementType, StockAggregate};

use crate::error::InventoryError;

/// The `(stock, reserved)` counter pair for one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockLevels {
    /// Total units physically on hand.
    pub stock: i64,

    /// Units held against pending carts/orders.
    pub reserved: i64,
}

/// The outcome of a legal transition: the new counters plus the movement
/// that documents the change, ready to be committed as one atomic unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// New value for `stock`.
    pub stock: i64,

    /// New value for `reserved`.
    pub reserved: i64,

    /// The movement type to record.
    pub movement_type: MovementType,

    /// Signed movement quantity, following the audit sign convention:
    /// reservations and sales negative, releases and restocks positive.
    pub quantity: i64,

    /// Snapshot of `stock` before the transition.
    pub stock_before: i64,

    /// Snapshot of `stock` after the transition.
    pub stock_after: i64,
}

impl StockLevels {
    /// Creates a counter pair.
    pub fn new(stock: i64, reserved: i64) -> Self {
        Self { stock, reserved }
    }

    /// Units sellable right now.
    pub fn available(&self) -> i64 {
        self.stock - self.reserved
    }

    /// Moves `quantity` units from free to reserved.
    ///
    /// `stock` is untouched; the movement records the availability decrease
    /// as a negative quantity with unchanged stock snapshots.
    pub fn reserve(&self, quantity: i64) -> Result<Transition, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        let available = self.available();
        if quantity > available {
            return Err(InventoryError::InsufficientStock {
                available,
                requested: quantity,
            });
        }
        Ok(Transition {
            stock: self.stock,
            reserved: self.reserved + quantity,
            movement_type: MovementType::Reservation,
            quantity: -quantity,
            stock_before: self.stock,
            stock_after: self.stock,
        })
    }

    /// Returns `quantity` reserved units to free stock.
    pub fn release(&self, quantity: i64) -> Result<Transition, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if quantity > self.reserved {
            return Err(InventoryError::OverRelease {
                reserved: self.reserved,
                requested: quantity,
            });
        }
        Ok(Transition {
            stock: self.stock,
            reserved: self.reserved - quantity,
            movement_type: MovementType::Release,
            quantity,
            stock_before: self.stock,
            stock_after: self.stock,
        })
    }

    /// Converts `quantity` reserved units into a permanent stock decrease.
    ///
    /// Both counters drop together; a sale is terminal for the units'
    /// reservation lifecycle. Reversal, if a caller ever needs one, is a
    /// fresh adjustment, never an undo.
    pub fn confirm_sale(&self, quantity: i64) -> Result<Transition, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        if quantity > self.reserved {
            return Err(InventoryError::OverConfirm {
                reserved: self.reserved,
                requested: quantity,
            });
        }
        Ok(Transition {
            stock: self.stock - quantity,
            reserved: self.reserved - quantity,
            movement_type: MovementType::Sale,
            quantity: -quantity,
            stock_before: self.stock,
            stock_after: self.stock - quantity,
        })
    }

    /// Creates or destroys free units directly: positive `delta` restocks,
    /// negative writes stock off.
    ///
    /// Reservations are never touched on this path, and the new stock level
    /// is not re-checked against `reserved`: a large negative adjustment
    /// can leave reservations above on-hand stock. Callers adjusting stock
    /// downward are responsible for not stranding reservations.
    pub fn adjust(
        &self,
        delta: i64,
        movement_type: MovementType,
    ) -> Result<Transition, InventoryError> {
        let stock_after = self.stock + delta;
        if stock_after < 0 {
            return Err(InventoryError::WouldUnderflow {
                current: self.stock,
                delta,
            });
        }
        Ok(Transition {
            stock: stock_after,
            reserved: self.reserved,
            movement_type,
            quantity: delta,
            stock_before: self.stock,
            stock_after,
        })
    }
}

impl From<&StockAggregate> for StockLevels {
    fn from(aggregate: &StockAggregate) -> Self {
        Self {
            stock: aggregate.stock,
            reserved: aggregate.reserved_stock,
        }
    }
}
