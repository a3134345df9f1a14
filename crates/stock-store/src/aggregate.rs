use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProductId;

/// Version number for a stock aggregate, used for optimistic concurrency
/// control.
///
/// Versions start at 1 when the aggregate row is created and increment by 1
/// for each committed mutation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the first version (1) assigned at aggregate creation.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Version> for i64 {
    fn from(version: Version) -> Self {
        version.0
    }
}

/// Current stock counters for one product.
///
/// This is the mutable side of the ledger: a cached summary of the movement
/// history, kept consistent with it inside each commit. The row is created
/// alongside the product by the catalog module and mutated exclusively
/// through [`StockStore::commit`](crate::StockStore::commit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAggregate {
    /// The product these counters belong to.
    pub product_id: ProductId,

    /// Total units physically on hand. Never negative.
    pub stock: i64,

    /// Units currently held against pending carts/orders. Never negative.
    pub reserved_stock: i64,

    /// Reorder trigger: the product counts as low-stock once its available
    /// stock is at or below this value.
    pub low_stock_threshold: i64,

    /// Mirror of the catalog's active flag. Deactivating a product does not
    /// erase its stock state; it only drops the product from the low-stock
    /// listing.
    pub is_active: bool,

    /// Optimistic-concurrency version, incremented on every commit.
    pub version: Version,

    /// When the counters were last committed.
    pub updated_at: DateTime<Utc>,
}

impl StockAggregate {
    /// Units sellable right now: `stock - reserved_stock`.
    pub fn available_stock(&self) -> i64 {
        self.stock - self.reserved_stock
    }

    /// Whether available stock is at or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.available_stock() <= self.low_stock_threshold
    }
}

/// Initial counters for a new stock aggregate row.
///
/// Created by the catalog collaborator when a product is registered.
#[derive(Debug, Clone)]
pub struct NewStockAggregate {
    pub product_id: ProductId,
    pub stock: i64,
    pub reserved_stock: i64,
    pub low_stock_threshold: i64,
    pub is_active: bool,
}

impl NewStockAggregate {
    /// Creates a new aggregate description with zeroed counters.
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            stock: 0,
            reserved_stock: 0,
            low_stock_threshold: 0,
            is_active: true,
        }
    }

    /// Sets the initial on-hand stock.
    pub fn stock(mut self, stock: i64) -> Self {
        self.stock = stock;
        self
    }

    /// Sets the initial reserved stock.
    pub fn reserved_stock(mut self, reserved_stock: i64) -> Self {
        self.reserved_stock = reserved_stock;
        self
    }

    /// Sets the low-stock threshold.
    pub fn low_stock_threshold(mut self, threshold: i64) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    /// Sets the active flag.
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}
