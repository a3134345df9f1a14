use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProductId, UserId};

/// Unique identifier for a movement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(Uuid);

impl MovementId {
    /// Creates a new random movement ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a movement ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MovementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of stock change a movement documents.
///
/// The `quantity` sign convention on movements is inherited from the audit
/// log this ledger is compatible with: reservations and sales are recorded
/// negative (availability decreased), releases and restocks positive, and
/// adjustments carry the caller's delta as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Incoming stock from a supplier or manual restock.
    Restock,

    /// Manual correction (shrinkage, damage write-off, count fix).
    Adjustment,

    /// Available stock held for a pending cart/order.
    Reservation,

    /// A reservation returned to available stock.
    Release,

    /// A reservation converted into a permanent stock decrease.
    Sale,
}

impl MovementType {
    /// Returns the wire/database representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Restock => "RESTOCK",
            MovementType::Adjustment => "ADJUSTMENT",
            MovementType::Reservation => "RESERVATION",
            MovementType::Release => "RELEASE",
            MovementType::Sale => "SALE",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = UnknownMovementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESTOCK" => Ok(MovementType::Restock),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            "RESERVATION" => Ok(MovementType::Reservation),
            "RELEASE" => Ok(MovementType::Release),
            "SALE" => Ok(MovementType::Sale),
            other => Err(UnknownMovementType(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized movement type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown movement type: {0}")]
pub struct UnknownMovementType(pub String);

/// One immutable entry in the movement ledger.
///
/// Records are created exclusively as a side effect of a stock commit, in
/// the same atomic unit as the counter mutation they document. They are
/// never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    /// Unique identifier for this movement.
    pub id: MovementId,

    /// The product whose counters changed.
    pub product_id: ProductId,

    /// The kind of change.
    pub movement_type: MovementType,

    /// Signed quantity, following the audit sign convention documented on
    /// [`MovementType`].
    pub quantity: i64,

    /// Free-text explanation, if any.
    pub reason: Option<String>,

    /// Snapshot of `stock` (not `reserved_stock`) before the change.
    /// Unchanged for pure reservation/release movements.
    pub stock_before: i64,

    /// Snapshot of `stock` after the change.
    pub stock_after: i64,

    /// The actor who triggered the change, if known.
    pub user_id: Option<UserId>,

    /// When the movement was committed. Per product, this order matches the
    /// order the store applied the commits.
    pub created_at: DateTime<Utc>,
}

/// A movement draft: everything except the id and timestamp, which the
/// store assigns at commit time.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub stock_before: i64,
    pub stock_after: i64,
    pub user_id: Option<UserId>,
}

impl NewMovement {
    /// Creates a draft with the given type and signed quantity. The stock
    /// snapshots default to zero; set them with [`NewMovement::snapshots`].
    pub fn new(product_id: ProductId, movement_type: MovementType, quantity: i64) -> Self {
        Self {
            product_id,
            movement_type,
            quantity,
            reason: None,
            stock_before: 0,
            stock_after: 0,
            user_id: None,
        }
    }

    /// Sets the before/after snapshots of `stock`.
    pub fn snapshots(mut self, stock_before: i64, stock_after: i64) -> Self {
        self.stock_before = stock_before;
        self.stock_after = stock_after;
        self
    }

    /// Sets the free-text reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets an optional free-text reason.
    pub fn maybe_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// Sets the acting user.
    pub fn user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Materializes the draft into a record with the given id and timestamp.
    ///
    /// Called by store backends at commit time.
    pub fn into_record(self, id: MovementId, created_at: DateTime<Utc>) -> MovementRecord {
        MovementRecord {
            id,
            product_id: self.product_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            reason: self.reason,
            stock_before: self.stock_before,
            stock_after: self.stock_after,
            user_id: self.user_id,
            created_at,
        }
    }
}
