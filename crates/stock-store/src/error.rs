use thiserror::Error;

use crate::{ProductId, Version};

/// Errors that can occur when interacting with the stock store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrency conflict occurred when committing a stock change.
    /// The expected aggregate version did not match the actual version.
    #[error(
        "Concurrency conflict for product {product_id}: expected version {expected}, found {actual}"
    )]
    VersionConflict {
        product_id: ProductId,
        expected: Version,
        actual: Version,
    },

    /// No stock aggregate exists for the referenced product.
    #[error("Stock aggregate not found for product {0}")]
    AggregateNotFound(ProductId),

    /// An aggregate already exists for the product being created.
    #[error("Stock aggregate already exists for product {0}")]
    AggregateExists(ProductId),

    /// The commit was structurally invalid before any I/O happened.
    #[error("Invalid stock commit: {0}")]
    InvalidCommit(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Whether the operation may succeed if simply retried.
    ///
    /// Version conflicts are the normal optimistic-concurrency signal;
    /// pool timeouts are transient contention.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. } | StoreError::Database(sqlx::Error::PoolTimedOut)
        )
    }
}

/// Result type for stock store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
