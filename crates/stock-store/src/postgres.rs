use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    MovementId, MovementRecord, MovementType, NewStockAggregate, ProductId, Result, StockAggregate,
    StoreError, UserId, Version,
    store::{MovementStream, StockCommit, StockStore, validate_commit},
};

/// PostgreSQL-backed stock store implementation.
///
/// Each commit runs as one transaction: a conditional counter update
/// guarded by the aggregate version, then the ledger insert. The version
/// guard serializes writers per product; readers never block.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_aggregate(row: PgRow) -> Result<StockAggregate> {
        Ok(StockAggregate {
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            stock: row.try_get("stock")?,
            reserved_stock: row.try_get("reserved_stock")?,
            low_stock_threshold: row.try_get("low_stock_threshold")?,
            is_active: row.try_get("is_active")?,
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_movement(row: PgRow) -> Result<MovementRecord> {
        let movement_type: MovementType = row
            .try_get::<String, _>("movement_type")?
            .parse()
            .map_err(|e| {
                StoreError::Database(sqlx::Error::ColumnDecode {
                    index: "movement_type".to_string(),
                    source: Box::new(e),
                })
            })?;

        Ok(MovementRecord {
            id: MovementId::from_uuid(row.try_get::<Uuid, _>("id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            movement_type,
            quantity: row.try_get("quantity")?,
            reason: row.try_get("reason")?,
            stock_before: row.try_get("stock_before")?,
            stock_after: row.try_get("stock_after")?,
            user_id: row
                .try_get::<Option<Uuid>, _>("user_id")?
                .map(UserId::from_uuid),
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    async fn create_aggregate(&self, new: NewStockAggregate) -> Result<StockAggregate> {
        let row = sqlx::query(
            r#"
            INSERT INTO stock_levels (product_id, stock, reserved_stock, low_stock_threshold, is_active, version)
            VALUES ($1, $2, $3, $4, $5, 1)
            RETURNING product_id, stock, reserved_stock, low_stock_threshold, is_active, version, updated_at
            "#,
        )
        .bind(new.product_id.as_uuid())
        .bind(new.stock)
        .bind(new.reserved_stock)
        .bind(new.low_stock_threshold)
        .bind(new.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("stock_levels_pkey")
            {
                return StoreError::AggregateExists(new.product_id);
            }
            StoreError::Database(e)
        })?;

        Self::row_to_aggregate(row)
    }

    async fn get_aggregate(&self, product_id: ProductId) -> Result<Option<StockAggregate>> {
        let row = sqlx::query(
            r#"
            SELECT product_id, stock, reserved_stock, low_stock_threshold, is_active, version, updated_at
            FROM stock_levels
            WHERE product_id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_aggregate).transpose()
    }

    async fn list_active_aggregates(&self) -> Result<Vec<StockAggregate>> {
        let rows = sqlx::query(
            r#"
            SELECT product_id, stock, reserved_stock, low_stock_threshold, is_active, version, updated_at
            FROM stock_levels
            WHERE is_active
            ORDER BY product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_aggregate).collect()
    }

    async fn commit(&self, commit: StockCommit) -> Result<(StockAggregate, MovementRecord)> {
        validate_commit(&commit).map_err(StoreError::InvalidCommit)?;

        let mut tx = self.pool.begin().await?;

        // Conditional update: zero rows means either a lost race or a
        // missing aggregate; disambiguate before aborting.
        let updated = sqlx::query(
            r#"
            UPDATE stock_levels
            SET stock = $1, reserved_stock = $2, version = version + 1, updated_at = now()
            WHERE product_id = $3 AND version = $4
            RETURNING product_id, stock, reserved_stock, low_stock_threshold, is_active, version, updated_at
            "#,
        )
        .bind(commit.stock)
        .bind(commit.reserved_stock)
        .bind(commit.product_id.as_uuid())
        .bind(commit.expected_version.as_i64())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM stock_levels WHERE product_id = $1")
                    .bind(commit.product_id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match actual {
                Some(actual) => StoreError::VersionConflict {
                    product_id: commit.product_id,
                    expected: commit.expected_version,
                    actual: Version::new(actual),
                },
                None => StoreError::AggregateNotFound(commit.product_id),
            });
        };

        let movement = &commit.movement;
        let row = sqlx::query(
            r#"
            INSERT INTO stock_movements (id, product_id, movement_type, quantity, reason, stock_before, stock_after, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, product_id, movement_type, quantity, reason, stock_before, stock_after, user_id, created_at
            "#,
        )
        .bind(MovementId::new().as_uuid())
        .bind(movement.product_id.as_uuid())
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(&movement.reason)
        .bind(movement.stock_before)
        .bind(movement.stock_after)
        .bind(movement.user_id.map(|u| u.as_uuid()))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((Self::row_to_aggregate(updated)?, Self::row_to_movement(row)?))
    }

    async fn movements_for_product(
        &self,
        product_id: ProductId,
        limit: usize,
    ) -> Result<Vec<MovementRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, movement_type, quantity, reason, stock_before, stock_after, user_id, created_at
            FROM stock_movements
            WHERE product_id = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_movement).collect()
    }

    async fn stream_movements(&self, product_id: ProductId) -> Result<MovementStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, product_id, movement_type, quantity, reason, stock_before, stock_after, user_id, created_at
            FROM stock_movements
            WHERE product_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_movement(row),
            Err(e) => Err(StoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }
}
