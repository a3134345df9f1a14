//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate the tables
//! between tests, so they are serialized. Run with:
//!
//! ```bash
//! cargo test -p stock-store --test postgres_integration
//! ```

use std::sync::Arc;

use serial_test::serial;
use sqlx::PgPool;
use stock_store::{
    MovementType, NewMovement, NewStockAggregate, PostgresStockStore, ProductId, StockCommit,
    StockStore, StoreError, Version,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_stock_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStockStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE stock_movements, stock_levels")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStockStore::new(pool)
}

async fn seed_product(store: &PostgresStockStore, stock: i64, reserved: i64) -> ProductId {
    let product_id = ProductId::new();
    store
        .create_aggregate(
            NewStockAggregate::new(product_id)
                .stock(stock)
                .reserved_stock(reserved),
        )
        .await
        .unwrap();
    product_id
}

fn restock_commit(product_id: ProductId, expected: Version, stock: i64) -> StockCommit {
    StockCommit {
        product_id,
        expected_version: expected,
        stock,
        reserved_stock: 0,
        movement: NewMovement::new(product_id, MovementType::Restock, stock).snapshots(0, stock),
    }
}

#[tokio::test]
#[serial]
async fn create_and_get_aggregate() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 10, 3).await;

    let aggregate = store.get_aggregate(product_id).await.unwrap().unwrap();
    assert_eq!(aggregate.stock, 10);
    assert_eq!(aggregate.reserved_stock, 3);
    assert_eq!(aggregate.available_stock(), 7);
    assert_eq!(aggregate.version, Version::first());
    assert!(aggregate.is_active);
}

#[tokio::test]
#[serial]
async fn get_unknown_aggregate_returns_none() {
    let store = get_test_store().await;
    let result = store.get_aggregate(ProductId::new()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_create_rejected() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 0, 0).await;

    let result = store
        .create_aggregate(NewStockAggregate::new(product_id))
        .await;
    assert!(matches!(result, Err(StoreError::AggregateExists(id)) if id == product_id));
}

#[tokio::test]
#[serial]
async fn commit_updates_counters_and_appends_movement_atomically() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 0, 0).await;

    let (aggregate, movement) = store
        .commit(restock_commit(product_id, Version::first(), 20))
        .await
        .unwrap();

    assert_eq!(aggregate.stock, 20);
    assert_eq!(aggregate.version, Version::new(2));
    assert_eq!(movement.movement_type, MovementType::Restock);
    assert_eq!(movement.quantity, 20);
    assert_eq!(movement.stock_before, 0);
    assert_eq!(movement.stock_after, 20);

    let movements = store.movements_for_product(product_id, 50).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].id, movement.id);
}

#[tokio::test]
#[serial]
async fn stale_version_conflicts_and_leaves_no_trace() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 0, 0).await;

    store
        .commit(restock_commit(product_id, Version::first(), 20))
        .await
        .unwrap();

    let result = store
        .commit(restock_commit(product_id, Version::first(), 30))
        .await;

    match result {
        Err(StoreError::VersionConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, Version::first());
            assert_eq!(actual, Version::new(2));
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }

    // Neither the counters nor the ledger saw the losing commit.
    let aggregate = store.get_aggregate(product_id).await.unwrap().unwrap();
    assert_eq!(aggregate.stock, 20);
    let movements = store.movements_for_product(product_id, 50).await.unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
#[serial]
async fn commit_against_missing_aggregate_fails() {
    let store = get_test_store().await;
    let product_id = ProductId::new();

    let result = store
        .commit(restock_commit(product_id, Version::first(), 5))
        .await;
    assert!(matches!(result, Err(StoreError::AggregateNotFound(id)) if id == product_id));
}

#[tokio::test]
#[serial]
async fn movements_newest_first_with_limit() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 0, 0).await;

    let mut version = Version::first();
    for stock in [10, 20, 30] {
        store
            .commit(restock_commit(product_id, version, stock))
            .await
            .unwrap();
        version = version.next();
    }

    let movements = store.movements_for_product(product_id, 2).await.unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].quantity, 30);
    assert_eq!(movements[1].quantity, 20);
}

#[tokio::test]
#[serial]
async fn stream_movements_oldest_first() {
    use futures_util::StreamExt;

    let store = get_test_store().await;
    let product_id = seed_product(&store, 0, 0).await;

    let mut version = Version::first();
    for stock in [10, 20] {
        store
            .commit(restock_commit(product_id, version, stock))
            .await
            .unwrap();
        version = version.next();
    }

    let stream = store.stream_movements(product_id).await.unwrap();
    let movements: Vec<_> = stream.map(|m| m.unwrap()).collect().await;
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].quantity, 10);
    assert_eq!(movements[1].quantity, 20);
}

#[tokio::test]
#[serial]
async fn movement_reason_and_user_roundtrip() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 10, 0).await;
    let user_id = stock_store::UserId::new();

    let commit = StockCommit {
        product_id,
        expected_version: Version::first(),
        stock: 10,
        reserved_stock: 2,
        movement: NewMovement::new(product_id, MovementType::Reservation, -2)
            .snapshots(10, 10)
            .reason("Stock reserved for cart")
            .user(Some(user_id)),
    };

    let (_, movement) = store.commit(commit).await.unwrap();
    assert_eq!(movement.reason.as_deref(), Some("Stock reserved for cart"));
    assert_eq!(movement.user_id, Some(user_id));

    let movements = store.movements_for_product(product_id, 1).await.unwrap();
    assert_eq!(movements[0], movement);
}

#[tokio::test]
#[serial]
async fn list_active_skips_inactive() {
    let store = get_test_store().await;
    let active = seed_product(&store, 5, 0).await;
    let inactive = ProductId::new();
    store
        .create_aggregate(NewStockAggregate::new(inactive).stock(5).active(false))
        .await
        .unwrap();

    let aggregates = store.list_active_aggregates().await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].product_id, active);
}

#[tokio::test]
#[serial]
async fn concurrent_commits_one_wins() {
    let store = get_test_store().await;
    let product_id = seed_product(&store, 0, 0).await;

    let a = store.commit(restock_commit(product_id, Version::first(), 10));
    let b = store.commit(restock_commit(product_id, Version::first(), 20));
    let (a, b) = tokio::join!(a, b);

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(StoreError::VersionConflict { .. })));

    let movements = store.movements_for_product(product_id, 50).await.unwrap();
    assert_eq!(movements.len(), 1);
}
