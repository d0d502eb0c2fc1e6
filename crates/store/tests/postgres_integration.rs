//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use serde_json::json;
use serial_test::serial;
use sqlx::PgPool;
use store::{
    Condition, PostgresRecordStore, PutMode, RecordStore, RecordStoreExt, ReturnValues,
    ScanRequest, StoreError, Table, UpdateExpression,
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

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_records_table.sql"
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

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresRecordStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE records")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRecordStore::new(pool)
}

fn decrement(qty: i64) -> UpdateExpression {
    UpdateExpression::new()
        .add("#stock", ":delta")
        .condition(Condition::at_least("#stock", ":qty"))
        .name("#stock", "stock")
        .value(":delta", -qty)
        .value(":qty", qty)
        .return_values(ReturnValues::AllNew)
}

#[tokio::test]
#[serial]
async fn put_and_get_item() {
    let store = get_test_store().await;

    store
        .put(
            Table::Ingredients,
            json!({"id": "flour", "name": "Flour", "stock": 5}),
            PutMode::Overwrite,
        )
        .await
        .unwrap();

    let item = store.get(Table::Ingredients, "flour").await.unwrap().unwrap();
    assert_eq!(item["stock"], 5);

    // Same key in a different table is a different item
    assert!(store.get(Table::Recipes, "flour").await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn put_if_absent_detects_existing_key() {
    let store = get_test_store().await;
    let marker = json!({"id": "reserve:o1:0:flour"});

    store
        .put(Table::Idempotency, marker.clone(), PutMode::IfAbsent)
        .await
        .unwrap();
    let second = store
        .put(Table::Idempotency, marker, PutMode::IfAbsent)
        .await;

    assert!(matches!(second, Err(StoreError::ConditionFailed { .. })));
}

#[tokio::test]
#[serial]
async fn conditional_decrement() {
    let store = get_test_store().await;
    store
        .put(
            Table::Ingredients,
            json!({"id": "flour", "stock": 3}),
            PutMode::Overwrite,
        )
        .await
        .unwrap();

    let updated = store
        .update(Table::Ingredients, "flour", decrement(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated["stock"], 1);

    let short = store.update(Table::Ingredients, "flour", decrement(2)).await;
    assert!(matches!(short, Err(StoreError::ConditionFailed { .. })));

    let item = store.get(Table::Ingredients, "flour").await.unwrap().unwrap();
    assert_eq!(item["stock"], 1);
}

#[tokio::test]
#[serial]
async fn concurrent_decrements_are_serialized() {
    let store = get_test_store().await;
    store
        .put(
            Table::Ingredients,
            json!({"id": "flour", "stock": 4}),
            PutMode::Overwrite,
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.update(Table::Ingredients, "flour", decrement(1)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 4);
    let item = store.get(Table::Ingredients, "flour").await.unwrap().unwrap();
    assert_eq!(item["stock"], 0);
}

#[tokio::test]
#[serial]
async fn update_missing_item() {
    let store = get_test_store().await;
    let result = store.update(Table::Orders, "missing", decrement(1)).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn scan_with_continuation_token() {
    let store = get_test_store().await;
    for key in ["p1", "p2", "p3"] {
        store
            .put(
                Table::Purchases,
                json!({"id": key, "purchasedQuantity": 1}),
                PutMode::Overwrite,
            )
            .await
            .unwrap();
    }

    let first = store
        .scan_records::<serde_json::Value>(Table::Purchases, ScanRequest::new(2))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.last_key.as_deref(), Some("p2"));

    let rest = store
        .scan(Table::Purchases, ScanRequest::new(2).after("p2"))
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0]["id"], "p3");
    assert!(rest.last_key.is_none());
}

#[tokio::test]
#[serial]
async fn scan_with_oversized_limit_returns_one_bounded_page() {
    let store = get_test_store().await;
    store
        .put(Table::Orders, json!({"id": "o1"}), PutMode::Overwrite)
        .await
        .unwrap();

    let oversized = ScanRequest {
        limit: usize::MAX,
        start_key: None,
    };
    let page = store.scan(Table::Orders, oversized).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.last_key.is_none());
}

#[tokio::test]
#[serial]
async fn delete_reports_whether_a_row_was_removed() {
    let store = get_test_store().await;
    store
        .put(
            Table::Idempotency,
            json!({"id": "processed:q:m1"}),
            PutMode::IfAbsent,
        )
        .await
        .unwrap();

    assert!(store.delete(Table::Idempotency, "processed:q:m1").await.unwrap());
    assert!(!store.delete(Table::Idempotency, "processed:q:m1").await.unwrap());
    assert!(
        store
            .get(Table::Idempotency, "processed:q:m1")
            .await
            .unwrap()
            .is_none()
    );
}
