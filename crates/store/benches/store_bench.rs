use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use store::{
    Condition, InMemoryRecordStore, PutMode, RecordStore, ScanRequest, Table, UpdateExpression,
};

fn decrement(qty: i64) -> UpdateExpression {
    UpdateExpression::new()
        .add("#stock", ":delta")
        .condition(Condition::at_least("#stock", ":qty"))
        .name("#stock", "stock")
        .value(":delta", -qty)
        .value(":qty", qty)
}

fn bench_put_item(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/put_item", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryRecordStore::new();
                store
                    .put(
                        Table::Ingredients,
                        json!({"id": "flour", "name": "Flour", "stock": 100}),
                        PutMode::Overwrite,
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_conditional_decrement(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryRecordStore::new();
    rt.block_on(async {
        store
            .put(
                Table::Ingredients,
                json!({"id": "flour", "stock": i64::MAX}),
                PutMode::Overwrite,
            )
            .await
            .unwrap();
    });

    c.bench_function("store/conditional_decrement", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .update(Table::Ingredients, "flour", decrement(1))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_scan_page(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryRecordStore::new();
    rt.block_on(async {
        for i in 0..1_000 {
            store
                .put(
                    Table::Purchases,
                    json!({"id": format!("p{i:04}"), "purchasedQuantity": 1}),
                    PutMode::Overwrite,
                )
                .await
                .unwrap();
        }
    });

    c.bench_function("store/scan_page_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .scan(Table::Purchases, ScanRequest::new(10).after("p0500"))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_put_item,
    bench_conditional_decrement,
    bench_scan_page
);
criterion_main!(benches);
