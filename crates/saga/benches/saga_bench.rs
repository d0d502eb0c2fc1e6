use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CreateOrderRequest, Ingredient, Recipe, RecipeIngredient};
use queue::{InMemoryQueue, QueueConfig};
use saga::{CreateOrder, FixedQuantities, PurchasePolicy, QueuePublisher, RuntimeOptions, SagaRuntime};
use store::{InMemoryRecordStore, RecordStoreExt, Table};

async fn run_order(initial_stock: i64, required: u32) {
    let store = InMemoryRecordStore::new();
    let queue = InMemoryQueue::new(QueueConfig {
        visibility_timeout: Duration::ZERO,
        max_receive_count: 3,
    });
    let runtime = SagaRuntime::new(
        store.clone(),
        queue.clone(),
        RuntimeOptions {
            quantities: Arc::new(FixedQuantities::new([4])),
            ..RuntimeOptions::default()
        },
    );

    let flour = Ingredient::new("Flour", initial_stock);
    store.put_record(Table::Ingredients, &flour).await.unwrap();
    let recipe = Recipe::new("Bread", vec![RecipeIngredient::new(flour.id, required)]);
    store.put_record(Table::Recipes, &recipe).await.unwrap();

    CreateOrder::new(store.clone(), QueuePublisher::new(queue))
        .handle(CreateOrderRequest {
            recipe_id: recipe.id,
        })
        .await
        .unwrap();
    runtime.drain().await.unwrap();
}

fn bench_order_in_stock(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga/order_in_stock", |b| {
        b.iter(|| rt.block_on(run_order(100, 2)));
    });
}

fn bench_order_with_purchase(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("saga/order_with_purchase", |b| {
        b.iter(|| rt.block_on(run_order(0, 20)));
    });
}

fn bench_purchase_plan(c: &mut Criterion) {
    let policy = PurchasePolicy::default();
    let quantities = FixedQuantities::new([3, 7, 1]);

    c.bench_function("saga/purchase_plan", |b| {
        b.iter(|| policy.plan(500, &quantities));
    });
}

criterion_group!(
    benches,
    bench_order_in_stock,
    bench_order_with_purchase,
    bench_purchase_plan
);
criterion_main!(benches);
