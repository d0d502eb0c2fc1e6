use domain::{CreateOrderRequest, Order, OrderCreated, Recipe};
use store::{RecordStore, RecordStoreExt, Table};

use crate::error::{Result, SagaError};
use crate::publisher::MessagePublisher;

/// Entry stage: persists a pending order and starts the saga for it.
pub struct CreateOrder<S, P> {
    store: S,
    publisher: P,
}

impl<S: RecordStore, P: MessagePublisher> CreateOrder<S, P> {
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    /// Creates the order. The record is written before `OrderCreated` is
    /// published so no downstream stage can observe a missing order.
    #[tracing::instrument(skip(self, request), fields(recipe_id = %request.recipe_id))]
    pub async fn handle(&self, request: CreateOrderRequest) -> Result<Order> {
        self.store
            .get_record::<Recipe>(Table::Recipes, &request.recipe_id.key())
            .await?
            .ok_or(SagaError::RecipeNotFound(request.recipe_id))?;

        let order = Order::new(request.recipe_id);
        self.store.put_record(Table::Orders, &order).await?;
        self.publisher
            .publish(OrderCreated::from(order.clone()).into())
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, "Order created");
        Ok(order)
    }
}
