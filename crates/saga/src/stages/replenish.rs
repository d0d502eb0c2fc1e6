use chrono::Utc;
use domain::{Order, OrderCreated, ReplenishRequest};
use queue::MessageId;
use store::{RecordStore, RecordStoreExt, StoreError, Table, UpdateExpression};

use crate::error::{Result, SagaError};
use crate::idempotency::{IdempotencyGuard, replenish_key};
use crate::publisher::MessagePublisher;

/// Adds purchased stock and sends the order back to the start of the
/// pipeline so its ingredients are checked again.
pub struct ReplenishStock<S, P> {
    store: S,
    publisher: P,
    guard: IdempotencyGuard<S>,
}

impl<S: RecordStore + Clone, P: MessagePublisher> ReplenishStock<S, P> {
    pub fn new(store: S, publisher: P) -> Self {
        let guard = IdempotencyGuard::new(store.clone());
        Self {
            store,
            publisher,
            guard,
        }
    }

    /// Applies `request`, delivered as `message_id`. The increment is
    /// applied at most once per message, so a redelivery after a later
    /// failure does not add the stock again.
    #[tracing::instrument(
        skip(self, request),
        fields(
            order_id = %request.order_id,
            ingredient_id = %request.ingredient_id,
            purchased_quantity = request.purchased_quantity
        )
    )]
    pub async fn handle(&self, request: ReplenishRequest, message_id: MessageId) -> Result<()> {
        let key = replenish_key(message_id);
        if self.guard.is_recorded(&key).await? {
            tracing::debug!("Stock already replenished for this message");
        } else {
            self.increment(&request).await?;
            self.guard.record(&key).await?;
        }

        let order = self
            .store
            .get_record::<Order>(Table::Orders, &request.order_id.key())
            .await?
            .ok_or(SagaError::OrderNotFound(request.order_id))?;

        self.publisher
            .publish(OrderCreated::from(order).into())
            .await?;
        Ok(())
    }

    async fn increment(&self, request: &ReplenishRequest) -> Result<()> {
        let expression = UpdateExpression::new()
            .add("#stock", ":quantity")
            .set("#updatedAt", ":now")
            .name("#stock", "stock")
            .name("#updatedAt", "updatedAt")
            .value(":quantity", i64::from(request.purchased_quantity))
            .value(":now", serde_json::to_value(Utc::now())?);

        self.store
            .update(Table::Ingredients, &request.ingredient_id.key(), expression)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => SagaError::IngredientNotFound(request.ingredient_id),
                e => e.into(),
            })?;

        tracing::info!("Ingredient stock replenished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::RecordingPublisher;
    use crate::stages::fixtures;
    use common::RecordId;
    use domain::{RecipeIngredient, SagaMessage};
    use store::InMemoryRecordStore;

    #[tokio::test]
    async fn adds_exactly_purchased_quantity_and_loops_back() {
        let store = InMemoryRecordStore::new();
        let publisher = RecordingPublisher::new();
        let flour = fixtures::ingredient(&store, "flour", 2).await;
        let recipe = fixtures::recipe(&store, vec![RecipeIngredient::new(flour.id, 10)]).await;
        let order = fixtures::order(&store, &recipe).await;

        ReplenishStock::new(store.clone(), publisher.clone())
            .handle(
                ReplenishRequest {
                    order_id: order.id,
                    ingredient_id: flour.id,
                    purchased_quantity: 9,
                    required_quantity: 8,
                },
                MessageId::new(),
            )
            .await
            .unwrap();

        assert_eq!(fixtures::stock_of(&store, &flour).await, 11);
        assert_eq!(
            publisher.published(),
            vec![SagaMessage::from(OrderCreated::from(order))]
        );
    }

    #[tokio::test]
    async fn missing_order_fails_but_stock_is_added_once() {
        let store = InMemoryRecordStore::new();
        let publisher = RecordingPublisher::new();
        let flour = fixtures::ingredient(&store, "flour", 0).await;
        let stage = ReplenishStock::new(store.clone(), publisher.clone());
        let missing = RecordId::new();
        let request = ReplenishRequest {
            order_id: missing,
            ingredient_id: flour.id,
            purchased_quantity: 4,
            required_quantity: 4,
        };
        let message_id = MessageId::new();

        for _ in 0..2 {
            let result = stage.handle(request.clone(), message_id).await;
            assert!(matches!(result, Err(SagaError::OrderNotFound(id)) if id == missing));
        }

        assert_eq!(fixtures::stock_of(&store, &flour).await, 4);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn unknown_ingredient_is_not_found() {
        let store = InMemoryRecordStore::new();
        let result = ReplenishStock::new(store, RecordingPublisher::new())
            .handle(
                ReplenishRequest {
                    order_id: RecordId::new(),
                    ingredient_id: RecordId::new(),
                    purchased_quantity: 1,
                    required_quantity: 1,
                },
                MessageId::new(),
            )
            .await;
        assert!(matches!(result, Err(SagaError::IngredientNotFound(_))));
    }
}
