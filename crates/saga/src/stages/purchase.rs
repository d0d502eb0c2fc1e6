use std::sync::Arc;

use domain::{Purchase, PurchaseRequest, ReplenishRequest};
use store::{RecordStore, RecordStoreExt, Table};

use crate::error::Result;
use crate::publisher::MessagePublisher;
use crate::purchasing::{PurchasePolicy, QuantitySource};

/// Buys a shortage in draws, recording each draw as a purchase, then asks
/// for the total to be added to stock.
pub struct PurchaseIngredient<S, P> {
    store: S,
    publisher: P,
    policy: PurchasePolicy,
    source: Arc<dyn QuantitySource>,
}

impl<S: RecordStore, P: MessagePublisher> PurchaseIngredient<S, P> {
    pub fn new(
        store: S,
        publisher: P,
        policy: PurchasePolicy,
        source: Arc<dyn QuantitySource>,
    ) -> Self {
        Self {
            store,
            publisher,
            policy,
            source,
        }
    }

    #[tracing::instrument(
        skip(self, request),
        fields(
            order_id = %request.order_id,
            ingredient_id = %request.ingredient_id,
            required_quantity = request.required_quantity
        )
    )]
    pub async fn handle(&self, request: PurchaseRequest) -> Result<ReplenishRequest> {
        let plan = self
            .policy
            .plan(request.required_quantity, self.source.as_ref());

        let mut total: u32 = 0;
        for quantity in &plan {
            let purchase = Purchase::new(request.ingredient_id, *quantity);
            self.store.put_record(Table::Purchases, &purchase).await?;
            total = total.saturating_add(*quantity);
            metrics::counter!("purchases_recorded_total").increment(1);
        }

        let replenish = ReplenishRequest {
            order_id: request.order_id,
            ingredient_id: request.ingredient_id,
            purchased_quantity: total,
            required_quantity: request.required_quantity,
        };
        self.publisher.publish(replenish.clone().into()).await?;

        tracing::info!(draws = plan.len(), purchased_quantity = total, "Ingredient purchased");
        Ok(replenish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::RecordingPublisher;
    use crate::purchasing::{FixedQuantities, RandomQuantities};
    use common::RecordId;
    use domain::SagaMessage;
    use store::InMemoryRecordStore;

    fn shortage(required_quantity: u32) -> PurchaseRequest {
        PurchaseRequest {
            order_id: RecordId::new(),
            ingredient_id: RecordId::new(),
            ingredient_name: "flour".to_string(),
            required_quantity,
        }
    }

    #[tokio::test]
    async fn records_each_draw_and_emits_total() {
        let store = InMemoryRecordStore::new();
        let publisher = RecordingPublisher::new();
        let stage = PurchaseIngredient::new(
            store.clone(),
            publisher.clone(),
            PurchasePolicy::default(),
            Arc::new(FixedQuantities::new([3, 4])),
        );
        let request = shortage(8);

        let replenish = stage.handle(request.clone()).await.unwrap();

        assert_eq!(replenish.purchased_quantity, 10);
        assert_eq!(replenish.required_quantity, 8);
        assert_eq!(store.count(Table::Purchases).await, 3);

        let purchases: Vec<Purchase> = store
            .items(Table::Purchases)
            .await
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        assert!(purchases.iter().all(|p| p.ingredient_id == request.ingredient_id));
        assert_eq!(
            purchases.iter().map(|p| p.purchased_quantity).sum::<u32>(),
            10
        );

        assert_eq!(publisher.published(), vec![SagaMessage::from(replenish)]);
    }

    #[tokio::test]
    async fn never_emits_less_than_required() {
        let store = InMemoryRecordStore::new();
        let publisher = RecordingPublisher::new();
        let stage = PurchaseIngredient::new(
            store,
            publisher,
            PurchasePolicy::default(),
            Arc::new(RandomQuantities),
        );

        for required in [1, 7, 8, 50, 400] {
            let replenish = stage.handle(shortage(required)).await.unwrap();
            assert!(replenish.purchased_quantity >= replenish.required_quantity);
        }
    }
}
