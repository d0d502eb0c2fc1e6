//! Routes saga messages to their stage handlers.

use std::sync::Arc;

use domain::SagaMessage;
use queue::MessageId;
use store::RecordStore;

use crate::error::Result;
use crate::publisher::MessagePublisher;
use crate::purchasing::{PurchasePolicy, QuantitySource};
use crate::stages::{
    CheckIngredientStock, ProcessOrder, PurchaseIngredient, ReplenishStock, UpdateOrderStatus,
};
use crate::state::MessageRoute;

/// Delivery metadata for one received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: MessageId,
    pub receive_count: u32,
}

impl Delivery {
    pub fn new(message_id: MessageId, receive_count: u32) -> Self {
        Self {
            message_id,
            receive_count,
        }
    }

    /// A first delivery with a fresh id, for driving stages directly.
    pub fn first() -> Self {
        Self::new(MessageId::new(), 1)
    }
}

/// Holds one handler per queue-driven stage and dispatches on the message tag.
pub struct SagaDispatcher<S, P> {
    process_order: ProcessOrder<S, P>,
    check_stock: CheckIngredientStock<S, P>,
    purchase: PurchaseIngredient<S, P>,
    replenish: ReplenishStock<S, P>,
    update_status: UpdateOrderStatus<S>,
}

impl<S, P> SagaDispatcher<S, P>
where
    S: RecordStore + Clone,
    P: MessagePublisher + Clone,
{
    pub fn new(
        store: S,
        publisher: P,
        policy: PurchasePolicy,
        quantities: Arc<dyn QuantitySource>,
    ) -> Self {
        Self {
            process_order: ProcessOrder::new(store.clone(), publisher.clone()),
            check_stock: CheckIngredientStock::new(store.clone(), publisher.clone()),
            purchase: PurchaseIngredient::new(store.clone(), publisher.clone(), policy, quantities),
            replenish: ReplenishStock::new(store.clone(), publisher),
            update_status: UpdateOrderStatus::new(store),
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(
            stage = %message.stage(),
            order_id = %message.order_id(),
            message_id = %delivery.message_id
        )
    )]
    pub async fn dispatch(&self, message: SagaMessage, delivery: &Delivery) -> Result<()> {
        match message {
            SagaMessage::OrderCreated(m) => self.process_order.handle(m).await,
            SagaMessage::GetIngredients(m) => self.check_stock.handle(m).await.map(|_| ()),
            SagaMessage::Purchase(m) => self.purchase.handle(m).await.map(|_| ()),
            SagaMessage::Replenish(m) => self.replenish.handle(m, delivery.message_id).await,
            SagaMessage::UpdateStatus(m) => self.update_status.handle(m).await.map(|_| ()),
        }
    }
}
