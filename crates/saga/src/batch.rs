//! Batch processing with per-message failure reporting.
//!
//! A batch is driven through one stage. Each message is parsed and handled
//! inside its own error boundary, so one bad message never fails the
//! batch: the response lists the failed messages individually and only
//! those are redelivered.

use std::sync::Arc;
use std::time::Instant;

use domain::SagaMessage;
use futures_util::future::join_all;
use queue::{MessageId, Receipt, ReceivedMessage};
use store::RecordStore;

use crate::dispatcher::{Delivery, SagaDispatcher};
use crate::error::Result;
use crate::idempotency::{IdempotencyGuard, processed_key};
use crate::publisher::MessagePublisher;
use crate::state::Stage;

/// How the messages of a batch are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// One at a time, in receive order. Preserves per-order ordering.
    #[default]
    Sequential,
    /// All at once.
    Parallel,
}

/// One message that was not handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemFailure {
    pub item_identifier: MessageId,
    pub receipt: Receipt,
    pub reason: String,
}

/// Per-message results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    /// Handled messages, to acknowledge.
    pub succeeded: Vec<Receipt>,
    /// Retryable failures, to redeliver.
    pub batch_item_failures: Vec<BatchItemFailure>,
    /// Failures redelivery would reproduce, to dead-letter.
    pub rejected: Vec<BatchItemFailure>,
}

impl BatchResponse {
    pub fn is_clean(&self) -> bool {
        self.batch_item_failures.is_empty() && self.rejected.is_empty()
    }
}

/// Drives received messages through a stage.
pub struct BatchProcessor<S, P> {
    dispatcher: Arc<SagaDispatcher<S, P>>,
    guard: IdempotencyGuard<S>,
    mode: BatchMode,
}

impl<S, P> BatchProcessor<S, P>
where
    S: RecordStore + Clone,
    P: MessagePublisher + Clone,
{
    pub fn new(store: S, dispatcher: Arc<SagaDispatcher<S, P>>, mode: BatchMode) -> Self {
        Self {
            dispatcher,
            guard: IdempotencyGuard::new(store),
            mode,
        }
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    #[tracing::instrument(skip(self, messages), fields(stage = %stage, batch_size = messages.len()))]
    pub async fn process(&self, stage: Stage, messages: Vec<ReceivedMessage>) -> BatchResponse {
        let started = Instant::now();

        let results = match self.mode {
            BatchMode::Sequential => {
                let mut results = Vec::with_capacity(messages.len());
                for message in &messages {
                    results.push(self.process_one(stage, message).await);
                }
                results
            }
            BatchMode::Parallel => {
                join_all(messages.iter().map(|m| self.process_one(stage, m))).await
            }
        };

        let mut response = BatchResponse::default();
        for (message, result) in messages.iter().zip(results) {
            let Err(err) = result else {
                metrics::counter!("saga_messages_processed_total", "stage" => stage.as_str())
                    .increment(1);
                response.succeeded.push(message.receipt);
                continue;
            };

            tracing::error!(
                stage = %stage,
                message_id = %message.message_id,
                order_group = %message.group_id,
                receive_count = message.receive_count,
                kind = %err.kind(),
                error = %err,
                "Batch item failed"
            );

            let failure = BatchItemFailure {
                item_identifier: message.message_id,
                receipt: message.receipt,
                reason: err.to_string(),
            };
            if err.is_retryable() {
                metrics::counter!("saga_messages_failed_total", "stage" => stage.as_str())
                    .increment(1);
                response.batch_item_failures.push(failure);
            } else {
                metrics::counter!("saga_messages_rejected_total", "stage" => stage.as_str())
                    .increment(1);
                response.rejected.push(failure);
            }
        }

        metrics::histogram!("saga_batch_duration_seconds", "stage" => stage.as_str())
            .record(started.elapsed().as_secs_f64());
        response
    }

    async fn process_one(&self, stage: Stage, message: &ReceivedMessage) -> Result<()> {
        let key = processed_key(stage.queue(), message.message_id);
        if self.guard.is_recorded(&key).await? {
            tracing::debug!(message_id = %message.message_id, "Message already processed");
            return Ok(());
        }

        let parsed = SagaMessage::parse(stage.input(), Some(message.body.as_bytes()))?;
        let delivery = Delivery::new(message.message_id, message.receive_count);
        self.dispatcher.dispatch(parsed, &delivery).await?;

        self.guard.record(&key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::RecordingPublisher;
    use crate::purchasing::{FixedQuantities, PurchasePolicy};
    use common::RecordId;
    use domain::{Order, OrderStatus, UpdateStatusRequest};
    use store::{InMemoryRecordStore, RecordStoreExt, Table};

    fn processor(
        store: &InMemoryRecordStore,
        mode: BatchMode,
    ) -> BatchProcessor<InMemoryRecordStore, RecordingPublisher> {
        let dispatcher = SagaDispatcher::new(
            store.clone(),
            RecordingPublisher::new(),
            PurchasePolicy::default(),
            Arc::new(FixedQuantities::new([1])),
        );
        BatchProcessor::new(store.clone(), Arc::new(dispatcher), mode)
    }

    fn received(body: String) -> ReceivedMessage {
        ReceivedMessage {
            message_id: MessageId::new(),
            receipt: Receipt::new(),
            group_id: "group".to_string(),
            body,
            receive_count: 1,
        }
    }

    fn status_body(order_id: RecordId, status: OrderStatus) -> String {
        SagaMessage::from(UpdateStatusRequest { order_id, status })
            .to_json()
            .unwrap()
    }

    async fn seeded_order(store: &InMemoryRecordStore) -> Order {
        let order = Order::new(RecordId::new());
        store.put_record(Table::Orders, &order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn partial_failure_reports_only_failed_items() {
        let store = InMemoryRecordStore::new();
        let order = seeded_order(&store).await;

        let good = received(status_body(order.id, OrderStatus::Preparing));
        let missing = received(status_body(RecordId::new(), OrderStatus::Preparing));
        let malformed = received("{\"orderId\": 42}".to_string());
        let after = received(status_body(order.id, OrderStatus::Completed));

        let response = processor(&store, BatchMode::Sequential)
            .process(
                Stage::UpdateOrderStatus,
                vec![good.clone(), missing.clone(), malformed.clone(), after.clone()],
            )
            .await;

        assert_eq!(response.succeeded, vec![good.receipt, after.receipt]);
        assert_eq!(response.batch_item_failures.len(), 1);
        assert_eq!(
            response.batch_item_failures[0].item_identifier,
            missing.message_id
        );
        assert_eq!(response.rejected.len(), 1);
        assert_eq!(response.rejected[0].item_identifier, malformed.message_id);

        // Later messages still ran after the failures.
        let stored: Order = store
            .get_record(Table::Orders, &order.id.key())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn sequential_mode_applies_in_receive_order() {
        let store = InMemoryRecordStore::new();
        let order = seeded_order(&store).await;

        let response = processor(&store, BatchMode::Sequential)
            .process(
                Stage::UpdateOrderStatus,
                vec![
                    received(status_body(order.id, OrderStatus::Preparing)),
                    received(status_body(order.id, OrderStatus::Completed)),
                ],
            )
            .await;

        assert!(response.is_clean());
        let stored: Order = store
            .get_record(Table::Orders, &order.id.key())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn parallel_mode_reports_every_message() {
        let store = InMemoryRecordStore::new();
        let a = seeded_order(&store).await;
        let b = seeded_order(&store).await;

        let response = processor(&store, BatchMode::Parallel)
            .process(
                Stage::UpdateOrderStatus,
                vec![
                    received(status_body(a.id, OrderStatus::Preparing)),
                    received(status_body(b.id, OrderStatus::Preparing)),
                    received(String::new()),
                ],
            )
            .await;

        assert_eq!(response.succeeded.len(), 2);
        assert_eq!(response.rejected.len(), 1);
        assert!(response.batch_item_failures.is_empty());
    }

    #[tokio::test]
    async fn processed_messages_are_skipped_on_redelivery() {
        let store = InMemoryRecordStore::new();
        let order = seeded_order(&store).await;
        let processor = processor(&store, BatchMode::Sequential);

        let message = received(status_body(order.id, OrderStatus::Preparing));
        processor
            .process(Stage::UpdateOrderStatus, vec![message.clone()])
            .await;

        // Move the order on, then redeliver the stale message.
        processor
            .process(
                Stage::UpdateOrderStatus,
                vec![received(status_body(order.id, OrderStatus::Completed))],
            )
            .await;
        let response = processor
            .process(Stage::UpdateOrderStatus, vec![message.clone()])
            .await;

        assert_eq!(response.succeeded, vec![message.receipt]);
        let stored: Order = store
            .get_record(Table::Orders, &order.id.key())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
    }
}
