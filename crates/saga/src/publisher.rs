//! Outbound port for saga messages.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::SagaMessage;
use queue::{MessageId, MessageQueue};

use crate::error::Result;
use crate::state::MessageRoute;

/// Publishes saga messages to the stage that consumes them.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: SagaMessage) -> Result<MessageId>;
}

/// Publishes onto a [`MessageQueue`], grouping every message by its order
/// so all messages of one order are consumed in send order.
#[derive(Clone)]
pub struct QueuePublisher<Q> {
    queue: Q,
}

impl<Q: MessageQueue> QueuePublisher<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }
}

#[async_trait]
impl<Q: MessageQueue> MessagePublisher for QueuePublisher<Q> {
    async fn publish(&self, message: SagaMessage) -> Result<MessageId> {
        let queue = message.queue();
        let group = message.order_id().key();
        let body = message.to_json()?;
        let id = self.queue.send(queue, &group, body).await?;
        tracing::debug!(
            queue = %queue,
            message_id = %id,
            order_id = %group,
            kind = %message.kind(),
            "Saga message published"
        );
        Ok(id)
    }
}

/// Publisher that keeps messages in memory, for testing stages in isolation.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<SagaMessage>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message published so far, in order.
    pub fn published(&self) -> Vec<SagaMessage> {
        self.published
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Removes and returns every message published so far.
    pub fn take(&self) -> Vec<SagaMessage> {
        self.published
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, message: SagaMessage) -> Result<MessageId> {
        if let Ok(mut messages) = self.published.lock() {
            messages.push(message);
        }
        Ok(MessageId::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::RecordId;
    use domain::{OrderStatus, UpdateStatusRequest};
    use queue::{InMemoryQueue, QueueName};

    fn status(order_id: RecordId, status: OrderStatus) -> SagaMessage {
        UpdateStatusRequest { order_id, status }.into()
    }

    #[tokio::test]
    async fn queue_publisher_routes_and_groups_by_order() {
        let queue = InMemoryQueue::default();
        let publisher = QueuePublisher::new(queue.clone());
        let order_id = RecordId::new();

        publisher
            .publish(status(order_id, OrderStatus::Preparing))
            .await
            .unwrap();

        let batch = queue
            .receive_batch(QueueName::UpdateOrderStatus, 10)
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].group_id, order_id.key());
        assert!(batch[0].body.contains("PREPARING"));
    }

    #[tokio::test]
    async fn recording_publisher_keeps_order() {
        let publisher = RecordingPublisher::new();
        let order_id = RecordId::new();
        publisher.publish(status(order_id, OrderStatus::Preparing)).await.unwrap();
        publisher.publish(status(order_id, OrderStatus::Completed)).await.unwrap();

        let taken = publisher.take();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[1], status(order_id, OrderStatus::Completed));
        assert!(publisher.published().is_empty());
    }
}
