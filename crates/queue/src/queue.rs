use async_trait::async_trait;
use serde::Serialize;

use crate::{MessageId, QueueName, Receipt, ReceivedMessage, Result};

/// Core trait for queue implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Sends a message to `queue` within the ordering group `group_id`.
    async fn send(&self, queue: QueueName, group_id: &str, body: String) -> Result<MessageId>;

    /// Receives up to `max_messages` visible messages, oldest first.
    ///
    /// A group with a message in flight contributes nothing until that
    /// message is acknowledged or becomes visible again.
    async fn receive_batch(
        &self,
        queue: QueueName,
        max_messages: usize,
    ) -> Result<Vec<ReceivedMessage>>;

    /// Deletes a successfully processed message.
    async fn ack(&self, queue: QueueName, receipt: Receipt) -> Result<()>;

    /// Reports a failed delivery. The message is delivered again once its
    /// visibility timeout lapses, until the receive limit routes it to the
    /// dead-letter sink.
    async fn fail(&self, queue: QueueName, receipt: Receipt) -> Result<()>;

    /// Moves an in-flight message straight to the dead-letter sink.
    async fn dead_letter(&self, queue: QueueName, receipt: Receipt, reason: &str) -> Result<()>;
}

/// Extension trait providing typed sends.
#[async_trait]
pub trait MessageQueueExt: MessageQueue {
    /// Serializes `message` to JSON and sends it.
    async fn send_json<T: Serialize + Sync>(
        &self,
        queue: QueueName,
        group_id: &str,
        message: &T,
    ) -> Result<MessageId> {
        let body = serde_json::to_string(message)?;
        self.send(queue, group_id, body).await
    }
}

impl<T: MessageQueue + ?Sized> MessageQueueExt for T {}
