use thiserror::Error;

use crate::{QueueName, Receipt};

/// Errors that can occur when interacting with a queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The receipt does not match an in-flight message. The message was
    /// already acknowledged, or its visibility timeout lapsed and it was
    /// handed out again under a new receipt.
    #[error("Unknown receipt {receipt} on queue {queue}")]
    UnknownReceipt { queue: QueueName, receipt: Receipt },

    /// The queue backend is unreachable.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// A message body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
