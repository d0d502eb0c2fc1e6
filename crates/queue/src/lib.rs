//! Queue adapter for the fulfillment saga.
//!
//! Models a FIFO queue with message groups: messages sharing a group are
//! delivered in send order and never handed to two consumers at once.
//! Delivery is at-least-once. A received message stays hidden for the
//! visibility timeout; if it is not acknowledged in time it is delivered
//! again, and after too many deliveries it moves to the queue's
//! dead-letter sink.

pub mod error;
pub mod memory;
pub mod message;
pub mod queue;

pub use error::{QueueError, Result};
pub use memory::{InMemoryQueue, QueueConfig};
pub use message::{DeadLetter, MessageId, QueueMessage, QueueName, Receipt, ReceivedMessage};
pub use queue::{MessageQueue, MessageQueueExt};
