use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The queues connecting the saga stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    /// New (or replenished) orders waiting for recipe lookup.
    ProcessOrders,
    /// Ingredient lists waiting for a stock check.
    GetIngredients,
    /// Shortages waiting to be bought.
    PurchaseIngredients,
    /// Purchases waiting to be added to stock.
    ReplenishIngredientStock,
    /// Order status changes.
    UpdateOrderStatus,
}

impl QueueName {
    pub const ALL: [QueueName; 5] = [
        QueueName::ProcessOrders,
        QueueName::GetIngredients,
        QueueName::PurchaseIngredients,
        QueueName::ReplenishIngredientStock,
        QueueName::UpdateOrderStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::ProcessOrders => "process-orders",
            QueueName::GetIngredients => "get-ingredients",
            QueueName::PurchaseIngredients => "purchase-ingredients",
            QueueName::ReplenishIngredientStock => "replenish-ingredient-stock",
            QueueName::UpdateOrderStatus => "update-order-status",
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifier assigned to a message when it is sent. Stable across redeliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for one delivery of a message; changes on every redelivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Receipt(Uuid);

impl Receipt {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Receipt {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Receipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as stored by the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub id: MessageId,
    /// Ordering group; messages sharing it are delivered one consumer at a time, in order.
    pub group_id: String,
    /// JSON body.
    pub body: String,
    /// Number of times the message has been handed to a consumer.
    pub receive_count: u32,
    pub sent_at: DateTime<Utc>,
}

/// A message handed to a consumer by `receive_batch`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub receipt: Receipt,
    pub group_id: String,
    pub body: String,
    /// Includes this delivery, so the first delivery has a count of 1.
    pub receive_count: u32,
}

/// A message moved to a dead-letter sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub message: QueueMessage,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}
