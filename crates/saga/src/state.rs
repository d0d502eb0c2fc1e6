//! Saga state machine.
//!
//! The fulfillment flow has no central orchestrator: each stage consumes
//! one message kind from its own queue and emits follow-up messages. This
//! module writes that topology down so it can be checked without a queue.
//!
//! ```text
//! CreateOrder ─► ProcessOrder ─► CheckIngredientStock ─┬─► UpdateOrderStatus (COMPLETED)
//!                    ▲    │                             └─► PurchaseIngredient
//!                    │    └─► UpdateOrderStatus (PREPARING)        │
//!                    └──────────── ReplenishStock ◄────────────────┘
//! ```

use domain::{MessageKind, SagaMessage};
use queue::QueueName;

/// A queue-driven saga stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Marks the order as preparing and requests its ingredients.
    ProcessOrder,
    /// Reserves stock, or reports shortages.
    CheckIngredientStock,
    /// Buys a shortage.
    PurchaseIngredient,
    /// Adds purchased stock and sends the order round again.
    ReplenishStock,
    /// Writes an order status.
    UpdateOrderStatus,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::ProcessOrder,
        Stage::CheckIngredientStock,
        Stage::PurchaseIngredient,
        Stage::ReplenishStock,
        Stage::UpdateOrderStatus,
    ];

    /// The queue this stage consumes.
    pub fn queue(&self) -> QueueName {
        match self {
            Stage::ProcessOrder => QueueName::ProcessOrders,
            Stage::CheckIngredientStock => QueueName::GetIngredients,
            Stage::PurchaseIngredient => QueueName::PurchaseIngredients,
            Stage::ReplenishStock => QueueName::ReplenishIngredientStock,
            Stage::UpdateOrderStatus => QueueName::UpdateOrderStatus,
        }
    }

    /// The message contract this stage consumes.
    pub fn input(&self) -> MessageKind {
        match self {
            Stage::ProcessOrder => MessageKind::OrderCreated,
            Stage::CheckIngredientStock => MessageKind::GetIngredients,
            Stage::PurchaseIngredient => MessageKind::Purchase,
            Stage::ReplenishStock => MessageKind::Replenish,
            Stage::UpdateOrderStatus => MessageKind::UpdateStatus,
        }
    }

    /// The message kinds this stage may emit.
    pub fn emits(&self) -> &'static [MessageKind] {
        match self {
            Stage::ProcessOrder => &[MessageKind::UpdateStatus, MessageKind::GetIngredients],
            Stage::CheckIngredientStock => &[MessageKind::UpdateStatus, MessageKind::Purchase],
            Stage::PurchaseIngredient => &[MessageKind::Replenish],
            Stage::ReplenishStock => &[MessageKind::OrderCreated],
            Stage::UpdateOrderStatus => &[],
        }
    }

    /// The stage consuming messages of `kind`.
    pub fn consuming(kind: MessageKind) -> Stage {
        match kind {
            MessageKind::OrderCreated => Stage::ProcessOrder,
            MessageKind::GetIngredients => Stage::CheckIngredientStock,
            MessageKind::Purchase => Stage::PurchaseIngredient,
            MessageKind::Replenish => Stage::ReplenishStock,
            MessageKind::UpdateStatus => Stage::UpdateOrderStatus,
        }
    }

    /// The stage consuming `queue`.
    pub fn for_queue(queue: QueueName) -> Stage {
        match queue {
            QueueName::ProcessOrders => Stage::ProcessOrder,
            QueueName::GetIngredients => Stage::CheckIngredientStock,
            QueueName::PurchaseIngredients => Stage::PurchaseIngredient,
            QueueName::ReplenishIngredientStock => Stage::ReplenishStock,
            QueueName::UpdateOrderStatus => Stage::UpdateOrderStatus,
        }
    }

    /// Returns true if the stage ends a branch of the saga.
    pub fn is_terminal(&self) -> bool {
        self.emits().is_empty()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ProcessOrder => "process_order",
            Stage::CheckIngredientStock => "check_ingredient_stock",
            Stage::PurchaseIngredient => "purchase_ingredient",
            Stage::ReplenishStock => "replenish_stock",
            Stage::UpdateOrderStatus => "update_order_status",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing of a saga message to the stage and queue that consume it.
pub trait MessageRoute {
    fn stage(&self) -> Stage;

    fn queue(&self) -> QueueName {
        self.stage().queue()
    }
}

impl MessageRoute for SagaMessage {
    fn stage(&self) -> Stage {
        Stage::consuming(self.kind())
    }
}
