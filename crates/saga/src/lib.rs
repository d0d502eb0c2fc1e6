//! Kitchen order fulfillment saga.
//!
//! An order moves through five queue-driven stages with no central
//! orchestrator:
//!
//! 1. Process order: mark it preparing, look up its recipe
//! 2. Check ingredient stock: reserve every line, or report shortages
//! 3. Purchase ingredient: buy each shortage
//! 4. Replenish stock: add the purchase and send the order round again
//! 5. Update order status
//!
//! The flow is written down in [`state::Stage`], dispatched by
//! [`SagaDispatcher`], and driven from the queues by [`SagaRuntime`].
//! Every message of one order shares an ordering group, and every
//! state-changing step is guarded by a deduplication key, so redelivery
//! is safe.

pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod idempotency;
pub mod publisher;
pub mod purchasing;
pub mod stages;
pub mod state;
pub mod worker;

pub use batch::{BatchItemFailure, BatchMode, BatchProcessor, BatchResponse};
pub use dispatcher::{Delivery, SagaDispatcher};
pub use error::{ErrorKind, Result, SagaError};
pub use idempotency::IdempotencyGuard;
pub use publisher::{MessagePublisher, QueuePublisher, RecordingPublisher};
pub use purchasing::{FixedQuantities, PurchasePolicy, QuantitySource, RandomQuantities};
pub use stages::{
    CheckIngredientStock, CreateIngredient, CreateOrder, CreateRecipe, ProcessOrder,
    PurchaseIngredient, ReplenishStock, StockCheck, UpdateOrderStatus,
};
pub use state::{MessageRoute, Stage};
pub use worker::{RuntimeOptions, SagaRuntime, StageWorker, WorkerConfig};
