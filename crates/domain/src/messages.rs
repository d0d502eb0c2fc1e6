//! Message contracts exchanged between saga stages.
//!
//! Each queue carries exactly one of these shapes as a JSON body.
//! [`SagaMessage`] tags them so a single dispatcher can route any of them.

use chrono::{DateTime, Utc};
use common::RecordId;
use serde::{Deserialize, Serialize};

use crate::{
    Fields, Order, OrderStatus, RecipeIngredient, Schema, ValidationError, parse,
};

/// An order entering (or re-entering) the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub id: RecordId,
    pub recipe_id: RecordId,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderCreated {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            recipe_id: order.recipe_id,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl Schema for OrderCreated {
    fn rules(fields: &mut Fields<'_>) {
        fields
            .uuid("id")
            .uuid("recipeId")
            .one_of("status", &OrderStatus::NAMES)
            .timestamp("createdAt")
            .timestamp("updatedAt");
    }
}

/// The ingredients an order needs, to be checked against stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetIngredientsRequest {
    pub order_id: RecordId,
    pub ingredients: Vec<RecipeIngredient>,
}

impl Schema for GetIngredientsRequest {
    fn rules(fields: &mut Fields<'_>) {
        // Emptiness is rejected by the stock check itself.
        fields.uuid("orderId").array("ingredients", 0, |line| {
            line.uuid("id").quantity("quantity", 1);
        });
    }
}

/// A shortage to be bought.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub order_id: RecordId,
    pub ingredient_id: RecordId,
    pub ingredient_name: String,
    pub required_quantity: u32,
}

impl Schema for PurchaseRequest {
    fn rules(fields: &mut Fields<'_>) {
        fields
            .uuid("orderId")
            .uuid("ingredientId")
            .string("ingredientName", 1)
            .quantity("requiredQuantity", 1);
    }
}

/// A completed purchase, to be added to stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplenishRequest {
    pub order_id: RecordId,
    pub ingredient_id: RecordId,
    pub purchased_quantity: u32,
    pub required_quantity: u32,
}

impl Schema for ReplenishRequest {
    fn rules(fields: &mut Fields<'_>) {
        fields
            .uuid("orderId")
            .uuid("ingredientId")
            .quantity("purchasedQuantity", 0)
            .quantity("requiredQuantity", 1);
    }
}

/// A status change for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_id: RecordId,
    pub status: OrderStatus,
}

impl Schema for UpdateStatusRequest {
    fn rules(fields: &mut Fields<'_>) {
        fields
            .uuid("orderId")
            .one_of("status", &OrderStatus::NAMES);
    }
}

/// Names the contract a message body follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    OrderCreated,
    GetIngredients,
    Purchase,
    Replenish,
    UpdateStatus,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::OrderCreated => "OrderCreated",
            MessageKind::GetIngredients => "GetIngredientsRequest",
            MessageKind::Purchase => "PurchaseRequest",
            MessageKind::Replenish => "ReplenishRequest",
            MessageKind::UpdateStatus => "UpdateStatusRequest",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any saga message, tagged by its contract.
#[derive(Debug, Clone, PartialEq)]
pub enum SagaMessage {
    OrderCreated(OrderCreated),
    GetIngredients(GetIngredientsRequest),
    Purchase(PurchaseRequest),
    Replenish(ReplenishRequest),
    UpdateStatus(UpdateStatusRequest),
}

impl SagaMessage {
    /// Parses and validates a queue body expected to follow `kind`.
    pub fn parse(kind: MessageKind, body: Option<&[u8]>) -> Result<Self, ValidationError> {
        Ok(match kind {
            MessageKind::OrderCreated => SagaMessage::OrderCreated(parse(body)?),
            MessageKind::GetIngredients => SagaMessage::GetIngredients(parse(body)?),
            MessageKind::Purchase => SagaMessage::Purchase(parse(body)?),
            MessageKind::Replenish => SagaMessage::Replenish(parse(body)?),
            MessageKind::UpdateStatus => SagaMessage::UpdateStatus(parse(body)?),
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            SagaMessage::OrderCreated(_) => MessageKind::OrderCreated,
            SagaMessage::GetIngredients(_) => MessageKind::GetIngredients,
            SagaMessage::Purchase(_) => MessageKind::Purchase,
            SagaMessage::Replenish(_) => MessageKind::Replenish,
            SagaMessage::UpdateStatus(_) => MessageKind::UpdateStatus,
        }
    }

    /// The order this message belongs to; used as the ordering group.
    pub fn order_id(&self) -> RecordId {
        match self {
            SagaMessage::OrderCreated(m) => m.id,
            SagaMessage::GetIngredients(m) => m.order_id,
            SagaMessage::Purchase(m) => m.order_id,
            SagaMessage::Replenish(m) => m.order_id,
            SagaMessage::UpdateStatus(m) => m.order_id,
        }
    }

    /// Serializes the payload as a queue body (untagged).
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            SagaMessage::OrderCreated(m) => serde_json::to_string(m),
            SagaMessage::GetIngredients(m) => serde_json::to_string(m),
            SagaMessage::Purchase(m) => serde_json::to_string(m),
            SagaMessage::Replenish(m) => serde_json::to_string(m),
            SagaMessage::UpdateStatus(m) => serde_json::to_string(m),
        }
    }
}

impl From<OrderCreated> for SagaMessage {
    fn from(m: OrderCreated) -> Self {
        SagaMessage::OrderCreated(m)
    }
}

impl From<GetIngredientsRequest> for SagaMessage {
    fn from(m: GetIngredientsRequest) -> Self {
        SagaMessage::GetIngredients(m)
    }
}

impl From<PurchaseRequest> for SagaMessage {
    fn from(m: PurchaseRequest) -> Self {
        SagaMessage::Purchase(m)
    }
}

impl From<ReplenishRequest> for SagaMessage {
    fn from(m: ReplenishRequest) -> Self {
        SagaMessage::Replenish(m)
    }
}

impl From<UpdateStatusRequest> for SagaMessage {
    fn from(m: UpdateStatusRequest) -> Self {
        SagaMessage::UpdateStatus(m)
    }
}
