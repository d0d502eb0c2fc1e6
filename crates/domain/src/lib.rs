//! Domain layer for kitchen order fulfillment.
//!
//! This crate provides:
//! - The persisted records: orders, recipes, ingredients and purchases
//! - The order status machine
//! - The message contracts exchanged between saga stages
//! - Ingress request shapes
//! - Schema validation shared by ingress and queue consumers

pub mod error;
pub mod kitchen;
pub mod messages;
pub mod order;
pub mod requests;
pub mod validation;

pub use error::{FieldViolation, ValidationError};
pub use kitchen::{Ingredient, Purchase, Recipe, RecipeIngredient};
pub use messages::{
    GetIngredientsRequest, MessageKind, OrderCreated, PurchaseRequest, ReplenishRequest,
    SagaMessage, UpdateStatusRequest,
};
pub use order::{Order, OrderStatus};
pub use requests::{CreateIngredientRequest, CreateOrderRequest, CreateRecipeRequest};
pub use validation::{Fields, Schema, parse, validate};
