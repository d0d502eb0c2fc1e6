use chrono::Utc;
use domain::{
    GetIngredientsRequest, Ingredient, OrderStatus, PurchaseRequest, RecipeIngredient,
    UpdateStatusRequest, ValidationError,
};
use store::{Condition, RecordStore, RecordStoreExt, StoreError, Table, UpdateExpression};

use crate::error::{Result, SagaError};
use crate::idempotency::{IdempotencyGuard, reserve_key};
use crate::publisher::MessagePublisher;

/// Outcome of one stock check.
#[derive(Debug, Clone, PartialEq)]
pub enum StockCheck {
    /// Every line is reserved; the order was marked completed.
    Complete,
    /// These shortages were sent to purchasing.
    Short(Vec<PurchaseRequest>),
}

/// Reserves each recipe line against ingredient stock.
///
/// Each line is reserved with a conditional decrement that never takes
/// stock below zero; a line that cannot be reserved becomes a shortage.
/// Reserved lines are recorded per order and position, so a redelivered
/// request, or the retry cycle after a replenishment, only reserves what
/// is still missing.
pub struct CheckIngredientStock<S, P> {
    store: S,
    publisher: P,
    guard: IdempotencyGuard<S>,
}

impl<S: RecordStore + Clone, P: MessagePublisher> CheckIngredientStock<S, P> {
    pub fn new(store: S, publisher: P) -> Self {
        let guard = IdempotencyGuard::new(store.clone());
        Self {
            store,
            publisher,
            guard,
        }
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id, lines = request.ingredients.len()))]
    pub async fn handle(&self, request: GetIngredientsRequest) -> Result<StockCheck> {
        if request.ingredients.is_empty() {
            return Err(ValidationError::single(
                "ingredients",
                "Array must contain at least 1 element(s)",
            )
            .into());
        }

        let mut shortages = Vec::new();
        for (index, line) in request.ingredients.iter().enumerate() {
            let key = reserve_key(request.order_id, index, line.id);
            if self.guard.is_recorded(&key).await? {
                tracing::debug!(ingredient_id = %line.id, index, "Line already reserved");
                continue;
            }

            let ingredient = self.ingredient(line).await?;
            let required = i64::from(line.quantity);

            let reserved = ingredient.stock >= required && self.reserve(line).await?;
            if reserved {
                self.guard.record(&key).await?;
                continue;
            }

            // Re-read: a lost race means the stock seen above is stale.
            let stock = self.ingredient(line).await?.stock;
            shortages.push(PurchaseRequest {
                order_id: request.order_id,
                ingredient_id: line.id,
                ingredient_name: ingredient.name,
                required_quantity: shortfall(line.quantity, stock),
            });
        }

        if shortages.is_empty() {
            self.publisher
                .publish(
                    UpdateStatusRequest {
                        order_id: request.order_id,
                        status: OrderStatus::Completed,
                    }
                    .into(),
                )
                .await?;
            tracing::info!("All ingredients reserved");
            return Ok(StockCheck::Complete);
        }

        metrics::counter!("ingredient_shortages_total").increment(shortages.len() as u64);
        for shortage in &shortages {
            tracing::info!(
                ingredient_id = %shortage.ingredient_id,
                required_quantity = shortage.required_quantity,
                "Ingredient short"
            );
            self.publisher.publish(shortage.clone().into()).await?;
        }
        Ok(StockCheck::Short(shortages))
    }

    async fn ingredient(&self, line: &RecipeIngredient) -> Result<Ingredient> {
        self.store
            .get_record::<Ingredient>(Table::Ingredients, &line.id.key())
            .await?
            .ok_or(SagaError::IngredientNotFound(line.id))
    }

    /// Decrements stock by the line's quantity unless that would take it
    /// below zero. Returns false if the stock was insufficient.
    async fn reserve(&self, line: &RecipeIngredient) -> Result<bool> {
        let quantity = i64::from(line.quantity);
        let expression = UpdateExpression::new()
            .add("#stock", ":delta")
            .set("#updatedAt", ":now")
            .condition(Condition::at_least("#stock", ":quantity"))
            .name("#stock", "stock")
            .name("#updatedAt", "updatedAt")
            .value(":delta", -quantity)
            .value(":quantity", quantity)
            .value(":now", serde_json::to_value(Utc::now())?);

        match self
            .store
            .update(Table::Ingredients, &line.id.key(), expression)
            .await
        {
            Ok(_) => Ok(true),
            Err(StoreError::ConditionFailed { .. }) => Ok(false),
            Err(StoreError::NotFound { .. }) => Err(SagaError::IngredientNotFound(line.id)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Units to buy so that `stock` covers `required`; at least one.
fn shortfall(required: u32, stock: i64) -> u32 {
    let missing = i64::from(required) - stock.max(0);
    u32::try_from(missing.max(1)).unwrap_or(u32::MAX)
}
