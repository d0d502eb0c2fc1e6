use domain::{GetIngredientsRequest, OrderCreated, OrderStatus, Recipe, UpdateStatusRequest};
use store::{RecordStore, RecordStoreExt, Table};

use crate::error::{Result, SagaError};
use crate::publisher::MessagePublisher;

/// Marks the order as preparing and requests the recipe's ingredients.
pub struct ProcessOrder<S, P> {
    store: S,
    publisher: P,
}

impl<S: RecordStore, P: MessagePublisher> ProcessOrder<S, P> {
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id, recipe_id = %order.recipe_id))]
    pub async fn handle(&self, order: OrderCreated) -> Result<()> {
        self.publisher
            .publish(
                UpdateStatusRequest {
                    order_id: order.id,
                    status: OrderStatus::Preparing,
                }
                .into(),
            )
            .await?;

        let recipe = self
            .store
            .get_record::<Recipe>(Table::Recipes, &order.recipe_id.key())
            .await?
            .ok_or(SagaError::RecipeNotFound(order.recipe_id))?;

        self.publisher
            .publish(
                GetIngredientsRequest {
                    order_id: order.id,
                    ingredients: recipe.ingredients,
                }
                .into(),
            )
            .await?;

        Ok(())
    }
}
