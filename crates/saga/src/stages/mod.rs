//! Stage handlers.
//!
//! Each handler owns its ports (a record store and, where it emits, a
//! publisher) and handles one input. Handlers never swallow errors: a
//! failure propagates to the batch processor, and redelivery is the only
//! recovery.

mod check_stock;
mod create_order;
mod kitchen;
mod process_order;
mod purchase;
mod replenish;
mod update_status;

pub use check_stock::{CheckIngredientStock, StockCheck};
pub use create_order::CreateOrder;
pub use kitchen::{CreateIngredient, CreateRecipe};
pub use process_order::ProcessOrder;
pub use purchase::PurchaseIngredient;
pub use replenish::ReplenishStock;
pub use update_status::UpdateOrderStatus;

#[cfg(test)]
pub(crate) mod fixtures {
    use domain::{Ingredient, Order, OrderStatus, Recipe, RecipeIngredient};
    use store::{InMemoryRecordStore, RecordStoreExt, Table};

    pub async fn ingredient(store: &InMemoryRecordStore, name: &str, stock: i64) -> Ingredient {
        let ingredient = Ingredient::new(name, stock);
        store.put_record(Table::Ingredients, &ingredient).await.unwrap();
        ingredient
    }

    pub async fn recipe(store: &InMemoryRecordStore, lines: Vec<RecipeIngredient>) -> Recipe {
        let recipe = Recipe::new("test recipe", lines);
        store.put_record(Table::Recipes, &recipe).await.unwrap();
        recipe
    }

    pub async fn order(store: &InMemoryRecordStore, recipe: &Recipe) -> Order {
        let order = Order::new(recipe.id);
        store.put_record(Table::Orders, &order).await.unwrap();
        order
    }

    pub async fn stock_of(store: &InMemoryRecordStore, ingredient: &Ingredient) -> i64 {
        store
            .get_record::<Ingredient>(Table::Ingredients, &ingredient.id.key())
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    pub async fn status_of(store: &InMemoryRecordStore, order: &Order) -> OrderStatus {
        store
            .get_record::<Order>(Table::Orders, &order.id.key())
            .await
            .unwrap()
            .unwrap()
            .status
    }
}
