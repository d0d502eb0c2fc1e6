use domain::{CreateIngredientRequest, CreateRecipeRequest, Ingredient, Recipe};
use store::{RecordStore, RecordStoreExt, Table};

use crate::error::Result;

/// Data-entry stage for recipes.
pub struct CreateRecipe<S> {
    store: S,
}

impl<S: RecordStore> CreateRecipe<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn handle(&self, request: CreateRecipeRequest) -> Result<Recipe> {
        let recipe = request.into_recipe();
        self.store.put_record(Table::Recipes, &recipe).await?;
        tracing::info!(recipe_id = %recipe.id, "Recipe created");
        Ok(recipe)
    }
}

/// Data-entry stage for ingredients.
pub struct CreateIngredient<S> {
    store: S,
}

impl<S: RecordStore> CreateIngredient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn handle(&self, request: CreateIngredientRequest) -> Result<Ingredient> {
        let ingredient = request.into_ingredient();
        self.store.put_record(Table::Ingredients, &ingredient).await?;
        tracing::info!(ingredient_id = %ingredient.id, stock = ingredient.stock, "Ingredient created");
        Ok(ingredient)
    }
}
