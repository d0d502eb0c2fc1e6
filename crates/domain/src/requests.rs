//! Ingress request shapes.

use common::RecordId;
use serde::{Deserialize, Serialize};

use crate::{Fields, Ingredient, Recipe, RecipeIngredient, Schema};

/// `POST /orders`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub recipe_id: RecordId,
}

impl Schema for CreateOrderRequest {
    fn rules(fields: &mut Fields<'_>) {
        fields.uuid("recipeId");
    }
}

/// `POST /kitchen/recipes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
}

impl CreateRecipeRequest {
    pub fn into_recipe(self) -> Recipe {
        Recipe::new(self.name, self.ingredients)
    }
}

impl Schema for CreateRecipeRequest {
    fn rules(fields: &mut Fields<'_>) {
        fields.string("name", 1).array("ingredients", 1, |line| {
            line.uuid("id").quantity("quantity", 1);
        });
    }
}

/// `POST /kitchen/ingredients`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub stock: i64,
}

impl CreateIngredientRequest {
    pub fn into_ingredient(self) -> Ingredient {
        Ingredient::new(self.name, self.stock)
    }
}

impl Schema for CreateIngredientRequest {
    fn rules(fields: &mut Fields<'_>) {
        fields.string("name", 3).integer("stock", 1..=i64::MAX);
    }
}
