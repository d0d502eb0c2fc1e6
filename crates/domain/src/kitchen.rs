//! Kitchen records: recipes, ingredient stock and the purchase audit trail.

use chrono::{DateTime, Utc};
use common::RecordId;
use serde::{Deserialize, Serialize};

/// One line of a recipe: an ingredient and how much of it an order needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub id: RecordId,
    pub quantity: u32,
}

impl RecipeIngredient {
    pub fn new(id: RecordId, quantity: u32) -> Self {
        Self { id, quantity }
    }
}

/// A recipe. Never modified once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: RecordId,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, ingredients: Vec<RecipeIngredient>) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            ingredients,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An ingredient and its current stock.
///
/// `stock` is signed so a record written by an older, non-atomic writer can
/// still be read; conditional decrements never take it below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: RecordId,
    pub name: String,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, stock: i64) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            name: name.into(),
            stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One simulated purchase of an ingredient. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: RecordId,
    pub ingredient_id: RecordId,
    pub purchased_quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    pub fn new(ingredient_id: RecordId, purchased_quantity: u32) -> Self {
        let now = Utc::now();
        Self {
            id: RecordId::new(),
            ingredient_id,
            purchased_quantity,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_round_trips_through_json() {
        let recipe = Recipe::new("bread", vec![RecipeIngredient::new(RecordId::new(), 2)]);
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["ingredients"][0]["quantity"], 2);
        assert!(json.get("createdAt").is_some());

        let back: Recipe = serde_json::from_value(json).unwrap();
        assert_eq!(back, recipe);
    }

    #[test]
    fn purchase_uses_camel_case() {
        let purchase = Purchase::new(RecordId::new(), 4);
        let json = serde_json::to_value(&purchase).unwrap();
        assert_eq!(json["purchasedQuantity"], 4);
        assert_eq!(json["ingredientId"], purchase.ingredient_id.key());
    }
}
