//! Recipe and ingredient data entry.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use domain::{CreateIngredientRequest, CreateRecipeRequest, Ingredient, Recipe, parse};
use queue::MessageQueue;
use store::{Page, RecordStore, RecordStoreExt, Table};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::ListParams;

/// POST /kitchen/recipes
#[tracing::instrument(skip(state, body))]
pub async fn create_recipe<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Recipe>), ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let request: CreateRecipeRequest = parse(Some(body.as_ref()))?;
    let recipe = state.create_recipe.handle(request).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /kitchen/recipes
#[tracing::instrument(skip(state))]
pub async fn list_recipes<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Recipe>>, ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let scan = params.scan(state.page_limit)?;
    Ok(Json(state.store.scan_records(Table::Recipes, scan).await?))
}

/// POST /kitchen/ingredients
#[tracing::instrument(skip(state, body))]
pub async fn create_ingredient<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Ingredient>), ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let request: CreateIngredientRequest = parse(Some(body.as_ref()))?;
    let ingredient = state.create_ingredient.handle(request).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

/// GET /kitchen/ingredients
#[tracing::instrument(skip(state))]
pub async fn list_ingredients<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Ingredient>>, ApiError>
where
    S: RecordStore + Clone + 'static,
    Q: MessageQueue + Clone + 'static,
{
    let scan = params.scan(state.page_limit)?;
    Ok(Json(state.store.scan_records(Table::Ingredients, scan).await?))
}
