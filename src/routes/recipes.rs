//! Recipe routes: recipe and ingredient CRUD plus meal plan management.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json as AxumJson};
use axum::{Extension, Json, Router, routing::{delete, get, post, put}};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::database::models::{Ingredient, Recipe, RecipeUpdate};
use crate::error::AppError;
use crate::server::AppState;
use crate::validation::require_nonblank;

#[derive(Deserialize)]
pub struct RecipesQuery {
    pub q: Option<String>,
    pub filter: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipeRequest {
    pub name: Option<String>,
    pub total_time: Option<String>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub ingredient_ids: Option<Vec<Uuid>>,
    pub ingredient_names: Option<Vec<String>>,
    pub ingredient_amounts: Option<Vec<Option<String>>>,
}

#[derive(Deserialize)]
pub struct CreateIngredientRequest {
    pub name: String,
    pub amount: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRequest {
    pub meal_plan_multiplier: i32,
}

pub async fn get_recipes(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<RecipesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let meal_plan_only = params.filter.as_deref() == Some("mealPlanOnly");
    let recipes =
        Recipe::fetch_for_user(state.db.pool(), user.id, params.q.as_deref(), meal_plan_only)
            .await?;
    Ok(AxumJson(json!({ "recipes": recipes })))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = Recipe::create_default(state.db.pool(), user.id).await?;
    Ok(AxumJson(json!({ "recipe": recipe })))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(recipe_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = can_change_recipe(&state, user.id, recipe_id).await?;
    let ingredients = Ingredient::fetch_for_recipe(state.db.pool(), recipe.id).await?;
    Ok(AxumJson(json!({ "recipe": recipe, "ingredients": ingredients })))
}

/// Save recipe fields and, when the parallel ingredient arrays are
/// provided, the existing ingredients in one request.
pub async fn save_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<SaveRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    can_change_recipe(&state, user.id, recipe_id).await?;

    if let Some(name) = &payload.name {
        require_nonblank("name", name, "recipe name cannot be blank")?;
    }
    if let Some(total_time) = &payload.total_time {
        require_nonblank("totalTime", total_time, "total time cannot be blank")?;
    }
    if let Some(instructions) = &payload.instructions {
        require_nonblank("instructions", instructions, "instructions cannot be blank")?;
    }

    // someone could drop an element client-side and submit mismatched
    // arrays, silently corrupting other ingredients
    let ids = payload.ingredient_ids.as_deref().unwrap_or_default();
    let names = payload.ingredient_names.as_deref().unwrap_or_default();
    let amounts = payload.ingredient_amounts.as_deref().unwrap_or_default();
    if ids.len() != names.len() || ids.len() != amounts.len() {
        return Err(AppError::validation(
            "ingredients",
            "Ingredient arrays must all be the same length",
        ));
    }
    for name in names {
        require_nonblank("ingredientNames", name, "ingredient name cannot be blank")?;
    }

    // the recipe guard above says nothing about the submitted ingredient
    // ids; each one must belong to this recipe or the save could reach
    // into another user's recipes
    let existing = Ingredient::fetch_for_recipe(state.db.pool(), recipe_id).await?;
    require_ingredients_of_recipe(ids, &existing)?;

    let recipe = Recipe::update(
        state.db.pool(),
        recipe_id,
        RecipeUpdate {
            name: payload.name.as_deref(),
            total_time: payload.total_time.as_deref(),
            instructions: payload.instructions.as_deref(),
            image_url: payload.image_url.as_deref(),
        },
    )
    .await?;

    for ((id, name), amount) in ids.iter().zip(names).zip(amounts) {
        Ingredient::update(state.db.pool(), *id, recipe_id, name, amount.as_deref()).await?;
    }

    let ingredients = Ingredient::fetch_for_recipe(state.db.pool(), recipe.id).await?;
    Ok(AxumJson(json!({ "recipe": recipe, "ingredients": ingredients })))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(recipe_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    can_change_recipe(&state, user.id, recipe_id).await?;
    Recipe::delete(state.db.pool(), recipe_id).await?;
    Ok(AxumJson(json!({ "message": "deleted" })))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<CreateIngredientRequest>,
) -> Result<impl IntoResponse, AppError> {
    can_change_recipe(&state, user.id, recipe_id).await?;
    require_nonblank("name", &payload.name, "name cannot be blank")?;

    let ingredient = Ingredient::create(
        state.db.pool(),
        recipe_id,
        payload.name.trim(),
        payload.amount.as_deref(),
    )
    .await?;
    Ok(AxumJson(json!({ "ingredient": ingredient })))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(ingredient_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(ingredient) = Ingredient::get_by_id(state.db.pool(), ingredient_id).await? {
        can_change_recipe(&state, user.id, ingredient.recipe_id).await?;
        Ingredient::delete(state.db.pool(), ingredient.id).await?;
    }
    Ok(AxumJson(json!({ "message": "deleted" })))
}

pub async fn update_meal_plan(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<MealPlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    can_change_recipe(&state, user.id, recipe_id).await?;
    if payload.meal_plan_multiplier < 1 {
        return Err(AppError::validation(
            "mealPlanMultiplier",
            "multiplier must be at least 1",
        ));
    }
    let recipe = Recipe::set_meal_plan_multiplier(
        state.db.pool(),
        recipe_id,
        Some(payload.meal_plan_multiplier),
    )
    .await?;
    Ok(AxumJson(json!({ "recipe": recipe })))
}

pub async fn remove_from_meal_plan(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(recipe_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    can_change_recipe(&state, user.id, recipe_id).await?;
    let recipe = Recipe::set_meal_plan_multiplier(state.db.pool(), recipe_id, None).await?;
    Ok(AxumJson(json!({ "recipe": recipe })))
}

pub async fn clear_meal_plan(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let cleared = Recipe::clear_meal_plan(state.db.pool(), user.id).await?;
    Ok(AxumJson(json!({ "cleared": cleared })))
}

/// Reject any submitted ingredient id that is not one of the recipe's own
/// ingredients.
fn require_ingredients_of_recipe(
    ids: &[Uuid],
    recipe_ingredients: &[Ingredient],
) -> Result<(), AppError> {
    for id in ids {
        if !recipe_ingredients.iter().any(|i| i.id == *id) {
            return Err(AppError::validation(
                "ingredientIds",
                "ingredient does not belong to this recipe",
            ));
        }
    }
    Ok(())
}

/// Both recipe detail and meal plan routes need the same guard: the
/// recipe must exist and belong to the caller.
async fn can_change_recipe(
    state: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<Recipe, AppError> {
    let recipe = Recipe::get_by_id(state.db.pool(), recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound("recipe does not exist".to_string()))?;
    if recipe.user_id != user_id {
        return Err(AppError::Unauthorized(
            "You are not authorized to update this recipe".to_string(),
        ));
    }
    Ok(recipe)
}

pub fn create_recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/api/recipes", get(get_recipes))
        .route("/api/recipes", post(create_recipe))
        .route("/api/recipes/clear-meal-plan", post(clear_meal_plan))
        .route("/api/recipes/{id}", get(get_recipe))
        .route("/api/recipes/{id}", put(save_recipe))
        .route("/api/recipes/{id}", delete(delete_recipe))
        .route("/api/recipes/{id}/ingredients", post(create_ingredient))
        .route("/api/recipes/{id}/meal-plan", post(update_meal_plan))
        .route("/api/recipes/{id}/meal-plan", delete(remove_from_meal_plan))
        .route("/api/ingredients/{id}", delete(delete_ingredient))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ingredient_of(recipe_id: Uuid) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            recipe_id,
            name: "Eggs".to_string(),
            amount: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_own_ingredient_ids_accepted() {
        let recipe_id = Uuid::new_v4();
        let own = vec![ingredient_of(recipe_id), ingredient_of(recipe_id)];
        let ids: Vec<Uuid> = own.iter().map(|i| i.id).collect();
        assert!(require_ingredients_of_recipe(&ids, &own).is_ok());
        assert!(require_ingredients_of_recipe(&[], &own).is_ok());
    }

    #[test]
    fn test_foreign_ingredient_id_rejected() {
        // an id from some other recipe smuggled into the save request must
        // not reach the update loop
        let recipe_id = Uuid::new_v4();
        let own = vec![ingredient_of(recipe_id)];
        let foreign = ingredient_of(Uuid::new_v4());

        let err = require_ingredients_of_recipe(&[own[0].id, foreign.id], &own).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // even alone, with no legitimate ids alongside it
        assert!(require_ingredients_of_recipe(&[foreign.id], &own).is_err());
    }
}
