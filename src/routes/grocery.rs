//! Grocery list routes: derive the list and check items off into a
//! dated pantry shelf.

use axum::extract::State;
use axum::response::{IntoResponse, Json as AxumJson};
use axum::{Extension, Json, Router, routing::{get, post}};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::middleware::CurrentUser;
use crate::database::models::{MealPlanIngredient, PantryItem, PantryShelf};
use crate::error::AppError;
use crate::server::AppState;
use crate::services::grocery_list::derive_grocery_list;
use crate::validation::require_nonblank;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOffRequest {
    pub grocery_name: String,
}

/// Derived fresh on every read; nothing about the list is persisted.
pub async fn get_grocery_list(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let pool = state.db.pool();
    let (ingredients, pantry_items) = tokio::try_join!(
        MealPlanIngredient::fetch_for_user(pool, user.id),
        PantryItem::fetch_for_user(pool, user.id),
    )?;

    let grocery_list = derive_grocery_list(&ingredients, &pantry_items);
    Ok(AxumJson(json!({ "groceryList": grocery_list })))
}

fn grocery_shelf_name() -> String {
    format!("Grocery List: {}", Utc::now().format("%b %-d"))
}

/// Mark a grocery item as bought by adding it to today's grocery shelf,
/// creating that shelf on first check-off of the day.
pub async fn check_off_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CheckOffRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_nonblank("groceryName", &payload.grocery_name, "name cannot be blank")?;

    let pool = state.db.pool();
    let shelf_name = grocery_shelf_name();
    let shelf = match PantryShelf::find_by_name(pool, user.id, &shelf_name).await? {
        Some(shelf) => shelf,
        None => PantryShelf::create(pool, user.id, &shelf_name).await?,
    };

    let item = PantryItem::create(pool, user.id, shelf.id, &payload.grocery_name).await?;
    Ok(AxumJson(json!({ "item": item })))
}

pub fn create_grocery_routes() -> Router<AppState> {
    Router::new()
        .route("/api/grocery-list", get(get_grocery_list))
        .route("/api/grocery-list/check-off", post(check_off_item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grocery_shelf_name_shape() {
        let name = grocery_shelf_name();
        assert!(name.starts_with("Grocery List: "));
        // "Grocery List: Aug 4", never zero-padded
        assert!(!name.contains(" 0"));
    }
}
