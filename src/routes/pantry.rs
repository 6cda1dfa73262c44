//! Pantry routes: shelf and item CRUD.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json as AxumJson};
use axum::{Extension, Json, Router, routing::{delete, get, post, put}};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::middleware::CurrentUser;
use crate::database::models::{PantryItem, PantryShelf};
use crate::error::AppError;
use crate::server::AppState;
use crate::validation::require_nonblank;

#[derive(Deserialize)]
pub struct PantryQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfWithItems {
    #[serde(flatten)]
    pub shelf: PantryShelf,
    pub items: Vec<PantryItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameShelfRequest {
    pub shelf_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub shelf_id: Uuid,
    pub name: String,
}

/// All of the user's shelves with their items, optionally filtered by a
/// case-insensitive shelf name search.
pub async fn get_pantry(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<PantryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pool = state.db.pool();
    let (shelves, items) = tokio::try_join!(
        PantryShelf::fetch_for_user(pool, user.id, params.q.as_deref()),
        PantryItem::fetch_for_user(pool, user.id),
    )?;

    let shelves: Vec<ShelfWithItems> = shelves
        .into_iter()
        .map(|shelf| {
            let items = items
                .iter()
                .filter(|item| item.shelf_id == shelf.id)
                .cloned()
                .collect();
            ShelfWithItems { shelf, items }
        })
        .collect();

    Ok(AxumJson(json!({ "shelves": shelves })))
}

pub async fn create_shelf(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let shelf = PantryShelf::create(state.db.pool(), user.id, "New Shelf").await?;
    Ok(AxumJson(json!({ "shelf": shelf })))
}

pub async fn rename_shelf(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(shelf_id): Path<Uuid>,
    Json(payload): Json<RenameShelfRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_nonblank("shelfName", &payload.shelf_name, "Shelf Name cannot be blank!")?;

    let shelf = require_owned_shelf(
        &state,
        user.id,
        shelf_id,
        "Sorry! This shelf is not yours so you cannot update the name",
    )
    .await?;

    let shelf = PantryShelf::rename(state.db.pool(), shelf.id, payload.shelf_name.trim()).await?;
    Ok(AxumJson(json!({ "shelf": shelf })))
}

pub async fn delete_shelf(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(shelf_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let shelf = require_owned_shelf(
        &state,
        user.id,
        shelf_id,
        "Sorry! This shelf is not yours so you cannot delete it",
    )
    .await?;

    PantryShelf::delete(state.db.pool(), shelf.id).await?;
    Ok(AxumJson(json!({ "message": "deleted" })))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_nonblank("name", &payload.name, "item name cannot be blank")?;

    require_owned_shelf(
        &state,
        user.id,
        payload.shelf_id,
        "Sorry! This shelf is not yours so you cannot add to it",
    )
    .await?;

    let item =
        PantryItem::create(state.db.pool(), user.id, payload.shelf_id, payload.name.trim())
            .await?;
    Ok(AxumJson(json!({ "item": item })))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // tolerate deleting an already-deleted item, but never someone else's
    if let Some(item) = PantryItem::get_by_id(state.db.pool(), item_id).await? {
        if item.user_id != user.id {
            return Err(AppError::Unauthorized(
                "Sorry! This item is not yours so you cannot delete it".to_string(),
            ));
        }
        PantryItem::delete(state.db.pool(), item.id).await?;
    }
    Ok(AxumJson(json!({ "message": "deleted" })))
}

async fn require_owned_shelf(
    state: &AppState,
    user_id: Uuid,
    shelf_id: Uuid,
    message: &str,
) -> Result<PantryShelf, AppError> {
    let shelf = PantryShelf::get_by_id(state.db.pool(), shelf_id)
        .await?
        .ok_or_else(|| AppError::NotFound("shelf does not exist".to_string()))?;
    if shelf.user_id != user_id {
        return Err(AppError::Unauthorized(message.to_string()));
    }
    Ok(shelf)
}

pub fn create_pantry_routes() -> Router<AppState> {
    Router::new()
        .route("/api/pantry", get(get_pantry))
        .route("/api/pantry/shelves", post(create_shelf))
        .route("/api/pantry/shelves/{id}", put(rename_shelf))
        .route("/api/pantry/shelves/{id}", delete(delete_shelf))
        .route("/api/pantry/items", post(create_item))
        .route("/api/pantry/items/{id}", delete(delete_item))
}
