//! Database Models
//!
//! Tokio-postgres compatible models for all relational entities: users,
//! pantry shelves and items, recipes, and ingredients. Query helpers live
//! next to the model they return.

use anyhow::Result;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

/// Trait for converting from a tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>
    where
        Self: Sized;
}

/// Build a literal-substring ILIKE pattern from a user-supplied search
/// term. `%`, `_`, and `\` in the term must match themselves, not act as
/// wildcards.
fn contains_pattern(query: Option<&str>) -> String {
    let escaped = query
        .unwrap_or("")
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// ============================================================================
// USERS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A shell user still needs to complete sign-up with their name.
    pub fn profile_complete(&self) -> bool {
        !self.first_name.is_empty() && !self.last_name.is_empty()
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

// ============================================================================
// PANTRY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryShelf {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for PantryShelf {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl PantryShelf {
    /// Fetch a user's shelves, newest first, optionally filtered by a
    /// case-insensitive name search.
    pub async fn fetch_for_user(
        pool: &Pool,
        user_id: Uuid,
        query: Option<&str>,
    ) -> Result<Vec<Self>> {
        let client = pool.get().await?;
        let pattern = contains_pattern(query);
        let rows = client
            .query(
                "SELECT * FROM pantry_shelves
                 WHERE user_id = $1 AND name ILIKE $2
                 ORDER BY created_at DESC",
                &[&user_id, &pattern],
            )
            .await?;
        rows.iter().map(|r| Ok(Self::from_row(r)?)).collect()
    }

    pub async fn get_by_id(pool: &Pool, shelf_id: Uuid) -> Result<Option<Self>> {
        let client = pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM pantry_shelves WHERE id = $1", &[&shelf_id])
            .await?;
        Ok(row.map(|r| Self::from_row(&r)).transpose()?)
    }

    pub async fn find_by_name(pool: &Pool, user_id: Uuid, name: &str) -> Result<Option<Self>> {
        let client = pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM pantry_shelves WHERE user_id = $1 AND name = $2",
                &[&user_id, &name],
            )
            .await?;
        Ok(row.map(|r| Self::from_row(&r)).transpose()?)
    }

    pub async fn create(pool: &Pool, user_id: Uuid, name: &str) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO pantry_shelves (user_id, name) VALUES ($1, $2) RETURNING *",
                &[&user_id, &name],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    pub async fn rename(pool: &Pool, shelf_id: Uuid, name: &str) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "UPDATE pantry_shelves SET name = $2, updated_at = NOW()
                 WHERE id = $1 RETURNING *",
                &[&shelf_id, &name],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    /// Items go with the shelf (ON DELETE CASCADE). Deleting an absent
    /// shelf is a no-op, mirroring tolerant delete semantics.
    pub async fn delete(pool: &Pool, shelf_id: Uuid) -> Result<u64> {
        let client = pool.get().await?;
        Ok(client
            .execute("DELETE FROM pantry_shelves WHERE id = $1", &[&shelf_id])
            .await?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shelf_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl FromRow for PantryItem {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            shelf_id: row.try_get("shelf_id")?,
            name: row.try_get("name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl PantryItem {
    pub async fn fetch_for_user(pool: &Pool, user_id: Uuid) -> Result<Vec<Self>> {
        let client = pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM pantry_items WHERE user_id = $1 ORDER BY name",
                &[&user_id],
            )
            .await?;
        rows.iter().map(|r| Ok(Self::from_row(r)?)).collect()
    }

    pub async fn get_by_id(pool: &Pool, item_id: Uuid) -> Result<Option<Self>> {
        let client = pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM pantry_items WHERE id = $1", &[&item_id])
            .await?;
        Ok(row.map(|r| Self::from_row(&r)).transpose()?)
    }

    pub async fn create(pool: &Pool, user_id: Uuid, shelf_id: Uuid, name: &str) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO pantry_items (user_id, shelf_id, name)
                 VALUES ($1, $2, $3) RETURNING *",
                &[&user_id, &shelf_id, &name],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    pub async fn delete(pool: &Pool, item_id: Uuid) -> Result<u64> {
        let client = pool.get().await?;
        Ok(client
            .execute("DELETE FROM pantry_items WHERE id = $1", &[&item_id])
            .await?)
    }
}

// ============================================================================
// RECIPES & INGREDIENTS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub total_time: String,
    pub image_url: String,
    pub instructions: String,
    pub meal_plan_multiplier: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for Recipe {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            total_time: row.try_get("total_time")?,
            image_url: row.try_get("image_url")?,
            instructions: row.try_get("instructions")?,
            meal_plan_multiplier: row.try_get("meal_plan_multiplier")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Fields a recipe update may touch; `None` leaves the column alone.
#[derive(Debug, Default)]
pub struct RecipeUpdate<'a> {
    pub name: Option<&'a str>,
    pub total_time: Option<&'a str>,
    pub instructions: Option<&'a str>,
    pub image_url: Option<&'a str>,
}

impl Recipe {
    pub async fn fetch_for_user(
        pool: &Pool,
        user_id: Uuid,
        query: Option<&str>,
        meal_plan_only: bool,
    ) -> Result<Vec<Self>> {
        let client = pool.get().await?;
        let pattern = contains_pattern(query);
        let sql = if meal_plan_only {
            "SELECT * FROM recipes
             WHERE user_id = $1 AND name ILIKE $2 AND meal_plan_multiplier IS NOT NULL
             ORDER BY created_at DESC"
        } else {
            "SELECT * FROM recipes
             WHERE user_id = $1 AND name ILIKE $2
             ORDER BY created_at DESC"
        };
        let rows = client.query(sql, &[&user_id, &pattern]).await?;
        rows.iter().map(|r| Ok(Self::from_row(r)?)).collect()
    }

    pub async fn get_by_id(pool: &Pool, recipe_id: Uuid) -> Result<Option<Self>> {
        let client = pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM recipes WHERE id = $1", &[&recipe_id])
            .await?;
        Ok(row.map(|r| Self::from_row(&r)).transpose()?)
    }

    /// Create a stub recipe for the user to edit, mirroring the empty
    /// state a freshly created recipe starts in.
    pub async fn create_default(pool: &Pool, user_id: Uuid) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO recipes (user_id, name, total_time, image_url, instructions)
                 VALUES ($1, 'New Recipe', '0 min', '', 'to be created')
                 RETURNING *",
                &[&user_id],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    pub async fn update(pool: &Pool, recipe_id: Uuid, update: RecipeUpdate<'_>) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "UPDATE recipes SET
                     name = COALESCE($2, name),
                     total_time = COALESCE($3, total_time),
                     instructions = COALESCE($4, instructions),
                     image_url = COALESCE($5, image_url),
                     updated_at = NOW()
                 WHERE id = $1 RETURNING *",
                &[
                    &recipe_id,
                    &update.name,
                    &update.total_time,
                    &update.instructions,
                    &update.image_url,
                ],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    pub async fn delete(pool: &Pool, recipe_id: Uuid) -> Result<u64> {
        let client = pool.get().await?;
        Ok(client
            .execute("DELETE FROM recipes WHERE id = $1", &[&recipe_id])
            .await?)
    }

    pub async fn set_meal_plan_multiplier(
        pool: &Pool,
        recipe_id: Uuid,
        multiplier: Option<i32>,
    ) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "UPDATE recipes SET meal_plan_multiplier = $2, updated_at = NOW()
                 WHERE id = $1 RETURNING *",
                &[&recipe_id, &multiplier],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    /// Take every one of the user's recipes off the meal plan.
    pub async fn clear_meal_plan(pool: &Pool, user_id: Uuid) -> Result<u64> {
        let client = pool.get().await?;
        Ok(client
            .execute(
                "UPDATE recipes SET meal_plan_multiplier = NULL, updated_at = NOW()
                 WHERE user_id = $1 AND meal_plan_multiplier IS NOT NULL",
                &[&user_id],
            )
            .await?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub name: String,
    pub amount: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromRow for Ingredient {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            recipe_id: row.try_get("recipe_id")?,
            name: row.try_get("name")?,
            amount: row.try_get("amount")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Ingredient {
    pub async fn fetch_for_recipe(pool: &Pool, recipe_id: Uuid) -> Result<Vec<Self>> {
        let client = pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM ingredients WHERE recipe_id = $1 ORDER BY created_at",
                &[&recipe_id],
            )
            .await?;
        rows.iter().map(|r| Ok(Self::from_row(r)?)).collect()
    }

    pub async fn create(
        pool: &Pool,
        recipe_id: Uuid,
        name: &str,
        amount: Option<&str>,
    ) -> Result<Self> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO ingredients (recipe_id, name, amount)
                 VALUES ($1, $2, $3) RETURNING *",
                &[&recipe_id, &name, &amount],
            )
            .await?;
        Ok(Self::from_row(&row)?)
    }

    pub async fn get_by_id(pool: &Pool, ingredient_id: Uuid) -> Result<Option<Self>> {
        let client = pool.get().await?;
        let row = client
            .query_opt(
                "SELECT * FROM ingredients WHERE id = $1",
                &[&ingredient_id],
            )
            .await?;
        Ok(row.map(|r| Self::from_row(&r)).transpose()?)
    }

    /// Scoped to the recipe so an id belonging to another recipe (and
    /// possibly another user) is never touched.
    pub async fn update(
        pool: &Pool,
        ingredient_id: Uuid,
        recipe_id: Uuid,
        name: &str,
        amount: Option<&str>,
    ) -> Result<u64> {
        let client = pool.get().await?;
        Ok(client
            .execute(
                "UPDATE ingredients SET name = $2, amount = $3
                 WHERE id = $1 AND recipe_id = $4",
                &[&ingredient_id, &name, &amount, &recipe_id],
            )
            .await?)
    }

    pub async fn delete(pool: &Pool, ingredient_id: Uuid) -> Result<u64> {
        let client = pool.get().await?;
        Ok(client
            .execute("DELETE FROM ingredients WHERE id = $1", &[&ingredient_id])
            .await?)
    }
}

// ============================================================================
// MEAL PLAN JOIN ROW
// ============================================================================

/// Ingredient pre-joined with its recipe's meal-plan state, the input row
/// for grocery list derivation. The query guarantees a non-null multiplier;
/// the deriver still guards against a violation of that invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct MealPlanIngredient {
    pub id: Uuid,
    pub name: String,
    pub amount: Option<String>,
    pub recipe_id: Uuid,
    pub recipe_name: String,
    pub meal_plan_multiplier: Option<i32>,
}

impl MealPlanIngredient {
    /// All ingredients belonging to the user's meal-plan recipes.
    pub async fn fetch_for_user(pool: &Pool, user_id: Uuid) -> Result<Vec<Self>> {
        let client = pool.get().await?;
        let rows = client
            .query(
                "SELECT i.id, i.name, i.amount, i.recipe_id,
                        r.name AS recipe_name, r.meal_plan_multiplier
                 FROM ingredients i
                 JOIN recipes r ON r.id = i.recipe_id
                 WHERE r.user_id = $1 AND r.meal_plan_multiplier IS NOT NULL
                 ORDER BY i.created_at",
                &[&user_id],
            )
            .await?;
        rows.iter()
            .map(|row| {
                Ok(Self {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    amount: row.try_get("amount")?,
                    recipe_id: row.try_get("recipe_id")?,
                    recipe_name: row.try_get("recipe_name")?,
                    meal_plan_multiplier: row.try_get("meal_plan_multiplier")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_wraps_term() {
        assert_eq!(contains_pattern(None), "%%");
        assert_eq!(contains_pattern(Some("milk")), "%milk%");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        // a search for "100%" must not match every shelf
        assert_eq!(contains_pattern(Some("100%")), "%100\\%%");
        assert_eq!(contains_pattern(Some("a_b")), "%a\\_b%");
        assert_eq!(contains_pattern(Some("back\\slash")), "%back\\\\slash%");
    }
}
