//! Grocery List Deriver
//!
//! Computes, on each request, the ingredients the user still needs to buy
//! for their active meal plan: meal-plan ingredients minus pantry contents,
//! grouped by normalized name with per-recipe provenance. Derived output is
//! never persisted; it is regenerated on every read.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::database::models::{MealPlanIngredient, PantryItem};

/// One recipe's claim on a missing ingredient. Quantities from different
/// recipes are listed side by side, never summed or unit-converted.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListUse {
    pub id: Uuid,
    pub amount: Option<String>,
    pub recipe_name: String,
    pub multiplier: i32,
}

/// A missing ingredient, grouped case-insensitively across recipes.
/// `id` is borrowed from the first contributing ingredient purely for
/// client-side keying; the item has no stored identity across requests.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListItem {
    pub id: Uuid,
    pub name: String,
    pub used_by: Vec<GroceryListUse>,
}

/// Derive the grocery list from meal-plan ingredients and pantry inventory.
///
/// Pantry matching is exact, case-insensitive name equality. No fuzzy or
/// substring matching, no unit-aware quantity comparison.
///
/// Inputs are read-only; calling twice with the same inputs yields
/// content-equal output. Items appear in order of first appearance in the
/// ingredient list, which keeps the ordering deterministic.
///
/// The input query filters to recipes on the meal plan, so a null
/// multiplier here is a programmer error: loud in debug builds, excluded
/// with an error log in release.
pub fn derive_grocery_list(
    ingredients: &[MealPlanIngredient],
    pantry_items: &[PantryItem],
) -> Vec<GroceryListItem> {
    let owned: HashSet<String> = pantry_items
        .iter()
        .map(|item| item.name.to_lowercase())
        .collect();

    let mut items: Vec<GroceryListItem> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for ingredient in ingredients {
        let Some(multiplier) = ingredient.meal_plan_multiplier else {
            debug_assert!(
                false,
                "ingredient {} reached the deriver without a meal plan multiplier",
                ingredient.id
            );
            tracing::error!(
                ingredient_id = %ingredient.id,
                "skipping ingredient without a meal plan multiplier"
            );
            continue;
        };

        let name = ingredient.name.to_lowercase();
        if owned.contains(&name) {
            continue;
        }

        let used_by = GroceryListUse {
            id: ingredient.recipe_id,
            amount: ingredient.amount.clone(),
            recipe_name: ingredient.recipe_name.clone(),
            multiplier,
        };

        match index_by_name.get(&name) {
            Some(&i) => items[i].used_by.push(used_by),
            None => {
                index_by_name.insert(name.clone(), items.len());
                items.push(GroceryListItem {
                    id: ingredient.id,
                    name,
                    used_by: vec![used_by],
                });
            }
        }
    }

    items
}
