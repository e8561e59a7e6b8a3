use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Grocery categories a catalog entry can belong to.
pub const CATEGORIES: &[&str] = &[
    "Bakery",
    "Beverages",
    "Dairy",
    "Frozen",
    "Meat",
    "Other",
    "Pantry",
    "Produce",
    "Seafood",
    "Spices",
];

pub const DEFAULT_CATEGORY: &str = "Other";

/// Title of the reserved meal that holds one-off items added straight to
/// the shopping list (quick-add and pantry picks).
pub const STANDALONE_MEAL_TITLE: &str = "Standalone Items";

/// A reusable catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub name: String,
    pub category: String,
    pub notes: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// An ingredient reference embedded in a meal. Carries denormalized
/// name/category so the list still renders after the catalog entry is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientUsage {
    pub ingredient_id: i64,
    pub name: String,
    pub category: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meal {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub title: String,
    pub ingredients: Vec<IngredientUsage>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMeal {
    pub title: String,
    pub ingredients: Vec<IngredientUsage>,
}

/// A staple the user regularly buys, kept separate from the meal catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryItem {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewPantryItem {
    pub name: String,
    pub category: String,
    pub notes: Option<String>,
}

/// A deduplicated, quantity-summed shopping-list entry.
///
/// Derived from the selected meals on every build, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedItem {
    pub ingredient_id: i64,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The built shopping list: the titles of the meals that fed it plus the
/// aggregated, category-sorted items.
#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    pub meal_titles: Vec<String>,
    pub items: Vec<AggregatedItem>,
}

/// Identity of the signed-in user.
///
/// Produced by the identity collaborator (locally: the profile file) and
/// threaded explicitly into every service call so nothing reads ambient
/// global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
}

pub fn validate_category(category: &str) -> Result<String> {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_CATEGORY.to_string());
    }
    match CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
    {
        Some(canonical) => Ok((*canonical).to_string()),
        None => bail!(
            "Invalid category '{category}'. Must be one of: {}",
            CATEGORIES.join(", ")
        ),
    }
}

pub fn validate_ingredient_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Ingredient name must not be empty");
    }
    Ok(trimmed.to_string())
}

pub fn validate_meal_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        bail!("Meal title must not be empty");
    }
    Ok(trimmed.to_string())
}

pub fn validate_quantity(quantity: i64) -> Result<()> {
    if quantity < 1 {
        bail!("Quantity must be at least 1 (got {quantity})");
    }
    Ok(())
}

/// Trim free-text notes, mapping empty input to `None`.
#[must_use]
pub fn normalize_notes(notes: Option<&str>) -> Option<String> {
    match notes {
        Some(n) => {
            let trimmed = n.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    }
}

/// Validate a usage before it is written into a meal: name, category,
/// and quantity must all be well-formed.
pub fn validate_usage(usage: &IngredientUsage) -> Result<()> {
    if usage.name.trim().is_empty() {
        bail!("Ingredient usage must carry a name");
    }
    validate_category(&usage.category)?;
    validate_quantity(usage.quantity)?;
    Ok(())
}
