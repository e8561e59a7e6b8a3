use std::path::Path;

use anyhow::{Result, bail};

use crate::aggregate::aggregate_meals;
use crate::catalog_import::{self, CatalogImportSummary};
use crate::db::Database;
use crate::export::render_html;
use crate::models::{
    Ingredient, IngredientUsage, Meal, NewIngredient, NewMeal, NewPantryItem, PantryItem,
    STANDALONE_MEAL_TITLE, ShoppingList, UserContext, normalize_notes, validate_category,
    validate_ingredient_name, validate_meal_title, validate_quantity, validate_usage,
};

/// Email-dispatch collaborator.
///
/// The CLI implements this with an HTTP client; tests use a mock. Dispatch
/// is fire-and-forget from the list's perspective: the result only feeds a
/// user-visible success/failure message.
pub trait ListMailer: Send + Sync {
    fn send(&self, to: &str, sender_name: &str, html_body: &str) -> Result<()>;
}

/// Facade over the store. Every operation takes the calling user's context
/// explicitly, so nothing in here reads ambient session state.
pub struct PlannerService {
    db: Database,
}

impl PlannerService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Ingredient catalog ---

    pub fn add_ingredient(&self, user: &UserContext, input: &NewIngredient) -> Result<Ingredient> {
        let name = validate_ingredient_name(&input.name)?;
        let category = validate_category(&input.category)?;
        if self.db.get_ingredient_by_name(&user.user_id, &name)?.is_some() {
            bail!("Ingredient '{name}' already exists");
        }
        self.db.insert_ingredient(
            &user.user_id,
            &NewIngredient {
                name,
                category,
                notes: normalize_notes(input.notes.as_deref()),
            },
        )
    }

    pub fn update_ingredient(
        &self,
        user: &UserContext,
        id: i64,
        input: &NewIngredient,
    ) -> Result<Ingredient> {
        let name = validate_ingredient_name(&input.name)?;
        let category = validate_category(&input.category)?;
        self.db.update_ingredient(
            &user.user_id,
            id,
            &NewIngredient {
                name,
                category,
                notes: normalize_notes(input.notes.as_deref()),
            },
        )
    }

    /// Delete a catalog entry; its usages are removed from every meal.
    pub fn delete_ingredient(&self, user: &UserContext, id: i64) -> Result<bool> {
        self.db.delete_ingredient(&user.user_id, id)
    }

    pub fn get_ingredient_by_name(&self, user: &UserContext, name: &str) -> Result<Ingredient> {
        self.db
            .get_ingredient_by_name(&user.user_id, name)?
            .ok_or_else(|| anyhow::anyhow!("Ingredient '{name}' not found"))
    }

    pub fn get_ingredient(&self, user: &UserContext, id: i64) -> Result<Ingredient> {
        self.db.get_ingredient_by_id(&user.user_id, id)
    }

    pub fn list_ingredients(&self, user: &UserContext, search: Option<&str>) -> Result<Vec<Ingredient>> {
        self.db.list_ingredients(&user.user_id, search)
    }

    /// Build a usage from a catalog entry, denormalizing its fields.
    pub fn usage_for(
        &self,
        user: &UserContext,
        name: &str,
        quantity: i64,
        notes: Option<&str>,
    ) -> Result<IngredientUsage> {
        validate_quantity(quantity)?;
        let ingredient = self.get_ingredient_by_name(user, name)?;
        Ok(IngredientUsage {
            ingredient_id: ingredient.id,
            name: ingredient.name,
            category: ingredient.category,
            quantity,
            notes: normalize_notes(notes).or(ingredient.notes),
        })
    }

    // --- Meals ---

    pub fn create_meal(&self, user: &UserContext, meal: &NewMeal) -> Result<Meal> {
        let title = validate_meal_title(&meal.title)?;
        for usage in &meal.ingredients {
            validate_usage(usage)?;
        }
        if self.db.get_meal_by_title(&user.user_id, &title).is_ok() {
            bail!("Meal '{title}' already exists");
        }
        self.db.insert_meal(
            &user.user_id,
            &NewMeal {
                title,
                ingredients: meal.ingredients.clone(),
            },
        )
    }

    /// Replace a meal's title and full ingredient list.
    pub fn update_meal(&self, user: &UserContext, id: i64, meal: &NewMeal) -> Result<Meal> {
        let title = validate_meal_title(&meal.title)?;
        for usage in &meal.ingredients {
            validate_usage(usage)?;
        }
        self.db.update_meal(
            &user.user_id,
            id,
            &NewMeal {
                title,
                ingredients: meal.ingredients.clone(),
            },
        )
    }

    /// Delete a meal; its id is pruned from the selection set.
    pub fn delete_meal(&self, user: &UserContext, id: i64) -> Result<bool> {
        self.db.delete_meal(&user.user_id, id)
    }

    pub fn get_meal(&self, user: &UserContext, id: i64) -> Result<Meal> {
        self.db.get_meal(&user.user_id, id)
    }

    pub fn get_meal_by_title(&self, user: &UserContext, title: &str) -> Result<Meal> {
        self.db.get_meal_by_title(&user.user_id, title)
    }

    pub fn list_meals(&self, user: &UserContext) -> Result<Vec<Meal>> {
        self.db.list_meals(&user.user_id)
    }

    // --- Selection set ---

    /// Replace the whole selection. Unknown meal ids are rejected.
    pub fn select_meals(&self, user: &UserContext, meal_ids: &[i64]) -> Result<()> {
        for &id in meal_ids {
            if self.db.get_meal(&user.user_id, id).is_err() {
                bail!("Meal with id {id} not found");
            }
        }
        self.db.set_selected_meals(&user.user_id, meal_ids)
    }

    pub fn selected_meal_ids(&self, user: &UserContext) -> Result<Vec<i64>> {
        self.db.get_selected_meal_ids(&user.user_id)
    }

    pub fn clear_selection(&self, user: &UserContext) -> Result<()> {
        self.db.set_selected_meals(&user.user_id, &[])
    }

    /// Build the shopping list: take an immutable snapshot of the selected
    /// meals, then run the pure aggregator over it.
    pub fn shopping_list(&self, user: &UserContext) -> Result<ShoppingList> {
        let meals = self.db.get_selected_meals(&user.user_id)?;
        let items = aggregate_meals(&meals);
        Ok(ShoppingList {
            meal_titles: meals.into_iter().map(|m| m.title).collect(),
            items,
        })
    }

    // --- One-off items ---

    /// Add a one-off item straight to the list: make sure a catalog entry
    /// exists, append a usage to the reserved standalone meal, and keep that
    /// meal selected.
    pub fn quick_add(
        &self,
        user: &UserContext,
        name: &str,
        category: &str,
        quantity: i64,
        notes: Option<&str>,
    ) -> Result<Meal> {
        let name = validate_ingredient_name(name)?;
        let category = validate_category(category)?;
        validate_quantity(quantity)?;
        let notes = normalize_notes(notes);

        let ingredient = match self.db.get_ingredient_by_name(&user.user_id, &name)? {
            Some(existing) => existing,
            None => self.db.insert_ingredient(
                &user.user_id,
                &NewIngredient {
                    name: name.clone(),
                    category: category.clone(),
                    notes: notes.clone(),
                },
            )?,
        };

        let standalone = self.standalone_meal(user)?;
        let usage = IngredientUsage {
            ingredient_id: ingredient.id,
            name,
            category,
            quantity,
            notes,
        };
        let meal = self.db.append_meal_usage(&user.user_id, standalone.id, &usage)?;
        self.db.add_selected_meal(&user.user_id, standalone.id)?;
        Ok(meal)
    }

    fn standalone_meal(&self, user: &UserContext) -> Result<Meal> {
        match self.db.get_meal_by_title(&user.user_id, STANDALONE_MEAL_TITLE) {
            Ok(meal) => Ok(meal),
            Err(_) => self.db.insert_meal(
                &user.user_id,
                &NewMeal {
                    title: STANDALONE_MEAL_TITLE.to_string(),
                    ingredients: Vec::new(),
                },
            ),
        }
    }

    // --- Pantry ---

    /// Add a staple to the pantry. Also upserts a matching catalog entry so
    /// picks can reference it.
    pub fn add_pantry_item(&self, user: &UserContext, input: &NewPantryItem) -> Result<PantryItem> {
        let name = validate_ingredient_name(&input.name)?;
        let category = validate_category(&input.category)?;
        let notes = normalize_notes(input.notes.as_deref());
        if self.db.get_pantry_item_by_name(&user.user_id, &name)?.is_some() {
            bail!("Pantry item '{name}' already exists");
        }

        if self.db.get_ingredient_by_name(&user.user_id, &name)?.is_none() {
            self.db.insert_ingredient(
                &user.user_id,
                &NewIngredient {
                    name: name.clone(),
                    category: category.clone(),
                    notes: notes.clone(),
                },
            )?;
        }

        self.db.insert_pantry_item(
            &user.user_id,
            &NewPantryItem {
                name,
                category,
                notes,
            },
        )
    }

    pub fn list_pantry_items(&self, user: &UserContext, search: Option<&str>) -> Result<Vec<PantryItem>> {
        self.db.list_pantry_items(&user.user_id, search)
    }

    pub fn remove_pantry_item(&self, user: &UserContext, name: &str) -> Result<bool> {
        match self.db.get_pantry_item_by_name(&user.user_id, name)? {
            Some(item) => self.db.delete_pantry_item(&user.user_id, item.id),
            None => Ok(false),
        }
    }

    /// Push a pantry staple onto the shopping list via the standalone meal.
    pub fn pick_pantry_item(&self, user: &UserContext, name: &str, quantity: i64) -> Result<Meal> {
        let item = self
            .db
            .get_pantry_item_by_name(&user.user_id, name)?
            .ok_or_else(|| anyhow::anyhow!("Pantry item '{name}' not found"))?;
        self.quick_add(user, &item.name, &item.category, quantity, item.notes.as_deref())
    }

    // --- Email export ---

    /// Build the current list, render it as HTML, and hand it to the
    /// dispatch collaborator. Returns the number of items sent.
    pub fn email_list(
        &self,
        user: &UserContext,
        mailer: &dyn ListMailer,
        to: &str,
        notes_enabled: bool,
    ) -> Result<usize> {
        if to.trim().is_empty() {
            bail!("Recipient email must not be empty");
        }
        let list = self.shopping_list(user)?;
        if list.items.is_empty() {
            bail!("Shopping list is empty — nothing to send");
        }
        let html = render_html(&list.items, notes_enabled);
        mailer.send(to, &user.display_name, &html)?;
        Ok(list.items.len())
    }

    // --- Catalog import ---

    pub fn import_catalog_csv(
        &self,
        user: &UserContext,
        csv_data: &str,
        dry_run: bool,
    ) -> Result<CatalogImportSummary> {
        let rows = catalog_import::parse_catalog_csv(csv_data.as_bytes())?;
        catalog_import::import_catalog(&self.db, &user.user_id, &rows, dry_run)
    }
}
