use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::models::{
    Ingredient, IngredientUsage, Meal, NewIngredient, NewMeal, NewPantryItem, PantryItem,
};

/// SQLite-backed store. Every table carries a `user_id` column so one
/// database file can hold several users' records, mirroring the
/// `users/{uid}/...` hierarchy of the hosted store this replaces. All
/// queries are scoped by the caller-supplied user id.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_id INTEGER NOT NULL REFERENCES meals(id),
                    ingredient_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    quantity INTEGER NOT NULL DEFAULT 1,
                    notes TEXT,
                    position INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS selected_meals (
                    user_id TEXT NOT NULL,
                    meal_id INTEGER NOT NULL,
                    UNIQUE (user_id, meal_id)
                );

                CREATE TABLE IF NOT EXISTS pantry_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_ingredients_user ON ingredients(user_id, name);
                CREATE INDEX IF NOT EXISTS idx_meals_user ON meals(user_id);
                CREATE INDEX IF NOT EXISTS idx_meal_ingredients_meal ON meal_ingredients(meal_id);
                CREATE INDEX IF NOT EXISTS idx_selected_meals_user ON selected_meals(user_id);
                CREATE INDEX IF NOT EXISTS idx_pantry_items_user ON pantry_items(user_id, name);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn ingredient_from_row(row: &rusqlite::Row) -> rusqlite::Result<Ingredient> {
        Ok(Ingredient {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn pantry_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<PantryItem> {
        Ok(PantryItem {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn usage_from_row(row: &rusqlite::Row) -> rusqlite::Result<IngredientUsage> {
        Ok(IngredientUsage {
            ingredient_id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            quantity: row.get(3)?,
            notes: row.get(4)?,
        })
    }

    // --- Ingredients ---

    pub fn insert_ingredient(&self, user_id: &str, ingredient: &NewIngredient) -> Result<Ingredient> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO ingredients (uuid, user_id, name, category, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid,
                user_id,
                ingredient.name,
                ingredient.category,
                ingredient.notes,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_ingredient_by_id(user_id, id)
    }

    pub fn get_ingredient_by_id(&self, user_id: &str, id: i64) -> Result<Ingredient> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, category, notes, created_at, updated_at
                 FROM ingredients WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                Self::ingredient_from_row,
            )
            .context("Ingredient not found")
    }

    pub fn get_ingredient_by_name(&self, user_id: &str, name: &str) -> Result<Option<Ingredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, category, notes, created_at, updated_at
             FROM ingredients WHERE user_id = ?1 AND LOWER(name) = LOWER(?2)
             ORDER BY id LIMIT 1",
        )?;
        let mut rows = stmt.query(params![user_id, name])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::ingredient_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn list_ingredients(&self, user_id: &str, search: Option<&str>) -> Result<Vec<Ingredient>> {
        if let Some(query) = search {
            let escaped = query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            let pattern = format!("%{escaped}%");
            let mut stmt = self.conn.prepare(
                "SELECT id, uuid, name, category, notes, created_at, updated_at
                 FROM ingredients
                 WHERE user_id = ?1 AND name LIKE ?2 ESCAPE '\\'
                 ORDER BY category, name",
            )?;
            let ingredients = stmt
                .query_map(params![user_id, pattern], Self::ingredient_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ingredients);
        }
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, category, notes, created_at, updated_at
             FROM ingredients WHERE user_id = ?1 ORDER BY category, name",
        )?;
        let ingredients = stmt
            .query_map(params![user_id], Self::ingredient_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    pub fn update_ingredient(
        &self,
        user_id: &str,
        id: i64,
        ingredient: &NewIngredient,
    ) -> Result<Ingredient> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE ingredients SET name = ?1, category = ?2, notes = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                ingredient.name,
                ingredient.category,
                ingredient.notes,
                now,
                id,
                user_id,
            ],
        )?;
        if rows == 0 {
            bail!("Ingredient not found");
        }
        self.get_ingredient_by_id(user_id, id)
    }

    /// Delete a catalog entry and remove its usages from every meal of the
    /// same user. Returns false when no catalog row matched.
    pub fn delete_ingredient(&self, user_id: &str, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM ingredients WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Ok(false);
        }
        self.conn.execute(
            "DELETE FROM meal_ingredients
             WHERE ingredient_id = ?1
               AND meal_id IN (SELECT id FROM meals WHERE user_id = ?2)",
            params![id, user_id],
        )?;
        Ok(true)
    }

    // --- Meals ---

    pub fn insert_meal(&self, user_id: &str, meal: &NewMeal) -> Result<Meal> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO meals (uuid, user_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uuid, user_id, meal.title, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.replace_meal_usages(id, &meal.ingredients)?;
        self.get_meal(user_id, id)
    }

    pub fn get_meal(&self, user_id: &str, id: i64) -> Result<Meal> {
        let mut meal = self
            .conn
            .query_row(
                "SELECT id, uuid, title, created_at, updated_at
                 FROM meals WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                |row| {
                    Ok(Meal {
                        id: row.get(0)?,
                        uuid: row.get(1)?,
                        title: row.get(2)?,
                        ingredients: Vec::new(),
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .context("Meal not found")?;
        meal.ingredients = self.meal_usages(id)?;
        Ok(meal)
    }

    pub fn get_meal_by_title(&self, user_id: &str, title: &str) -> Result<Meal> {
        let id: i64 = self
            .conn
            .query_row(
                "SELECT id FROM meals WHERE user_id = ?1 AND LOWER(title) = LOWER(?2)
                 ORDER BY id LIMIT 1",
                params![user_id, title],
                |row| row.get(0),
            )
            .context(format!("Meal '{title}' not found"))?;
        self.get_meal(user_id, id)
    }

    /// All meals of the user in creation order, usages included.
    pub fn list_meals(&self, user_id: &str) -> Result<Vec<Meal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, title, created_at, updated_at
             FROM meals WHERE user_id = ?1 ORDER BY id",
        )?;
        let mut meals = stmt
            .query_map(params![user_id], |row| {
                Ok(Meal {
                    id: row.get(0)?,
                    uuid: row.get(1)?,
                    title: row.get(2)?,
                    ingredients: Vec::new(),
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for meal in &mut meals {
            meal.ingredients = self.meal_usages(meal.id)?;
        }
        Ok(meals)
    }

    /// Replace a meal's title and full usage list.
    pub fn update_meal(&self, user_id: &str, id: i64, meal: &NewMeal) -> Result<Meal> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE meals SET title = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
            params![meal.title, now, id, user_id],
        )?;
        if rows == 0 {
            bail!("Meal not found");
        }
        self.conn.execute(
            "DELETE FROM meal_ingredients WHERE meal_id = ?1",
            params![id],
        )?;
        self.replace_meal_usages(id, &meal.ingredients)?;
        self.get_meal(user_id, id)
    }

    /// Append a usage at the end of a meal's list.
    pub fn append_meal_usage(&self, user_id: &str, id: i64, usage: &IngredientUsage) -> Result<Meal> {
        // Verify ownership before touching the child table
        self.get_meal(user_id, id)?;
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM meal_ingredients WHERE meal_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO meal_ingredients (meal_id, ingredient_id, name, category, quantity, notes, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                usage.ingredient_id,
                usage.name,
                usage.category,
                usage.quantity,
                usage.notes,
                next,
            ],
        )?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE meals SET updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        self.get_meal(user_id, id)
    }

    /// Delete a meal, its usages, and its entry in the selection set.
    pub fn delete_meal(&self, user_id: &str, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM meals WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Ok(false);
        }
        self.conn.execute(
            "DELETE FROM meal_ingredients WHERE meal_id = ?1",
            params![id],
        )?;
        self.conn.execute(
            "DELETE FROM selected_meals WHERE user_id = ?1 AND meal_id = ?2",
            params![user_id, id],
        )?;
        Ok(true)
    }

    fn meal_usages(&self, meal_id: i64) -> Result<Vec<IngredientUsage>> {
        let mut stmt = self.conn.prepare(
            "SELECT ingredient_id, name, category, quantity, notes
             FROM meal_ingredients WHERE meal_id = ?1 ORDER BY position",
        )?;
        let usages = stmt
            .query_map(params![meal_id], Self::usage_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(usages)
    }

    fn replace_meal_usages(&self, meal_id: i64, usages: &[IngredientUsage]) -> Result<()> {
        for (position, usage) in usages.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO meal_ingredients (meal_id, ingredient_id, name, category, quantity, notes, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    meal_id,
                    usage.ingredient_id,
                    usage.name,
                    usage.category,
                    usage.quantity,
                    usage.notes,
                    i64::try_from(position)?,
                ],
            )?;
        }
        Ok(())
    }

    // --- Selection set ---

    /// Replace the user's whole selection with the given meal ids.
    pub fn set_selected_meals(&self, user_id: &str, meal_ids: &[i64]) -> Result<()> {
        self.conn.execute(
            "DELETE FROM selected_meals WHERE user_id = ?1",
            params![user_id],
        )?;
        for meal_id in meal_ids {
            self.conn.execute(
                "INSERT OR IGNORE INTO selected_meals (user_id, meal_id) VALUES (?1, ?2)",
                params![user_id, meal_id],
            )?;
        }
        Ok(())
    }

    /// Add one meal id to the selection, keeping the rest.
    pub fn add_selected_meal(&self, user_id: &str, meal_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO selected_meals (user_id, meal_id) VALUES (?1, ?2)",
            params![user_id, meal_id],
        )?;
        Ok(())
    }

    pub fn get_selected_meal_ids(&self, user_id: &str) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT meal_id FROM selected_meals WHERE user_id = ?1 ORDER BY meal_id")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Snapshot of the selected meals that still exist, in creation order.
    /// Selection rows whose meal is gone are skipped (the join drops them).
    pub fn get_selected_meals(&self, user_id: &str) -> Result<Vec<Meal>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.uuid, m.title, m.created_at, m.updated_at
             FROM meals m
             JOIN selected_meals s ON s.meal_id = m.id AND s.user_id = m.user_id
             WHERE m.user_id = ?1
             ORDER BY m.id",
        )?;
        let mut meals = stmt
            .query_map(params![user_id], |row| {
                Ok(Meal {
                    id: row.get(0)?,
                    uuid: row.get(1)?,
                    title: row.get(2)?,
                    ingredients: Vec::new(),
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for meal in &mut meals {
            meal.ingredients = self.meal_usages(meal.id)?;
        }
        Ok(meals)
    }

    // --- Pantry ---

    pub fn insert_pantry_item(&self, user_id: &str, item: &NewPantryItem) -> Result<PantryItem> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO pantry_items (uuid, user_id, name, category, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![uuid, user_id, item.name, item.category, item.notes, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_pantry_item_by_id(user_id, id)
    }

    pub fn get_pantry_item_by_id(&self, user_id: &str, id: i64) -> Result<PantryItem> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, category, notes, created_at, updated_at
                 FROM pantry_items WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                Self::pantry_item_from_row,
            )
            .context("Pantry item not found")
    }

    pub fn get_pantry_item_by_name(&self, user_id: &str, name: &str) -> Result<Option<PantryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, category, notes, created_at, updated_at
             FROM pantry_items WHERE user_id = ?1 AND LOWER(name) = LOWER(?2)
             ORDER BY id LIMIT 1",
        )?;
        let mut rows = stmt.query(params![user_id, name])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::pantry_item_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn list_pantry_items(&self, user_id: &str, search: Option<&str>) -> Result<Vec<PantryItem>> {
        if let Some(query) = search {
            let escaped = query
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            let pattern = format!("%{escaped}%");
            let mut stmt = self.conn.prepare(
                "SELECT id, uuid, name, category, notes, created_at, updated_at
                 FROM pantry_items
                 WHERE user_id = ?1 AND name LIKE ?2 ESCAPE '\\'
                 ORDER BY category, name",
            )?;
            let items = stmt
                .query_map(params![user_id, pattern], Self::pantry_item_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(items);
        }
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, category, notes, created_at, updated_at
             FROM pantry_items WHERE user_id = ?1 ORDER BY category, name",
        )?;
        let items = stmt
            .query_map(params![user_id], Self::pantry_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn delete_pantry_item(&self, user_id: &str, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM pantry_items WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(rows > 0)
    }
}
