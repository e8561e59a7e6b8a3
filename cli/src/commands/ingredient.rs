use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::Style,
};

use larder_core::models::{NewIngredient, UserContext};
use larder_core::service::PlannerService;

use super::helpers::{json_error, notes_cell, truncate};

pub(crate) fn cmd_ingredient_add(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    category: &str,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let ingredient = svc.add_ingredient(
        user,
        &NewIngredient {
            name: name.to_string(),
            category: category.to_string(),
            notes,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ingredient)?);
    } else {
        let name = &ingredient.name;
        let category = &ingredient.category;
        let id = ingredient.id;
        println!("Added ingredient: {name} [{category}] (id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_ingredient_list(
    svc: &PlannerService,
    user: &UserContext,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct IngredientRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let ingredients = svc.list_ingredients(user, search)?;

    if ingredients.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No ingredients found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ingredients)?);
        return Ok(());
    }

    let rows: Vec<IngredientRow> = ingredients
        .iter()
        .map(|i| IngredientRow {
            id: i.id,
            name: truncate(&i.name, 35),
            category: i.category.clone(),
            notes: notes_cell(i.notes.as_deref()),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_ingredient_edit(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    new_name: Option<String>,
    category: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    if new_name.is_none() && category.is_none() && notes.is_none() {
        bail!("Nothing to update. Provide at least one of --name, --category, or --notes");
    }

    let existing = match svc.get_ingredient_by_name(user, name) {
        Ok(i) => i,
        Err(_) => {
            if json {
                println!("{}", json_error(&format!("Ingredient '{name}' not found")));
            } else {
                eprintln!("Ingredient '{name}' not found");
            }
            process::exit(2);
        }
    };

    let updated = svc.update_ingredient(
        user,
        existing.id,
        &NewIngredient {
            name: new_name.unwrap_or(existing.name),
            category: category.unwrap_or(existing.category),
            notes: notes.or(existing.notes),
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        let name = &updated.name;
        let category = &updated.category;
        println!("Updated ingredient: {name} [{category}]");
    }
    Ok(())
}

pub(crate) fn cmd_ingredient_delete(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    json: bool,
) -> Result<()> {
    let existing = match svc.get_ingredient_by_name(user, name) {
        Ok(i) => i,
        Err(_) => {
            if json {
                println!("{}", json_error(&format!("Ingredient '{name}' not found")));
            } else {
                eprintln!("Ingredient '{name}' not found");
            }
            process::exit(2);
        }
    };

    svc.delete_ingredient(user, existing.id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": existing.id }));
    } else {
        let name = &existing.name;
        println!("Deleted ingredient {name} (removed from all meals)");
    }
    Ok(())
}
