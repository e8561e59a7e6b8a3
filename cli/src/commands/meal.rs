use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::Style,
};

use larder_core::models::{IngredientUsage, NewMeal, UserContext};
use larder_core::service::PlannerService;

use super::helpers::{json_error, parse_usage_spec, truncate};

/// Resolve `"Name xQty"` specs against the catalog into denormalized usages.
fn resolve_usages(
    svc: &PlannerService,
    user: &UserContext,
    specs: &[String],
) -> Result<Vec<IngredientUsage>> {
    let mut usages = Vec::with_capacity(specs.len());
    for spec in specs {
        let (name, quantity) = parse_usage_spec(spec)?;
        let usage = svc.usage_for(user, &name, quantity, None).map_err(|e| {
            anyhow::anyhow!("{e}. Add it first with: larder ingredient add \"{name}\"")
        })?;
        usages.push(usage);
    }
    Ok(usages)
}

pub(crate) fn cmd_meal_create(
    svc: &PlannerService,
    user: &UserContext,
    title: &str,
    ingredient_specs: &[String],
    json: bool,
) -> Result<()> {
    let ingredients = resolve_usages(svc, user, ingredient_specs)?;
    let meal = svc.create_meal(
        user,
        &NewMeal {
            title: title.to_string(),
            ingredients,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else {
        let title = &meal.title;
        let count = meal.ingredients.len();
        let id = meal.id;
        println!("Created meal: {title} ({count} ingredients, id: {id})");
    }
    Ok(())
}

pub(crate) fn cmd_meal_list(svc: &PlannerService, user: &UserContext, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Ingredients")]
        ingredients: String,
        #[tabled(rename = "Selected")]
        selected: String,
    }

    let meals = svc.list_meals(user)?;

    if meals.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No meals found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&meals)?);
        return Ok(());
    }

    let selected = svc.selected_meal_ids(user)?;
    let rows: Vec<MealRow> = meals
        .iter()
        .map(|m| {
            let names: Vec<&str> = m.ingredients.iter().map(|u| u.name.as_str()).collect();
            MealRow {
                id: m.id,
                title: truncate(&m.title, 30),
                ingredients: truncate(&names.join(", "), 50),
                selected: if selected.contains(&m.id) { "*" } else { "" }.to_string(),
            }
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_meal_show(
    svc: &PlannerService,
    user: &UserContext,
    title: &str,
    json: bool,
) -> Result<()> {
    let meal = match svc.get_meal_by_title(user, title) {
        Ok(m) => m,
        Err(_) => {
            if json {
                println!("{}", json_error(&format!("Meal '{title}' not found")));
            } else {
                eprintln!("Meal '{title}' not found");
            }
            process::exit(2);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
        return Ok(());
    }

    let name = &meal.title;
    println!("=== {name} ===\n");

    if meal.ingredients.is_empty() {
        println!("  (no ingredients)");
        return Ok(());
    }

    for usage in &meal.ingredients {
        let uname = &usage.name;
        let category = &usage.category;
        let quantity = usage.quantity;
        let notes = usage
            .notes
            .as_ref()
            .map(|n| format!(" — {n}"))
            .unwrap_or_default();
        if quantity > 1 {
            println!("  ({quantity}) {uname} [{category}]{notes}");
        } else {
            println!("  {uname} [{category}]{notes}");
        }
    }

    Ok(())
}

pub(crate) fn cmd_meal_edit(
    svc: &PlannerService,
    user: &UserContext,
    title: &str,
    new_title: Option<String>,
    ingredient_specs: Option<Vec<String>>,
    json: bool,
) -> Result<()> {
    if new_title.is_none() && ingredient_specs.is_none() {
        bail!("Nothing to update. Provide --title and/or one or more --ingredient");
    }

    let existing = match svc.get_meal_by_title(user, title) {
        Ok(m) => m,
        Err(_) => {
            if json {
                println!("{}", json_error(&format!("Meal '{title}' not found")));
            } else {
                eprintln!("Meal '{title}' not found");
            }
            process::exit(2);
        }
    };

    // -i replaces the whole ingredient list, matching how the edit form saves
    let ingredients = match ingredient_specs {
        Some(specs) => resolve_usages(svc, user, &specs)?,
        None => existing.ingredients,
    };

    let meal = svc.update_meal(
        user,
        existing.id,
        &NewMeal {
            title: new_title.unwrap_or(existing.title),
            ingredients,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else {
        let title = &meal.title;
        let count = meal.ingredients.len();
        println!("Updated meal: {title} ({count} ingredients)");
    }
    Ok(())
}

pub(crate) fn cmd_meal_delete(
    svc: &PlannerService,
    user: &UserContext,
    title: &str,
    json: bool,
) -> Result<()> {
    let existing = match svc.get_meal_by_title(user, title) {
        Ok(m) => m,
        Err(_) => {
            if json {
                println!("{}", json_error(&format!("Meal '{title}' not found")));
            } else {
                eprintln!("Meal '{title}' not found");
            }
            process::exit(2);
        }
    };

    svc.delete_meal(user, existing.id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": existing.id }));
    } else {
        let title = &existing.title;
        println!("Deleted meal {title} (removed from shopping list selection)");
    }
    Ok(())
}
