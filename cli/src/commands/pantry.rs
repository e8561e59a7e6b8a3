use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::Style,
};

use larder_core::models::{NewPantryItem, UserContext};
use larder_core::service::PlannerService;

use super::helpers::{json_error, notes_cell, truncate};

pub(crate) fn cmd_pantry_add(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    category: &str,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let item = svc.add_pantry_item(
        user,
        &NewPantryItem {
            name: name.to_string(),
            category: category.to_string(),
            notes,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        let name = &item.name;
        let category = &item.category;
        println!("Added {name} [{category}] to the pantry");
    }
    Ok(())
}

pub(crate) fn cmd_pantry_list(
    svc: &PlannerService,
    user: &UserContext,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct PantryRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Notes")]
        notes: String,
    }

    let items = svc.list_pantry_items(user, search)?;

    if items.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No items in your pantry. Add staples you regularly buy");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let rows: Vec<PantryRow> = items
        .iter()
        .map(|i| PantryRow {
            name: truncate(&i.name, 35),
            category: i.category.clone(),
            notes: notes_cell(i.notes.as_deref()),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

pub(crate) fn cmd_pantry_remove(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    json: bool,
) -> Result<()> {
    if svc.remove_pantry_item(user, name)? {
        if json {
            println!("{}", serde_json::json!({ "removed": name }));
        } else {
            println!("Removed {name} from the pantry");
        }
        Ok(())
    } else {
        if json {
            println!("{}", json_error(&format!("Pantry item '{name}' not found")));
        } else {
            eprintln!("Pantry item '{name}' not found");
        }
        process::exit(2);
    }
}

pub(crate) fn cmd_pantry_pick(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    quantity: i64,
    json: bool,
) -> Result<()> {
    match svc.pick_pantry_item(user, name, quantity) {
        Ok(meal) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&meal)?);
            } else if quantity > 1 {
                println!("Added ({quantity}) {name} to the shopping list");
            } else {
                println!("Added {name} to the shopping list");
            }
            Ok(())
        }
        Err(e) if e.to_string().contains("not found") => {
            if json {
                println!("{}", json_error(&format!("Pantry item '{name}' not found")));
            } else {
                eprintln!("Pantry item '{name}' not found");
            }
            process::exit(2);
        }
        Err(e) => Err(e),
    }
}
