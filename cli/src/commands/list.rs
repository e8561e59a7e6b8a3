use anyhow::{Context, Result};
use std::process;

use larder_core::export::render_html;
use larder_core::models::{ShoppingList, UserContext};
use larder_core::service::PlannerService;

use crate::config::EmailSettings;
use crate::emailer::DispatchClient;

use super::helpers::json_error;

pub(crate) fn cmd_list_select(
    svc: &PlannerService,
    user: &UserContext,
    titles: &[String],
    json: bool,
) -> Result<()> {
    let mut ids = Vec::with_capacity(titles.len());
    let mut resolved = Vec::with_capacity(titles.len());
    for title in titles {
        match svc.get_meal_by_title(user, title) {
            Ok(meal) => {
                ids.push(meal.id);
                resolved.push(meal.title);
            }
            Err(_) => {
                if json {
                    println!("{}", json_error(&format!("Meal '{title}' not found")));
                } else {
                    eprintln!("Meal '{title}' not found");
                }
                process::exit(2);
            }
        }
    }

    svc.select_meals(user, &ids)?;

    if json {
        println!("{}", serde_json::json!({ "selected": ids }));
    } else {
        let count = ids.len();
        let names = resolved.join(", ");
        println!("Selected {count} meals for the shopping list: {names}");
    }
    Ok(())
}

pub(crate) fn cmd_list_clear(svc: &PlannerService, user: &UserContext, json: bool) -> Result<()> {
    svc.clear_selection(user)?;
    if json {
        println!("{}", serde_json::json!({ "selected": [] }));
    } else {
        println!("Cleared the shopping list selection");
    }
    Ok(())
}

/// Print the aggregated list grouped by category: the category name heads
/// each run, quantities above one show as a parenthetical, and notes appear
/// only when enabled.
fn print_list(list: &ShoppingList, notes_enabled: bool) {
    let titles = list.meal_titles.join(", ");
    println!("Meals: {titles}\n");

    let flags = larder_core::aggregate::header_flags(&list.items);
    for (item, header) in list.items.iter().zip(flags) {
        if header {
            let category = &item.category;
            println!("{category}");
        }
        let name = &item.name;
        let quantity = if item.quantity > 1 {
            format!("({}) ", item.quantity)
        } else {
            String::new()
        };
        let notes = if notes_enabled {
            item.notes
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .map(|n| format!(" — Notes: {n}"))
                .unwrap_or_default()
        } else {
            String::new()
        };
        println!("  {quantity}{name}{notes}");
    }
}

pub(crate) fn cmd_list_show(
    svc: &PlannerService,
    user: &UserContext,
    notes: bool,
    json: bool,
) -> Result<()> {
    let list = svc.shopping_list(user)?;

    if list.meal_titles.is_empty() {
        if json {
            println!("{}", serde_json::to_string_pretty(&list)?);
            return Ok(());
        }
        eprintln!("No meals selected. Choose some with: larder list select <meal>...");
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    print_list(&list, notes);
    Ok(())
}

pub(crate) fn cmd_list_add(
    svc: &PlannerService,
    user: &UserContext,
    name: &str,
    category: &str,
    quantity: i64,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let meal = svc.quick_add(user, name, category, quantity, notes.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else if quantity > 1 {
        println!("Added ({quantity}) {name} to the shopping list");
    } else {
        println!("Added {name} to the shopping list");
    }
    Ok(())
}

pub(crate) async fn cmd_list_email(
    svc: &PlannerService,
    user: &UserContext,
    to: Option<String>,
    notes: bool,
    json: bool,
) -> Result<()> {
    let to = to.or_else(|| user.email.clone()).context(
        "No recipient address. Pass one, or set a default with: larder profile set --email",
    )?;

    let settings = EmailSettings::from_env().context(
        "Email dispatch is not configured. Set LARDER_EMAIL_URL (and optionally LARDER_EMAIL_TOKEN)",
    )?;
    let client = DispatchClient::new(&settings);

    let list = svc.shopping_list(user)?;
    if list.items.is_empty() {
        if json {
            println!("{}", json_error("Shopping list is empty — nothing to send"));
        } else {
            eprintln!("Shopping list is empty — nothing to send");
        }
        process::exit(2);
    }

    let html = render_html(&list.items, notes);
    client.send_async(&to, &user.display_name, &html).await?;

    let count = list.items.len();
    if json {
        println!("{}", serde_json::json!({ "sent": count, "to": to }));
    } else {
        println!("Sent {count} items to {to}");
    }
    Ok(())
}
