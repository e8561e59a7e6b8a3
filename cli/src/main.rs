mod commands;
mod config;
mod emailer;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_import_ingredients, cmd_ingredient_add, cmd_ingredient_delete, cmd_ingredient_edit,
    cmd_ingredient_list, cmd_list_add, cmd_list_clear, cmd_list_email, cmd_list_select,
    cmd_list_show, cmd_meal_create, cmd_meal_delete, cmd_meal_edit, cmd_meal_list, cmd_meal_show,
    cmd_pantry_add, cmd_pantry_list, cmd_pantry_pick, cmd_pantry_remove, cmd_profile_set,
    cmd_profile_show,
};
use crate::config::{Config, EmailSettings};
use larder_core::service::PlannerService;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "A simple meal planner and shopping list CLI",
    long_about = "\n\n  ██╗      █████╗ ██████╗ ██████╗ ███████╗██████╗
  ██║     ██╔══██╗██╔══██╗██╔══██╗██╔════╝██╔══██╗
  ██║     ███████║██████╔╝██║  ██║█████╗  ██████╔╝
  ██║     ██╔══██║██╔══██╗██║  ██║██╔══╝  ██╔══██╗
  ███████╗██║  ██║██║  ██║██████╔╝███████╗██║  ██║
  ╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝╚═════╝ ╚══════╝╚═╝  ╚═╝
     plan meals. build the list. go shop.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the ingredient catalog
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Manage meals (named collections of ingredients)
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Build, show, and send the shopping list
    List {
        #[command(subcommand)]
        command: ListCommands,
    },
    /// Manage pantry staples
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Import data from external sources
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Show or edit the local profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Add an ingredient to the catalog
    Add {
        /// Ingredient name
        name: String,
        /// Category: Bakery, Beverages, Dairy, Frozen, Meat, Other, Pantry, Produce, Seafood, Spices
        #[arg(short, long, default_value = "Other")]
        category: String,
        /// Free-text notes (brand, variety, ...)
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List/search the ingredient catalog
    List {
        /// Search query to filter ingredients
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an ingredient
    Edit {
        /// Current ingredient name
        name: String,
        /// New name
        #[arg(long = "name", value_name = "NAME")]
        new_name: Option<String>,
        /// New category
        #[arg(short, long)]
        category: Option<String>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an ingredient (also removes it from every meal)
    Delete {
        /// Ingredient name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Create a new meal
    Create {
        /// Meal title
        title: String,
        /// Ingredient spec "NAME" or "NAME xQTY" (repeatable); must exist in the catalog
        #[arg(short, long = "ingredient", value_name = "SPEC")]
        ingredients: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all meals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a meal's ingredients
    Show {
        /// Meal title
        title: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a meal (new -i specs replace the whole ingredient list)
    Edit {
        /// Current meal title
        title: String,
        /// New title
        #[arg(long = "title", value_name = "TITLE")]
        new_title: Option<String>,
        /// Ingredient spec "NAME" or "NAME xQTY" (repeatable, replaces all)
        #[arg(short, long = "ingredient", value_name = "SPEC")]
        ingredients: Option<Vec<String>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal (also removes it from the shopping list selection)
    Delete {
        /// Meal title
        title: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ListCommands {
    /// Select the meals for this week's list (replaces the previous selection)
    Select {
        /// Meal titles
        #[arg(required = true)]
        meals: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the aggregated shopping list grouped by category
    Show {
        /// Include ingredient notes
        #[arg(long)]
        notes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a one-off item straight to the list
    Add {
        /// Item name
        name: String,
        /// Category
        #[arg(short, long, default_value = "Other")]
        category: String,
        /// How many to buy
        #[arg(short, long, default_value = "1")]
        quantity: i64,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear the meal selection
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Email the shopping list
    Email {
        /// Recipient address (default: the profile email)
        to: Option<String>,
        /// Include ingredient notes
        #[arg(long)]
        notes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Add a staple to the pantry
    Add {
        /// Item name
        name: String,
        /// Category
        #[arg(short, long, default_value = "Other")]
        category: String,
        /// Free-text notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List/search pantry staples
    List {
        /// Search query to filter items
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a staple from the pantry
    Remove {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a pantry staple on the shopping list
    Pick {
        /// Item name
        name: String,
        /// How many to buy
        #[arg(short, long, default_value = "1")]
        quantity: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import ingredients from a `Name,Category,Notes` CSV
    Ingredients {
        /// Path to the CSV file
        file: std::path::PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the local profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set display name and/or email
    Set {
        /// Display name used as the email sender
        #[arg(long)]
        name: Option<String>,
        /// Default recipient for `larder list email`
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let user = config.load_or_create_profile()?;
    let svc = PlannerService::new(&config.db_path.to_string_lossy())?;

    match cli.command {
        Commands::Ingredient { command } => match command {
            IngredientCommands::Add {
                name,
                category,
                notes,
                json,
            } => cmd_ingredient_add(&svc, &user, &name, &category, notes, json),
            IngredientCommands::List { search, json } => {
                cmd_ingredient_list(&svc, &user, search.as_deref(), json)
            }
            IngredientCommands::Edit {
                name,
                new_name,
                category,
                notes,
                json,
            } => cmd_ingredient_edit(&svc, &user, &name, new_name, category, notes, json),
            IngredientCommands::Delete { name, json } => {
                cmd_ingredient_delete(&svc, &user, &name, json)
            }
        },
        Commands::Meal { command } => match command {
            MealCommands::Create {
                title,
                ingredients,
                json,
            } => cmd_meal_create(&svc, &user, &title, &ingredients, json),
            MealCommands::List { json } => cmd_meal_list(&svc, &user, json),
            MealCommands::Show { title, json } => cmd_meal_show(&svc, &user, &title, json),
            MealCommands::Edit {
                title,
                new_title,
                ingredients,
                json,
            } => cmd_meal_edit(&svc, &user, &title, new_title, ingredients, json),
            MealCommands::Delete { title, json } => cmd_meal_delete(&svc, &user, &title, json),
        },
        Commands::List { command } => match command {
            ListCommands::Select { meals, json } => cmd_list_select(&svc, &user, &meals, json),
            ListCommands::Show { notes, json } => cmd_list_show(&svc, &user, notes, json),
            ListCommands::Add {
                name,
                category,
                quantity,
                notes,
                json,
            } => cmd_list_add(&svc, &user, &name, &category, quantity, notes, json),
            ListCommands::Clear { json } => cmd_list_clear(&svc, &user, json),
            ListCommands::Email { to, notes, json } => {
                cmd_list_email(&svc, &user, to, notes, json).await
            }
        },
        Commands::Pantry { command } => match command {
            PantryCommands::Add {
                name,
                category,
                notes,
                json,
            } => cmd_pantry_add(&svc, &user, &name, &category, notes, json),
            PantryCommands::List { search, json } => {
                cmd_pantry_list(&svc, &user, search.as_deref(), json)
            }
            PantryCommands::Remove { name, json } => cmd_pantry_remove(&svc, &user, &name, json),
            PantryCommands::Pick {
                name,
                quantity,
                json,
            } => cmd_pantry_pick(&svc, &user, &name, quantity, json),
        },
        Commands::Import { command } => match command {
            ImportCommands::Ingredients {
                file,
                dry_run,
                json,
            } => cmd_import_ingredients(&svc, &user, &file, dry_run, json),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Show { json } => cmd_profile_show(&user, json),
            ProfileCommands::Set { name, email, json } => {
                cmd_profile_set(&config, &user, name, email, json)
            }
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            let email_settings = EmailSettings::from_env();
            server::start_server(svc, user, port, &bind, api_key, email_settings).await
        }
    }
}
