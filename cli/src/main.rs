mod commands;
mod config;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{
    MealChoice, cmd_category_add, cmd_category_delete, cmd_category_list, cmd_category_move,
    cmd_doctor, cmd_export, cmd_import, cmd_init, cmd_pantry_add, cmd_pantry_list,
    cmd_pantry_remove, cmd_pantry_restock, cmd_pantry_toggle, cmd_plan_clear, cmd_plan_copy,
    cmd_plan_set, cmd_plan_shop, cmd_plan_show, cmd_product_delete, cmd_product_list,
    cmd_product_move, cmd_product_rename, cmd_product_season, cmd_recipe_add_ingredient,
    cmd_recipe_create, cmd_recipe_delete, cmd_recipe_import, cmd_recipe_list,
    cmd_recipe_remove_ingredient, cmd_recipe_show, cmd_recipe_shop, cmd_shop_add, cmd_shop_check,
    cmd_shop_clear, cmd_shop_csv, cmd_shop_list, cmd_shop_remove, cmd_shop_stocked,
};
use crate::config::Config;
use larder_core::planner::MealSlot;
use larder_core::service::LarderService;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "A simple, local-first grocery, pantry and meal-plan manager",
    long_about = "Keep a shopping list, a pantry, recipes and a weekly meal plan on this \
device. Move data between devices with `larder export` and `larder import`."
)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up local storage
    Init {
        /// Load a few sample items into an empty catalog
        #[arg(long)]
        sample: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check storage health and show where each collection was loaded from
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the shopping list
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Manage the pantry list
    Pantry {
        #[command(subcommand)]
        command: PantryCommands,
    },
    /// Manage the product catalog
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Plan meals by week (weeks start on Saturday)
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Export everything to a JSON file for another device
    Export {
        /// Output file (default: ./grocery-data.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a file written by `larder export` (replaces local data)
    Import {
        /// Path to grocery-data.json
        file: PathBuf,
        /// Accept a file with a different name
        #[arg(long)]
        any_name: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Show the shopping list
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an item to the shopping list
    Add {
        /// Item name
        name: String,
        /// Category name
        #[arg(short, long, default_value = "other")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tick an item off (or un-tick it)
    Check {
        /// Item name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take an item off the list
    Remove {
        /// Item name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Take an item off the list and mark it in stock in the pantry
    Stocked {
        /// Item name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every bought item from the list
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the list as CSV (to stdout unless --output is given)
    Csv {
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PantryCommands {
    /// Show the pantry list
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start tracking a staple (starts in stock)
    Add {
        /// Item name
        name: String,
        /// Category name
        #[arg(short, long, default_value = "other")]
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip an item between in stock and out of stock
    Toggle {
        /// Item name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop tracking an item in the pantry
    Remove {
        /// Item name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put every out-of-stock item on the shopping list
    Restock {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProductCommands {
    /// List catalog products
    List {
        /// Filter by name
        #[arg(short, long)]
        search: Option<String>,
        /// Only products that are in season
        #[arg(long)]
        in_season: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a product
    Rename {
        /// Product name or ID
        item: String,
        /// New name
        new_name: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a product to another category
    Move {
        /// Product name or ID
        item: String,
        /// Target category
        category: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle whether a product is in season
    Season {
        /// Product name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a product no recipe or planned meal uses
    Delete {
        /// Product name or ID
        item: String,
        /// Category, when the name exists in several
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories in display order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category
    Add {
        /// Category name
        name: String,
        /// Emoji shown next to the name
        #[arg(long)]
        emoji: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete an unused, non-default category
    Delete {
        /// Category name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a category to a new position (1 = first)
    Move {
        /// Category name
        name: String,
        /// New position
        position: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Short description
        #[arg(short, long)]
        description: Option<String>,
        /// Preparation steps
        #[arg(short, long)]
        preparation: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a recipe with its ingredients
    Show {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient (creates the product if the catalog lacks it)
    AddIngredient {
        /// Recipe name or ID
        recipe: String,
        /// Product name or ID
        product: String,
        /// Amount
        #[arg(short, long, default_value = "1")]
        quantity: f64,
        /// Unit (e.g. "g", "cups")
        #[arg(short, long)]
        unit: Option<String>,
        /// Category for a newly created product
        #[arg(short, long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe name or ID
        recipe: String,
        /// Product name or ID
        product: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe and clear the meals that use it
    Delete {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a recipe's missing ingredients on the shopping list
    Shop {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a recipe from a Cooklang (.cook) file
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Recipe name override (defaults to metadata title or file name)
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Show the week containing a date (default: this week)
    Show {
        /// Any date in the week (YYYY-MM-DD, today, tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plan a meal: a recipe or a named meal with loose products
    Set {
        /// Meal slot: breakfast, lunch, dinner
        #[arg(value_parser = parse_slot)]
        slot: MealSlot,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Recipe name or ID
        #[arg(long, conflicts_with_all = ["meal", "products"])]
        recipe: Option<String>,
        /// Name of a simple meal
        #[arg(long)]
        meal: Option<String>,
        /// Products for a simple meal, comma-separated
        #[arg(long = "with", value_delimiter = ',', requires = "meal")]
        products: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear one meal, or the whole week with --week
    Clear {
        /// Meal slot: breakfast, lunch, dinner
        #[arg(value_parser = parse_slot)]
        slot: Option<MealSlot>,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Clear every meal in the week containing the date
        #[arg(long, conflicts_with = "slot")]
        week: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy a week's plan over another week
    Copy {
        /// Any date in the destination week
        to: String,
        /// Any date in the source week (default: this week)
        #[arg(long)]
        from: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put everything the week's meals need on the shopping list
    Shop {
        /// Any date in the week (default: this week)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_slot(s: &str) -> Result<MealSlot, String> {
    s.parse::<MealSlot>().map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("larder=debug,larder_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    tracing::debug!(db = %config.db_path.display(), "opening storage");
    let mut svc = LarderService::new(&config.db_path)?;

    match cli.command {
        Commands::Init { sample, json } => cmd_init(&mut svc, &config, sample, json),
        Commands::Doctor { json } => cmd_doctor(&svc, &config, json),
        Commands::Shop { command } => match command {
            ShopCommands::List { json } => cmd_shop_list(&svc, json),
            ShopCommands::Add {
                name,
                category,
                json,
            } => cmd_shop_add(&mut svc, &name, &category, json),
            ShopCommands::Check {
                item,
                category,
                json,
            } => cmd_shop_check(&mut svc, &item, category.as_deref(), json),
            ShopCommands::Remove {
                item,
                category,
                json,
            } => cmd_shop_remove(&mut svc, &item, category.as_deref(), json),
            ShopCommands::Stocked {
                item,
                category,
                json,
            } => cmd_shop_stocked(&mut svc, &item, category.as_deref(), json),
            ShopCommands::Clear { json } => cmd_shop_clear(&mut svc, json),
            ShopCommands::Csv { output, json } => cmd_shop_csv(&svc, output.as_deref(), json),
        },
        Commands::Pantry { command } => match command {
            PantryCommands::List { json } => cmd_pantry_list(&svc, json),
            PantryCommands::Add {
                name,
                category,
                json,
            } => cmd_pantry_add(&mut svc, &name, &category, json),
            PantryCommands::Toggle {
                item,
                category,
                json,
            } => cmd_pantry_toggle(&mut svc, &item, category.as_deref(), json),
            PantryCommands::Remove {
                item,
                category,
                json,
            } => cmd_pantry_remove(&mut svc, &item, category.as_deref(), json),
            PantryCommands::Restock { json } => cmd_pantry_restock(&mut svc, json),
        },
        Commands::Product { command } => match command {
            ProductCommands::List {
                search,
                in_season,
                json,
            } => cmd_product_list(&svc, search, in_season, json),
            ProductCommands::Rename {
                item,
                new_name,
                category,
                json,
            } => cmd_product_rename(&mut svc, &item, &new_name, category.as_deref(), json),
            ProductCommands::Move {
                item,
                category,
                json,
            } => cmd_product_move(&mut svc, &item, &category, json),
            ProductCommands::Season {
                item,
                category,
                json,
            } => cmd_product_season(&mut svc, &item, category.as_deref(), json),
            ProductCommands::Delete {
                item,
                category,
                json,
            } => cmd_product_delete(&mut svc, &item, category.as_deref(), json),
        },
        Commands::Category { command } => match command {
            CategoryCommands::List { json } => cmd_category_list(&svc, json),
            CategoryCommands::Add { name, emoji, json } => {
                cmd_category_add(&mut svc, &name, emoji.as_deref(), json)
            }
            CategoryCommands::Delete { name, json } => cmd_category_delete(&mut svc, &name, json),
            CategoryCommands::Move {
                name,
                position,
                json,
            } => cmd_category_move(&mut svc, &name, position, json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create {
                name,
                description,
                preparation,
                json,
            } => cmd_recipe_create(
                &mut svc,
                &name,
                description.as_deref(),
                preparation.as_deref(),
                json,
            ),
            RecipeCommands::Show { recipe, json } => cmd_recipe_show(&svc, &recipe, json),
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
            RecipeCommands::AddIngredient {
                recipe,
                product,
                quantity,
                unit,
                category,
                json,
            } => cmd_recipe_add_ingredient(
                &mut svc,
                &recipe,
                &product,
                quantity,
                unit.as_deref(),
                category.as_deref(),
                json,
            ),
            RecipeCommands::RemoveIngredient {
                recipe,
                product,
                json,
            } => cmd_recipe_remove_ingredient(&mut svc, &recipe, &product, json),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&mut svc, &recipe, json),
            RecipeCommands::Shop { recipe, json } => cmd_recipe_shop(&mut svc, &recipe, json),
            RecipeCommands::Import { file, name, json } => {
                cmd_recipe_import(&mut svc, &file, name.as_deref(), json)
            }
        },
        Commands::Plan { command } => match command {
            PlanCommands::Show { date, json } => cmd_plan_show(&svc, date, json),
            PlanCommands::Set {
                slot,
                date,
                recipe,
                meal,
                products,
                json,
            } => {
                let choice = match (recipe, meal) {
                    (Some(recipe), _) => MealChoice::Recipe(recipe),
                    (None, Some(name)) => MealChoice::Simple { name, products },
                    (None, None) => bail!("Pass --recipe <name> or --meal <name>"),
                };
                cmd_plan_set(&mut svc, date, slot, choice, json)
            }
            PlanCommands::Clear {
                slot,
                date,
                week,
                json,
            } => {
                if slot.is_none() && !week {
                    bail!("Name a meal slot to clear, or pass --week to clear the whole week");
                }
                cmd_plan_clear(&mut svc, date, slot, json)
            }
            PlanCommands::Copy { to, from, json } => cmd_plan_copy(&mut svc, from, &to, json),
            PlanCommands::Shop { date, json } => cmd_plan_shop(&mut svc, date, json),
        },
        Commands::Export { output, json } => {
            let output = output.unwrap_or_else(Config::default_export_path);
            cmd_export(&svc, &output, json)
        }
        Commands::Import {
            file,
            any_name,
            json,
        } => cmd_import(&mut svc, &file, any_name, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan_set_simple_meal() {
        let cli = Cli::try_parse_from([
            "larder", "plan", "set", "Dinner", "--meal", "Tacos", "--with", "tortillas,beans",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan {
                command:
                    PlanCommands::Set {
                        slot,
                        meal,
                        products,
                        recipe,
                        ..
                    },
            } => {
                assert_eq!(slot, MealSlot::Dinner);
                assert_eq!(meal.as_deref(), Some("Tacos"));
                assert_eq!(products, vec!["tortillas", "beans"]);
                assert!(recipe.is_none());
            }
            _ => panic!("expected plan set"),
        }
    }

    #[test]
    fn test_parse_rejects_recipe_with_meal() {
        assert!(
            Cli::try_parse_from([
                "larder", "plan", "set", "lunch", "--recipe", "Soup", "--meal", "Soup"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_parse_rejects_unknown_slot() {
        assert!(Cli::try_parse_from(["larder", "plan", "set", "brunch", "--meal", "x"]).is_err());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["larder", "shop", "list", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }
}
