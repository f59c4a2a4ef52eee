use anyhow::{Context, Result};
use std::path::Path;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::models::{CategoryGroup, ShoppingList};
use larder_core::service::LarderService;
use larder_core::shopping_csv::write_shopping_csv;

use super::helpers::{print_json, require_category_id, require_product_id, truncate};

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Item")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
}

fn group_rows(groups: &[CategoryGroup]) -> Vec<ItemRow> {
    groups
        .iter()
        .flat_map(|g| {
            g.items.iter().map(move |p| ItemRow {
                id: p.id,
                name: truncate(&p.name, 40),
                category: format!("{} {}", g.emoji, g.name),
            })
        })
        .collect()
}

fn print_shopping_list(svc: &LarderService, list: &ShoppingList) {
    if list.is_empty() {
        eprintln!("Your shopping list is empty. Use `larder shop add <item>` to add something.");
        return;
    }

    if !list.groups.is_empty() {
        let table = Table::new(group_rows(&list.groups))
            .with(Style::rounded())
            .with(Modify::new(Columns::first()).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    if !list.bought.is_empty() {
        println!("\nBought:");
        let rows: Vec<ItemRow> = list
            .bought
            .iter()
            .map(|p| ItemRow {
                id: p.id,
                name: truncate(&p.name, 40),
                category: format!(
                    "{} {}",
                    svc.catalog().category_emoji(&p.category),
                    svc.catalog()
                        .category(&p.category)
                        .map_or_else(|| p.category.clone(), |c| c.display_name())
                ),
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::first()).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }

    println!(
        "\n{} of {} item(s) left to buy",
        list.remaining, list.total
    );
}

pub(crate) fn cmd_shop_list(svc: &LarderService, json: bool) -> Result<()> {
    let list = svc.shopping_list();
    if json {
        print_json(&list)
    } else {
        print_shopping_list(svc, &list);
        Ok(())
    }
}

pub(crate) fn cmd_shop_add(
    svc: &mut LarderService,
    name: &str,
    category: &str,
    json: bool,
) -> Result<()> {
    let category = require_category_id(svc, category, json);
    let (product, created) = svc.add_to_shopping(name, &category)?;
    if json {
        print_json(&product)
    } else {
        let verb = if created { "Added" } else { "Put back" };
        println!(
            "{verb} {} ({}) on the shopping list [id {}]",
            product.name, product.category, product.id
        );
        Ok(())
    }
}

pub(crate) fn cmd_shop_check(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.toggle_completed(id)?;
    if json {
        print_json(&product)
    } else {
        let state = if product.completed { "bought" } else { "to buy" };
        println!("{} marked as {state}", product.name);
        Ok(())
    }
}

pub(crate) fn cmd_shop_remove(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.remove_from_shopping(id)?;
    if json {
        print_json(&product)
    } else {
        println!("Removed {} from the shopping list", product.name);
        Ok(())
    }
}

pub(crate) fn cmd_shop_stocked(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.mark_in_stock(id)?;
    if json {
        print_json(&product)
    } else if product.in_pantry {
        println!("{} is back in stock", product.name);
        Ok(())
    } else {
        println!("Removed {} from the shopping list", product.name);
        Ok(())
    }
}

pub(crate) fn cmd_shop_clear(svc: &mut LarderService, json: bool) -> Result<()> {
    let cleared = svc.clear_completed()?;
    if json {
        println!("{}", serde_json::json!({ "cleared": cleared }));
    } else if cleared == 0 {
        eprintln!("No bought items to clear");
    } else {
        println!("Cleared {cleared} bought item(s)");
    }
    Ok(())
}

pub(crate) fn cmd_shop_csv(svc: &LarderService, output: Option<&Path>, json: bool) -> Result<()> {
    let list = svc.shopping_list();
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = write_shopping_csv(&list, svc.catalog(), file)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "path": path.display().to_string(), "rows": rows })
                );
            } else {
                println!("Wrote {rows} item(s) to {}", path.display());
            }
        }
        None => {
            write_shopping_csv(&list, svc.catalog(), std::io::stdout().lock())?;
        }
    }
    Ok(())
}
