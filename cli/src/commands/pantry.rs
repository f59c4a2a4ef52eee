use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::service::LarderService;

use super::helpers::{print_json, require_category_id, require_product_id, truncate, yes_no};

pub(crate) fn cmd_pantry_list(svc: &LarderService, json: bool) -> Result<()> {
    let pantry = svc.pantry_list();
    if json {
        return print_json(&pantry);
    }
    if pantry.total == 0 {
        eprintln!("Your pantry list is empty. Use `larder pantry add <item>` to track staples.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct PantryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "In stock")]
        in_stock: &'static str,
        #[tabled(rename = "On list")]
        on_list: &'static str,
    }

    let rows: Vec<PantryRow> = pantry
        .groups
        .iter()
        .flat_map(|g| {
            g.items.iter().map(move |p| PantryRow {
                id: p.id,
                name: truncate(&p.name, 40),
                category: format!("{} {} ({}/{})", g.emoji, g.name, g.in_stock, g.items.len()),
                in_stock: yes_no(p.in_stock),
                on_list: yes_no(p.in_shopping),
            })
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("\n{} of {} item(s) in stock", pantry.in_stock, pantry.total);
    Ok(())
}

pub(crate) fn cmd_pantry_add(
    svc: &mut LarderService,
    name: &str,
    category: &str,
    json: bool,
) -> Result<()> {
    let category = require_category_id(svc, category, json);
    let (product, _) = svc.add_to_pantry(name, &category)?;
    if json {
        print_json(&product)
    } else {
        println!(
            "Tracking {} ({}) in the pantry [id {}]",
            product.name, product.category, product.id
        );
        Ok(())
    }
}

pub(crate) fn cmd_pantry_toggle(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.toggle_stock(id)?;
    if json {
        print_json(&product)
    } else if product.in_stock {
        println!("{} is in stock", product.name);
        Ok(())
    } else {
        println!("{} is out of stock and on the shopping list", product.name);
        Ok(())
    }
}

pub(crate) fn cmd_pantry_remove(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.remove_from_pantry(id)?;
    if json {
        print_json(&product)
    } else {
        println!("Stopped tracking {} in the pantry", product.name);
        Ok(())
    }
}

pub(crate) fn cmd_pantry_restock(svc: &mut LarderService, json: bool) -> Result<()> {
    let added = svc.add_unstocked_to_shopping()?;
    if json {
        println!("{}", serde_json::json!({ "added": added }));
    } else if added == 0 {
        eprintln!("Nothing to restock: every pantry item is in stock or already on the list");
    } else {
        println!("Added {added} out-of-stock item(s) to the shopping list");
    }
    Ok(())
}
