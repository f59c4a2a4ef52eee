use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::models::{ProductFilter, UpdateProduct};
use larder_core::service::LarderService;

use super::helpers::{
    category_id, not_found, print_json, require_category_id, require_product_id, truncate, yes_no,
};

pub(crate) fn cmd_product_list(
    svc: &LarderService,
    search: Option<String>,
    in_season: bool,
    json: bool,
) -> Result<()> {
    let products = svc.list_products(&ProductFilter {
        search,
        in_season_only: in_season,
    });

    if json {
        return print_json(&products);
    }
    if products.is_empty() {
        eprintln!("No products found.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct ProductRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Shopping")]
        shopping: &'static str,
        #[tabled(rename = "Pantry")]
        pantry: String,
        #[tabled(rename = "In season")]
        in_season: &'static str,
    }

    let rows: Vec<ProductRow> = products
        .iter()
        .map(|p| ProductRow {
            id: p.id,
            name: truncate(&p.name, 35),
            category: format!("{} {}", svc.catalog().category_emoji(&p.category), p.category),
            shopping: match (p.in_shopping, p.completed) {
                (true, true) => "bought",
                (true, false) => "to buy",
                _ => "",
            },
            pantry: if p.in_pantry {
                (if p.in_stock { "in stock" } else { "out" }).to_string()
            } else {
                String::new()
            },
            in_season: yes_no(p.in_season),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::first()).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

fn apply_update(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    update: &UpdateProduct,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.update_product(id, update)?;
    if json {
        print_json(&product)
    } else {
        println!(
            "Updated {} ({}) [id {}]",
            product.name, product.category, product.id
        );
        Ok(())
    }
}

pub(crate) fn cmd_product_rename(
    svc: &mut LarderService,
    item: &str,
    new_name: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let update = UpdateProduct {
        name: Some(new_name.to_string()),
        ..UpdateProduct::default()
    };
    apply_update(svc, item, category, &update, json)
}

pub(crate) fn cmd_product_move(
    svc: &mut LarderService,
    item: &str,
    new_category: &str,
    json: bool,
) -> Result<()> {
    let category = require_category_id(svc, new_category, json);
    let update = UpdateProduct {
        category: Some(category),
        ..UpdateProduct::default()
    };
    apply_update(svc, item, None, &update, json)
}

pub(crate) fn cmd_product_season(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.toggle_season(id)?;
    if json {
        print_json(&product)
    } else {
        let state = if product.in_season { "in season" } else { "out of season" };
        println!("{} is now {state}", product.name);
        Ok(())
    }
}

pub(crate) fn cmd_product_delete(
    svc: &mut LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let id = require_product_id(svc, item, category, json);
    let product = svc.delete_product(id)?;
    if json {
        print_json(&product)
    } else {
        println!("Deleted {} from the catalog", product.name);
        Ok(())
    }
}

// --- Categories ---

pub(crate) fn cmd_category_list(svc: &LarderService, json: bool) -> Result<()> {
    let categories = svc.categories();
    if json {
        return print_json(categories);
    }

    #[derive(Tabled)]
    struct CategoryRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Category")]
        name: String,
        #[tabled(rename = "Products")]
        products: usize,
        #[tabled(rename = "Default")]
        is_default: &'static str,
    }

    let rows: Vec<CategoryRow> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| CategoryRow {
            position: i + 1,
            name: format!("{} {}", c.emoji, c.display_name()),
            products: svc
                .catalog()
                .products()
                .iter()
                .filter(|p| p.category == c.id)
                .count(),
            is_default: yes_no(c.is_default),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_category_add(
    svc: &mut LarderService,
    name: &str,
    emoji: Option<&str>,
    json: bool,
) -> Result<()> {
    let category = svc.add_category(name, emoji)?;
    if json {
        print_json(&category)
    } else {
        println!("Added category {} {}", category.emoji, category.display_name());
        Ok(())
    }
}

pub(crate) fn cmd_category_delete(svc: &mut LarderService, name: &str, json: bool) -> Result<()> {
    let id = require_category_id(svc, name, json);
    let category = svc.delete_category(&id)?;
    if json {
        print_json(&category)
    } else {
        println!("Deleted category {}", category.display_name());
        Ok(())
    }
}

/// Move a category to a 1-based position in the ordering.
pub(crate) fn cmd_category_move(
    svc: &mut LarderService,
    name: &str,
    position: usize,
    json: bool,
) -> Result<()> {
    let id = category_id(name);
    let Some(from) = svc.catalog().category_position(&id) else {
        not_found(&format!("Category '{id}' not found"), json);
    };
    if position == 0 {
        bail!("Positions start at 1");
    }
    svc.move_category(from, position - 1)?;

    if json {
        print_json(svc.categories())
    } else {
        let order: Vec<String> = svc
            .categories()
            .iter()
            .map(|c| format!("{} {}", c.emoji, c.display_name()))
            .collect();
        println!("Category order: {}", order.join(", "));
        Ok(())
    }
}
