use anyhow::{Context, Result};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::models::{RecipeDetail, validate_quantity};
use larder_core::service::{INGREDIENT_CATEGORY, LarderService};

use super::helpers::{
    find_product_id, format_quantity, not_found, print_json, require_category_id,
    require_recipe_id, truncate, yes_no,
};

pub(crate) fn cmd_recipe_create(
    svc: &mut LarderService,
    name: &str,
    description: Option<&str>,
    preparation: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe = svc.create_recipe(
        name,
        description.unwrap_or_default(),
        preparation.unwrap_or_default(),
    )?;
    if json {
        print_json(&recipe)
    } else {
        let id = recipe.id;
        println!("Created recipe: {} (id: {id})", recipe.name);
        println!(
            "Add ingredients with: larder recipe add-ingredient \"{}\" <product> --quantity <n>",
            recipe.name
        );
        Ok(())
    }
}

pub(crate) fn cmd_recipe_add_ingredient(
    svc: &mut LarderService,
    recipe: &str,
    product: &str,
    quantity: f64,
    unit: Option<&str>,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe_id = require_recipe_id(svc, recipe, json);
    validate_quantity(quantity)?;
    let (product_id, _) = ingredient_product(svc, product, category, json)?;

    let updated = svc.add_ingredient(recipe_id, product_id, quantity, unit.unwrap_or_default())?;
    if json {
        print_json(&updated)
    } else {
        let name = svc.get_product(product_id)?.name;
        let unit = unit.map(|u| format!(" {u}")).unwrap_or_default();
        println!(
            "Added {}{unit} of {name} to {}",
            format_quantity(quantity),
            updated.name
        );
        Ok(())
    }
}

/// Find the product an ingredient names, adding it to the catalog when no
/// product has that name. The flag is true for a newly added product.
fn ingredient_product(
    svc: &mut LarderService,
    product: &str,
    category: Option<&str>,
    json: bool,
) -> Result<(i64, bool)> {
    let category = category.map(|name| require_category_id(svc, name, json));
    if let Some(id) = find_product_id(svc, product, category.as_deref()) {
        return Ok((id, false));
    }
    let category = category.unwrap_or_else(|| INGREDIENT_CATEGORY.to_string());
    let (resolved, created) = svc.resolve_product(product, &category)?;
    if created {
        eprintln!("Added {} ({}) to the catalog", resolved.name, resolved.category);
    }
    Ok((resolved.id, created))
}

pub(crate) fn cmd_recipe_remove_ingredient(
    svc: &mut LarderService,
    recipe: &str,
    product: &str,
    json: bool,
) -> Result<()> {
    let recipe_id = require_recipe_id(svc, recipe, json);
    let missing = format!("Ingredient '{product}' not found in recipe");
    let Some(product_id) = find_product_id(svc, product, None) else {
        not_found(&missing, json);
    };

    if svc.remove_ingredient(recipe_id, product_id)? {
        if json {
            println!("{}", serde_json::json!({ "removed": product }));
        } else {
            println!("Removed {product} from {recipe}");
        }
        Ok(())
    } else {
        not_found(&missing, json)
    }
}

fn print_recipe(detail: &RecipeDetail) {
    let recipe = &detail.recipe;
    println!("=== {} ===", recipe.name);
    if !recipe.description.is_empty() {
        println!("  {}", recipe.description);
    }

    println!("\n  INGREDIENTS:");
    if detail.ingredients.is_empty() {
        println!("    (none yet)");
    }
    for ing in &detail.ingredients {
        let unit = if ing.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", ing.unit)
        };
        let mut notes = Vec::new();
        if ing.in_stock {
            notes.push("in stock");
        }
        if ing.in_shopping {
            notes.push("on list");
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!("  [{}]", notes.join(", "))
        };
        println!(
            "    {} {}{unit}{notes}",
            ing.name,
            format_quantity(ing.quantity)
        );
    }

    if !recipe.preparation.is_empty() {
        println!("\n  PREPARATION:");
        for line in recipe.preparation.lines() {
            println!("    {line}");
        }
    }
}

pub(crate) fn cmd_recipe_show(svc: &LarderService, recipe: &str, json: bool) -> Result<()> {
    let id = require_recipe_id(svc, recipe, json);
    let detail = svc.recipe_detail(id)?;
    if json {
        print_json(&detail)
    } else {
        print_recipe(&detail);
        Ok(())
    }
}

pub(crate) fn cmd_recipe_list(svc: &LarderService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
        #[tabled(rename = "Planned")]
        planned: &'static str,
        #[tabled(rename = "Description")]
        description: String,
    }

    let recipes = svc.list_recipes();
    if json {
        return print_json(&recipes);
    }
    if recipes.is_empty() {
        eprintln!("No recipes yet. Use `larder recipe create <name>` to add one.");
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id,
            name: truncate(&r.name, 30),
            ingredients: r.ingredients.len(),
            planned: yes_no(svc.meal_plan().references_recipe(r.id)),
            description: truncate(&r.description, 40),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &mut LarderService, recipe: &str, json: bool) -> Result<()> {
    let id = require_recipe_id(svc, recipe, json);
    let (deleted, cleared) = svc.delete_recipe(id)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": deleted, "clearedMeals": cleared })
        );
    } else {
        println!("Deleted recipe {}", deleted.name);
        if cleared > 0 {
            println!("Cleared {cleared} planned meal(s) that used it");
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_shop(svc: &mut LarderService, recipe: &str, json: bool) -> Result<()> {
    let id = require_recipe_id(svc, recipe, json);
    let added = svc.add_recipe_to_shopping(id)?;
    if json {
        println!("{}", serde_json::json!({ "added": added }));
    } else if added == 0 {
        eprintln!("Everything for this recipe is in stock or already on the list");
    } else {
        println!("Added {added} ingredient(s) to the shopping list");
    }
    Ok(())
}

pub(crate) fn cmd_recipe_import(
    svc: &mut LarderService,
    file: &std::path::Path,
    name_override: Option<&str>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let file_stem = file.file_stem().and_then(|s| s.to_str());

    let detail = svc.import_cooklang(&input, name_override, file_stem)?;
    if json {
        print_json(&detail)
    } else {
        println!(
            "Imported recipe: {} ({} ingredients)",
            detail.recipe.name,
            detail.ingredients.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ingredient_with_bad_quantity_leaves_catalog_alone() {
        let mut svc = LarderService::new_in_memory().unwrap();
        svc.create_recipe("Soup", "", "").unwrap();
        let result = cmd_recipe_add_ingredient(&mut svc, "Soup", "Saffron", 0.0, None, None, true);
        assert!(result.is_err());
        assert!(svc.find_product("saffron", None).is_none());
        assert!(svc.catalog().products().is_empty());
    }

    #[test]
    fn test_add_ingredient_creates_missing_product() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let soup = svc.create_recipe("Soup", "", "").unwrap();
        cmd_recipe_add_ingredient(&mut svc, "Soup", "Leek", 2.0, None, None, true).unwrap();
        let leek = svc.find_product("leek", None).unwrap();
        assert_eq!(leek.category, INGREDIENT_CATEGORY);
        let detail = svc.recipe_detail(soup.id).unwrap();
        assert_eq!(detail.recipe.ingredients.len(), 1);
    }

    #[test]
    fn test_ingredient_product_reuses_product_from_other_category() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let (milk, _) = svc.add_to_pantry("Milk", "dairy").unwrap();
        let (id, created) = ingredient_product(&mut svc, "milk", Some("Produce"), true).unwrap();
        assert_eq!(id, milk.id);
        assert!(!created);
        assert_eq!(svc.catalog().products().len(), 1);

        let (_, created) = ingredient_product(&mut svc, "Basil", Some("Produce"), true).unwrap();
        assert!(created);
        assert_eq!(svc.find_product("basil", Some("produce")).unwrap().category, "produce");
    }
}
