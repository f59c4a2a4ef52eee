use anyhow::{Result, bail};
use tabled::{Table, Tabled, settings::Style};

use larder_core::planner::{MealSlot, PlannedMeal, check_meal_name, locate, week_start};
use larder_core::service::{INGREDIENT_CATEGORY, LarderService};

use super::helpers::{find_product_id, parse_date, print_json, require_recipe_id, truncate};

fn label(svc: &LarderService, meal: Option<&PlannedMeal>) -> String {
    meal.map(|m| truncate(&svc.meal_label(m), 24))
        .unwrap_or_default()
}

pub(crate) fn cmd_plan_show(svc: &LarderService, date: Option<String>, json: bool) -> Result<()> {
    let week = week_start(parse_date(date)?);
    let view = svc.week(week)?;
    if json {
        return print_json(&view);
    }

    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Day")]
        day: String,
        #[tabled(rename = "Breakfast")]
        breakfast: String,
        #[tabled(rename = "Lunch")]
        lunch: String,
        #[tabled(rename = "Dinner")]
        dinner: String,
    }

    let rows: Vec<DayRow> = view
        .days
        .iter()
        .map(|d| DayRow {
            day: format!("{} {}", d.weekday, d.date.format("%m-%d")),
            breakfast: label(svc, d.slot(MealSlot::Breakfast)),
            lunch: label(svc, d.slot(MealSlot::Lunch)),
            dinner: label(svc, d.slot(MealSlot::Dinner)),
        })
        .collect();

    println!("Week of {}", week.format("%Y-%m-%d"));
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}

/// What to put in a slot: a recipe, or a named meal with loose products.
pub(crate) enum MealChoice {
    Recipe(String),
    Simple { name: String, products: Vec<String> },
}

pub(crate) fn cmd_plan_set(
    svc: &mut LarderService,
    date: Option<String>,
    slot: MealSlot,
    choice: MealChoice,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let previous = match choice {
        MealChoice::Recipe(recipe) => {
            let id = require_recipe_id(svc, &recipe, json);
            svc.assign_recipe(date, slot, id)?
        }
        MealChoice::Simple { name, products } => {
            check_meal_name(&name)?;
            let mut ids = Vec::with_capacity(products.len());
            for product in products.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
                let id = match find_product_id(svc, product, None) {
                    Some(id) => id,
                    None => svc.resolve_product(product, INGREDIENT_CATEGORY)?.0.id,
                };
                ids.push(id);
            }
            svc.assign_simple(date, slot, &name, ids)?
        }
    };

    let (week, day) = locate(date);
    let assigned = svc.meal_plan().get(week, day, slot).cloned();
    if json {
        return print_json(&assigned);
    }
    let label = assigned
        .as_ref()
        .map(|m| svc.meal_label(m))
        .unwrap_or_default();
    println!("{} {slot}: {label}", date.format("%a %Y-%m-%d"));
    if let Some(previous) = previous {
        println!("  (replaced {})", svc.meal_label(&previous));
    }
    Ok(())
}

pub(crate) fn cmd_plan_clear(
    svc: &mut LarderService,
    date: Option<String>,
    slot: Option<MealSlot>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let cleared = match slot {
        Some(slot) => usize::from(svc.clear_meal(date, slot)?.is_some()),
        None => svc.clear_week(date)?,
    };

    if json {
        println!("{}", serde_json::json!({ "cleared": cleared }));
    } else if cleared == 0 {
        eprintln!("Nothing planned there");
    } else if let Some(slot) = slot {
        println!("Cleared {slot} on {date}");
    } else {
        println!(
            "Cleared {cleared} meal(s) from the week of {}",
            week_start(date)
        );
    }
    Ok(())
}

pub(crate) fn cmd_plan_copy(
    svc: &mut LarderService,
    from: Option<String>,
    to: &str,
    json: bool,
) -> Result<()> {
    let from = week_start(parse_date(from)?);
    let to = week_start(parse_date(Some(to.to_string()))?);
    if from == to {
        bail!("Both dates fall in the week of {from}");
    }
    let copied = svc.copy_week(from, to)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "from": from, "to": to, "copied": copied })
        );
    } else {
        println!("Copied {copied} meal(s) from the week of {from} to the week of {to}");
    }
    Ok(())
}

pub(crate) fn cmd_plan_shop(svc: &mut LarderService, date: Option<String>, json: bool) -> Result<()> {
    let week = week_start(parse_date(date)?);
    let added = svc.add_week_to_shopping(week)?;
    if json {
        println!("{}", serde_json::json!({ "week": week, "added": added }));
    } else if added == 0 {
        eprintln!("Nothing to add for the week of {week}");
    } else {
        println!("Added {added} item(s) for the week of {week} to the shopping list");
    }
    Ok(())
}
