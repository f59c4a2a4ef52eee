use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::process;

use larder_core::models::Recipe;
use larder_core::service::LarderService;

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Category ids are the lowercased, trimmed name.
pub(crate) fn category_id(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Resolve a category name to the id of an existing category.
pub(crate) fn find_category_id(svc: &LarderService, name: &str) -> Option<String> {
    let id = category_id(name);
    svc.catalog().category(&id).map(|c| c.id.clone())
}

/// Like [`find_category_id`], but exits with status 2 when nothing matches.
pub(crate) fn require_category_id(svc: &LarderService, name: &str, json: bool) -> String {
    find_category_id(svc, name)
        .unwrap_or_else(|| not_found(&format!("Category '{}' not found", category_id(name)), json))
}

/// Resolve `item` (an id or a name) to a product id.
pub(crate) fn find_product_id(
    svc: &LarderService,
    item: &str,
    category: Option<&str>,
) -> Option<i64> {
    if let Ok(id) = item.trim().parse::<i64>() {
        if svc.get_product(id).is_ok() {
            return Some(id);
        }
    }
    let category = category.map(category_id);
    svc.find_product(item, category.as_deref()).map(|p| p.id)
}

/// Like [`find_product_id`], but exits with status 2 when nothing matches.
pub(crate) fn require_product_id(
    svc: &LarderService,
    item: &str,
    category: Option<&str>,
    json: bool,
) -> i64 {
    find_product_id(svc, item, category)
        .unwrap_or_else(|| not_found(&format!("No product found for '{item}'"), json))
}

pub(crate) fn find_recipe<'a>(svc: &'a LarderService, recipe: &str) -> Option<&'a Recipe> {
    if let Ok(id) = recipe.trim().parse::<i64>() {
        if let Ok(found) = svc.recipe_book().get(id) {
            return Some(found);
        }
    }
    svc.find_recipe(recipe)
}

pub(crate) fn require_recipe_id(svc: &LarderService, recipe: &str, json: bool) -> i64 {
    find_recipe(svc, recipe)
        .map(|r| r.id)
        .unwrap_or_else(|| not_found(&format!("Recipe '{recipe}' not found"), json))
}

/// Report a missing record and exit with status 2.
pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Trim trailing zeros so `2.0` prints as `2` and `0.25` stays `0.25`.
pub(crate) fn format_quantity(quantity: f64) -> String {
    let s = format!("{quantity:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "" }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-06-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("someday".to_string())).is_err());
    }

    #[test]
    fn test_category_id() {
        assert_eq!(category_id("  Dairy "), "dairy");
    }

    #[test]
    fn test_find_category_id() {
        let mut svc = LarderService::new_in_memory().unwrap();
        assert_eq!(find_category_id(&svc, " Dairy"), Some("dairy".to_string()));
        assert_eq!(find_category_id(&svc, "snacks"), None);
        svc.add_category("Snacks", None).unwrap();
        assert_eq!(find_category_id(&svc, "SNACKS"), Some("snacks".to_string()));
    }

    #[test]
    fn test_find_product_id_by_id_and_name() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let (milk, _) = svc.add_to_shopping("Milk", "dairy").unwrap();
        assert_eq!(find_product_id(&svc, &milk.id.to_string(), None), Some(milk.id));
        assert_eq!(find_product_id(&svc, "milk", None), Some(milk.id));
        assert_eq!(find_product_id(&svc, "milk", Some("Dairy")), Some(milk.id));
        assert_eq!(find_product_id(&svc, "milk", Some("produce")), None);
        assert_eq!(find_product_id(&svc, "cheese", None), None);
    }

    #[test]
    fn test_find_recipe_by_id_and_name() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let recipe = svc.create_recipe("Soup", "", "").unwrap();
        assert_eq!(find_recipe(&svc, "1").unwrap().id, recipe.id);
        assert_eq!(find_recipe(&svc, "SOUP").unwrap().id, recipe.id);
        assert!(find_recipe(&svc, "Stew").is_none());
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(2.0), "2");
        assert_eq!(format_quantity(0.25), "0.25");
        assert_eq!(format_quantity(1.5), "1.5");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }
}
