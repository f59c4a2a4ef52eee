use std::collections::HashSet;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::legacy_import::{LegacyShoppingItem, LegacyStandardItem};
use crate::planner::MealPlan;

/// Version written into every export file.
pub const EXPORT_VERSION: &str = "2.0";

/// File name the export/import round-trip is built around.
pub const EXPORT_FILE_NAME: &str = "grocery-data.json";

pub const DEFAULT_CATEGORY_EMOJI: &str = "🏷️";

/// Emoji shown for products whose category is missing from the registry.
pub const FALLBACK_CATEGORY_EMOJI: &str = "📦";

pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("produce", "🥬"),
    ("dairy", "🥛"),
    ("meat", "🥩"),
    ("pantry", "🥫"),
    ("frozen", "🧊"),
    ("bakery", "🍞"),
    ("other", "📦"),
];

fn default_true() -> bool {
    true
}

fn default_quantity() -> f64 {
    1.0
}

/// Trimmed, lowercased product name used for de-duplication.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub in_shopping: bool,
    #[serde(default)]
    pub in_pantry: bool,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default = "default_true")]
    pub in_season: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub date_added: String,
}

impl Product {
    /// True when `name` + `category` is this product's de-dup key.
    #[must_use]
    pub fn matches(&self, name: &str, category: &str) -> bool {
        self.category == category && normalize_name(&self.name) == normalize_name(name)
    }

    /// Clear flags that only make sense alongside another flag.
    pub fn normalize(&mut self) {
        if !self.in_shopping {
            self.completed = false;
        }
        if !self.in_pantry {
            self.in_stock = false;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub in_shopping: bool,
    pub in_pantry: bool,
    pub in_stock: bool,
    pub in_season: bool,
}

impl NewProduct {
    /// A product known to the catalog but on neither list.
    #[must_use]
    pub fn catalog_only(name: &str, category: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            category: category.to_string(),
            in_shopping: false,
            in_pantry: false,
            in_stock: false,
            in_season: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub category: Option<String>,
    pub in_season: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub in_season_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub emoji: String,
    pub order: usize,
    #[serde(default)]
    pub is_default: bool,
}

impl Category {
    /// Name with its first letter upper-cased, as shown in headings.
    #[must_use]
    pub fn display_name(&self) -> String {
        capitalize(&self.name)
    }
}

#[must_use]
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[must_use]
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(order, (name, emoji))| Category {
            id: (*name).to_string(),
            name: (*name).to_string(),
            emoji: (*emoji).to_string(),
            order,
            is_default: true,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub preparation: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateRecipe {
    pub name: Option<String>,
    pub description: Option<String>,
    pub preparation: Option<String>,
}

// --- View projections ---

#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub name: String,
    pub emoji: String,
    pub items: Vec<Product>,
    pub in_stock: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    pub groups: Vec<CategoryGroup>,
    pub bought: Vec<Product>,
    pub remaining: usize,
    pub total: usize,
}

impl ShoppingList {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PantryList {
    pub groups: Vec<CategoryGroup>,
    pub in_stock: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub ingredients: Vec<IngredientDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngredientDetail {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub in_stock: bool,
    pub in_shopping: bool,
}

// --- Export / Import ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipes: Option<Vec<Recipe>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_plan: Option<MealPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_items: Option<Vec<LegacyShoppingItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_items: Option<Vec<LegacyStandardItem>>,
}

impl ExportData {
    /// Files written before the unified catalog carried two separate lists.
    #[must_use]
    pub fn is_legacy(&self) -> bool {
        self.products.is_none() && (self.shopping_items.is_some() || self.standard_items.is_some())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub products: usize,
    pub categories: usize,
    pub recipes: usize,
    pub planned_meals: usize,
    pub legacy_items: usize,
    pub dropped_references: usize,
}

// --- Validation ---

pub fn validate_product(product: &Product) -> Result<()> {
    if product.name.trim().is_empty() {
        bail!("Product {} has an empty name", product.id);
    }
    if product.category.trim().is_empty() {
        bail!("Product '{}' has no category", product.name);
    }
    Ok(())
}

pub fn validate_category(category: &Category) -> Result<()> {
    if category.id.trim().is_empty() || category.name.trim().is_empty() {
        bail!("Category id and name must not be empty");
    }
    if category.id != normalize_name(&category.name) {
        bail!(
            "Category id '{}' does not match its name '{}'",
            category.id,
            category.name
        );
    }
    Ok(())
}

pub fn validate_quantity(quantity: f64) -> Result<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        bail!("Ingredient quantity must be greater than 0 (got {quantity})");
    }
    Ok(())
}

pub fn validate_ingredient(ingredient: &Ingredient) -> Result<()> {
    validate_quantity(ingredient.quantity)
}

pub fn validate_recipe(recipe: &Recipe) -> Result<()> {
    if recipe.name.trim().is_empty() {
        bail!("Recipe {} has an empty name", recipe.id);
    }
    let mut seen = HashSet::new();
    for ingredient in &recipe.ingredients {
        validate_ingredient(ingredient)?;
        if !seen.insert(ingredient.product_id) {
            bail!(
                "Recipe '{}' lists product {} more than once",
                recipe.name,
                ingredient.product_id
            );
        }
    }
    Ok(())
}

/// Reject a collection in which two entries share an id.
pub fn ensure_unique_ids<T, K, F>(items: &[T], what: &str, key: F) -> Result<()>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    for item in items {
        let id = key(item);
        if seen.contains(&id) {
            bail!("Duplicate {what} id {id}");
        }
        seen.insert(id);
    }
    Ok(())
}

/// Reject a collection in which two entries share a name, ignoring case.
pub fn ensure_unique_names<T, F>(items: &[T], what: &str, name: F) -> Result<()>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    for item in items {
        let name = name(item);
        if !seen.insert(normalize_name(name)) {
            bail!("Duplicate {what} name '{name}'");
        }
    }
    Ok(())
}
