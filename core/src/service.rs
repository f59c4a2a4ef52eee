//! Orchestration layer over the catalog, recipe book and meal planner.
//!
//! Every mutating method edits the in-memory collections and then persists
//! the collections it touched before returning, so a caller never has to
//! remember to save.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::db::{Database, LoadSource};
use crate::legacy_import::{
    self, LEGACY_SHOPPING_KEY, LEGACY_STANDARD_KEY, LegacyShoppingItem, LegacyStandardItem,
};
use crate::models::{
    Category, EXPORT_VERSION, ExportData, ImportSummary, Ingredient, IngredientDetail, NewProduct,
    PantryList, Product, ProductFilter, Recipe, RecipeDetail, ShoppingList, UpdateProduct,
    UpdateRecipe, ensure_unique_ids, ensure_unique_names, validate_category, validate_product,
    validate_recipe,
};
use crate::planner::{MealPlan, MealSlot, PlannedMeal, WeekView, week_start};
use crate::recipes::RecipeBook;

pub const PRODUCTS_KEY: &str = "products";
pub const CATEGORIES_KEY: &str = "categories";
pub const RECIPES_KEY: &str = "recipes";
pub const MEAL_PLAN_KEY: &str = "mealPlan";

/// Category given to products created while resolving recipe ingredients.
pub const INGREDIENT_CATEGORY: &str = "other";

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub key: &'static str,
    pub loaded_from: LoadSource,
    pub items: usize,
    pub saved_at: Option<String>,
}

pub struct LarderService {
    db: Database,
    catalog: Catalog,
    recipes: RecipeBook,
    plan: MealPlan,
    sources: Vec<(&'static str, LoadSource)>,
}

impl LarderService {
    pub fn new(db_path: &Path) -> Result<Self> {
        Self::load(Database::open(db_path)?)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::load(Database::open_in_memory()?)
    }

    fn load(db: Database) -> Result<Self> {
        let (products, products_source) =
            if !db.has_collection(PRODUCTS_KEY)? && has_legacy_lists(&db)? {
                migrate_legacy_storage(&db)?
            } else {
                db.load_collection::<Vec<Product>>(PRODUCTS_KEY)?
            };
        let (categories, categories_source) =
            db.load_collection::<Vec<Category>>(CATEGORIES_KEY)?;
        let (recipes, recipes_source) = db.load_collection::<Vec<Recipe>>(RECIPES_KEY)?;
        let (mut plan, plan_source) = db.load_collection::<MealPlan>(MEAL_PLAN_KEY)?;
        if let Err(e) = plan.validate() {
            tracing::error!(error = %e, "stored meal plan is invalid, starting empty");
            plan = MealPlan::default();
        }

        let mut svc = Self {
            db,
            catalog: Catalog::new(products, categories),
            recipes: RecipeBook::new(recipes),
            plan,
            sources: vec![
                (PRODUCTS_KEY, products_source),
                (CATEGORIES_KEY, categories_source),
                (RECIPES_KEY, recipes_source),
                (MEAL_PLAN_KEY, plan_source),
            ],
        };
        if svc.catalog.ensure_default_categories() {
            tracing::info!("installed default categories");
            svc.save_categories()?;
        }
        Ok(svc)
    }

    // --- Persistence ---

    fn save_products(&self) -> Result<()> {
        self.db.save_collection(PRODUCTS_KEY, self.catalog.products())
    }

    fn save_categories(&self) -> Result<()> {
        self.db
            .save_collection(CATEGORIES_KEY, self.catalog.categories())
    }

    fn save_recipes(&self) -> Result<()> {
        self.db.save_collection(RECIPES_KEY, self.recipes.recipes())
    }

    fn save_plan(&self) -> Result<()> {
        self.db.save_collection(MEAL_PLAN_KEY, &self.plan)
    }

    fn save_all(&self) -> Result<()> {
        self.save_products()?;
        self.save_categories()?;
        self.save_recipes()?;
        self.save_plan()
    }

    /// Run a catalog mutation and persist products on success.
    fn with_catalog<T>(&mut self, f: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        let value = f(&mut self.catalog)?;
        self.save_products()?;
        Ok(value)
    }

    // --- Read access ---

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn recipe_book(&self) -> &RecipeBook {
        &self.recipes
    }

    #[must_use]
    pub fn meal_plan(&self) -> &MealPlan {
        &self.plan
    }

    #[must_use]
    pub fn shopping_list(&self) -> ShoppingList {
        self.catalog.shopping_list()
    }

    #[must_use]
    pub fn pantry_list(&self) -> PantryList {
        self.catalog.pantry_list()
    }

    #[must_use]
    pub fn list_products(&self, filter: &ProductFilter) -> Vec<Product> {
        self.catalog.list_products(filter)
    }

    pub fn get_product(&self, id: i64) -> Result<Product> {
        self.catalog.get(id).cloned()
    }

    /// Look a product up by name, optionally restricted to one category.
    #[must_use]
    pub fn find_product(&self, name: &str, category: Option<&str>) -> Option<&Product> {
        match category {
            Some(category) => self.catalog.find(name, category),
            None => self.catalog.find_by_name(name),
        }
    }

    // --- Shopping list ---

    pub fn add_to_shopping(&mut self, name: &str, category: &str) -> Result<(Product, bool)> {
        self.with_catalog(|c| c.add_to_shopping(name, category))
    }

    pub fn toggle_completed(&mut self, id: i64) -> Result<Product> {
        self.with_catalog(|c| c.toggle_completed(id))
    }

    pub fn remove_from_shopping(&mut self, id: i64) -> Result<Product> {
        self.with_catalog(|c| c.remove_from_shopping(id))
    }

    pub fn mark_in_stock(&mut self, id: i64) -> Result<Product> {
        self.with_catalog(|c| c.mark_in_stock(id))
    }

    pub fn clear_completed(&mut self) -> Result<usize> {
        self.with_catalog(|c| Ok(c.clear_completed()))
    }

    // --- Pantry ---

    pub fn add_to_pantry(&mut self, name: &str, category: &str) -> Result<(Product, bool)> {
        self.with_catalog(|c| c.add_to_pantry(name, category))
    }

    pub fn toggle_stock(&mut self, id: i64) -> Result<Product> {
        self.with_catalog(|c| c.toggle_stock(id))
    }

    pub fn remove_from_pantry(&mut self, id: i64) -> Result<Product> {
        self.with_catalog(|c| c.remove_from_pantry(id))
    }

    pub fn add_unstocked_to_shopping(&mut self) -> Result<usize> {
        self.with_catalog(|c| Ok(c.add_unstocked_to_shopping()))
    }

    // --- Catalog ---

    pub fn update_product(&mut self, id: i64, update: &UpdateProduct) -> Result<Product> {
        self.with_catalog(|c| c.update_product(id, update))
    }

    pub fn toggle_season(&mut self, id: i64) -> Result<Product> {
        self.with_catalog(|c| c.toggle_season(id))
    }

    /// Remove a product that no recipe or planned meal still points at.
    pub fn delete_product(&mut self, id: i64) -> Result<Product> {
        let product = self.catalog.get(id)?;
        if let Some(recipe) = self.recipes.first_using(id) {
            bail!(
                "'{}' is used by recipe '{}'. Remove it from the recipe first",
                product.name,
                recipe.name
            );
        }
        if self.plan.references_product(id) {
            bail!(
                "'{}' is part of a planned meal. Clear that meal first",
                product.name
            );
        }
        self.with_catalog(|c| c.remove_product(id))
    }

    /// Find a product by name in any category, or create a catalog-only
    /// product in `category`.
    pub fn resolve_product(&mut self, name: &str, category: &str) -> Result<(Product, bool)> {
        if let Some(existing) = self.catalog.find_by_name(name) {
            return Ok((existing.clone(), false));
        }
        self.with_catalog(|c| c.add_product(&NewProduct::catalog_only(name, category)))
    }

    // --- Categories ---

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        self.catalog.categories()
    }

    pub fn add_category(&mut self, name: &str, emoji: Option<&str>) -> Result<Category> {
        let category = self.catalog.add_category(name, emoji)?;
        self.save_categories()?;
        Ok(category)
    }

    pub fn delete_category(&mut self, id: &str) -> Result<Category> {
        let category = self.catalog.delete_category(id)?;
        self.save_categories()?;
        Ok(category)
    }

    pub fn move_category(&mut self, from: usize, to: usize) -> Result<()> {
        self.catalog.move_category(from, to)?;
        self.save_categories()
    }

    // --- Recipes ---

    #[must_use]
    pub fn list_recipes(&self) -> Vec<Recipe> {
        self.recipes.list()
    }

    #[must_use]
    pub fn find_recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.find_by_name(name)
    }

    pub fn create_recipe(
        &mut self,
        name: &str,
        description: &str,
        preparation: &str,
    ) -> Result<Recipe> {
        let recipe = self.recipes.create(name, description, preparation)?;
        self.save_recipes()?;
        tracing::debug!(id = recipe.id, name = %recipe.name, "recipe created");
        Ok(recipe)
    }

    pub fn update_recipe(&mut self, id: i64, update: &UpdateRecipe) -> Result<Recipe> {
        let recipe = self.recipes.update(id, update)?;
        self.save_recipes()?;
        Ok(recipe)
    }

    /// Delete a recipe and clear every planned slot that used it. Returns
    /// the recipe and the number of slots cleared.
    pub fn delete_recipe(&mut self, id: i64) -> Result<(Recipe, usize)> {
        let recipe = self.recipes.delete(id)?;
        let cleared = self.plan.remove_recipe(id);
        self.save_recipes()?;
        if cleared > 0 {
            self.save_plan()?;
        }
        Ok((recipe, cleared))
    }

    pub fn recipe_detail(&self, id: i64) -> Result<RecipeDetail> {
        let recipe = self.recipes.get(id)?.clone();
        let ingredients = recipe
            .ingredients
            .iter()
            .filter_map(|ingredient| match self.catalog.get(ingredient.product_id) {
                Ok(product) => Some(IngredientDetail {
                    product_id: product.id,
                    name: product.name.clone(),
                    category: product.category.clone(),
                    quantity: ingredient.quantity,
                    unit: ingredient.unit.clone(),
                    in_stock: product.in_stock,
                    in_shopping: product.in_shopping,
                }),
                Err(e) => {
                    tracing::warn!(recipe = recipe.id, error = %e, "skipping dangling ingredient");
                    None
                }
            })
            .collect();
        Ok(RecipeDetail {
            recipe,
            ingredients,
        })
    }

    pub fn add_ingredient(
        &mut self,
        recipe_id: i64,
        product_id: i64,
        quantity: f64,
        unit: &str,
    ) -> Result<Recipe> {
        self.catalog.get(product_id)?;
        let recipe = self.recipes.add_ingredient(
            recipe_id,
            Ingredient {
                product_id,
                quantity,
                unit: unit.trim().to_string(),
            },
        )?;
        self.save_recipes()?;
        Ok(recipe)
    }

    pub fn remove_ingredient(&mut self, recipe_id: i64, product_id: i64) -> Result<bool> {
        let removed = self.recipes.remove_ingredient(recipe_id, product_id)?;
        if removed {
            self.save_recipes()?;
        }
        Ok(removed)
    }

    /// Put a recipe's ingredients on the shopping list.
    pub fn add_recipe_to_shopping(&mut self, recipe_id: i64) -> Result<usize> {
        let ids: Vec<i64> = self
            .recipes
            .get(recipe_id)?
            .ingredients
            .iter()
            .map(|i| i.product_id)
            .collect();
        self.add_existing_to_shopping(ids)
    }

    fn add_existing_to_shopping(&mut self, mut ids: Vec<i64>) -> Result<usize> {
        ids.retain(|id| self.catalog.get(*id).is_ok());
        let added = self.with_catalog(|c| c.add_products_to_shopping(&ids))?;
        tracing::debug!(added, "products added to shopping list");
        Ok(added)
    }

    /// Create a recipe from Cooklang source, resolving each ingredient to a
    /// catalog product. The name comes from `name_override`, then the
    /// recipe's title metadata, then `fallback_name`.
    pub fn import_cooklang(
        &mut self,
        source: &str,
        name_override: Option<&str>,
        fallback_name: Option<&str>,
    ) -> Result<RecipeDetail> {
        let (recipe_data, _report) = cooklang::parse(source)
            .into_result()
            .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang recipe: {e}"))?;

        let name = name_override
            .map(String::from)
            .or_else(|| recipe_data.metadata.title().map(String::from))
            .or_else(|| fallback_name.map(String::from))
            .context("Could not determine recipe name. Pass --name to specify one")?;
        if name.trim().is_empty() {
            bail!("Recipe name must not be empty");
        }
        if let Some(existing) = self.recipes.find_by_name(&name) {
            bail!("A recipe named '{}' already exists", existing.name);
        }

        let description = recipe_data
            .metadata
            .servings()
            .and_then(|s| s.as_number().map(f64::from))
            .map(|n| format!("Serves {n}"))
            .unwrap_or_default();

        let converter = cooklang::Converter::default();
        let grouped = recipe_data.group_ingredients(&converter);
        let parsed: Vec<(String, f64, String)> = grouped.iter().map(cooklang_ingredient).collect();
        if parsed.is_empty() {
            bail!("No ingredients found in recipe");
        }

        let mut ingredients = Vec::with_capacity(parsed.len());
        for (ingredient_name, quantity, unit) in parsed {
            let (product, _) = self.resolve_product(&ingredient_name, INGREDIENT_CATEGORY)?;
            ingredients.push(Ingredient {
                product_id: product.id,
                quantity,
                unit,
            });
        }

        let recipe = self.recipes.create(&name, &description, "")?;
        for ingredient in ingredients {
            self.recipes.add_ingredient(recipe.id, ingredient)?;
        }
        self.save_recipes()?;
        tracing::info!(id = recipe.id, name = %recipe.name, "imported Cooklang recipe");
        self.recipe_detail(recipe.id)
    }

    // --- Meal planner ---

    pub fn week(&self, week: NaiveDate) -> Result<WeekView> {
        self.plan.week(week)
    }

    pub fn assign_recipe(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        recipe_id: i64,
    ) -> Result<Option<PlannedMeal>> {
        self.recipes.get(recipe_id)?;
        let previous = self
            .plan
            .assign_on(date, slot, PlannedMeal::Recipe { id: recipe_id })?;
        self.save_plan()?;
        Ok(previous)
    }

    pub fn assign_simple(
        &mut self,
        date: NaiveDate,
        slot: MealSlot,
        name: &str,
        products: Vec<i64>,
    ) -> Result<Option<PlannedMeal>> {
        for id in &products {
            self.catalog.get(*id)?;
        }
        let previous = self.plan.assign_on(
            date,
            slot,
            PlannedMeal::Simple {
                name: name.trim().to_string(),
                products,
            },
        )?;
        self.save_plan()?;
        Ok(previous)
    }

    pub fn clear_meal(&mut self, date: NaiveDate, slot: MealSlot) -> Result<Option<PlannedMeal>> {
        let removed = self.plan.clear_on(date, slot);
        if removed.is_some() {
            self.save_plan()?;
        }
        Ok(removed)
    }

    pub fn clear_week(&mut self, week: NaiveDate) -> Result<usize> {
        let cleared = self.plan.clear_week(week_start(week));
        if cleared > 0 {
            self.save_plan()?;
        }
        Ok(cleared)
    }

    pub fn copy_week(&mut self, from: NaiveDate, to: NaiveDate) -> Result<usize> {
        let copied = self.plan.copy_week(from, to)?;
        self.save_plan()?;
        Ok(copied)
    }

    /// Put every product used by the week's meals on the shopping list.
    pub fn add_week_to_shopping(&mut self, week: NaiveDate) -> Result<usize> {
        let ids = self.week_product_ids(week_start(week));
        self.add_existing_to_shopping(ids)
    }

    fn week_product_ids(&self, week: NaiveDate) -> Vec<i64> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for meal in self.plan.meals_in_week(week) {
            let products: Vec<i64> = match meal {
                PlannedMeal::Recipe { id } => self
                    .recipes
                    .get(*id)
                    .map(|r| r.ingredients.iter().map(|i| i.product_id).collect())
                    .unwrap_or_default(),
                PlannedMeal::Simple { products, .. } => products.clone(),
            };
            for id in products {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// Human-readable label for a planned meal.
    #[must_use]
    pub fn meal_label(&self, meal: &PlannedMeal) -> String {
        match meal {
            PlannedMeal::Recipe { id } => self
                .recipes
                .get(*id)
                .map_or_else(|_| format!("Recipe #{id}"), |r| r.name.clone()),
            PlannedMeal::Simple { name, .. } => name.clone(),
        }
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        let data = ExportData {
            version: EXPORT_VERSION.to_string(),
            export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            export_time: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            device_info: Some(device_info()),
            device_id: Some(self.db.get_or_create_device_id()?),
            products: Some(self.catalog.products().to_vec()),
            categories: Some(self.catalog.categories().to_vec()),
            recipes: Some(self.recipes.recipes().to_vec()),
            meal_plan: Some(self.plan.clone()),
            shopping_items: None,
            standard_items: None,
        };
        tracing::info!(
            products = self.catalog.products().len(),
            recipes = self.recipes.recipes().len(),
            "export prepared"
        );
        Ok(data)
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export_all()?).context("Failed to serialize export")
    }

    pub fn import_json(&mut self, text: &str) -> Result<ImportSummary> {
        let data: ExportData =
            serde_json::from_str(text).context("Invalid backup file: not valid export data")?;
        self.import_data(data)
    }

    /// Replace every collection present in `data`. Nothing changes unless
    /// the whole file validates.
    pub fn import_data(&mut self, data: ExportData) -> Result<ImportSummary> {
        if data.version.trim().is_empty() || data.export_date.trim().is_empty() {
            bail!("Invalid backup file format: missing version or exportDate");
        }

        let mut summary = ImportSummary::default();
        let products = if data.is_legacy() {
            let (products, conversion) = legacy_import::convert_legacy(
                data.shopping_items.as_deref().unwrap_or_default(),
                data.standard_items.as_deref().unwrap_or_default(),
            );
            summary.legacy_items = conversion.items_read;
            Some(products)
        } else {
            data.products
        };
        validate_import(
            products.as_deref(),
            data.categories.as_deref(),
            data.recipes.as_deref(),
            data.meal_plan.as_ref(),
        )
        .context("Invalid backup file")?;

        let mut catalog = self.catalog.clone();
        if let Some(products) = products {
            summary.products = products.len();
            catalog.replace_products(products);
        }
        if let Some(categories) = data.categories {
            catalog.replace_categories(categories);
            if catalog.ensure_default_categories() {
                tracing::warn!("imported category list was empty, using defaults");
            }
            summary.categories = catalog.categories().len();
        }

        let mut recipes = self.recipes.clone();
        if let Some(list) = data.recipes {
            summary.recipes = list.len();
            recipes.replace(list);
        }
        let mut plan = match data.meal_plan {
            Some(plan) => {
                summary.planned_meals = plan.len();
                plan
            }
            None => self.plan.clone(),
        };

        let product_ids: HashSet<i64> = catalog.products().iter().map(|p| p.id).collect();
        let recipe_ids: HashSet<i64> = recipes.recipes().iter().map(|r| r.id).collect();
        let dropped = recipes.retain_products(|id| product_ids.contains(&id))
            + plan.retain_references(
                |id| product_ids.contains(&id),
                |id| recipe_ids.contains(&id),
            );
        if dropped > 0 {
            tracing::warn!(dropped, "dropped references to missing products or recipes");
        }
        summary.dropped_references = dropped;

        self.catalog = catalog;
        self.recipes = recipes;
        self.plan = plan;
        self.save_all()?;

        tracing::info!(
            products = summary.products,
            categories = summary.categories,
            recipes = summary.recipes,
            planned_meals = summary.planned_meals,
            "import complete"
        );
        Ok(summary)
    }

    /// Load the starter items into an empty catalog.
    pub fn seed_sample_data(&mut self) -> Result<usize> {
        let existing = self.catalog.products().len();
        if existing > 0 {
            bail!(
                "The catalog already has {existing} product(s). Sample data only loads into an empty catalog"
            );
        }

        let now = Local::now().to_rfc3339();
        let shopping = [
            sample_shopping("Bananas", "produce", false, &now),
            sample_shopping("Milk", "dairy", true, &now),
        ];
        let standard = [
            sample_standard("Rice", "pantry", true, &now),
            sample_standard("Milk", "dairy", false, &now),
            sample_standard("Apples", "produce", true, &now),
        ];
        let (products, _) = legacy_import::convert_legacy(&shopping, &standard);
        let count = products.len();
        self.catalog.replace_products(products);
        self.save_products()?;
        tracing::info!(count, "sample data loaded");
        Ok(count)
    }

    // --- Health ---

    pub fn check_health(&self) -> Result<()> {
        self.db.check_health()
    }

    pub fn device_id(&self) -> Result<String> {
        self.db.get_or_create_device_id()
    }

    /// Where each collection was loaded from at startup and when it was
    /// last saved.
    pub fn collection_status(&self) -> Result<Vec<CollectionStatus>> {
        self.sources
            .iter()
            .map(|&(key, loaded_from)| {
                let items = match key {
                    PRODUCTS_KEY => self.catalog.products().len(),
                    CATEGORIES_KEY => self.catalog.categories().len(),
                    RECIPES_KEY => self.recipes.recipes().len(),
                    _ => self.plan.len(),
                };
                Ok(CollectionStatus {
                    key,
                    loaded_from,
                    items,
                    saved_at: self.db.collection_timestamp(key)?,
                })
            })
            .collect()
    }
}

fn has_legacy_lists(db: &Database) -> Result<bool> {
    Ok(db.has_collection(LEGACY_SHOPPING_KEY)? || db.has_collection(LEGACY_STANDARD_KEY)?)
}

/// Convert the two-list storage layout into products and persist them.
fn migrate_legacy_storage(db: &Database) -> Result<(Vec<Product>, LoadSource)> {
    let (shopping, _) = db.load_collection::<Vec<LegacyShoppingItem>>(LEGACY_SHOPPING_KEY)?;
    let (standard, _) = db.load_collection::<Vec<LegacyStandardItem>>(LEGACY_STANDARD_KEY)?;
    let (products, conversion) = legacy_import::convert_legacy(&shopping, &standard);
    db.save_collection(PRODUCTS_KEY, &products)?;
    tracing::info!(
        products = conversion.products_created,
        "migrated legacy shopping and pantry lists"
    );
    Ok((products, LoadSource::Primary))
}

fn validate_import(
    products: Option<&[Product]>,
    categories: Option<&[Category]>,
    recipes: Option<&[Recipe]>,
    plan: Option<&MealPlan>,
) -> Result<()> {
    if let Some(products) = products {
        for product in products {
            validate_product(product)?;
        }
        ensure_unique_ids(products, "product", |p| p.id)?;
    }
    if let Some(categories) = categories {
        for category in categories {
            validate_category(category)?;
        }
        ensure_unique_ids(categories, "category", |c| c.id.clone())?;
        ensure_unique_names(categories, "category", |c| c.name.as_str())?;
    }
    if let Some(recipes) = recipes {
        for recipe in recipes {
            validate_recipe(recipe)?;
        }
        ensure_unique_ids(recipes, "recipe", |r| r.id)?;
        ensure_unique_names(recipes, "recipe", |r| r.name.as_str())?;
    }
    if let Some(plan) = plan {
        plan.validate()?;
    }
    Ok(())
}

fn device_info() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

fn sample_shopping(name: &str, category: &str, from_standard: bool, now: &str) -> LegacyShoppingItem {
    LegacyShoppingItem {
        name: name.to_string(),
        category: category.to_string(),
        completed: false,
        from_standard,
        date_added: now.to_string(),
    }
}

fn sample_standard(name: &str, category: &str, in_stock: bool, now: &str) -> LegacyStandardItem {
    LegacyStandardItem {
        name: name.to_string(),
        category: category.to_string(),
        in_stock,
        date_added: now.to_string(),
    }
}

/// Name, positive quantity and unit for one grouped Cooklang ingredient.
fn cooklang_ingredient(
    gi: &cooklang::ingredient_list::GroupedIngredient<'_>,
) -> (String, f64, String) {
    let (quantity, unit) =
        gi.quantity
            .iter()
            .next()
            .map_or((1.0, String::new()), |qty: &cooklang::Quantity| {
                let unit = qty.unit().map(String::from).unwrap_or_default();
                match qty.value() {
                    cooklang::Value::Number(n) => (n.value(), unit),
                    cooklang::Value::Range { start, .. } => (start.value(), unit),
                    cooklang::Value::Text(t) => (1.0, format!("{t} {unit}").trim().to_string()),
                }
            });
    let quantity = if quantity.is_finite() && quantity > 0.0 {
        quantity
    } else {
        1.0
    };
    (gi.ingredient.display_name().to_string(), quantity, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-06-15 is a Saturday.
    fn sat() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn service_with_pancakes() -> (LarderService, Recipe, Product, Product) {
        let mut svc = LarderService::new_in_memory().unwrap();
        let (flour, _) = svc.resolve_product("Flour", "pantry").unwrap();
        let (milk, _) = svc.add_to_pantry("Milk", "dairy").unwrap();
        let recipe = svc.create_recipe("Pancakes", "Fluffy", "Mix and fry").unwrap();
        svc.add_ingredient(recipe.id, flour.id, 200.0, "g").unwrap();
        svc.add_ingredient(recipe.id, milk.id, 300.0, "ml").unwrap();
        (svc, recipe, flour, milk)
    }

    #[test]
    fn test_new_service_installs_default_categories() {
        let svc = LarderService::new_in_memory().unwrap();
        assert_eq!(svc.categories().len(), 7);
        assert_eq!(svc.categories()[0].id, "produce");
        assert!(svc.shopping_list().is_empty());
    }

    #[test]
    fn test_delete_product_blocked_by_recipe() {
        let (mut svc, _, flour, _) = service_with_pancakes();
        let err = svc.delete_product(flour.id).unwrap_err();
        assert!(err.to_string().contains("Pancakes"));
        assert!(svc.get_product(flour.id).is_ok());
    }

    #[test]
    fn test_delete_product_blocked_by_simple_meal() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let (bread, _) = svc.add_to_shopping("Bread", "bakery").unwrap();
        svc.assign_simple(sat(), MealSlot::Breakfast, "Toast", vec![bread.id])
            .unwrap();
        assert!(svc.delete_product(bread.id).is_err());

        svc.clear_meal(sat(), MealSlot::Breakfast).unwrap();
        svc.delete_product(bread.id).unwrap();
        assert!(svc.get_product(bread.id).is_err());
    }

    #[test]
    fn test_delete_recipe_clears_planned_slots() {
        let (mut svc, recipe, _, _) = service_with_pancakes();
        svc.assign_recipe(sat(), MealSlot::Breakfast, recipe.id)
            .unwrap();
        svc.assign_recipe(sat() + chrono::Duration::days(1), MealSlot::Lunch, recipe.id)
            .unwrap();
        assert_eq!(svc.meal_plan().len(), 2);

        let (deleted, cleared) = svc.delete_recipe(recipe.id).unwrap();
        assert_eq!(deleted.name, "Pancakes");
        assert_eq!(cleared, 2);
        assert!(svc.meal_plan().is_empty());
    }

    #[test]
    fn test_assign_recipe_requires_existing_recipe() {
        let mut svc = LarderService::new_in_memory().unwrap();
        assert!(svc.assign_recipe(sat(), MealSlot::Dinner, 42).is_err());
        assert!(
            svc.assign_simple(sat(), MealSlot::Dinner, "Leftovers", vec![99])
                .is_err()
        );
        assert!(svc.meal_plan().is_empty());
    }

    #[test]
    fn test_add_recipe_to_shopping_skips_stocked_pantry_items() {
        let (mut svc, recipe, flour, milk) = service_with_pancakes();
        // Milk went into the pantry in stock, flour is catalog-only.
        let added = svc.add_recipe_to_shopping(recipe.id).unwrap();
        assert_eq!(added, 1);
        assert!(svc.get_product(flour.id).unwrap().in_shopping);
        assert!(!svc.get_product(milk.id).unwrap().in_shopping);

        // Running again adds nothing new.
        assert_eq!(svc.add_recipe_to_shopping(recipe.id).unwrap(), 0);
    }

    #[test]
    fn test_add_week_to_shopping_collects_recipes_and_simple_meals() {
        let (mut svc, recipe, flour, _) = service_with_pancakes();
        let (eggs, _) = svc.resolve_product("Eggs", "dairy").unwrap();
        svc.assign_recipe(sat(), MealSlot::Breakfast, recipe.id)
            .unwrap();
        svc.assign_simple(
            sat() + chrono::Duration::days(3),
            MealSlot::Dinner,
            "Omelette",
            vec![eggs.id, flour.id],
        )
        .unwrap();

        // Any date inside the week works.
        let added = svc
            .add_week_to_shopping(sat() + chrono::Duration::days(5))
            .unwrap();
        assert_eq!(added, 2);
        let list = svc.shopping_list();
        assert_eq!(list.remaining, 2);
    }

    #[test]
    fn test_copy_and_clear_week() {
        let (mut svc, recipe, _, _) = service_with_pancakes();
        svc.assign_recipe(sat(), MealSlot::Dinner, recipe.id).unwrap();
        let next = sat() + chrono::Duration::days(7);
        assert_eq!(svc.copy_week(sat(), next).unwrap(), 1);
        assert_eq!(svc.meal_plan().len(), 2);
        assert_eq!(svc.clear_week(next).unwrap(), 1);
        assert_eq!(svc.meal_plan().len(), 1);
    }

    #[test]
    fn test_meal_label() {
        let (svc, recipe, _, _) = service_with_pancakes();
        assert_eq!(
            svc.meal_label(&PlannedMeal::Recipe { id: recipe.id }),
            "Pancakes"
        );
        assert_eq!(svc.meal_label(&PlannedMeal::Recipe { id: 99 }), "Recipe #99");
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut svc, recipe, _, _) = service_with_pancakes();
        svc.add_category("snacks", Some("🍿")).unwrap();
        svc.assign_recipe(sat(), MealSlot::Lunch, recipe.id).unwrap();
        let json = svc.export_json().unwrap();

        let exported: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(exported["version"], "2.0");
        assert!(exported["exportDate"].is_string());
        assert!(exported["deviceId"].is_string());
        assert!(exported["mealPlan"]["2024-06-15"]["0"]["lunch"].is_object());

        let mut other = LarderService::new_in_memory().unwrap();
        let summary = other.import_json(&json).unwrap();
        assert_eq!(summary.products, 2);
        assert_eq!(summary.categories, 8);
        assert_eq!(summary.recipes, 1);
        assert_eq!(summary.planned_meals, 1);
        assert_eq!(summary.dropped_references, 0);
        assert_eq!(other.recipe_detail(recipe.id).unwrap().ingredients.len(), 2);
        assert!(other.catalog().category("snacks").is_some());
    }

    #[test]
    fn test_import_requires_version_and_export_date() {
        let mut svc = LarderService::new_in_memory().unwrap();
        assert!(svc.import_json(r#"{"products": []}"#).is_err());
        assert!(svc.import_json("not json").is_err());
    }

    #[test]
    fn test_invalid_import_leaves_state_untouched() {
        let mut svc = LarderService::new_in_memory().unwrap();
        svc.add_to_shopping("Bread", "bakery").unwrap();
        let bad = r#"{
            "version": "2.0",
            "exportDate": "2024-06-15T10:00:00.000Z",
            "products": [
                {"id": 1, "name": "Milk", "category": "dairy"},
                {"id": 1, "name": "Eggs", "category": "dairy"}
            ]
        }"#;
        let err = svc.import_json(bad).unwrap_err();
        assert!(format!("{err:#}").contains("Duplicate product id 1"));
        assert_eq!(svc.catalog().products().len(), 1);
        assert_eq!(svc.catalog().products()[0].name, "Bread");
    }

    #[test]
    fn test_import_rejects_recipe_names_differing_by_case() {
        let (mut svc, _, _, _) = service_with_pancakes();
        let bad = r#"{
            "version": "2.0",
            "exportDate": "2024-06-15T10:00:00.000Z",
            "recipes": [
                {"id": 1, "name": "Soup"},
                {"id": 2, "name": "soup"}
            ]
        }"#;
        let err = svc.import_json(bad).unwrap_err();
        assert!(format!("{err:#}").contains("Duplicate recipe name"));
        assert_eq!(svc.list_recipes().len(), 1);
        assert!(svc.find_recipe("Pancakes").is_some());
        assert!(svc.find_recipe("Soup").is_none());
    }

    #[test]
    fn test_import_rejects_category_id_not_matching_name() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let bad = r#"{
            "version": "2.0",
            "exportDate": "2024-06-15T10:00:00.000Z",
            "categories": [
                {"id": "x", "name": "Dairy", "emoji": "🥛", "order": 0}
            ]
        }"#;
        let err = svc.import_json(bad).unwrap_err();
        assert!(format!("{err:#}").contains("does not match its name"));
        assert_eq!(svc.categories().len(), 7);
        assert!(svc.catalog().category("x").is_none());
    }

    #[test]
    fn test_import_rejects_duplicate_category_names() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let bad = r#"{
            "version": "2.0",
            "exportDate": "2024-06-15T10:00:00.000Z",
            "categories": [
                {"id": "dairy", "name": "dairy", "emoji": "🥛", "order": 0},
                {"id": "dairy", "name": "Dairy", "emoji": "🧀", "order": 1}
            ]
        }"#;
        let err = svc.import_json(bad).unwrap_err();
        assert!(format!("{err:#}").contains("Duplicate category"));
        assert_eq!(svc.categories().len(), 7);
    }

    #[test]
    fn test_import_keeps_absent_collections() {
        let (mut svc, _, _, _) = service_with_pancakes();
        let file = r#"{
            "version": "2.0",
            "exportDate": "2024-06-15T10:00:00.000Z",
            "categories": []
        }"#;
        let summary = svc.import_json(file).unwrap();
        // Empty category list falls back to the defaults.
        assert_eq!(summary.categories, 7);
        assert_eq!(svc.catalog().products().len(), 2);
        assert_eq!(svc.list_recipes().len(), 1);
    }

    #[test]
    fn test_import_drops_dangling_references() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let file = r#"{
            "version": "2.0",
            "exportDate": "2024-06-15T10:00:00.000Z",
            "products": [{"id": 1, "name": "Milk", "category": "dairy", "completed": true}],
            "recipes": [{"id": 1, "name": "Latte", "ingredients": [
                {"productId": 1, "quantity": 1, "unit": "cup"},
                {"productId": 7, "quantity": 2, "unit": ""}
            ]}],
            "mealPlan": {"2024-06-15": {"0": {
                "breakfast": {"type": "recipe", "id": 1},
                "dinner": {"type": "recipe", "id": 5}
            }}}
        }"#;
        let summary = svc.import_json(file).unwrap();
        assert_eq!(summary.dropped_references, 2);
        assert_eq!(svc.meal_plan().len(), 1);
        // completed without inShopping is normalised away.
        assert!(!svc.get_product(1).unwrap().completed);
    }

    #[test]
    fn test_import_legacy_file() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let file = r#"{
            "version": "1.0",
            "exportDate": "2023-01-01T00:00:00.000Z",
            "shoppingItems": [{"id": 1, "name": "Milk", "category": "dairy", "completed": false}],
            "standardItems": [
                {"id": 2, "name": "milk", "category": "dairy", "inStock": false},
                {"id": 3, "name": "Rice", "category": "pantry", "inStock": true}
            ]
        }"#;
        let summary = svc.import_json(file).unwrap();
        assert_eq!(summary.legacy_items, 3);
        assert_eq!(summary.products, 2);
        let list = svc.shopping_list();
        assert_eq!(list.remaining, 1);
        assert_eq!(svc.pantry_list().in_stock, 1);
    }

    #[test]
    fn test_legacy_storage_is_migrated_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        {
            let db = Database::open(&path).unwrap();
            db.set_item(
                LEGACY_SHOPPING_KEY,
                r#"[{"id": 1, "name": "Eggs", "category": "dairy", "completed": true}]"#,
            )
            .unwrap();
            db.set_item(
                LEGACY_STANDARD_KEY,
                r#"[{"id": 2, "name": "Oats", "category": "pantry", "inStock": true}]"#,
            )
            .unwrap();
        }
        let svc = LarderService::new(&path).unwrap();
        assert_eq!(svc.catalog().products().len(), 2);
        assert_eq!(svc.shopping_list().bought.len(), 1);

        // Migration is persisted, so reopening reads the products key.
        let reopened = LarderService::new(&path).unwrap();
        assert_eq!(reopened.catalog().products().len(), 2);
        let status = reopened.collection_status().unwrap();
        assert_eq!(status[0].key, PRODUCTS_KEY);
        assert_eq!(status[0].loaded_from, LoadSource::Primary);
        assert!(status[0].saved_at.is_some());
    }

    #[test]
    fn test_stored_plan_with_non_saturday_week_is_reset_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        {
            let db = Database::open(&path).unwrap();
            // 2024-06-17 is a Monday.
            db.set_item(
                MEAL_PLAN_KEY,
                r#"{"2024-06-17": {"0": {"lunch": {"type": "recipe", "id": 1}}}}"#,
            )
            .unwrap();
        }
        let svc = LarderService::new(&path).unwrap();
        assert!(svc.meal_plan().is_empty());
        assert!(svc.week(sat()).unwrap().days.iter().all(|d| d.breakfast.is_none()));
    }

    #[test]
    fn test_state_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        {
            let mut svc = LarderService::new(&path).unwrap();
            let (milk, _) = svc.add_to_shopping("Milk", "dairy").unwrap();
            svc.toggle_completed(milk.id).unwrap();
            svc.create_recipe("Porridge", "", "").unwrap();
            svc.move_category(6, 0).unwrap();
        }
        let svc = LarderService::new(&path).unwrap();
        assert_eq!(svc.shopping_list().bought.len(), 1);
        assert!(svc.find_recipe("porridge").is_some());
        assert_eq!(svc.categories()[0].id, "other");
    }

    #[test]
    fn test_seed_sample_data() {
        let mut svc = LarderService::new_in_memory().unwrap();
        assert_eq!(svc.seed_sample_data().unwrap(), 4);
        let list = svc.shopping_list();
        assert_eq!(list.remaining, 2);
        let pantry = svc.pantry_list();
        assert_eq!(pantry.total, 3);
        assert_eq!(pantry.in_stock, 2);
        assert!(svc.seed_sample_data().is_err());
    }

    #[test]
    fn test_resolve_product_matches_any_category() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let (milk, created) = svc.add_to_shopping("Milk", "dairy").unwrap();
        assert!(created);
        let (resolved, created) = svc.resolve_product("MILK", INGREDIENT_CATEGORY).unwrap();
        assert!(!created);
        assert_eq!(resolved.id, milk.id);
    }

    #[test]
    fn test_import_cooklang_recipe() {
        let mut svc = LarderService::new_in_memory().unwrap();
        let (flour, _) = svc.add_to_pantry("Flour", "pantry").unwrap();
        let source = "Mix @flour{200%g} with @milk{300%ml} and a pinch of @salt.";
        let detail = svc.import_cooklang(source, Some("Crepes"), None).unwrap();
        assert_eq!(detail.recipe.name, "Crepes");
        assert_eq!(detail.ingredients.len(), 3);

        let flour_line = detail
            .ingredients
            .iter()
            .find(|i| i.product_id == flour.id)
            .unwrap();
        assert!((flour_line.quantity - 200.0).abs() < f64::EPSILON);
        assert_eq!(flour_line.unit, "g");

        let salt = svc.find_product("salt", Some(INGREDIENT_CATEGORY)).unwrap();
        assert!(!salt.in_shopping);

        assert!(svc.import_cooklang(source, None, Some("crepes")).is_err());
    }

    #[test]
    fn test_check_health() {
        let svc = LarderService::new_in_memory().unwrap();
        svc.check_health().unwrap();
        assert_eq!(svc.device_id().unwrap(), svc.device_id().unwrap());
    }
}
