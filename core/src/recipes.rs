use anyhow::{Context, Result, bail};

use crate::models::{Ingredient, Recipe, UpdateRecipe, normalize_name, validate_ingredient};

#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl RecipeBook {
    #[must_use]
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn replace(&mut self, recipes: Vec<Recipe>) {
        self.recipes = recipes;
    }

    /// All recipes sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<Recipe> {
        let mut out = self.recipes.clone();
        out.sort_by_key(|r| normalize_name(&r.name));
        out
    }

    pub fn get(&self, id: i64) -> Result<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.id == id)
            .with_context(|| format!("Recipe {id} not found"))
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut Recipe> {
        self.recipes
            .iter_mut()
            .find(|r| r.id == id)
            .with_context(|| format!("Recipe {id} not found"))
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Recipe> {
        let wanted = normalize_name(name);
        self.recipes
            .iter()
            .find(|r| normalize_name(&r.name) == wanted)
    }

    fn ensure_name_free(&self, name: &str, except: Option<i64>) -> Result<()> {
        if let Some(existing) = self.find_by_name(name) {
            if Some(existing.id) != except {
                bail!("A recipe named '{}' already exists", existing.name);
            }
        }
        Ok(())
    }

    pub fn create(&mut self, name: &str, description: &str, preparation: &str) -> Result<Recipe> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Recipe name must not be empty");
        }
        self.ensure_name_free(name, None)?;

        let recipe = Recipe {
            id: self.recipes.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            name: name.to_string(),
            description: description.trim().to_string(),
            preparation: preparation.trim().to_string(),
            ingredients: Vec::new(),
        };
        self.recipes.push(recipe.clone());
        Ok(recipe)
    }

    pub fn update(&mut self, id: i64, update: &UpdateRecipe) -> Result<Recipe> {
        self.get(id)?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                bail!("Recipe name must not be empty");
            }
            self.ensure_name_free(name, Some(id))?;
        }

        let recipe = self.get_mut(id)?;
        if let Some(name) = &update.name {
            recipe.name = name.trim().to_string();
        }
        if let Some(description) = &update.description {
            recipe.description = description.trim().to_string();
        }
        if let Some(preparation) = &update.preparation {
            recipe.preparation = preparation.trim().to_string();
        }
        Ok(recipe.clone())
    }

    pub fn delete(&mut self, id: i64) -> Result<Recipe> {
        let idx = self
            .recipes
            .iter()
            .position(|r| r.id == id)
            .with_context(|| format!("Recipe {id} not found"))?;
        Ok(self.recipes.remove(idx))
    }

    /// Add an ingredient; a product already in the recipe gets the new amount.
    pub fn add_ingredient(&mut self, recipe_id: i64, ingredient: Ingredient) -> Result<Recipe> {
        validate_ingredient(&ingredient)?;
        let recipe = self.get_mut(recipe_id)?;
        if let Some(existing) = recipe
            .ingredients
            .iter_mut()
            .find(|i| i.product_id == ingredient.product_id)
        {
            *existing = ingredient;
        } else {
            recipe.ingredients.push(ingredient);
        }
        Ok(recipe.clone())
    }

    pub fn remove_ingredient(&mut self, recipe_id: i64, product_id: i64) -> Result<bool> {
        let recipe = self.get_mut(recipe_id)?;
        let before = recipe.ingredients.len();
        recipe.ingredients.retain(|i| i.product_id != product_id);
        Ok(recipe.ingredients.len() < before)
    }

    /// First recipe (by name) listing `product_id` as an ingredient.
    #[must_use]
    pub fn first_using(&self, product_id: i64) -> Option<&Recipe> {
        self.recipes
            .iter()
            .filter(|r| r.ingredients.iter().any(|i| i.product_id == product_id))
            .min_by_key(|r| normalize_name(&r.name))
    }

    #[must_use]
    pub fn references_product(&self, product_id: i64) -> bool {
        self.first_using(product_id).is_some()
    }

    /// Drop ingredients whose product no longer exists; returns how many.
    pub fn retain_products<F>(&mut self, exists: F) -> usize
    where
        F: Fn(i64) -> bool,
    {
        let mut dropped = 0;
        for recipe in &mut self.recipes {
            let before = recipe.ingredients.len();
            recipe.ingredients.retain(|i| exists(i.product_id));
            dropped += before - recipe.ingredients.len();
        }
        dropped
    }
}
