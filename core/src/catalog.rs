//! Product catalog, category registry and the shopping/pantry projections.
//!
//! The catalog is the only owner of product state. The shopping list and the
//! pantry list are computed from the `in_shopping` / `in_pantry` flags on
//! every read, so there is nothing to keep in sync beyond the flags
//! themselves.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use chrono::Local;

use crate::models::{
    Category, CategoryGroup, DEFAULT_CATEGORY_EMOJI, FALLBACK_CATEGORY_EMOJI, NewProduct,
    PantryList, Product, ProductFilter, ShoppingList, UpdateProduct, capitalize,
    default_categories, normalize_name,
};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    categories: Vec<Category>,
}

impl Catalog {
    #[must_use]
    pub fn new(products: Vec<Product>, categories: Vec<Category>) -> Self {
        let mut catalog = Self {
            products,
            categories,
        };
        catalog.normalize();
        catalog
    }

    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Categories sorted by their `order` rank.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn replace_products(&mut self, products: Vec<Product>) {
        self.products = products;
        self.normalize();
    }

    pub fn replace_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.normalize();
    }

    /// Re-derive every dependent flag and re-rank the registry.
    pub fn normalize(&mut self) {
        for product in &mut self.products {
            product.normalize();
        }
        self.categories.sort_by_key(|c| c.order);
        self.renumber_categories();
    }

    fn renumber_categories(&mut self) {
        for (order, category) in self.categories.iter_mut().enumerate() {
            category.order = order;
        }
    }

    // --- Products ---

    pub fn get(&self, id: i64) -> Result<&Product> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .with_context(|| format!("Product {id} not found"))
    }

    fn get_mut(&mut self, id: i64) -> Result<&mut Product> {
        self.products
            .iter_mut()
            .find(|p| p.id == id)
            .with_context(|| format!("Product {id} not found"))
    }

    #[must_use]
    pub fn find(&self, name: &str, category: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.matches(name, category))
    }

    /// First product with this name in any category.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Product> {
        let wanted = normalize_name(name);
        self.products
            .iter()
            .find(|p| normalize_name(&p.name) == wanted)
    }

    fn next_id(&self) -> i64 {
        self.products.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn require_category(&self, category: &str) -> Result<()> {
        if self.category(category).is_none() {
            bail!("Unknown category '{category}'");
        }
        Ok(())
    }

    fn insert(&mut self, new: &NewProduct) -> Product {
        let mut product = Product {
            id: self.next_id(),
            name: new.name.trim().to_string(),
            category: new.category.clone(),
            in_shopping: new.in_shopping,
            in_pantry: new.in_pantry,
            in_stock: new.in_stock,
            in_season: new.in_season,
            completed: false,
            date_added: Local::now().to_rfc3339(),
        };
        product.normalize();
        self.products.push(product.clone());
        tracing::debug!(id = product.id, name = %product.name, "product created");
        product
    }

    /// Add to the catalog, returning the existing product on a de-dup match.
    pub fn add_product(&mut self, new: &NewProduct) -> Result<(Product, bool)> {
        if new.name.trim().is_empty() {
            bail!("Product name must not be empty");
        }
        self.require_category(&new.category)?;
        if let Some(existing) = self.find(&new.name, &new.category) {
            return Ok((existing.clone(), false));
        }
        Ok((self.insert(new), true))
    }

    /// Put an item on the shopping list, creating it if the catalog lacks it.
    pub fn add_to_shopping(&mut self, name: &str, category: &str) -> Result<(Product, bool)> {
        if name.trim().is_empty() {
            bail!("Item name must not be empty");
        }
        self.require_category(category)?;

        if let Some(id) = self.find(name, category).map(|p| p.id) {
            let product = self.get_mut(id)?;
            product.in_shopping = true;
            product.completed = false;
            return Ok((product.clone(), false));
        }

        let mut new = NewProduct::catalog_only(name, category);
        new.in_shopping = true;
        Ok((self.insert(&new), true))
    }

    /// Track an item in the pantry; new pantry items start in stock.
    pub fn add_to_pantry(&mut self, name: &str, category: &str) -> Result<(Product, bool)> {
        if name.trim().is_empty() {
            bail!("Item name must not be empty");
        }
        self.require_category(category)?;

        if let Some(id) = self.find(name, category).map(|p| p.id) {
            let product = self.get_mut(id)?;
            if product.in_pantry {
                bail!("'{}' already exists in your pantry list", product.name);
            }
            product.in_pantry = true;
            product.in_stock = true;
            return Ok((product.clone(), false));
        }

        let mut new = NewProduct::catalog_only(name, category);
        new.in_pantry = true;
        new.in_stock = true;
        Ok((self.insert(&new), true))
    }

    pub fn update_product(&mut self, id: i64, update: &UpdateProduct) -> Result<Product> {
        let current = self.get(id)?.clone();
        let name = match &update.name {
            Some(n) if n.trim().is_empty() => bail!("Product name must not be empty"),
            Some(n) => n.trim().to_string(),
            None => current.name.clone(),
        };
        let category = update
            .category
            .clone()
            .unwrap_or_else(|| current.category.clone());
        if update.category.is_some() {
            self.require_category(&category)?;
        }
        if let Some(other) = self.find(&name, &category) {
            if other.id != id {
                bail!("'{}' already exists in {category}", other.name);
            }
        }

        let product = self.get_mut(id)?;
        product.name = name;
        product.category = category;
        if let Some(in_season) = update.in_season {
            product.in_season = in_season;
        }
        Ok(product.clone())
    }

    pub fn remove_product(&mut self, id: i64) -> Result<Product> {
        let idx = self
            .products
            .iter()
            .position(|p| p.id == id)
            .with_context(|| format!("Product {id} not found"))?;
        Ok(self.products.remove(idx))
    }

    #[must_use]
    pub fn list_products(&self, filter: &ProductFilter) -> Vec<Product> {
        let needle = filter.search.as_deref().map(normalize_name);
        let mut out: Vec<Product> = self
            .products
            .iter()
            .filter(|p| !filter.in_season_only || p.in_season)
            .filter(|p| {
                needle
                    .as_deref()
                    .is_none_or(|n| normalize_name(&p.name).contains(n))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            self.category_rank(&a.category)
                .cmp(&self.category_rank(&b.category))
                .then_with(|| normalize_name(&a.name).cmp(&normalize_name(&b.name)))
        });
        out
    }

    pub fn toggle_season(&mut self, id: i64) -> Result<Product> {
        let product = self.get_mut(id)?;
        product.in_season = !product.in_season;
        Ok(product.clone())
    }

    // --- Shopping list transitions ---

    pub fn toggle_completed(&mut self, id: i64) -> Result<Product> {
        let product = self.get_mut(id)?;
        if !product.in_shopping {
            bail!("'{}' is not on the shopping list", product.name);
        }
        product.completed = !product.completed;
        Ok(product.clone())
    }

    pub fn remove_from_shopping(&mut self, id: i64) -> Result<Product> {
        let product = self.get_mut(id)?;
        if !product.in_shopping {
            bail!("'{}' is not on the shopping list", product.name);
        }
        product.in_shopping = false;
        product.normalize();
        Ok(product.clone())
    }

    /// Take an item off the list and, for pantry staples, back into stock.
    pub fn mark_in_stock(&mut self, id: i64) -> Result<Product> {
        let product = self.get_mut(id)?;
        product.in_shopping = false;
        if product.in_pantry {
            product.in_stock = true;
        }
        product.normalize();
        Ok(product.clone())
    }

    pub fn clear_completed(&mut self) -> usize {
        let mut cleared = 0;
        for product in self.products.iter_mut().filter(|p| p.completed) {
            product.in_shopping = false;
            if product.in_pantry {
                product.in_stock = true;
            }
            product.normalize();
            cleared += 1;
        }
        cleared
    }

    // --- Pantry transitions ---

    /// Flip stock state; running out puts the item on the shopping list.
    pub fn toggle_stock(&mut self, id: i64) -> Result<Product> {
        let product = self.get_mut(id)?;
        if !product.in_pantry {
            bail!("'{}' is not in the pantry list", product.name);
        }
        product.in_stock = !product.in_stock;
        if product.in_stock {
            product.in_shopping = false;
        } else if !product.in_shopping {
            product.in_shopping = true;
            product.completed = false;
        }
        product.normalize();
        Ok(product.clone())
    }

    pub fn remove_from_pantry(&mut self, id: i64) -> Result<Product> {
        let product = self.get_mut(id)?;
        if !product.in_pantry {
            bail!("'{}' is not in the pantry list", product.name);
        }
        product.in_pantry = false;
        product.normalize();
        Ok(product.clone())
    }

    pub fn add_unstocked_to_shopping(&mut self) -> usize {
        let mut added = 0;
        for product in &mut self.products {
            if product.in_pantry && !product.in_stock && !product.in_shopping {
                product.in_shopping = true;
                product.completed = false;
                added += 1;
            }
        }
        added
    }

    /// Put products on the shopping list unless already there or in stock.
    pub fn add_products_to_shopping(&mut self, ids: &[i64]) -> Result<usize> {
        for id in ids {
            self.get(*id)?;
        }
        let mut added = 0;
        for id in ids {
            let product = self.get_mut(*id)?;
            if product.in_shopping || (product.in_pantry && product.in_stock) {
                continue;
            }
            product.in_shopping = true;
            product.completed = false;
            added += 1;
        }
        Ok(added)
    }

    // --- Views ---

    #[must_use]
    pub fn shopping_list(&self) -> ShoppingList {
        let mut active: Vec<&Product> = self
            .products
            .iter()
            .filter(|p| p.in_shopping && !p.completed)
            .collect();
        active.sort_by(|a, b| b.id.cmp(&a.id));

        let mut bought: Vec<Product> = self
            .products
            .iter()
            .filter(|p| p.in_shopping && p.completed)
            .cloned()
            .collect();
        bought.sort_by_key(|p| self.category_rank(&p.category));

        let remaining = active.len();
        ShoppingList {
            groups: self.group_by_category(&active),
            total: remaining + bought.len(),
            bought,
            remaining,
        }
    }

    #[must_use]
    pub fn pantry_list(&self) -> PantryList {
        let items: Vec<&Product> = self.products.iter().filter(|p| p.in_pantry).collect();
        let in_stock = items.iter().filter(|p| p.in_stock).count();
        PantryList {
            groups: self.group_by_category(&items),
            in_stock,
            total: items.len(),
        }
    }

    /// Group in registry order; unknown categories follow, alphabetically.
    fn group_by_category(&self, items: &[&Product]) -> Vec<CategoryGroup> {
        let mut grouped: BTreeMap<(usize, &str), Vec<Product>> = BTreeMap::new();
        for item in items {
            grouped
                .entry((self.category_rank(&item.category), item.category.as_str()))
                .or_default()
                .push((*item).clone());
        }

        grouped
            .into_iter()
            .map(|((_, id), items)| {
                let (name, emoji) = match self.category(id) {
                    Some(c) => (c.display_name(), c.emoji.clone()),
                    None => (capitalize(id), FALLBACK_CATEGORY_EMOJI.to_string()),
                };
                CategoryGroup {
                    category: id.to_string(),
                    name,
                    emoji,
                    in_stock: items.iter().filter(|p| p.in_stock).count(),
                    items,
                }
            })
            .collect()
    }

    // --- Categories ---

    #[must_use]
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn category_rank(&self, id: &str) -> usize {
        self.categories
            .iter()
            .position(|c| c.id == id)
            .unwrap_or(self.categories.len())
    }

    #[must_use]
    pub fn category_order(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.id.clone()).collect()
    }

    #[must_use]
    pub fn category_emoji(&self, id: &str) -> &str {
        self.category(id)
            .map_or(FALLBACK_CATEGORY_EMOJI, |c| c.emoji.as_str())
    }

    /// Install the default registry when no categories exist yet.
    pub fn ensure_default_categories(&mut self) -> bool {
        if !self.categories.is_empty() {
            return false;
        }
        self.categories = default_categories();
        true
    }

    pub fn add_category(&mut self, name: &str, emoji: Option<&str>) -> Result<Category> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            bail!("Category name must not be empty");
        }
        if self.categories.iter().any(|c| c.name == name || c.id == name) {
            bail!("A category named '{name}' already exists");
        }
        let emoji = emoji
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_CATEGORY_EMOJI);

        let category = Category {
            id: name.clone(),
            name,
            emoji: emoji.to_string(),
            order: self.categories.len(),
            is_default: false,
        };
        self.categories.push(category.clone());
        Ok(category)
    }

    pub fn delete_category(&mut self, id: &str) -> Result<Category> {
        let idx = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .with_context(|| format!("Category '{id}' not found"))?;
        if self.categories[idx].is_default {
            bail!("Cannot delete default category '{id}'");
        }
        let used = self.products.iter().filter(|p| p.category == id).count();
        if used > 0 {
            bail!(
                "Category '{id}' is used by {used} product(s). Move them to another category first"
            );
        }
        let removed = self.categories.remove(idx);
        self.renumber_categories();
        Ok(removed)
    }

    /// Move the category at position `from` to position `to`.
    pub fn move_category(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.categories.len();
        if from >= len || to >= len {
            bail!("Category position out of range (0-{})", len.saturating_sub(1));
        }
        let category = self.categories.remove(from);
        self.categories.insert(to, category);
        self.renumber_categories();
        Ok(())
    }

    #[must_use]
    pub fn category_position(&self, id: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        let mut c = Catalog::default();
        c.ensure_default_categories();
        c
    }

    #[test]
    fn test_add_to_shopping_creates_product() {
        let mut c = catalog();
        let (p, created) = c.add_to_shopping("Bananas", "produce").unwrap();
        assert!(created);
        assert_eq!(p.id, 1);
        assert!(p.in_shopping);
        assert!(!p.in_pantry);
        assert_eq!(c.shopping_list().total, 1);
    }

    #[test]
    fn test_add_to_shopping_dedups_by_name_and_category() {
        let mut c = catalog();
        let (first, _) = c.add_to_shopping("Milk", "dairy").unwrap();
        c.toggle_completed(first.id).unwrap();

        let (again, created) = c.add_to_shopping("  milk ", "dairy").unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);
        assert!(!again.completed);
        assert_eq!(c.products().len(), 1);

        let (other, created) = c.add_to_shopping("Milk", "other").unwrap();
        assert!(created);
        assert_ne!(other.id, first.id);
    }

    #[test]
    fn test_add_rejects_empty_name_and_unknown_category() {
        let mut c = catalog();
        assert!(c.add_to_shopping("   ", "dairy").is_err());
        assert!(c.add_to_shopping("Milk", "spaceship").is_err());
        assert!(c.add_to_pantry("", "dairy").is_err());
        assert!(c.products().is_empty());
    }

    #[test]
    fn test_add_to_pantry_duplicate_is_error() {
        let mut c = catalog();
        let (p, _) = c.add_to_pantry("Rice", "pantry").unwrap();
        assert!(p.in_pantry);
        assert!(p.in_stock);
        assert!(c.add_to_pantry("rice", "pantry").is_err());
    }

    #[test]
    fn test_add_to_pantry_promotes_shopping_item() {
        let mut c = catalog();
        let (p, _) = c.add_to_shopping("Eggs", "dairy").unwrap();
        let (promoted, created) = c.add_to_pantry("Eggs", "dairy").unwrap();
        assert!(!created);
        assert_eq!(promoted.id, p.id);
        assert!(promoted.in_pantry);
        assert!(promoted.in_shopping);
    }

    #[test]
    fn test_toggle_stock_reconciles_shopping_list() {
        let mut c = catalog();
        let (p, _) = c.add_to_pantry("Flour", "pantry").unwrap();

        let out = c.toggle_stock(p.id).unwrap();
        assert!(!out.in_stock);
        assert!(out.in_shopping);
        assert_eq!(c.shopping_list().remaining, 1);

        let back = c.toggle_stock(p.id).unwrap();
        assert!(back.in_stock);
        assert!(!back.in_shopping);
        assert!(c.shopping_list().is_empty());
    }

    #[test]
    fn test_toggle_stock_requires_pantry_item() {
        let mut c = catalog();
        let (p, _) = c.add_to_shopping("Chips", "other").unwrap();
        assert!(c.toggle_stock(p.id).is_err());
        assert!(c.toggle_stock(999).is_err());
    }

    #[test]
    fn test_mark_in_stock() {
        let mut c = catalog();
        let (p, _) = c.add_to_pantry("Butter", "dairy").unwrap();
        c.toggle_stock(p.id).unwrap();

        let stocked = c.mark_in_stock(p.id).unwrap();
        assert!(stocked.in_stock);
        assert!(!stocked.in_shopping);

        let (plain, _) = c.add_to_shopping("Candles", "other").unwrap();
        let gone = c.mark_in_stock(plain.id).unwrap();
        assert!(!gone.in_shopping);
        assert!(!gone.in_stock);
    }

    #[test]
    fn test_clear_completed_restocks_pantry_items() {
        let mut c = catalog();
        let (milk, _) = c.add_to_pantry("Milk", "dairy").unwrap();
        c.toggle_stock(milk.id).unwrap();
        let (bread, _) = c.add_to_shopping("Bread", "bakery").unwrap();
        let (jam, _) = c.add_to_shopping("Jam", "pantry").unwrap();

        c.toggle_completed(milk.id).unwrap();
        c.toggle_completed(bread.id).unwrap();

        assert_eq!(c.clear_completed(), 2);
        let list = c.shopping_list();
        assert_eq!(list.total, 1);
        assert_eq!(list.groups[0].items[0].id, jam.id);
        assert!(c.get(milk.id).unwrap().in_stock);
        assert!(!c.get(bread.id).unwrap().completed);
    }

    #[test]
    fn test_toggle_completed_requires_shopping_item() {
        let mut c = catalog();
        let (p, _) = c.add_to_pantry("Salt", "pantry").unwrap();
        assert!(c.toggle_completed(p.id).is_err());
    }

    #[test]
    fn test_remove_from_shopping_clears_completed() {
        let mut c = catalog();
        let (p, _) = c.add_to_shopping("Tea", "pantry").unwrap();
        c.toggle_completed(p.id).unwrap();
        let removed = c.remove_from_shopping(p.id).unwrap();
        assert!(!removed.in_shopping);
        assert!(!removed.completed);
        assert!(c.remove_from_shopping(p.id).is_err());
        assert_eq!(c.products().len(), 1);
    }

    #[test]
    fn test_remove_from_pantry_clears_stock() {
        let mut c = catalog();
        let (p, _) = c.add_to_pantry("Oats", "pantry").unwrap();
        let removed = c.remove_from_pantry(p.id).unwrap();
        assert!(!removed.in_pantry);
        assert!(!removed.in_stock);
        assert_eq!(c.pantry_list().total, 0);
    }

    #[test]
    fn test_add_unstocked_to_shopping() {
        let mut c = catalog();
        let (a, _) = c.add_to_pantry("Rice", "pantry").unwrap();
        let (b, _) = c.add_to_pantry("Beans", "pantry").unwrap();
        c.add_to_pantry("Pasta", "pantry").unwrap();
        c.toggle_stock(a.id).unwrap();
        // Out of stock but explicitly taken off the list.
        c.toggle_stock(b.id).unwrap();
        c.remove_from_shopping(b.id).unwrap();

        assert_eq!(c.add_unstocked_to_shopping(), 1);
        assert_eq!(c.add_unstocked_to_shopping(), 0);
        assert_eq!(c.shopping_list().remaining, 2);
    }

    #[test]
    fn test_add_products_to_shopping_skips_stocked() {
        let mut c = catalog();
        let (stocked, _) = c.add_to_pantry("Oil", "pantry").unwrap();
        let (plain, _) = c
            .add_product(&NewProduct::catalog_only("Basil", "produce"))
            .unwrap();
        let added = c.add_products_to_shopping(&[stocked.id, plain.id]).unwrap();
        assert_eq!(added, 1);
        assert!(c.get(plain.id).unwrap().in_shopping);
        assert!(!c.get(stocked.id).unwrap().in_shopping);

        assert!(c.add_products_to_shopping(&[plain.id, 404]).is_err());
    }

    #[test]
    fn test_update_product_rename_and_move() {
        let mut c = catalog();
        let (p, _) = c.add_to_shopping("Chese", "dairy").unwrap();
        let updated = c
            .update_product(
                p.id,
                &UpdateProduct {
                    name: Some("Cheese".to_string()),
                    category: Some("other".to_string()),
                    in_season: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Cheese");
        assert_eq!(updated.category, "other");

        let bad_category = UpdateProduct {
            category: Some("nope".to_string()),
            ..UpdateProduct::default()
        };
        assert!(c.update_product(p.id, &bad_category).is_err());
    }

    #[test]
    fn test_update_product_rejects_collision() {
        let mut c = catalog();
        c.add_to_shopping("Apples", "produce").unwrap();
        let (pears, _) = c.add_to_shopping("Pears", "produce").unwrap();
        let rename = UpdateProduct {
            name: Some("apples".to_string()),
            ..UpdateProduct::default()
        };
        assert!(c.update_product(pears.id, &rename).is_err());
    }

    #[test]
    fn test_list_products_filters() {
        let mut c = catalog();
        let (a, _) = c.add_to_shopping("Strawberries", "produce").unwrap();
        c.add_to_shopping("Straws", "other").unwrap();
        c.add_to_pantry("Rice", "pantry").unwrap();
        c.toggle_season(a.id).unwrap();

        let all = c.list_products(&ProductFilter::default());
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "Strawberries");

        let straw = c.list_products(&ProductFilter {
            search: Some("STRAW".to_string()),
            in_season_only: false,
        });
        assert_eq!(straw.len(), 2);

        let seasonal = c.list_products(&ProductFilter {
            search: None,
            in_season_only: true,
        });
        assert_eq!(seasonal.len(), 2);
        assert!(seasonal.iter().all(|p| p.in_season));
    }

    #[test]
    fn test_shopping_list_grouped_by_category_order() {
        let mut c = catalog();
        c.add_to_shopping("Bread", "bakery").unwrap();
        c.add_to_shopping("Apples", "produce").unwrap();
        c.add_to_shopping("Kale", "produce").unwrap();
        let (milk, _) = c.add_to_shopping("Milk", "dairy").unwrap();
        c.toggle_completed(milk.id).unwrap();

        let list = c.shopping_list();
        assert_eq!(list.total, 4);
        assert_eq!(list.remaining, 3);
        let order: Vec<&str> = list.groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(order, vec!["produce", "bakery"]);
        // Newest first within a group.
        assert_eq!(list.groups[0].items[0].name, "Kale");
        assert_eq!(list.groups[0].name, "Produce");
        assert_eq!(list.groups[0].emoji, "🥬");
        assert_eq!(list.bought.len(), 1);
        assert_eq!(list.bought[0].name, "Milk");
    }

    #[test]
    fn test_bought_section_sorted_by_category() {
        let mut c = catalog();
        let (bread, _) = c.add_to_shopping("Bread", "bakery").unwrap();
        let (kale, _) = c.add_to_shopping("Kale", "produce").unwrap();
        c.toggle_completed(bread.id).unwrap();
        c.toggle_completed(kale.id).unwrap();
        let list = c.shopping_list();
        assert_eq!(list.remaining, 0);
        assert_eq!(list.bought[0].name, "Kale");
        assert_eq!(list.bought[1].name, "Bread");
    }

    #[test]
    fn test_orphan_category_grouped_last() {
        let mut c = catalog();
        c.add_to_shopping("Apples", "produce").unwrap();
        let mut products = c.products().to_vec();
        products.push(Product {
            id: 50,
            name: "Mystery".to_string(),
            category: "imported".to_string(),
            in_shopping: true,
            in_pantry: false,
            in_stock: false,
            in_season: true,
            completed: false,
            date_added: String::new(),
        });
        c.replace_products(products);

        let list = c.shopping_list();
        assert_eq!(list.groups.len(), 2);
        assert_eq!(list.groups[1].category, "imported");
        assert_eq!(list.groups[1].emoji, FALLBACK_CATEGORY_EMOJI);
    }

    #[test]
    fn test_pantry_list_counts_stock() {
        let mut c = catalog();
        let (rice, _) = c.add_to_pantry("Rice", "pantry").unwrap();
        c.add_to_pantry("Beans", "pantry").unwrap();
        c.add_to_pantry("Milk", "dairy").unwrap();
        c.add_to_shopping("Chips", "other").unwrap();
        c.toggle_stock(rice.id).unwrap();

        let pantry = c.pantry_list();
        assert_eq!(pantry.total, 3);
        assert_eq!(pantry.in_stock, 2);
        assert_eq!(pantry.groups[0].category, "dairy");
        assert_eq!(pantry.groups[1].category, "pantry");
        assert_eq!(pantry.groups[1].in_stock, 1);
        assert_eq!(pantry.groups[1].items.len(), 2);
    }

    #[test]
    fn test_ensure_default_categories_only_when_empty() {
        let mut c = Catalog::default();
        assert!(c.ensure_default_categories());
        assert!(!c.ensure_default_categories());
        assert_eq!(c.categories().len(), 7);
    }

    #[test]
    fn test_add_category() {
        let mut c = catalog();
        let cat = c.add_category("  Snacks ", None).unwrap();
        assert_eq!(cat.id, "snacks");
        assert_eq!(cat.emoji, DEFAULT_CATEGORY_EMOJI);
        assert_eq!(cat.order, 7);
        assert!(!cat.is_default);

        assert!(c.add_category("SNACKS", Some("🍿")).is_err());
        assert!(c.add_category("  ", None).is_err());

        let drinks = c.add_category("drinks", Some("🥤")).unwrap();
        assert_eq!(drinks.emoji, "🥤");
    }

    #[test]
    fn test_delete_category_rules() {
        let mut c = catalog();
        assert!(c.delete_category("produce").is_err());
        assert!(c.delete_category("missing").is_err());

        c.add_category("snacks", None).unwrap();
        c.add_category("drinks", None).unwrap();
        let (chips, _) = c.add_to_shopping("Chips", "snacks").unwrap();
        assert!(c.delete_category("snacks").is_err());

        c.remove_product(chips.id).unwrap();
        c.delete_category("snacks").unwrap();
        assert!(c.category("snacks").is_none());
        assert_eq!(c.category("drinks").unwrap().order, 7);
    }

    #[test]
    fn test_move_category_renumbers() {
        let mut c = catalog();
        c.move_category(6, 0).unwrap();
        assert_eq!(c.category_order()[0], "other");
        assert_eq!(c.category_order()[1], "produce");
        assert!(
            c.categories()
                .iter()
                .enumerate()
                .all(|(i, cat)| cat.order == i)
        );

        c.move_category(0, 6).unwrap();
        assert_eq!(c.category_order()[6], "other");
        assert!(c.move_category(0, 7).is_err());
    }

    #[test]
    fn test_new_sorts_and_renumbers_categories() {
        let mut cats = default_categories();
        cats.swap(0, 3);
        cats[0].order = 10;
        let c = Catalog::new(Vec::new(), cats);
        assert!(
            c.categories()
                .iter()
                .enumerate()
                .all(|(i, cat)| cat.order == i)
        );
        assert_eq!(c.categories().last().unwrap().id, "pantry");
    }

    #[test]
    fn test_category_emoji_fallback() {
        let c = catalog();
        assert_eq!(c.category_emoji("dairy"), "🥛");
        assert_eq!(c.category_emoji("unknown"), FALLBACK_CATEGORY_EMOJI);
    }
}
