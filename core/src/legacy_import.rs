//! Conversion from the two-list format (separate shopping and pantry arrays)
//! into catalog products.

use serde::{Deserialize, Serialize};

use crate::models::Product;

/// Storage keys used before the unified catalog existed.
pub const LEGACY_SHOPPING_KEY: &str = "shoppingItems";
pub const LEGACY_STANDARD_KEY: &str = "standardItems";

const LEGACY_DEFAULT_CATEGORY: &str = "other";

fn default_category() -> String {
    LEGACY_DEFAULT_CATEGORY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyShoppingItem {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub from_standard: bool,
    #[serde(default)]
    pub date_added: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStandardItem {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub date_added: String,
}

/// What a legacy conversion produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyConversion {
    pub items_read: usize,
    pub products_created: usize,
    pub merged: usize,
    pub skipped: usize,
}

/// Merge both lists into products keyed by name + category.
///
/// Pantry items come first so a shopping entry for the same item lands on
/// the existing pantry product instead of creating a second one.
#[must_use]
pub fn convert_legacy(
    shopping: &[LegacyShoppingItem],
    standard: &[LegacyStandardItem],
) -> (Vec<Product>, LegacyConversion) {
    let mut products: Vec<Product> = Vec::new();
    let mut summary = LegacyConversion {
        items_read: shopping.len() + standard.len(),
        ..LegacyConversion::default()
    };

    let mut upsert = |name: &str, category: &str, date_added: &str| -> Option<usize> {
        let name = name.trim();
        if name.is_empty() {
            summary.skipped += 1;
            return None;
        }
        if let Some(idx) = products.iter().position(|p| p.matches(name, category)) {
            summary.merged += 1;
            return Some(idx);
        }
        products.push(Product {
            id: i64::try_from(products.len()).unwrap_or(i64::MAX - 1) + 1,
            name: name.to_string(),
            category: category.to_string(),
            in_shopping: false,
            in_pantry: false,
            in_stock: false,
            in_season: true,
            completed: false,
            date_added: date_added.to_string(),
        });
        summary.products_created += 1;
        Some(products.len() - 1)
    };

    // (index, is pantry entry, inStock or completed flag)
    let mut flags: Vec<(usize, bool, bool)> = Vec::new();
    for item in standard {
        if let Some(idx) = upsert(&item.name, &item.category, &item.date_added) {
            flags.push((idx, true, item.in_stock));
        }
    }
    for item in shopping {
        if let Some(idx) = upsert(&item.name, &item.category, &item.date_added) {
            flags.push((idx, false, item.completed));
        }
    }

    for (idx, pantry, flag) in flags {
        let product = &mut products[idx];
        if pantry {
            product.in_pantry = true;
            product.in_stock = flag;
        } else {
            product.in_shopping = true;
            product.completed = product.completed || flag;
        }
    }
    for product in &mut products {
        product.normalize();
    }

    tracing::info!(
        read = summary.items_read,
        created = summary.products_created,
        merged = summary.merged,
        "converted legacy lists"
    );
    (products, summary)
}
