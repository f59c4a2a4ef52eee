use std::io::Write;

use anyhow::{Context, Result};

use crate::catalog::Catalog;
use crate::models::{ShoppingList, capitalize};

pub const STATUS_TO_BUY: &str = "to buy";
pub const STATUS_BOUGHT: &str = "bought";

/// Write the shopping list as `category,name,status` rows: active items in
/// display order, then bought items. Returns the number of data rows.
pub fn write_shopping_csv<W: Write>(
    list: &ShoppingList,
    catalog: &Catalog,
    writer: W,
) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["category", "name", "status"])?;

    let mut rows = 0;
    for group in &list.groups {
        for item in &group.items {
            wtr.write_record([group.name.as_str(), item.name.as_str(), STATUS_TO_BUY])?;
            rows += 1;
        }
    }
    for item in &list.bought {
        let category = catalog
            .category(&item.category)
            .map_or_else(|| capitalize(&item.category), |c| c.display_name());
        wtr.write_record([category.as_str(), item.name.as_str(), STATUS_BOUGHT])?;
        rows += 1;
    }

    wtr.flush().context("Failed to write shopping CSV")?;
    tracing::debug!(rows, "shopping list written as CSV");
    Ok(rows)
}
