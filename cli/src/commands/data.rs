use anyhow::{Context, Result, bail};
use std::path::Path;
use tabled::{Table, Tabled, settings::Style};

use larder_core::db::LoadSource;
use larder_core::models::EXPORT_FILE_NAME;
use larder_core::service::LarderService;

use crate::config::Config;

use super::helpers::print_json;

pub(crate) fn cmd_init(
    svc: &mut LarderService,
    config: &Config,
    sample: bool,
    json: bool,
) -> Result<()> {
    svc.check_health()?;
    let seeded = if sample { svc.seed_sample_data()? } else { 0 };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "dataDir": config.data_dir.display().to_string(),
                "database": config.db_path.display().to_string(),
                "categories": svc.categories().len(),
                "sampleProducts": seeded,
            })
        );
    } else {
        println!("Storage ready at {}", config.db_path.display());
        println!("{} categories configured", svc.categories().len());
        if seeded > 0 {
            println!("Loaded {seeded} sample product(s). Try `larder shop list`.");
        }
    }
    Ok(())
}

pub(crate) fn cmd_doctor(svc: &LarderService, config: &Config, json: bool) -> Result<()> {
    let health = svc.check_health();
    let status = svc.collection_status()?;
    let device_id = svc.device_id()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "database": config.db_path.display().to_string(),
                "healthy": health.is_ok(),
                "error": health.as_ref().err().map(|e| format!("{e:#}")),
                "deviceId": device_id,
                "collections": status,
            })
        );
    } else {
        #[derive(Tabled)]
        struct StatusRow {
            #[tabled(rename = "Collection")]
            key: &'static str,
            #[tabled(rename = "Items")]
            items: usize,
            #[tabled(rename = "Loaded from")]
            source: &'static str,
            #[tabled(rename = "Last saved")]
            saved_at: String,
        }

        println!("Database:  {}", config.db_path.display());
        println!("Device ID: {device_id}");
        match &health {
            Ok(()) => println!("Storage:   OK"),
            Err(e) => println!("Storage:   FAILED ({e:#})"),
        }

        let rows: Vec<StatusRow> = status
            .iter()
            .map(|s| StatusRow {
                key: s.key,
                items: s.items,
                source: match s.loaded_from {
                    LoadSource::Primary => "primary",
                    LoadSource::Backup => "backup (recovered)",
                    LoadSource::Missing => "not saved yet",
                },
                saved_at: s.saved_at.clone().unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        let table = Table::new(&rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    health
}

pub(crate) fn cmd_export(svc: &LarderService, output: &Path, json: bool) -> Result<()> {
    let data = svc.export_all()?;
    let text = serde_json::to_string_pretty(&data)?;
    std::fs::write(output, &text)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": output.display().to_string(),
                "exportDate": data.export_date,
                "products": data.products.as_ref().map_or(0, Vec::len),
                "recipes": data.recipes.as_ref().map_or(0, Vec::len),
            })
        );
    } else {
        println!("Exported data to {}", output.display());
        println!("Copy this file to your other device and run `larder import {EXPORT_FILE_NAME}`");
    }
    Ok(())
}

/// The sync round-trip is built around one well-known file name.
fn check_file_name(file: &Path, any_name: bool) -> Result<()> {
    if any_name {
        return Ok(());
    }
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name != EXPORT_FILE_NAME {
        bail!(
            "Please select the {EXPORT_FILE_NAME} file (got '{name}'). Pass --any-name to import it anyway"
        );
    }
    Ok(())
}

pub(crate) fn cmd_import(
    svc: &mut LarderService,
    file: &Path,
    any_name: bool,
    json: bool,
) -> Result<()> {
    check_file_name(file, any_name)?;
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let summary = svc.import_json(&text)?;

    if json {
        print_json(&summary)
    } else {
        println!("Imported from {}:", file.display());
        println!("  {} product(s)", summary.products);
        println!("  {} categories", summary.categories);
        println!("  {} recipe(s)", summary.recipes);
        println!("  {} planned meal(s)", summary.planned_meals);
        if summary.legacy_items > 0 {
            println!("  {} item(s) converted from the old list format", summary.legacy_items);
        }
        if summary.dropped_references > 0 {
            println!(
                "  {} reference(s) to missing products or recipes dropped",
                summary.dropped_references
            );
        }
        Ok(())
    }
}
