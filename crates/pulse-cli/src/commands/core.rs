//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `load_config` - Resolve the config and apply the `--db` override
//! - `warehouse_path` - The configured warehouse file
//! - `cmd_init` - Create the warehouse schema
//! - `cmd_import` - Import a sales CSV

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pulse_core::{import_csv, Config, Warehouse};

/// Load the config (explicit path, override, embedded) and apply `--db`
pub fn load_config(config_path: Option<&Path>, db: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(config_path).context("Failed to load config")?;
    if let Some(db) = db {
        config.source.database = Some(db.to_path_buf());
    }
    Ok(config)
}

/// The warehouse file commands that write to it operate on
pub fn warehouse_path(config: &Config) -> Result<&Path> {
    match config.source.database.as_deref() {
        Some(path) => Ok(path),
        None => bail!("No warehouse configured: pass --db or set [source].database"),
    }
}

pub fn cmd_init(config: &Config) -> Result<()> {
    let path = warehouse_path(config)?;
    println!("🔧 Initializing warehouse at {}...", path.display());

    Warehouse::create(path).context("Failed to create warehouse")?;

    println!("✅ Warehouse initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import sales: pulse import --file sales.csv");
    println!("  2. Show the dashboard: pulse dashboard");
    println!("  3. Start the API: pulse serve");

    Ok(())
}

pub fn cmd_import(config: &Config, file: &Path) -> Result<()> {
    let path = warehouse_path(config)?;
    println!("📥 Importing {}...", file.display());

    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let warehouse = Warehouse::create(path).context("Failed to open warehouse")?;
    let stats = import_csv(&warehouse, reader).context("Import failed")?;

    println!();
    println!("📊 Import Results");
    println!("   ─────────────────────────────");
    println!("   Imported:   {}", stats.imported);
    println!("   Duplicates: {}", stats.duplicates);
    if stats.skipped > 0 {
        println!("   ⚠️  Skipped:    {} (run with --verbose for details)", stats.skipped);
    }

    Ok(())
}
