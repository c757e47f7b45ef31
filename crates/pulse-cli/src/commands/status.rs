//! Status command implementation

use std::fs;

use anyhow::Result;
use pulse_core::{config::default_config_path, Config, Warehouse};

pub fn cmd_status(config: &Config) -> Result<()> {
    println!();
    println!("📊 Pulse Status");
    println!("   ─────────────────────────────────────────────────────────────");

    match default_config_path().filter(|p| p.exists()) {
        Some(path) => println!("   Config override: {}", path.display()),
        None => println!("   Config override: (none, using defaults)"),
    }
    println!(
        "   Forecast: {} ({} trees, seed {})",
        config.forecast.algorithm, config.forecast.n_estimators, config.forecast.seed
    );
    println!(
        "   Synthetic fallback: {}",
        if config.source.fallback_to_synthetic {
            "enabled"
        } else {
            "disabled"
        }
    );

    let Some(path) = config.source.database.as_deref() else {
        println!("   Warehouse: (none, serving synthetic data)");
        println!();
        return Ok(());
    };

    println!("   Warehouse: {}", path.display());
    if let Ok(metadata) = fs::metadata(path) {
        let size_kb = metadata.len() as f64 / 1024.0;
        if size_kb < 1024.0 {
            println!("   Size: {:.1} KB", size_kb);
        } else {
            println!("   Size: {:.1} MB", size_kb / 1024.0);
        }
    }

    match Warehouse::open_existing(path).and_then(|w| w.stats()) {
        Ok(stats) => {
            println!();
            println!("   Sales: {}", stats.sales);
            println!("   Retailers: {}", stats.retailers);
            println!("   Locations: {}", stats.locations);
            println!("   Products: {}", stats.products);
            if let (Some(first), Some(last)) = (&stats.first_date, &stats.last_date) {
                println!("   Invoice dates: {} to {}", first, last);
            }
        }
        Err(e) => {
            println!();
            println!("   ❌ Warehouse unavailable: {}", e);
            println!("      Run 'pulse init' and 'pulse import --file sales.csv'");
        }
    }

    println!();
    Ok(())
}
