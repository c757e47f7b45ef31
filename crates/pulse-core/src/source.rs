//! Record source: warehouse load with synthetic fallback, plus a process-wide cache

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::SalesRecord;
use crate::synthetic::{generate_synthetic, SYNTHETIC_ROWS, SYNTHETIC_SEED};
use crate::warehouse::Warehouse;

/// Where records are loaded from (`[source]` config table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Warehouse file; `None` serves the synthetic dataset directly
    pub database: Option<PathBuf>,
    pub fallback_to_synthetic: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database: Some(PathBuf::from("pulse.db")),
            fallback_to_synthetic: true,
        }
    }
}

impl SourceConfig {
    pub fn warehouse(path: impl Into<PathBuf>) -> Self {
        Self {
            database: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn synthetic() -> Self {
        Self {
            database: None,
            fallback_to_synthetic: true,
        }
    }

    /// Cache key identifying this load
    pub fn signature(&self) -> String {
        match &self.database {
            Some(path) => format!(
                "warehouse:{}:fallback={}",
                path.display(),
                self.fallback_to_synthetic
            ),
            None => "synthetic".to_string(),
        }
    }
}

/// Where a loaded record set came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataOrigin {
    Warehouse { path: PathBuf },
    Synthetic { rows: usize, seed: u64 },
}

impl std::fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warehouse { path } => write!(f, "warehouse {}", path.display()),
            Self::Synthetic { rows, seed } => write!(f, "synthetic ({} rows, seed {})", rows, seed),
        }
    }
}

/// The full record set for one process
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedRecords {
    #[serde(skip)]
    pub records: Vec<SalesRecord>,
    pub origin: DataOrigin,
    /// The warehouse was configured but unreachable
    pub fallback_used: bool,
    /// Warehouse rows dropped by validation
    pub skipped_rows: usize,
}

impl LoadedRecords {
    fn synthetic(fallback_used: bool) -> Self {
        Self {
            records: generate_synthetic(SYNTHETIC_ROWS, SYNTHETIC_SEED),
            origin: DataOrigin::Synthetic {
                rows: SYNTHETIC_ROWS,
                seed: SYNTHETIC_SEED,
            },
            fallback_used,
            skipped_rows: 0,
        }
    }
}

/// Load every sales record
///
/// An unreachable warehouse is recovered by serving the synthetic dataset
/// (unless `fallback_to_synthetic` is off); the recovery is reported through
/// [`LoadedRecords::fallback_used`] and a warning, never as an error.
pub fn load_all(config: &SourceConfig) -> Result<LoadedRecords> {
    let Some(path) = &config.database else {
        info!("No warehouse configured, using synthetic data");
        return Ok(LoadedRecords::synthetic(false));
    };

    let loaded = Warehouse::open_existing(path).and_then(|warehouse| {
        warehouse.load_sales().map_err(|e| match e {
            Error::Database(_) | Error::Pool(_) => Error::Connectivity(e.to_string()),
            other => other,
        })
    });

    match loaded {
        Ok((records, skipped_rows)) => Ok(LoadedRecords {
            records,
            origin: DataOrigin::Warehouse { path: path.clone() },
            fallback_used: false,
            skipped_rows,
        }),
        Err(Error::Connectivity(reason)) if config.fallback_to_synthetic => {
            warn!(
                path = %path.display(),
                reason = %reason,
                "Warehouse unavailable, using synthetic data"
            );
            Ok(LoadedRecords::synthetic(true))
        }
        Err(e) => Err(e),
    }
}

/// Memoizes full loads by source signature for the process lifetime
#[derive(Default)]
pub struct RecordCache {
    entries: Mutex<HashMap<String, Arc<LoadedRecords>>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached load for `config`, loading it on first use
    pub fn get_or_load(&self, config: &SourceConfig) -> Result<Arc<LoadedRecords>> {
        let key = config.signature();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = entries.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let loaded = Arc::new(load_all(config)?);
        entries.insert(key, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;
    use chrono::NaiveDate;

    #[test]
    fn test_missing_warehouse_falls_back() {
        let config = SourceConfig::warehouse("/nonexistent/pulse.db");
        let loaded = load_all(&config).unwrap();
        assert!(loaded.fallback_used);
        assert_eq!(loaded.records.len(), SYNTHETIC_ROWS);
        assert!(matches!(loaded.origin, DataOrigin::Synthetic { seed: 42, .. }));
    }

    #[test]
    fn test_fallback_can_be_disabled() {
        let config = SourceConfig {
            database: Some(PathBuf::from("/nonexistent/pulse.db")),
            fallback_to_synthetic: false,
        };
        assert!(matches!(load_all(&config), Err(Error::Connectivity(_))));
    }

    #[test]
    fn test_synthetic_source_is_not_a_fallback() {
        let loaded = load_all(&SourceConfig::synthetic()).unwrap();
        assert!(!loaded.fallback_used);
        assert_eq!(loaded.records.len(), SYNTHETIC_ROWS);
    }

    #[test]
    fn test_loads_from_warehouse() {
        let warehouse = Warehouse::in_memory().unwrap();
        let record = SalesRecord::on(NaiveDate::from_ymd_opt(2021, 2, 3).unwrap())
            .with_retailer("Amazon")
            .with_location(Location::new("West", "California", "Los Angeles"))
            .with_product("Women's Apparel", Some(80.0))
            .with_amounts(3, 240.0, 60.0);
        warehouse.insert_sale(&record, "h").unwrap();

        let loaded = load_all(&SourceConfig::warehouse(warehouse.path())).unwrap();
        assert!(!loaded.fallback_used);
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(
            loaded.origin,
            DataOrigin::Warehouse {
                path: warehouse.path().to_path_buf()
            }
        );
    }

    #[test]
    fn test_cache_memoizes_by_signature() {
        let cache = RecordCache::new();
        let a = cache.get_or_load(&SourceConfig::synthetic()).unwrap();
        let b = cache.get_or_load(&SourceConfig::synthetic()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache
            .get_or_load(&SourceConfig::warehouse("/nonexistent/other.db"))
            .unwrap();
        assert_eq!(cache.len(), 2);
    }
}
