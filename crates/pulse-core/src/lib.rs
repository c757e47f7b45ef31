//! Pulse Core Library
//!
//! Analytics core for the Pulse retail sales dashboard:
//! - Typed sales records loaded from a SQLite star-schema warehouse
//! - Seeded synthetic fallback data when the warehouse is unreachable
//! - Period presets and inclusive date filtering
//! - KPI aggregation with a historical baseline and year-over-year growth
//! - Monthly sales forecasting (bagged regression trees or least squares)
//! - Threshold-based alert classification
//! - Focus-parameterized narrative insights
//! - Whole-dashboard assembly with per-widget failure isolation

pub mod aggregate;
pub mod alerts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod import;
pub mod insights;
pub mod kpi;
pub mod models;
pub mod period;
pub mod source;
pub mod synthetic;
pub mod warehouse;

pub use aggregate::{
    gender_category_matrix, group_by_month, group_pair, group_totals, monthly_series, yearly_totals,
};
pub use alerts::{
    forecast_alerts, gender_preference_alerts, geographic_insights, margin_category_alerts,
    performance_alert, top_bottom_alerts, units_category_alerts, PerformanceMetric,
};
pub use config::{Config, DisplayConfig, ServerSettings, DEFAULT_CONFIG};
pub use dashboard::{AlertPanel, Dashboard, DashboardRequest, PeriodSelection, SalesTables, Widget};
pub use error::{Error, Result};
pub use forecast::{forecast, Algorithm, ForecastConfig};
pub use import::{import_csv, ImportStats};
pub use insights::{synthesize, Aggregates, Focus};
pub use kpi::{compute_kpis, year_over_year};
pub use models::{
    Alert, AlertKind, AlertLevel, Dimension, EntityTotal, Forecast, Gender, GenderBreakdown,
    KpiSet, Location, Metric, MonthlyBreakdown, MonthlyPoint, PairedTotal, PredictionResult,
    Quarter, SalesMethod, SalesRecord, Trend, YearOverYear, YearlyTotal,
};
pub use period::{filter_records, PeriodPreset, PeriodWindow};
pub use source::{load_all, DataOrigin, LoadedRecords, RecordCache, SourceConfig};
pub use synthetic::generate_synthetic;
pub use warehouse::{Warehouse, WarehouseStats};
