//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config, warehouse path) and init/import
//! - `analytics` - Dashboard, KPI, forecast, alert, insight and period commands
//! - `serve` - Web server command
//! - `status` - Warehouse and configuration status

pub mod analytics;
pub mod core;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use analytics::*;
pub use core::*;
pub use serve::*;
pub use status::*;
