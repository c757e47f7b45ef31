//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Pulse - Retail sales analytics dashboard
#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Retail sales KPIs, forecasts, alerts and insights", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Warehouse path (overrides [source].database from the config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file
    ///
    /// Defaults to ~/.config/pulse/pulse.toml when present, then to the
    /// built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Period selection shared by the analytics commands
#[derive(Args, Debug, Clone, Default)]
pub struct PeriodArgs {
    /// Period preset: all, year-2021, q1-2021, last-6-months, extent
    #[arg(short, long)]
    pub period: Option<String>,

    /// Custom start date (YYYY-MM-DD), requires --to
    #[arg(long)]
    pub from: Option<String>,

    /// Custom end date (YYYY-MM-DD), requires --from
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the warehouse schema
    Init,

    /// Import a sales CSV into the warehouse
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List period presets and the data range
    Periods,

    /// Show the full dashboard
    Dashboard {
        #[command(flatten)]
        period: PeriodArgs,

        /// Insight focus: all, region, retailer, product, gender, sales-method, forecast
        #[arg(long)]
        focus: Option<String>,

        /// Forecast algorithm: random_forest, linear
        #[arg(long)]
        algorithm: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show KPIs and year-over-year growth
    Kpis {
        #[command(flatten)]
        period: PeriodArgs,

        #[arg(long)]
        json: bool,
    },

    /// Forecast next month's sales
    Forecast {
        #[command(flatten)]
        period: PeriodArgs,

        /// Forecast algorithm: random_forest, linear
        #[arg(long)]
        algorithm: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show performance alerts
    Alerts {
        #[command(flatten)]
        period: PeriodArgs,

        #[arg(long)]
        json: bool,
    },

    /// Show narrative insights
    Insights {
        #[command(flatten)]
        period: PeriodArgs,

        /// Insight focus: all, region, retailer, product, gender, sales-method, forecast
        #[arg(long)]
        focus: Option<String>,

        /// Forecast algorithm: random_forest, linear
        #[arg(long)]
        algorithm: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on (overrides [server].port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides [server].host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Show warehouse and configuration status
    Status,
}
