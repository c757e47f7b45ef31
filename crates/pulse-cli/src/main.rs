//! Pulse CLI - Retail sales analytics dashboard
//!
//! Usage:
//!   pulse init                    Create the warehouse schema
//!   pulse import --file CSV       Import a sales export
//!   pulse dashboard --period q1-2021
//!   pulse serve --port 3000       Start the JSON API

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.db.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&config),
        Commands::Import { file } => commands::cmd_import(&config, &file),
        Commands::Periods => commands::cmd_periods(&config),
        Commands::Dashboard {
            period,
            focus,
            algorithm,
            json,
        } => {
            let request =
                commands::build_request(&config, &period, focus.as_deref(), algorithm.as_deref())?;
            commands::cmd_dashboard(&config, &request, json)
        }
        Commands::Kpis { period, json } => {
            let request = commands::build_request(&config, &period, None, None)?;
            commands::cmd_kpis(&config, &request, json)
        }
        Commands::Forecast {
            period,
            algorithm,
            json,
        } => {
            let request = commands::build_request(&config, &period, None, algorithm.as_deref())?;
            commands::cmd_forecast(&config, &request, json)
        }
        Commands::Alerts { period, json } => {
            let request = commands::build_request(&config, &period, None, None)?;
            commands::cmd_alerts(&config, &request, json)
        }
        Commands::Insights {
            period,
            focus,
            algorithm,
            json,
        } => {
            let request =
                commands::build_request(&config, &period, focus.as_deref(), algorithm.as_deref())?;
            commands::cmd_insights(&config, &request, json)
        }
        Commands::Serve { port, host } => commands::cmd_serve(config, host, port).await,
        Commands::Status => commands::cmd_status(&config),
    }
}
