//! Analytics command implementations (periods, dashboard, kpis, forecast, alerts, insights)
//!
//! Every command renders a [`Dashboard`] and prints the sections it is about,
//! as text or as JSON with `--json`.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use pulse_core::models::MILLIONS;
use pulse_core::{
    load_all, Alert, AlertLevel, AlertPanel, Config, Dashboard, DashboardRequest, DisplayConfig,
    Focus, Forecast, KpiSet, LoadedRecords, MonthlyPoint, PeriodPreset, PeriodSelection,
    PeriodWindow, Widget, YearOverYear,
};

use crate::cli::PeriodArgs;

/// Turn command-line options into a render request
pub fn build_request(
    config: &Config,
    period: &PeriodArgs,
    focus: Option<&str>,
    algorithm: Option<&str>,
) -> Result<DashboardRequest> {
    let period = PeriodSelection::from_params(
        period.period.as_deref(),
        period.from.as_deref(),
        period.to.as_deref(),
    )
    .context("Invalid period")?;

    let focus = match focus {
        Some(name) => name.parse::<Focus>().map_err(|e| anyhow!(e))?,
        None => Focus::default(),
    };

    let mut forecast = config.forecast.clone();
    if let Some(name) = algorithm {
        forecast.algorithm = name.parse().map_err(|e: String| anyhow!(e))?;
    }

    Ok(DashboardRequest {
        period,
        focus,
        forecast,
    })
}

fn load(config: &Config) -> Result<LoadedRecords> {
    let loaded = load_all(&config.source).context("Failed to load sales records")?;
    if loaded.fallback_used {
        // stderr keeps --json output parseable
        eprintln!("⚠️  Warehouse unavailable, showing {}", loaded.origin);
    }
    Ok(loaded)
}

fn render(config: &Config, request: &DashboardRequest) -> Result<Dashboard> {
    let loaded = load(config)?;
    Ok(Dashboard::build(&loaded, request))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_section<T>(title: &str, widget: &Widget<T>, lines: impl FnOnce(&T) -> Vec<String>) {
    println!();
    println!("  {}", title);
    match widget {
        Widget::Ready { data } => {
            for line in lines(data) {
                println!("     {}", line);
            }
        }
        Widget::Unavailable { reason } => println!("     (unavailable: {})", reason),
    }
}

fn print_header(title: &str, dashboard: &Dashboard) {
    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│  {:<39}│", title);
    println!("╰─────────────────────────────────────────╯");
    if let Some(window) = dashboard.period.data() {
        println!("  Period:  {}", window);
    }
    println!(
        "  Records: {} of {} ({})",
        dashboard.filtered_records, dashboard.total_records, dashboard.origin
    );
}

// ========== Line Formatting ==========

pub fn kpi_lines(kpis: &KpiSet, display: &DisplayConfig) -> Vec<String> {
    vec![
        format!("Total Sales:       {}", display.millions(kpis.total_sales)),
        format!("Operating Profit:  {}", display.millions(kpis.total_profit)),
        format!("Units Sold:        {:.2}M", kpis.total_units),
        format!("Avg Price/Unit:    {}", display.amount(kpis.avg_price)),
        format!(
            "Monthly Baseline:  {} sales, {} profit",
            display.millions(kpis.historical_avg_sales),
            display.millions(kpis.historical_avg_profit)
        ),
    ]
}

pub fn growth_lines(growth: &YearOverYear) -> Vec<String> {
    vec![
        format!("{} vs {}", growth.current_year, growth.previous_year),
        format!("Sales:   {:+.1}%", growth.sales_growth),
        format!("Profit:  {:+.1}%", growth.profit_growth),
        format!("Units:   {:+.1}%", growth.units_growth),
        format!("Price:   {:+.1}%", growth.price_growth),
    ]
}

pub fn forecast_lines(forecast: &Forecast, display: &DisplayConfig) -> Vec<String> {
    match forecast {
        Forecast::Available(result) => vec![
            format!(
                "Next month:  {}",
                display.millions(result.prediction / MILLIONS)
            ),
            format!(
                "Trend:       {} {}",
                alert_icon(result.trend.level()),
                result.trend
            ),
            format!("MAE:         {}", display.millions(result.mae / MILLIONS)),
        ],
        Forecast::InsufficientData { months } => vec![format!(
            "Not enough history ({} month(s), 3 needed)",
            months
        )],
    }
}

fn monthly_lines(series: &[MonthlyPoint], display: &DisplayConfig) -> Vec<String> {
    series
        .iter()
        .map(|point| {
            format!(
                "Month {:>2}:  {} sales, {} profit",
                point.month,
                display.millions(point.total_sales / MILLIONS),
                display.millions(point.operating_profit / MILLIONS)
            )
        })
        .collect()
}

fn alert_icon(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Success => "✅",
        AlertLevel::Warning => "⚠️ ",
        AlertLevel::Danger => "🚨",
        AlertLevel::Info => "ℹ️ ",
    }
}

pub fn alert_lines(alerts: &[Alert]) -> Vec<String> {
    alerts
        .iter()
        .map(|alert| format!("{} {}", alert_icon(alert.level), alert.message))
        .collect()
}

fn alert_sections(panel: &AlertPanel) -> [(&'static str, &Widget<Vec<Alert>>); 10] {
    [
        ("Performance", &panel.performance),
        ("Retailers", &panel.retailers),
        ("Product Categories", &panel.categories),
        ("Cities", &panel.cities),
        ("Sales Methods", &panel.sales_methods),
        ("Gender Preferences", &panel.gender),
        ("Geography", &panel.geographic),
        ("Units by Category", &panel.units),
        ("Margins by Category", &panel.margins),
        ("Forecast", &panel.forecast),
    ]
}

fn insight_lines(insights: &[String]) -> Vec<String> {
    insights.iter().map(|line| format!("• {}", line)).collect()
}

// ========== Commands ==========

pub fn cmd_periods(config: &Config) -> Result<()> {
    let loaded = load(config)?;

    println!();
    println!("📅 Periods");
    println!("   ─────────────────────────────");
    for preset in PeriodPreset::all() {
        match preset.resolve(&loaded.records) {
            Ok(window) => println!("   {:<14} {:<22} {}", preset.as_str(), preset.label(), window),
            Err(e) => println!("   {:<14} {:<22} ({})", preset.as_str(), preset.label(), e),
        }
    }

    println!();
    match PeriodWindow::extent(&loaded.records) {
        Some(extent) => println!("   Data range: {} ({} records)", extent, loaded.records.len()),
        None => println!("   Data range: (no records)"),
    }
    println!("   Custom: pulse dashboard --from YYYY-MM-DD --to YYYY-MM-DD");

    Ok(())
}

pub fn cmd_dashboard(config: &Config, request: &DashboardRequest, json: bool) -> Result<()> {
    let dashboard = render(config, request)?;
    if json {
        return print_json(&dashboard);
    }

    let display = &config.display;
    print_header("📈 Pulse Dashboard", &dashboard);
    print_section("KPIs", &dashboard.kpis, |kpis| kpi_lines(kpis, display));
    print_section("Year over Year", &dashboard.growth, growth_lines);
    print_section("Forecast", &dashboard.forecast, |f| forecast_lines(f, display));

    let alerts: Vec<Alert> = dashboard.alerts.all().into_iter().cloned().collect();
    println!();
    println!("  Alerts");
    for line in alert_lines(&alerts) {
        println!("     {}", line);
    }

    print_section("Insights", &dashboard.insights, |i| insight_lines(i));
    println!();

    Ok(())
}

pub fn cmd_kpis(config: &Config, request: &DashboardRequest, json: bool) -> Result<()> {
    let dashboard = render(config, request)?;
    if json {
        return print_json(&serde_json::json!({
            "period": dashboard.period,
            "kpis": dashboard.kpis,
            "growth": dashboard.growth,
        }));
    }

    print_header("📊 KPIs", &dashboard);
    print_section("KPIs", &dashboard.kpis, |kpis| kpi_lines(kpis, &config.display));
    print_section("Year over Year", &dashboard.growth, growth_lines);
    println!();

    Ok(())
}

pub fn cmd_forecast(config: &Config, request: &DashboardRequest, json: bool) -> Result<()> {
    let dashboard = render(config, request)?;
    if json {
        return print_json(&serde_json::json!({
            "period": dashboard.period,
            "algorithm": request.forecast.algorithm,
            "monthly": dashboard.monthly,
            "forecast": dashboard.forecast,
        }));
    }

    let display = &config.display;
    print_header("🔮 Forecast", &dashboard);
    println!("  Algorithm: {}", request.forecast.algorithm);
    print_section("Monthly Sales", &dashboard.monthly, |s| monthly_lines(s, display));
    print_section("Next Month", &dashboard.forecast, |f| forecast_lines(f, display));
    println!();

    Ok(())
}

pub fn cmd_alerts(config: &Config, request: &DashboardRequest, json: bool) -> Result<()> {
    let dashboard = render(config, request)?;
    if json {
        return print_json(&dashboard.alerts);
    }

    print_header("🔔 Alerts", &dashboard);
    for (title, widget) in alert_sections(&dashboard.alerts) {
        print_section(title, widget, |alerts| alert_lines(alerts));
    }
    println!();

    Ok(())
}

pub fn cmd_insights(config: &Config, request: &DashboardRequest, json: bool) -> Result<()> {
    let dashboard = render(config, request)?;
    if json {
        return print_json(&serde_json::json!({
            "period": dashboard.period,
            "focus": request.focus,
            "insights": dashboard.insights,
        }));
    }

    print_header("💡 Insights", &dashboard);
    println!("  Focus: {}", request.focus);
    print_section("Insights", &dashboard.insights, |i| insight_lines(i));
    println!();

    Ok(())
}
