//! Threshold classification of KPIs and grouped tables into alerts
//!
//! Tables are expected in the order produced by [`crate::aggregate`];
//! when several entities share the largest (or smallest) value the first
//! one in table order is reported.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Alert, AlertKind, AlertLevel, Dimension, EntityTotal, Forecast, GenderBreakdown, MILLIONS,
};

/// Above this multiple of the baseline a metric is a success
const ABOVE_BASELINE: f64 = 1.1;
/// Below this multiple of the baseline a metric is a danger
const BELOW_BASELINE: f64 = 0.9;
/// Region share (percent) above which a region is dominant
const DOMINANT_SHARE: f64 = 30.0;
/// Region share (percent) below which a region has expansion potential
const EXPANSION_SHARE: f64 = 10.0;

/// KPI compared against its historical baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceMetric {
    Sales,
    Profit,
}

impl PerformanceMetric {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Profit => "Profit",
        }
    }
}

/// Classify `current` against `baseline`
///
/// Strictly above 110% is a success, strictly below 90% a danger, anything
/// in between a warning. Returns `None` when the baseline is zero or not
/// finite, since no ratio can be formed.
///
/// The thresholds are multiples of the baseline even when it is negative (a
/// loss), so a smaller loss can land on either side. The reported percentage
/// is the distance from the baseline relative to its magnitude.
pub fn performance_alert(current: f64, baseline: f64, metric: PerformanceMetric) -> Option<Alert> {
    if baseline == 0.0 || !baseline.is_finite() || !current.is_finite() {
        return None;
    }
    let magnitude = baseline.abs();

    let alert = if current > baseline * ABOVE_BASELINE {
        let pct = (current - baseline) / magnitude * 100.0;
        Alert::new(
            AlertLevel::Success,
            AlertKind::Performance,
            format!("{} is {:.1}% above the historical average", metric.label(), pct),
        )
        .with_value(pct)
    } else if current < baseline * BELOW_BASELINE {
        let pct = (baseline - current) / magnitude * 100.0;
        Alert::new(
            AlertLevel::Danger,
            AlertKind::Performance,
            format!("{} is {:.1}% below the historical average", metric.label(), pct),
        )
        .with_value(pct)
    } else {
        Alert::new(
            AlertLevel::Warning,
            AlertKind::Performance,
            format!("{} is within the normal range", metric.label()),
        )
    };

    Some(alert.with_subject(metric.label()))
}

/// First maximum and first minimum of a table
fn extremes<'a>(table: &'a [EntityTotal], what: &str) -> Result<(&'a EntityTotal, &'a EntityTotal)> {
    let first = table
        .first()
        .ok_or_else(|| Error::Data(format!("no {} data in the selected period", what)))?;
    let (mut top, mut bottom) = (first, first);
    for entry in &table[1..] {
        if entry.value > top.value {
            top = entry;
        }
        if entry.value < bottom.value {
            bottom = entry;
        }
    }
    Ok((top, bottom))
}

/// Top performer and needs-attention alerts for a sales table (values in USD)
pub fn top_bottom_alerts(table: &[EntityTotal], dimension: Dimension) -> Result<Vec<Alert>> {
    let (top, bottom) = extremes(table, dimension.as_str())?;
    let top_m = top.value / MILLIONS;
    let bottom_m = bottom.value / MILLIONS;

    let (top_msg, bottom_msg) = match dimension {
        Dimension::Retailer => (
            format!("Top performer: {} with ${:.1}M in sales", top.name, top_m),
            format!("Needs attention: {} with ${:.1}M in sales", bottom.name, bottom_m),
        ),
        Dimension::ProductCategory => (
            format!("Best category: {} (${:.1}M)", top.name, top_m),
            format!("Needs attention: {} (${:.1}M)", bottom.name, bottom_m),
        ),
        Dimension::City => (
            format!("Top city: {} (${:.1}M)", top.name, top_m),
            format!("Needs focus: {} (${:.1}M)", bottom.name, bottom_m),
        ),
        Dimension::SalesMethod => (
            format!("Dominant method: {} (${:.1}M)", top.name, top_m),
            format!("Underperforming: {} (${:.1}M)", bottom.name, bottom_m),
        ),
        other => (
            format!("Top {}: {} (${:.1}M)", other.as_str(), top.name, top_m),
            format!("Lowest {}: {} (${:.1}M)", other.as_str(), bottom.name, bottom_m),
        ),
    };

    Ok(vec![
        Alert::new(AlertLevel::Success, AlertKind::TopPerformer, top_msg)
            .with_subject(&top.name)
            .with_value(top_m),
        Alert::new(AlertLevel::Warning, AlertKind::NeedsAttention, bottom_msg)
            .with_subject(&bottom.name)
            .with_value(bottom_m),
    ])
}

/// Best-selling category per gender segment
pub fn gender_preference_alerts(matrix: &[GenderBreakdown]) -> Result<Vec<Alert>> {
    if matrix.is_empty() {
        return Err(Error::Data("no gender data in the selected period".into()));
    }

    let mut alerts = Vec::with_capacity(matrix.len());
    for breakdown in matrix {
        let Ok((top, _)) = extremes(&breakdown.categories, "category") else {
            continue;
        };
        let value = top.value / MILLIONS;
        alerts.push(
            Alert::new(
                AlertLevel::Success,
                AlertKind::GenderPreference,
                format!(
                    "Top preference {}: {} (${:.1}M)",
                    breakdown.gender, top.name, value
                ),
            )
            .with_subject(&top.name)
            .with_value(value),
        );
    }
    Ok(alerts)
}

/// Dominant (>30%) and expansion-potential (<10%) regions by share of sales
pub fn geographic_insights(regions: &[EntityTotal]) -> Result<Vec<Alert>> {
    let total: f64 = regions.iter().map(|r| r.value).sum();
    if regions.is_empty() || total == 0.0 || !total.is_finite() {
        return Err(Error::Data("regional sales total is zero".into()));
    }

    Ok(regions
        .iter()
        .filter_map(|region| {
            let share = region.value * 100.0 / total;
            let alert = if share > DOMINANT_SHARE {
                Alert::new(
                    AlertLevel::Info,
                    AlertKind::DominantRegion,
                    format!("{}: dominant region ({:.1}% of total sales)", region.name, share),
                )
            } else if share < EXPANSION_SHARE {
                Alert::new(
                    AlertLevel::Warning,
                    AlertKind::ExpansionPotential,
                    format!("{}: expansion potential ({:.1}% of total sales)", region.name, share),
                )
            } else {
                return None;
            };
            Some(alert.with_subject(&region.name).with_value(share))
        })
        .collect())
}

/// Category with the most units sold
pub fn units_category_alerts(table: &[EntityTotal]) -> Result<Vec<Alert>> {
    let (top, _) = extremes(table, "units")?;
    Ok(vec![Alert::new(
        AlertLevel::Success,
        AlertKind::TopPerformer,
        format!("Top category: {} ({:.0} units)", top.name, top.value),
    )
    .with_subject(&top.name)
    .with_value(top.value)])
}

/// Highest and lowest mean operating margin per category
pub fn margin_category_alerts(table: &[EntityTotal]) -> Result<Vec<Alert>> {
    let (top, bottom) = extremes(table, "margin")?;
    Ok(vec![
        Alert::new(
            AlertLevel::Success,
            AlertKind::TopPerformer,
            format!("Highest margin: {} ({:.1}%)", top.name, top.value),
        )
        .with_subject(&top.name)
        .with_value(top.value),
        Alert::new(
            AlertLevel::Warning,
            AlertKind::NeedsAttention,
            format!("Lowest margin: {} ({:.1}%)", bottom.name, bottom.value),
        )
        .with_subject(&bottom.name)
        .with_value(bottom.value),
    ])
}

/// Prediction, trend and MAE summary lines; empty when no forecast is available
pub fn forecast_alerts(forecast: &Forecast) -> Vec<Alert> {
    let Some(result) = forecast.prediction() else {
        return Vec::new();
    };
    let prediction = result.prediction / MILLIONS;
    let mae = result.mae / MILLIONS;

    vec![
        Alert::new(
            AlertLevel::Info,
            AlertKind::Forecast,
            format!("Next month prediction: ${:.1}M", prediction),
        )
        .with_value(prediction),
        Alert::new(
            AlertLevel::Info,
            AlertKind::Forecast,
            format!("Trend: {}", result.trend.as_str().to_uppercase()),
        )
        .with_subject(result.trend.as_str()),
        Alert::new(
            AlertLevel::Info,
            AlertKind::Forecast,
            format!("MAE: ${:.1}M", mae),
        )
        .with_value(mae),
    ]
}
