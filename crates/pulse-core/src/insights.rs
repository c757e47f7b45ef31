//! Narrative insights over pre-computed aggregates
//!
//! [`synthesize`] only accepts an [`Aggregates`] value, so narratives are
//! always generated from tables built over the same filtered record set.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::group_totals;
use crate::error::{Error, Result};
use crate::models::{Dimension, EntityTotal, Forecast, Metric, SalesRecord, Trend, MILLIONS};

/// Which part of the business a narrative request is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Focus {
    #[default]
    All,
    Region,
    Retailer,
    Product,
    Gender,
    SalesMethod,
    Forecast,
}

impl Focus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Region => "region",
            Self::Retailer => "retailer",
            Self::Product => "product",
            Self::Gender => "gender",
            Self::SalesMethod => "sales-method",
            Self::Forecast => "forecast",
        }
    }

    /// Focuses covered by `All`, in narrative order
    fn expand(self) -> &'static [Focus] {
        match self {
            Self::All => &[
                Self::Region,
                Self::Retailer,
                Self::Product,
                Self::Gender,
                Self::SalesMethod,
                Self::Forecast,
            ],
            Self::Region => &[Self::Region],
            Self::Retailer => &[Self::Retailer],
            Self::Product => &[Self::Product],
            Self::Gender => &[Self::Gender],
            Self::SalesMethod => &[Self::SalesMethod],
            Self::Forecast => &[Self::Forecast],
        }
    }
}

impl std::str::FromStr for Focus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Self::All),
            "region" | "regions" => Ok(Self::Region),
            "retailer" | "retailers" => Ok(Self::Retailer),
            "product" | "products" | "category" => Ok(Self::Product),
            "gender" => Ok(Self::Gender),
            "sales-method" | "method" => Ok(Self::SalesMethod),
            "forecast" | "prediction" => Ok(Self::Forecast),
            _ => Err(format!(
                "Unknown focus: {} (valid: all, region, retailer, product, gender, sales-method, forecast)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sales tables the narratives are written from (values in USD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    pub total_sales: f64,
    pub by_region: Vec<EntityTotal>,
    pub by_retailer: Vec<EntityTotal>,
    pub by_category: Vec<EntityTotal>,
    pub by_gender: Vec<EntityTotal>,
    pub by_sales_method: Vec<EntityTotal>,
    pub forecast: Forecast,
}

impl Aggregates {
    /// Build every table from the filtered records
    pub fn compute(filtered: &[SalesRecord], forecast: Forecast) -> Result<Self> {
        if filtered.is_empty() {
            return Err(Error::Data("no records in the selected period".into()));
        }

        let sales = |dimension| group_totals(filtered, dimension, Metric::TotalSales);
        Ok(Self {
            total_sales: filtered.iter().map(|r| r.total_sales).sum(),
            by_region: sales(Dimension::Region),
            by_retailer: sales(Dimension::Retailer),
            by_category: sales(Dimension::ProductCategory),
            by_gender: sales(Dimension::Gender),
            by_sales_method: sales(Dimension::SalesMethod),
            forecast,
        })
    }
}

fn leader(table: &[EntityTotal]) -> Option<&EntityTotal> {
    table
        .iter()
        .fold(None, |best: Option<&EntityTotal>, entry| match best {
            Some(b) if b.value >= entry.value => Some(b),
            _ => Some(entry),
        })
}

fn leader_narrative(label: &str, table: &[EntityTotal], total: f64) -> Option<String> {
    let top = leader(table)?;
    let share = if total > 0.0 { top.value / total * 100.0 } else { 0.0 };
    Some(format!(
        "{} leads {} with ${:.1}M ({:.1}% of sales)",
        top.name,
        label,
        top.value / MILLIONS,
        share
    ))
}

fn forecast_narrative(forecast: &Forecast) -> String {
    match forecast {
        Forecast::Available(result) => {
            let direction = match result.trend {
                Trend::Up => "an upward",
                Trend::Down => "a downward",
                Trend::Flat => "a flat",
            };
            format!(
                "Next month is projected at ${:.1}M with {} trend (MAE ${:.1}M)",
                result.prediction / MILLIONS,
                direction,
                result.mae / MILLIONS
            )
        }
        Forecast::InsufficientData { months } => format!(
            "Not enough monthly history to forecast ({} month(s) available, 3 needed)",
            months
        ),
    }
}

/// Narrative strings for the requested focus
pub fn synthesize(focus: Focus, aggregates: &Aggregates) -> Vec<String> {
    let total = aggregates.total_sales;
    let narratives: Vec<String> = focus
        .expand()
        .iter()
        .filter_map(|part| match part {
            Focus::Region => leader_narrative("regions", &aggregates.by_region, total),
            Focus::Retailer => leader_narrative("retailers", &aggregates.by_retailer, total),
            Focus::Product => leader_narrative("product categories", &aggregates.by_category, total),
            Focus::Gender => leader_narrative("gender segments", &aggregates.by_gender, total),
            Focus::SalesMethod => {
                leader_narrative("sales methods", &aggregates.by_sales_method, total)
            }
            Focus::Forecast => Some(forecast_narrative(&aggregates.forecast)),
            Focus::All => None,
        })
        .collect();

    debug!(focus = focus.as_str(), count = narratives.len(), "Synthesized insights");
    narratives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, PredictionResult, SalesMethod};
    use chrono::NaiveDate;

    fn records() -> Vec<SalesRecord> {
        let day = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
        vec![
            SalesRecord::on(day)
                .with_retailer("West Gear")
                .with_location(Location::new("West", "California", "Los Angeles"))
                .with_product("Men's Street Footwear", Some(60.0))
                .with_sales_method(SalesMethod::Online)
                .with_amounts(10, 3_000_000.0, 900_000.0),
            SalesRecord::on(day)
                .with_retailer("Amazon")
                .with_location(Location::new("South", "Texas", "Houston"))
                .with_product("Women's Apparel", Some(40.0))
                .with_amounts(5, 1_000_000.0, 200_000.0),
        ]
    }

    #[test]
    fn test_region_focus() {
        let aggregates = Aggregates::compute(&records(), Forecast::InsufficientData { months: 1 }).unwrap();
        let insights = synthesize(Focus::Region, &aggregates);
        assert_eq!(insights, vec!["West leads regions with $3.0M (75.0% of sales)"]);
    }

    #[test]
    fn test_all_focus_covers_every_section() {
        let forecast = Forecast::Available(PredictionResult {
            prediction: 4_200_000.0,
            trend: Trend::Up,
            mae: 100_000.0,
        });
        let aggregates = Aggregates::compute(&records(), forecast).unwrap();
        let insights = synthesize(Focus::All, &aggregates);
        assert_eq!(insights.len(), 6);
        assert!(insights[1].starts_with("West Gear leads retailers"));
        assert!(insights[3].starts_with("Men leads gender segments"));
        assert!(insights[4].starts_with("Online leads sales methods"));
        assert_eq!(
            insights[5],
            "Next month is projected at $4.2M with an upward trend (MAE $0.1M)"
        );
    }

    #[test]
    fn test_forecast_focus_without_history() {
        let aggregates = Aggregates::compute(&records(), Forecast::InsufficientData { months: 2 }).unwrap();
        let insights = synthesize(Focus::Forecast, &aggregates);
        assert_eq!(insights.len(), 1);
        assert!(insights[0].contains("2 month(s) available"));
    }

    #[test]
    fn test_empty_records_cannot_be_aggregated() {
        let result = Aggregates::compute(&[], Forecast::InsufficientData { months: 0 });
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_focus_from_str() {
        assert_eq!("sales_method".parse::<Focus>().unwrap(), Focus::SalesMethod);
        assert_eq!("Product".parse::<Focus>().unwrap(), Focus::Product);
        assert!("weather".parse::<Focus>().is_err());
    }
}
