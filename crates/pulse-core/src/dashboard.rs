//! One dashboard render: filter, KPIs, forecast, alerts and insights
//!
//! Each section is a [`Widget`]. A section that fails is logged and marked
//! unavailable; the others still render.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::aggregate::{
    gender_category_matrix, group_by_month, group_pair, group_totals, monthly_series,
    yearly_totals,
};
use crate::alerts::{
    forecast_alerts, gender_preference_alerts, geographic_insights, margin_category_alerts,
    performance_alert, top_bottom_alerts, units_category_alerts, PerformanceMetric,
};
use crate::error::{Error, Result};
use crate::forecast::{forecast, ForecastConfig};
use crate::insights::{synthesize, Aggregates, Focus};
use crate::kpi::{compute_kpis, year_over_year};
use crate::models::{
    Alert, Dimension, EntityTotal, Forecast, KpiSet, Metric, MonthlyBreakdown, MonthlyPoint,
    PairedTotal, SalesRecord, YearOverYear, YearlyTotal,
};
use crate::period::{PeriodPreset, PeriodWindow};
use crate::source::{DataOrigin, LoadedRecords};

/// A dashboard section that either rendered or explains why it did not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Widget<T> {
    Ready { data: T },
    Unavailable { reason: String },
}

impl<T> Widget<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Wrap a section result, logging failures
    pub fn from_result(name: &str, result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::Ready { data },
            Err(e) => {
                if e.is_widget_local() {
                    warn!(widget = name, error = %e, "Widget unavailable");
                } else {
                    error!(widget = name, error = %e, "Widget failed");
                }
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready { data } => Some(data),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// How the active period is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeriodSelection {
    Preset { preset: PeriodPreset },
    Custom { window: PeriodWindow },
}

impl Default for PeriodSelection {
    fn default() -> Self {
        Self::Preset {
            preset: PeriodPreset::All,
        }
    }
}

impl PeriodSelection {
    /// Build from request parameters: `from`/`to` win over a preset name
    pub fn from_params(period: Option<&str>, from: Option<&str>, to: Option<&str>) -> Result<Self> {
        match (from, to) {
            (Some(from), Some(to)) => Ok(Self::Custom {
                window: PeriodWindow::custom(from, to)?,
            }),
            (None, None) => match period {
                Some(name) => Ok(Self::Preset {
                    preset: name.parse().map_err(Error::InvalidData)?,
                }),
                None => Ok(Self::default()),
            },
            _ => Err(Error::InvalidData(
                "custom periods need both from and to".into(),
            )),
        }
    }

    pub fn resolve(&self, records: &[SalesRecord]) -> Result<PeriodWindow> {
        match self {
            Self::Preset { preset } => preset.resolve(records),
            Self::Custom { window } => Ok(*window),
        }
    }
}

/// Parameters of one render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardRequest {
    pub period: PeriodSelection,
    pub focus: Focus,
    pub forecast: ForecastConfig,
}

/// Grouped sales tables shown as charts (values in USD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesTables {
    pub retailers: Vec<EntityTotal>,
    pub categories: Vec<EntityTotal>,
    pub cities: Vec<EntityTotal>,
    pub regions: Vec<EntityTotal>,
    pub sales_methods: Vec<EntityTotal>,
    pub yearly: Vec<YearlyTotal>,
    /// Sales (primary) and mean operating margin (secondary)
    pub retailer_performance: Vec<PairedTotal>,
    /// Sales (primary) and operating profit (secondary)
    pub category_performance: Vec<PairedTotal>,
    pub units_per_category: Vec<EntityTotal>,
    pub margin_per_category: Vec<EntityTotal>,
    pub monthly_by_gender: Vec<MonthlyBreakdown>,
    pub monthly_by_sales_method: Vec<MonthlyBreakdown>,
    /// Units sold, not sales
    pub monthly_units_by_category: Vec<MonthlyBreakdown>,
}

/// Every alert family, each rendered independently
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPanel {
    pub performance: Widget<Vec<Alert>>,
    pub retailers: Widget<Vec<Alert>>,
    pub categories: Widget<Vec<Alert>>,
    pub cities: Widget<Vec<Alert>>,
    pub sales_methods: Widget<Vec<Alert>>,
    pub gender: Widget<Vec<Alert>>,
    pub geographic: Widget<Vec<Alert>>,
    pub units: Widget<Vec<Alert>>,
    pub margins: Widget<Vec<Alert>>,
    pub forecast: Widget<Vec<Alert>>,
}

impl AlertPanel {
    fn unavailable(reason: &str) -> Self {
        let off = || Widget::unavailable(reason);
        Self {
            performance: off(),
            retailers: off(),
            categories: off(),
            cities: off(),
            sales_methods: off(),
            gender: off(),
            geographic: off(),
            units: off(),
            margins: off(),
            forecast: off(),
        }
    }

    /// Alerts of every ready widget, in panel order
    pub fn all(&self) -> Vec<&Alert> {
        [
            &self.performance,
            &self.retailers,
            &self.categories,
            &self.cities,
            &self.sales_methods,
            &self.gender,
            &self.geographic,
            &self.units,
            &self.margins,
            &self.forecast,
        ]
        .into_iter()
        .filter_map(Widget::data)
        .flatten()
        .collect()
    }
}

/// A fully assembled dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub origin: DataOrigin,
    pub fallback_used: bool,
    pub period: Widget<PeriodWindow>,
    pub total_records: usize,
    pub filtered_records: usize,
    pub kpis: Widget<KpiSet>,
    pub growth: Widget<YearOverYear>,
    pub monthly: Widget<Vec<MonthlyPoint>>,
    pub forecast: Widget<Forecast>,
    pub tables: Widget<SalesTables>,
    pub alerts: AlertPanel,
    pub insights: Widget<Vec<String>>,
}

fn performance_alerts(kpis: &KpiSet) -> Vec<Alert> {
    [
        performance_alert(kpis.total_sales, kpis.historical_avg_sales, PerformanceMetric::Sales),
        performance_alert(kpis.total_profit, kpis.historical_avg_profit, PerformanceMetric::Profit),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn sales_tables(filtered: &[SalesRecord]) -> Result<SalesTables> {
    if filtered.is_empty() {
        return Err(Error::Data("no records in the selected period".into()));
    }
    let sales = |dimension| group_totals(filtered, dimension, Metric::TotalSales);
    Ok(SalesTables {
        retailers: sales(Dimension::Retailer),
        categories: sales(Dimension::ProductCategory),
        cities: sales(Dimension::City),
        regions: sales(Dimension::Region),
        sales_methods: sales(Dimension::SalesMethod),
        yearly: yearly_totals(filtered),
        retailer_performance: group_pair(
            filtered,
            Dimension::Retailer,
            Metric::TotalSales,
            Metric::OperatingMargin,
        ),
        category_performance: group_pair(
            filtered,
            Dimension::ProductCategory,
            Metric::TotalSales,
            Metric::OperatingProfit,
        ),
        units_per_category: group_totals(filtered, Dimension::ProductCategory, Metric::UnitsSold),
        margin_per_category: group_totals(
            filtered,
            Dimension::ProductCategory,
            Metric::OperatingMargin,
        ),
        monthly_by_gender: group_by_month(filtered, Dimension::Gender, Metric::TotalSales),
        monthly_by_sales_method: group_by_month(filtered, Dimension::SalesMethod, Metric::TotalSales),
        monthly_units_by_category: group_by_month(
            filtered,
            Dimension::ProductCategory,
            Metric::UnitsSold,
        ),
    })
}

impl Dashboard {
    /// Dashboard whose period could not be resolved
    fn unresolved(loaded: &LoadedRecords, err: Error) -> Self {
        warn!(error = %err, "Cannot resolve dashboard period");
        let reason = err.to_string();
        Self {
            origin: loaded.origin.clone(),
            fallback_used: loaded.fallback_used,
            period: Widget::unavailable(&reason),
            total_records: loaded.records.len(),
            filtered_records: 0,
            kpis: Widget::unavailable(&reason),
            growth: Widget::unavailable(&reason),
            monthly: Widget::unavailable(&reason),
            forecast: Widget::unavailable(&reason),
            tables: Widget::unavailable(&reason),
            alerts: AlertPanel::unavailable(&reason),
            insights: Widget::unavailable(&reason),
        }
    }

    /// Run the whole pipeline for one render
    pub fn build(loaded: &LoadedRecords, request: &DashboardRequest) -> Self {
        let full = &loaded.records;
        let window = match request.period.resolve(full) {
            Ok(window) => window,
            Err(e) => return Self::unresolved(loaded, e),
        };

        let filtered = window.filter(full);
        let kpis = compute_kpis(&filtered, full);
        let series = monthly_series(&filtered);
        let prediction = forecast(&series, &request.forecast);
        let sales_table = |dimension| group_totals(&filtered, dimension, Metric::TotalSales);

        let alerts = AlertPanel {
            performance: Widget::from_result(
                "performance_alerts",
                kpis.as_ref()
                    .map(performance_alerts)
                    .map_err(|e| Error::Data(e.to_string())),
            ),
            retailers: Widget::from_result(
                "retailer_alerts",
                top_bottom_alerts(&sales_table(Dimension::Retailer), Dimension::Retailer),
            ),
            categories: Widget::from_result(
                "category_alerts",
                top_bottom_alerts(
                    &sales_table(Dimension::ProductCategory),
                    Dimension::ProductCategory,
                ),
            ),
            cities: Widget::from_result(
                "city_alerts",
                top_bottom_alerts(&sales_table(Dimension::City), Dimension::City),
            ),
            sales_methods: Widget::from_result(
                "sales_method_alerts",
                top_bottom_alerts(&sales_table(Dimension::SalesMethod), Dimension::SalesMethod),
            ),
            gender: Widget::from_result(
                "gender_alerts",
                gender_preference_alerts(&gender_category_matrix(&filtered)),
            ),
            geographic: Widget::from_result(
                "geographic_alerts",
                geographic_insights(&sales_table(Dimension::Region)),
            ),
            units: Widget::from_result(
                "units_alerts",
                units_category_alerts(&group_totals(
                    &filtered,
                    Dimension::ProductCategory,
                    Metric::UnitsSold,
                )),
            ),
            margins: Widget::from_result(
                "margin_alerts",
                margin_category_alerts(&group_totals(
                    &filtered,
                    Dimension::ProductCategory,
                    Metric::OperatingMargin,
                )),
            ),
            forecast: Widget::from_result(
                "forecast_alerts",
                prediction
                    .as_ref()
                    .map(forecast_alerts)
                    .map_err(|e| Error::Computation(e.to_string())),
            ),
        };

        let insights = match &prediction {
            Ok(p) => Aggregates::compute(&filtered, p.clone())
                .map(|aggregates| synthesize(request.focus, &aggregates)),
            Err(e) => Err(Error::Computation(e.to_string())),
        };

        let dashboard = Self {
            origin: loaded.origin.clone(),
            fallback_used: loaded.fallback_used,
            period: Widget::Ready { data: window },
            total_records: full.len(),
            filtered_records: filtered.len(),
            kpis: Widget::from_result("kpis", kpis),
            growth: Widget::from_result("growth", year_over_year(&filtered, full)),
            monthly: Widget::Ready { data: series },
            forecast: Widget::from_result("forecast", prediction),
            tables: Widget::from_result("tables", sales_tables(&filtered)),
            alerts,
            insights: Widget::from_result("insights", insights),
        };

        debug!(
            period = %window,
            filtered = dashboard.filtered_records,
            alerts = dashboard.alerts.all().len(),
            "Dashboard built"
        );

        dashboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, SalesMethod};
    use crate::source::{load_all, SourceConfig};
    use chrono::NaiveDate;

    fn loaded(records: Vec<SalesRecord>) -> LoadedRecords {
        LoadedRecords {
            records,
            origin: DataOrigin::Synthetic { rows: 0, seed: 0 },
            fallback_used: false,
            skipped_rows: 0,
        }
    }

    #[test]
    fn test_synthetic_dashboard_renders_every_widget() {
        let data = load_all(&SourceConfig::synthetic()).unwrap();
        let dashboard = Dashboard::build(&data, &DashboardRequest::default());

        assert_eq!(dashboard.total_records, 1000);
        assert_eq!(dashboard.filtered_records, 1000);
        assert!(dashboard.kpis.is_ready());
        assert!(dashboard.growth.is_ready());
        assert!(dashboard.forecast.is_ready());
        assert!(dashboard.tables.is_ready());
        assert!(dashboard.insights.is_ready());
        assert_eq!(dashboard.monthly.data().unwrap().len(), 12);
        assert_eq!(dashboard.alerts.forecast.data().unwrap().len(), 3);
        assert_eq!(dashboard.alerts.retailers.data().unwrap().len(), 2);
        assert_eq!(dashboard.insights.data().unwrap().len(), 6);
    }

    #[test]
    fn test_empty_period_confines_failures_to_widgets() {
        let data = load_all(&SourceConfig::synthetic()).unwrap();
        let request = DashboardRequest {
            period: PeriodSelection::from_params(None, Some("2030-01-01"), Some("2030-12-31")).unwrap(),
            ..Default::default()
        };
        let dashboard = Dashboard::build(&data, &request);

        assert!(dashboard.period.is_ready());
        assert_eq!(dashboard.filtered_records, 0);
        // baseline still comes from the full set
        assert!(dashboard.kpis.is_ready());
        assert!(!dashboard.growth.is_ready());
        assert!(!dashboard.alerts.retailers.is_ready());
        assert!(!dashboard.insights.is_ready());
        assert_eq!(
            dashboard.forecast.data(),
            Some(&Forecast::InsufficientData { months: 0 })
        );
        assert_eq!(dashboard.alerts.forecast.data().map(Vec::len), Some(0));
    }

    #[test]
    fn test_unresolvable_period_marks_everything_unavailable() {
        let request = DashboardRequest {
            period: PeriodSelection::Preset {
                preset: PeriodPreset::LastSixMonths,
            },
            ..Default::default()
        };
        let dashboard = Dashboard::build(&loaded(Vec::new()), &request);
        assert!(!dashboard.period.is_ready());
        assert!(!dashboard.kpis.is_ready());
        assert!(dashboard.alerts.all().is_empty());
    }

    #[test]
    fn test_two_months_of_data_has_no_forecast_but_other_widgets_render() {
        let day = |m| NaiveDate::from_ymd_opt(2021, m, 1).unwrap();
        let records = vec![
            SalesRecord::on(day(1))
                .with_retailer("Amazon")
                .with_location(Location::new("West", "California", "Los Angeles"))
                .with_product("Women's Apparel", Some(40.0))
                .with_sales_method(SalesMethod::Online)
                .with_amounts(10, 1_000_000.0, 250_000.0)
                .with_margin(25.0),
            SalesRecord::on(day(2))
                .with_retailer("Walmart")
                .with_location(Location::new("South", "Texas", "Houston"))
                .with_product("Men's Street Footwear", Some(60.0))
                .with_amounts(20, 2_000_000.0, 600_000.0)
                .with_margin(30.0),
        ];
        let request = DashboardRequest {
            period: PeriodSelection::Preset {
                preset: PeriodPreset::Extent,
            },
            ..Default::default()
        };
        let dashboard = Dashboard::build(&loaded(records), &request);

        assert_eq!(
            dashboard.forecast.data(),
            Some(&Forecast::InsufficientData { months: 2 })
        );
        let kpis = dashboard.kpis.data().unwrap();
        assert!((kpis.total_sales - 3.0).abs() < 1e-12);
        let retailers = dashboard.alerts.retailers.data().unwrap();
        assert_eq!(retailers[0].subject.as_deref(), Some("Walmart"));
        assert!(dashboard.insights.is_ready());

        let tables = dashboard.tables.data().unwrap();
        assert_eq!(tables.yearly.len(), 1);
        assert_eq!(tables.yearly[0].total_sales, 3_000_000.0);
        assert_eq!(tables.retailer_performance[0].name, "Amazon");
        assert_eq!(tables.retailer_performance[0].secondary, 25.0);
        assert_eq!(tables.category_performance[0].secondary, 600_000.0);
        assert_eq!(tables.units_per_category[1], EntityTotal::new("Women's Apparel", 10.0));
        assert_eq!(tables.monthly_by_gender.len(), 2);
        assert_eq!(tables.monthly_by_sales_method[0].groups[0].name, "Online");
        assert_eq!(tables.monthly_units_by_category[1].groups[0].value, 20.0);
    }

    #[test]
    fn test_period_selection_from_params() {
        assert_eq!(
            PeriodSelection::from_params(Some("q1-2021"), None, None).unwrap(),
            PeriodSelection::Preset {
                preset: PeriodPreset::Q12021
            }
        );
        assert_eq!(
            PeriodSelection::from_params(None, None, None).unwrap(),
            PeriodSelection::default()
        );
        assert!(matches!(
            PeriodSelection::from_params(None, Some("2021-01-01"), None),
            Err(Error::InvalidData(_))
        ));
        assert!(PeriodSelection::from_params(Some("decade"), None, None).is_err());
    }

    #[test]
    fn test_widget_serializes_with_status_tag() {
        let widget: Widget<u32> = Widget::Unavailable {
            reason: "Insufficient data: none".into(),
        };
        let json = serde_json::to_value(&widget).unwrap();
        assert_eq!(json["status"], "unavailable");
        let ready = serde_json::to_value(Widget::Ready { data: 3 }).unwrap();
        assert_eq!(ready["data"], 3);
    }
}
