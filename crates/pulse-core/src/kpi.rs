//! Headline KPIs, historical baseline and year-over-year growth

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{KpiSet, SalesRecord, YearOverYear, MILLIONS};

/// Compute the KPI set for the filtered records against the full dataset
///
/// Sales, profit and units are reported in millions. The historical
/// averages divide the full-dataset totals by the number of distinct
/// `month` values (1-12) in the full set, so two years of data still
/// yield at most 12 buckets.
pub fn compute_kpis(filtered: &[SalesRecord], full: &[SalesRecord]) -> Result<KpiSet> {
    if full.is_empty() {
        return Err(Error::Data(
            "historical baseline needs at least one record".into(),
        ));
    }

    let total_sales: f64 = filtered.iter().map(|r| r.total_sales).sum();
    let total_profit: f64 = filtered.iter().map(|r| r.operating_profit).sum();
    let total_units: u64 = filtered.iter().map(|r| r.units_sold).sum();

    let distinct_months = full.iter().map(|r| r.month).collect::<HashSet<_>>().len() as f64;
    let full_sales: f64 = full.iter().map(|r| r.total_sales).sum();
    let full_profit: f64 = full.iter().map(|r| r.operating_profit).sum();

    let kpis = KpiSet {
        total_sales: total_sales / MILLIONS,
        total_profit: total_profit / MILLIONS,
        total_units: total_units as f64 / MILLIONS,
        avg_price: mean_price(filtered.iter()).unwrap_or(0.0),
        historical_avg_sales: full_sales / distinct_months / MILLIONS,
        historical_avg_profit: full_profit / distinct_months / MILLIONS,
    };

    debug!(
        filtered = filtered.len(),
        full = full.len(),
        distinct_months,
        "Computed KPIs"
    );

    Ok(kpis)
}

/// Mean of the non-null unit prices, `None` when no record carries a price
fn mean_price<'a>(records: impl Iterator<Item = &'a SalesRecord>) -> Option<f64> {
    let (sum, count) = records
        .filter_map(|r| r.price_per_unit)
        .fold((0.0, 0usize), |(sum, count), price| (sum + price, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn growth(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Growth of the latest filtered year over the year before it
///
/// The current year is the latest `year` in the filtered set; both years'
/// totals come from the full dataset so a narrow window still compares
/// whole years.
pub fn year_over_year(filtered: &[SalesRecord], full: &[SalesRecord]) -> Result<YearOverYear> {
    let current_year = filtered
        .iter()
        .map(|r| r.year)
        .max()
        .ok_or_else(|| Error::Data("no records in the selected period".into()))?;
    let previous_year = current_year - 1;

    let year_totals = |year: i32| {
        let rows = full.iter().filter(move |r| r.year == year);
        let sales: f64 = rows.clone().map(|r| r.total_sales).sum();
        let profit: f64 = rows.clone().map(|r| r.operating_profit).sum();
        let units: u64 = rows.clone().map(|r| r.units_sold).sum();
        let price = mean_price(rows).unwrap_or(0.0);
        (sales, profit, units as f64, price)
    };

    let (sales, profit, units, price) = year_totals(current_year);
    let (prev_sales, prev_profit, prev_units, prev_price) = year_totals(previous_year);

    Ok(YearOverYear {
        current_year,
        previous_year,
        sales_growth: growth(sales, prev_sales),
        profit_growth: growth(profit, prev_profit),
        units_growth: growth(units, prev_units),
        price_growth: growth(price, prev_price),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sale(y: i32, m: u32, sales: f64, units: u64) -> SalesRecord {
        SalesRecord::on(NaiveDate::from_ymd_opt(y, m, 1).unwrap()).with_amounts(units, sales, sales / 4.0)
    }

    #[test]
    fn test_kpi_scenario() {
        let records = vec![sale(2021, 1, 1_000_000.0, 10), sale(2021, 2, 2_000_000.0, 20)];
        let kpis = compute_kpis(&records, &records).unwrap();
        assert!((kpis.total_sales - 3.0).abs() < 1e-12);
        assert!((kpis.total_units - 0.00003).abs() < 1e-12);
        assert!((kpis.total_profit - 0.75).abs() < 1e-12);
        // 3M over two distinct months
        assert!((kpis.historical_avg_sales - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_doubling_sales_doubles_total() {
        let records = vec![sale(2021, 1, 12_345.0, 1), sale(2021, 5, 67_890.0, 2)];
        let doubled: Vec<_> = records
            .iter()
            .cloned()
            .map(|mut r| {
                r.total_sales *= 2.0;
                r
            })
            .collect();
        let base = compute_kpis(&records, &records).unwrap();
        let twice = compute_kpis(&doubled, &doubled).unwrap();
        assert!((twice.total_sales - 2.0 * base.total_sales).abs() < 1e-12);
    }

    #[test]
    fn test_baseline_counts_distinct_month_attribute() {
        // January of two different years is one bucket
        let full = vec![
            sale(2020, 1, 1_000_000.0, 1),
            sale(2021, 1, 1_000_000.0, 1),
            sale(2021, 2, 1_000_000.0, 1),
        ];
        let kpis = compute_kpis(&full[2..], &full).unwrap();
        assert!((kpis.historical_avg_sales - 1.5).abs() < 1e-12);
        assert!((kpis.total_sales - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_avg_price_ignores_missing_prices() {
        let records = vec![
            sale(2021, 1, 100.0, 1).with_product("Apparel", Some(50.0)),
            sale(2021, 1, 100.0, 1).with_product("Apparel", Some(150.0)),
            sale(2021, 1, 100.0, 1).with_product("Apparel", None),
        ];
        let kpis = compute_kpis(&records, &records).unwrap();
        assert!((kpis.avg_price - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_avg_price_zero_without_prices() {
        let records = vec![sale(2021, 1, 100.0, 1)];
        assert_eq!(compute_kpis(&records, &records).unwrap().avg_price, 0.0);
    }

    #[test]
    fn test_empty_full_set_is_data_error() {
        assert!(matches!(compute_kpis(&[], &[]), Err(Error::Data(_))));
    }

    #[test]
    fn test_empty_filtered_set_gives_zero_totals() {
        let full = vec![sale(2021, 1, 500_000.0, 5)];
        let kpis = compute_kpis(&[], &full).unwrap();
        assert_eq!(kpis.total_sales, 0.0);
        assert!((kpis.historical_avg_sales - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_year_over_year_growth() {
        let full = vec![
            sale(2020, 3, 1_000_000.0, 100),
            sale(2021, 3, 1_500_000.0, 50),
        ];
        let filtered = vec![full[1].clone()];
        let yoy = year_over_year(&filtered, &full).unwrap();
        assert_eq!(yoy.current_year, 2021);
        assert_eq!(yoy.previous_year, 2020);
        assert!((yoy.sales_growth - 50.0).abs() < 1e-9);
        assert!((yoy.units_growth + 50.0).abs() < 1e-9);
        // no prices in either year
        assert_eq!(yoy.price_growth, 0.0);
    }

    #[test]
    fn test_year_over_year_without_previous_year() {
        let full = vec![sale(2020, 3, 1_000_000.0, 100)];
        let yoy = year_over_year(&full, &full).unwrap();
        assert_eq!(yoy.sales_growth, 0.0);
        assert_eq!(yoy.profit_growth, 0.0);
    }

    #[test]
    fn test_year_over_year_empty_filtered() {
        assert!(matches!(year_over_year(&[], &[]), Err(Error::Data(_))));
    }
}
