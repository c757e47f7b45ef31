//! Grouped tables over a record set
//!
//! Every table is ordered by group key so downstream tie-breaking
//! ("first in table order") is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::{
    Dimension, EntityTotal, Gender, GenderBreakdown, Metric, MonthlyBreakdown, MonthlyPoint,
    PairedTotal, SalesRecord, YearlyTotal,
};

/// Running sum and row count of one group
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Operating margin is averaged, every other metric summed
    fn finish(self, metric: Metric) -> f64 {
        match metric {
            Metric::OperatingMargin => self.sum / self.count as f64,
            _ => self.sum,
        }
    }
}

/// Sum `metric` per distinct `dimension` value (mean for operating margin)
pub fn group_totals(records: &[SalesRecord], dimension: Dimension, metric: Metric) -> Vec<EntityTotal> {
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for record in records {
        groups
            .entry(dimension.key(record))
            .or_default()
            .add(metric.value(record));
    }

    let table: Vec<EntityTotal> = groups
        .into_iter()
        .map(|(name, acc)| EntityTotal::new(name, acc.finish(metric)))
        .collect();

    debug!(
        dimension = dimension.as_str(),
        metric = metric.as_str(),
        groups = table.len(),
        "Grouped records"
    );

    table
}

/// Two metrics per distinct `dimension` value, each combined like [`group_totals`]
pub fn group_pair(
    records: &[SalesRecord],
    dimension: Dimension,
    primary: Metric,
    secondary: Metric,
) -> Vec<PairedTotal> {
    let mut groups: BTreeMap<String, (Accumulator, Accumulator)> = BTreeMap::new();
    for record in records {
        let (first, second) = groups.entry(dimension.key(record)).or_default();
        first.add(primary.value(record));
        second.add(secondary.value(record));
    }

    groups
        .into_iter()
        .map(|(name, (first, second))| PairedTotal {
            name,
            primary: first.finish(primary),
            secondary: second.finish(secondary),
        })
        .collect()
}

/// `metric` per (`month` attribute, `dimension` value), in month then name order
///
/// Like [`monthly_series`], different years sharing a month are merged.
pub fn group_by_month(
    records: &[SalesRecord],
    dimension: Dimension,
    metric: Metric,
) -> Vec<MonthlyBreakdown> {
    let mut months: BTreeMap<u32, BTreeMap<String, Accumulator>> = BTreeMap::new();
    for record in records {
        months
            .entry(record.month)
            .or_default()
            .entry(dimension.key(record))
            .or_default()
            .add(metric.value(record));
    }

    months
        .into_iter()
        .map(|(month, groups)| MonthlyBreakdown {
            month,
            groups: groups
                .into_iter()
                .map(|(name, acc)| EntityTotal::new(name, acc.finish(metric)))
                .collect(),
        })
        .collect()
}

/// Sales and profit summed per calendar year, oldest first
pub fn yearly_totals(records: &[SalesRecord]) -> Vec<YearlyTotal> {
    let mut years: BTreeMap<i32, (f64, f64)> = BTreeMap::new();
    for record in records {
        let entry = years.entry(record.year).or_insert((0.0, 0.0));
        entry.0 += record.total_sales;
        entry.1 += record.operating_profit;
    }

    years
        .into_iter()
        .map(|(year, (total_sales, operating_profit))| YearlyTotal {
            year,
            total_sales,
            operating_profit,
        })
        .collect()
}

/// Total sales per (gender, category), zero-filled across all categories in the set
pub fn gender_category_matrix(records: &[SalesRecord]) -> Vec<GenderBreakdown> {
    let categories: BTreeSet<&str> = records.iter().map(|r| r.product_category.as_str()).collect();

    let mut sales: BTreeMap<Gender, BTreeMap<&str, f64>> = BTreeMap::new();
    for record in records {
        *sales
            .entry(record.gender)
            .or_default()
            .entry(record.product_category.as_str())
            .or_insert(0.0) += record.total_sales;
    }

    sales
        .into_iter()
        .map(|(gender, by_category)| GenderBreakdown {
            gender,
            categories: categories
                .iter()
                .map(|category| {
                    EntityTotal::new(*category, by_category.get(category).copied().unwrap_or(0.0))
                })
                .collect(),
        })
        .collect()
}

/// Sales and profit summed per `month` attribute (1-12), in month order
///
/// Records from different years sharing a month land in the same point.
pub fn monthly_series(records: &[SalesRecord]) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<u32, (f64, f64)> = BTreeMap::new();
    for record in records {
        let entry = months.entry(record.month).or_insert((0.0, 0.0));
        entry.0 += record.total_sales;
        entry.1 += record.operating_profit;
    }

    months
        .into_iter()
        .enumerate()
        .map(|(index, (month, (total_sales, operating_profit)))| MonthlyPoint {
            index,
            month,
            total_sales,
            operating_profit,
        })
        .collect()
}
