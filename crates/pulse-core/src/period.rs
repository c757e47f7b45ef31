//! Period presets and inclusive date-window filtering

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::SalesRecord;

/// Days covered by the `last-6-months` preset
const LAST_SIX_MONTHS_DAYS: i64 = 180;

/// Closed date interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window spanning the earliest to latest invoice date, `None` for an empty set
    pub fn extent(records: &[SalesRecord]) -> Option<Self> {
        let start = records.iter().map(|r| r.invoice_date).min()?;
        let end = records.iter().map(|r| r.invoice_date).max()?;
        Some(Self { start, end })
    }

    /// Window from two `YYYY-MM-DD` strings
    pub fn custom(from: &str, to: &str) -> Result<Self> {
        Ok(Self {
            start: parse_day(from)?,
            end: parse_day(to)?,
        })
    }

    /// Records whose invoice date falls inside the window
    pub fn filter(&self, records: &[SalesRecord]) -> Vec<SalesRecord> {
        filter_records(records, self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for PeriodWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("Invalid date: {} (expected YYYY-MM-DD)", s)))
}

/// Named period choices offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodPreset {
    /// January 2020 through December 2021
    All,
    #[serde(rename = "year-2021")]
    Year2021,
    #[serde(rename = "q1-2021")]
    Q12021,
    /// 180 days back from the latest invoice date
    #[serde(rename = "last-6-months")]
    LastSixMonths,
    /// Earliest to latest invoice date of the record set
    Extent,
}

impl PeriodPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Year2021 => "year-2021",
            Self::Q12021 => "q1-2021",
            Self::LastSixMonths => "last-6-months",
            Self::Extent => "extent",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "Jan 2020 - Dec 2021",
            Self::Year2021 => "2021 Full Year",
            Self::Q12021 => "Q1 2021",
            Self::LastSixMonths => "Last 6 Months",
            Self::Extent => "Full Data Range",
        }
    }

    pub fn all() -> &'static [PeriodPreset] {
        &[
            Self::All,
            Self::Year2021,
            Self::Q12021,
            Self::LastSixMonths,
            Self::Extent,
        ]
    }

    /// Resolve to a concrete window; data-relative presets need a non-empty record set
    pub fn resolve(&self, records: &[SalesRecord]) -> Result<PeriodWindow> {
        match self {
            Self::All => Ok(PeriodWindow::new(ymd(2020, 1, 1), ymd(2021, 12, 31))),
            Self::Year2021 => Ok(PeriodWindow::new(ymd(2021, 1, 1), ymd(2021, 12, 31))),
            Self::Q12021 => Ok(PeriodWindow::new(ymd(2021, 1, 1), ymd(2021, 3, 31))),
            Self::LastSixMonths => {
                let extent = PeriodWindow::extent(records).ok_or_else(|| {
                    Error::Data("cannot resolve last-6-months on an empty record set".into())
                })?;
                Ok(PeriodWindow::new(
                    extent.end - Duration::days(LAST_SIX_MONTHS_DAYS),
                    extent.end,
                ))
            }
            Self::Extent => PeriodWindow::extent(records)
                .ok_or_else(|| Error::Data("cannot resolve extent of an empty record set".into())),
        }
    }
}

impl std::str::FromStr for PeriodPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Self::All),
            "year-2021" | "2021" => Ok(Self::Year2021),
            "q1-2021" => Ok(Self::Q12021),
            "last-6-months" => Ok(Self::LastSixMonths),
            "extent" => Ok(Self::Extent),
            _ => Err(format!(
                "Unknown period: {} (valid: all, year-2021, q1-2021, last-6-months, extent)",
                s
            )),
        }
    }
}

impl std::fmt::Display for PeriodPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Preset dates are fixed literals
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Keep records with `start <= invoice_date <= end`
///
/// Returns an empty set when `start > end`. The input is never modified.
pub fn filter_records(records: &[SalesRecord], start: NaiveDate, end: NaiveDate) -> Vec<SalesRecord> {
    let filtered: Vec<SalesRecord> = records
        .iter()
        .filter(|r| start <= r.invoice_date && r.invoice_date <= end)
        .cloned()
        .collect();

    debug!(
        start = %start,
        end = %end,
        before = records.len(),
        after = filtered.len(),
        "Filtered records by period"
    );

    filtered
}
