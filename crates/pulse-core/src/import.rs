//! CSV import of flat sales exports into the warehouse
//!
//! Expected columns (header names are matched case-insensitively, ignoring
//! spaces and punctuation): Retailer, Invoice Date, Region, State, City,
//! Product, Price per Unit, Units Sold, Total Sales, Operating Profit,
//! Operating Margin, Sales Method, and optionally Gender. Without a Gender
//! column the segment is taken from a "Men's"/"Women's" product prefix.

use std::collections::HashMap;
use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{Gender, Location, SalesRecord};
use crate::warehouse::Warehouse;

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub imported: usize,
    pub duplicates: usize,
    /// Rows that could not be parsed or failed validation
    pub skipped: usize,
}

/// Normalize a header: lowercase alphanumerics only
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Column positions resolved from the header row
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    const REQUIRED: [&'static str; 12] = [
        "retailer",
        "invoicedate",
        "region",
        "state",
        "city",
        "product",
        "priceperunit",
        "unitssold",
        "totalsales",
        "operatingprofit",
        "operatingmargin",
        "salesmethod",
    ];

    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (header_key(h), i))
            .collect();

        let missing: Vec<&str> = Self::REQUIRED
            .iter()
            .copied()
            .filter(|key| !index.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Import(format!(
                "CSV is missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { index })
    }

    fn get<'r>(&self, record: &'r StringRecord, key: &str) -> Option<&'r str> {
        self.index
            .get(key)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn require<'r>(&self, record: &'r StringRecord, key: &str) -> Result<&'r str> {
        self.get(record, key)
            .ok_or_else(|| Error::Import(format!("Missing value for {}", key)))
    }
}

/// Parse a date string in the formats sales exports use
fn parse_date(s: &str) -> Result<NaiveDate> {
    let formats = [
        "%Y-%m-%d", // 2021-01-15
        "%m/%d/%Y", // 01/15/2021
        "%m/%d/%y", // 01/15/21
        "%d-%m-%Y", // 15-01-2021
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s.trim(), fmt) {
            return Ok(date);
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas and percent signs
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s.trim().replace(['$', ',', ' ', '%'], "");

    cleaned
        .parse::<f64>()
        .map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

/// Margins may be written as `35%`, `35` or as a fraction `0.35`
///
/// Only values below 1 or written with a decimal point are fractions, so a
/// bare `1` is 1%.
fn parse_margin(s: &str) -> Result<f64> {
    let value = parse_amount(s)?;
    let fractional = value.abs() < 1.0 || (s.contains('.') && value.abs() <= 1.0);
    if !s.contains('%') && fractional {
        Ok(value * 100.0)
    } else {
        Ok(value)
    }
}

fn gender_from_product(product: &str) -> Option<Gender> {
    let lower = product.to_lowercase();
    if lower.starts_with("women") {
        Some(Gender::Women)
    } else if lower.starts_with("men") {
        Some(Gender::Men)
    } else {
        None
    }
}

/// Generate a unique hash for deduplication
///
/// `occurrence` numbers identical lines within one file, so repeated sales
/// are all kept while re-importing the same file stays idempotent.
fn generate_hash(record: &SalesRecord, occurrence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.retailer.as_bytes());
    hasher.update(record.invoice_date.to_string().as_bytes());
    hasher.update(record.location.city.as_bytes());
    hasher.update(record.product_category.as_bytes());
    hasher.update(record.sales_method.as_str().as_bytes());
    hasher.update(record.gender.as_str().as_bytes());
    hasher.update(record.units_sold.to_be_bytes());
    hasher.update(record.total_sales.to_be_bytes());
    hasher.update(record.operating_profit.to_be_bytes());
    hasher.update(record.operating_margin.to_be_bytes());
    hasher.update(record.price_per_unit.unwrap_or(-1.0).to_be_bytes());
    hasher.update((occurrence as u64).to_be_bytes());
    hex::encode(hasher.finalize())
}

fn parse_row(columns: &Columns, row: &StringRecord) -> Result<SalesRecord> {
    let product = columns.require(row, "product")?;
    let gender = match columns.get(row, "gender") {
        Some(g) => g.parse::<Gender>().map_err(Error::Import)?,
        None => gender_from_product(product)
            .ok_or_else(|| Error::Import(format!("Cannot infer gender from product: {}", product)))?,
    };

    let units = parse_amount(columns.require(row, "unitssold")?)?;
    if units < 0.0 || units.fract() != 0.0 {
        return Err(Error::Import(format!("Invalid units sold: {}", units)));
    }

    let record = SalesRecord::on(parse_date(columns.require(row, "invoicedate")?)?)
        .with_retailer(columns.require(row, "retailer")?)
        .with_location(Location::new(
            columns.require(row, "region")?,
            columns.require(row, "state")?,
            columns.require(row, "city")?,
        ))
        .with_product(
            product,
            columns.get(row, "priceperunit").map(parse_amount).transpose()?,
        )
        .with_gender(gender)
        .with_sales_method(
            columns
                .require(row, "salesmethod")?
                .parse()
                .map_err(Error::Import)?,
        )
        .with_amounts(
            units as u64,
            parse_amount(columns.require(row, "totalsales")?)?,
            parse_amount(columns.require(row, "operatingprofit")?)?,
        )
        .with_margin(parse_margin(columns.require(row, "operatingmargin")?)?);

    record.validate()?;
    Ok(record)
}

/// Import a sales CSV into the warehouse
///
/// Rows that cannot be read or parsed are skipped with a warning; rows whose
/// hash is already stored count as duplicates.
pub fn import_csv<R: Read>(warehouse: &Warehouse, reader: R) -> Result<ImportStats> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut stats = ImportStats::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (line, result) in rdr.records().enumerate() {
        let record = match result
            .map_err(Error::from)
            .and_then(|row| parse_row(&columns, &row))
        {
            Ok(record) => record,
            Err(e) => {
                // +2: header line and 1-based numbering
                warn!(line = line + 2, error = %e, "Skipping sales row");
                stats.skipped += 1;
                continue;
            }
        };

        let occurrence = seen.entry(generate_hash(&record, 0)).or_insert(0);
        let hash = generate_hash(&record, *occurrence);
        *occurrence += 1;

        match warehouse.insert_sale(&record, &hash)? {
            Some(id) => {
                debug!(sales_id = id, "Imported sale");
                stats.imported += 1;
            }
            None => stats.duplicates += 1,
        }
    }

    info!(
        imported = stats.imported,
        duplicates = stats.duplicates,
        skipped = stats.skipped,
        "CSV import complete"
    );
    Ok(stats)
}
