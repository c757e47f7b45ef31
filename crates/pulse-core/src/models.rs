//! Domain models for Pulse

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Divisor used for every "millions" figure (sales, profit, units)
pub const MILLIONS: f64 = 1e6;

/// Calendar quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        }
    }

    /// Quarter containing the given month (1-12)
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            1..=3 => Some(Self::Q1),
            4..=6 => Some(Self::Q2),
            7..=9 => Some(Self::Q3),
            10..=12 => Some(Self::Q4),
            _ => None,
        }
    }
}

impl std::str::FromStr for Quarter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "Q1" | "1" => Ok(Self::Q1),
            "Q2" | "2" => Ok(Self::Q2),
            "Q3" | "3" => Ok(Self::Q3),
            "Q4" | "4" => Ok(Self::Q4),
            _ => Err(format!("Unknown quarter: {}", s)),
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Customer gender segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Men,
    Women,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Men => "Men",
            Self::Women => "Women",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "men" | "male" | "m" => Ok(Self::Men),
            "women" | "female" | "f" | "w" => Ok(Self::Women),
            _ => Err(format!("Unknown gender segment: {}", s)),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sales channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesMethod {
    InStore,
    Online,
    Outlet,
}

impl SalesMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InStore => "In-store",
            Self::Online => "Online",
            Self::Outlet => "Outlet",
        }
    }
}

impl std::str::FromStr for SalesMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "in-store" | "instore" | "store" => Ok(Self::InStore),
            "online" => Ok(Self::Online),
            "outlet" => Ok(Self::Outlet),
            _ => Err(format!("Unknown sales method: {}", s)),
        }
    }
}

impl std::fmt::Display for SalesMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a sale happened
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub region: String,
    pub state: String,
    pub city: String,
}

impl Location {
    pub fn new(region: &str, state: &str, city: &str) -> Self {
        Self {
            region: region.to_string(),
            state: state.to_string(),
            city: city.to_string(),
        }
    }
}

/// One sale line from the warehouse (fact row joined to its dimensions)
///
/// `year`, `month`, `quarter`, `day` and `weekday` are denormalized from
/// `invoice_date`; [`SalesRecord::validate`] checks that they agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Source join key, not used by the analytics
    pub sales_id: i64,
    pub retailer: String,
    pub year: i32,
    pub month: u32,
    pub quarter: Quarter,
    pub day: u32,
    pub weekday: Weekday,
    pub location: Location,
    pub product_category: String,
    /// USD per unit, `None` when the source had no price
    pub price_per_unit: Option<f64>,
    pub gender: Gender,
    pub sales_method: SalesMethod,
    pub units_sold: u64,
    /// USD
    pub total_sales: f64,
    /// USD, may be negative
    pub operating_profit: f64,
    /// Percent
    pub operating_margin: f64,
    pub invoice_date: NaiveDate,
}

impl SalesRecord {
    /// A zero-valued sale on `invoice_date` with calendar fields derived from the date
    pub fn on(invoice_date: NaiveDate) -> Self {
        Self {
            sales_id: 0,
            retailer: String::new(),
            year: invoice_date.year(),
            month: invoice_date.month(),
            quarter: Quarter::from_month(invoice_date.month()).unwrap_or(Quarter::Q1),
            day: invoice_date.day(),
            weekday: invoice_date.weekday(),
            location: Location::new("", "", ""),
            product_category: String::new(),
            price_per_unit: None,
            gender: Gender::Men,
            sales_method: SalesMethod::InStore,
            units_sold: 0,
            total_sales: 0.0,
            operating_profit: 0.0,
            operating_margin: 0.0,
            invoice_date,
        }
    }

    pub fn with_id(mut self, sales_id: i64) -> Self {
        self.sales_id = sales_id;
        self
    }

    pub fn with_retailer(mut self, retailer: impl Into<String>) -> Self {
        self.retailer = retailer.into();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_product(mut self, category: impl Into<String>, price: Option<f64>) -> Self {
        self.product_category = category.into();
        self.price_per_unit = price;
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_sales_method(mut self, method: SalesMethod) -> Self {
        self.sales_method = method;
        self
    }

    /// Set units, sales and profit amounts
    pub fn with_amounts(mut self, units_sold: u64, total_sales: f64, operating_profit: f64) -> Self {
        self.units_sold = units_sold;
        self.total_sales = total_sales;
        self.operating_profit = operating_profit;
        self
    }

    pub fn with_margin(mut self, operating_margin: f64) -> Self {
        self.operating_margin = operating_margin;
        self
    }

    /// Check the record rules enforced at the source boundary
    pub fn validate(&self) -> Result<()> {
        if self.invoice_date.year() != self.year || self.invoice_date.month() != self.month {
            return Err(Error::InvalidData(format!(
                "sale {}: invoice date {} disagrees with year/month {}-{:02}",
                self.sales_id, self.invoice_date, self.year, self.month
            )));
        }
        if !(1..=12).contains(&self.month) {
            return Err(Error::InvalidData(format!(
                "sale {}: month {} out of range",
                self.sales_id, self.month
            )));
        }
        if let Some(price) = self.price_per_unit {
            if !price.is_finite() || price < 0.0 {
                return Err(Error::InvalidData(format!(
                    "sale {}: invalid price per unit {}",
                    self.sales_id, price
                )));
            }
        }
        if !self.total_sales.is_finite() || self.total_sales < 0.0 {
            return Err(Error::InvalidData(format!(
                "sale {}: invalid total sales {}",
                self.sales_id, self.total_sales
            )));
        }
        if !self.operating_profit.is_finite() || !self.operating_margin.is_finite() {
            return Err(Error::InvalidData(format!(
                "sale {}: non-finite profit or margin",
                self.sales_id
            )));
        }
        Ok(())
    }
}

// ========== Aggregation Models ==========

/// A column records can be grouped by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Retailer,
    ProductCategory,
    City,
    State,
    Region,
    SalesMethod,
    Gender,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retailer => "retailer",
            Self::ProductCategory => "product_category",
            Self::City => "city",
            Self::State => "state",
            Self::Region => "region",
            Self::SalesMethod => "sales_method",
            Self::Gender => "gender",
        }
    }

    /// The value of this dimension on a record
    pub fn key(&self, record: &SalesRecord) -> String {
        match self {
            Self::Retailer => record.retailer.clone(),
            Self::ProductCategory => record.product_category.clone(),
            Self::City => record.location.city.clone(),
            Self::State => record.location.state.clone(),
            Self::Region => record.location.region.clone(),
            Self::SalesMethod => record.sales_method.as_str().to_string(),
            Self::Gender => record.gender.as_str().to_string(),
        }
    }
}

/// A measure summed (or averaged) per group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalSales,
    OperatingProfit,
    UnitsSold,
    /// Mean operating margin (percent), not a sum
    OperatingMargin,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalSales => "total_sales",
            Self::OperatingProfit => "operating_profit",
            Self::UnitsSold => "units_sold",
            Self::OperatingMargin => "operating_margin",
        }
    }

    pub fn value(&self, record: &SalesRecord) -> f64 {
        match self {
            Self::TotalSales => record.total_sales,
            Self::OperatingProfit => record.operating_profit,
            Self::UnitsSold => record.units_sold as f64,
            Self::OperatingMargin => record.operating_margin,
        }
    }
}

/// One row of a table grouped by a single dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTotal {
    pub name: String,
    pub value: f64,
}

impl EntityTotal {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Sales per product category within one gender segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderBreakdown {
    pub gender: Gender,
    /// Every category of the record set, zero-filled when this gender has no sales in it
    pub categories: Vec<EntityTotal>,
}

/// One month of the forecast input series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    /// Position in the grouped order, not the calendar month
    pub index: usize,
    /// Calendar month (1-12) the point was grouped from
    pub month: u32,
    pub total_sales: f64,
    pub operating_profit: f64,
}

/// Two measures of one group, e.g. retailer sales with mean margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedTotal {
    pub name: String,
    pub primary: f64,
    pub secondary: f64,
}

/// One month of a table grouped by month and a second dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBreakdown {
    pub month: u32,
    /// Only groups with sales in this month, by name
    pub groups: Vec<EntityTotal>,
}

/// Sales and profit summed per calendar year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyTotal {
    pub year: i32,
    pub total_sales: f64,
    pub operating_profit: f64,
}

// ========== Report Models ==========

/// Headline metrics for the active period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    /// USD millions
    pub total_sales: f64,
    /// USD millions
    pub total_profit: f64,
    /// Millions of units
    pub total_units: f64,
    /// USD; 0 means no prices were available
    pub avg_price: f64,
    /// Full-dataset sales per distinct month, USD millions
    pub historical_avg_sales: f64,
    /// Full-dataset profit per distinct month, USD millions
    pub historical_avg_profit: f64,
}

/// Growth of the latest filtered year against the year before
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOverYear {
    pub current_year: i32,
    pub previous_year: i32,
    /// Percent
    pub sales_growth: f64,
    pub profit_growth: f64,
    pub units_growth: f64,
    pub price_growth: f64,
}

/// Direction of the linear fit over the whole forecast series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Flat => "flat",
        }
    }

    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Self::Up
        } else if slope < 0.0 {
            Self::Down
        } else {
            Self::Flat
        }
    }

    /// Alert level a trend is displayed with
    pub fn level(&self) -> AlertLevel {
        match self {
            Self::Up => AlertLevel::Success,
            Self::Down => AlertLevel::Danger,
            Self::Flat => AlertLevel::Warning,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of a successful forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted total sales (USD) for the index after the last observed one
    pub prediction: f64,
    pub trend: Trend,
    /// Mean absolute error on the held-out tail (USD)
    pub mae: f64,
}

/// Forecast outcome; too little history is a normal result, not an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Forecast {
    Available(PredictionResult),
    InsufficientData { months: usize },
}

impl Forecast {
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            Self::Available(result) => Some(result),
            Self::InsufficientData { .. } => None,
        }
    }
}

// ========== Alert Models ==========

/// Display severity of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Success,
    Warning,
    Danger,
    Info,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Current value compared with the historical baseline
    Performance,
    /// Largest entity of a grouped table
    TopPerformer,
    /// Smallest entity of a grouped table
    NeedsAttention,
    /// Best-selling category within a gender segment
    GenderPreference,
    /// Region holding more than 30% of sales
    DominantRegion,
    /// Region holding less than 10% of sales
    ExpansionPotential,
    /// Forecast summary line
    Forecast,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::TopPerformer => "top_performer",
            Self::NeedsAttention => "needs_attention",
            Self::GenderPreference => "gender_preference",
            Self::DominantRegion => "dominant_region",
            Self::ExpansionPotential => "expansion_potential",
            Self::Forecast => "forecast",
        }
    }
}

/// A classified, human-readable observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: AlertKind,
    pub message: String,
    /// Entity the alert is about (retailer, category, region...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Value quoted in the message, already scaled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Alert {
    pub fn new(level: AlertLevel, kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
            subject: None,
            value: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}
