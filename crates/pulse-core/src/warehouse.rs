//! SQLite star-schema warehouse with connection pooling and migrations
//!
//! Tables:
//! - `fact_sales` - one row per sale line, deduplicated by `import_hash`
//! - `dim_retailer`, `dim_date`, `dim_location`, `dim_product`,
//!   `dim_gender`, `dim_sales_method` - the dimensions it joins to

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, ToSql};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{Gender, Location, Quarter, SalesMethod, SalesRecord};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Price used for products stored without one
pub const DEFAULT_PRICE_PER_UNIT: f64 = 100.0;

/// The fixed join every load runs
const SALES_QUERY: &str = r#"
    SELECT
        fs.sales_id, dr.retailer_name, dd.year, dd.month, dd.quarter, dd.day, dd.weekday,
        dl.region, dl.state, dl.city, dp.product_category,
        COALESCE(dp.price_per_unit, 100) AS price_per_unit,
        dg.gender_type, dsm.sales_method, fs.units_sold, fs.total_sales,
        fs.operating_profit, fs.operating_margin, dd.invoice_date
    FROM fact_sales fs
    JOIN dim_retailer dr ON fs.retailer_id = dr.retailer_id
    JOIN dim_date dd ON fs.date_id = dd.date_id
    JOIN dim_location dl ON fs.location_id = dl.location_id
    JOIN dim_product dp ON fs.product_id = dp.product_id
    JOIN dim_gender dg ON fs.gender_id = dg.gender_id
    JOIN dim_sales_method dsm ON fs.sales_method_id = dsm.sales_method_id
    ORDER BY fs.sales_id
"#;

/// Row counts and date coverage of a warehouse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseStats {
    pub sales: i64,
    pub retailers: i64,
    pub locations: i64,
    pub products: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Columns of one joined row before they are typed
struct RawSale {
    sales_id: i64,
    retailer: String,
    year: i32,
    month: u32,
    quarter: String,
    day: u32,
    weekday: String,
    region: String,
    state: String,
    city: String,
    product_category: String,
    price_per_unit: Option<f64>,
    gender: String,
    sales_method: String,
    units_sold: i64,
    total_sales: f64,
    operating_profit: f64,
    operating_margin: f64,
    invoice_date: String,
}

impl RawSale {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            sales_id: row.get(0)?,
            retailer: row.get(1)?,
            year: row.get(2)?,
            month: row.get(3)?,
            quarter: row.get(4)?,
            day: row.get(5)?,
            weekday: row.get(6)?,
            region: row.get(7)?,
            state: row.get(8)?,
            city: row.get(9)?,
            product_category: row.get(10)?,
            price_per_unit: row.get(11)?,
            gender: row.get(12)?,
            sales_method: row.get(13)?,
            units_sold: row.get(14)?,
            total_sales: row.get(15)?,
            operating_profit: row.get(16)?,
            operating_margin: row.get(17)?,
            invoice_date: row.get(18)?,
        })
    }

    fn into_record(self) -> Result<SalesRecord> {
        let bad = |what: &str, value: &str| {
            Error::InvalidData(format!("sale {}: invalid {} {:?}", self.sales_id, what, value))
        };

        let invoice_date = NaiveDate::parse_from_str(&self.invoice_date, "%Y-%m-%d")
            .map_err(|_| bad("invoice date", &self.invoice_date))?;
        let quarter: Quarter = self.quarter.parse().map_err(|_| bad("quarter", &self.quarter))?;
        let weekday: Weekday = self.weekday.parse().map_err(|_| bad("weekday", &self.weekday))?;
        let gender: Gender = self.gender.parse().map_err(|_| bad("gender", &self.gender))?;
        let sales_method: SalesMethod = self
            .sales_method
            .parse()
            .map_err(|_| bad("sales method", &self.sales_method))?;
        let units_sold = u64::try_from(self.units_sold)
            .map_err(|_| bad("units sold", &self.units_sold.to_string()))?;

        Ok(SalesRecord {
            sales_id: self.sales_id,
            retailer: self.retailer,
            year: self.year,
            month: self.month,
            quarter,
            day: self.day,
            weekday,
            location: Location {
                region: self.region,
                state: self.state,
                city: self.city,
            },
            product_category: self.product_category,
            price_per_unit: self.price_per_unit,
            gender,
            sales_method,
            units_sold,
            total_sales: self.total_sales,
            operating_profit: self.operating_profit,
            operating_margin: self.operating_margin,
            invoice_date,
        })
    }
}

/// Look up a dimension row by its key columns, inserting it when absent
fn dimension_id(
    conn: &Connection,
    select: &str,
    key: &[&dyn ToSql],
    insert: &str,
    values: &[&dyn ToSql],
) -> Result<i64> {
    if let Some(id) = conn.query_row(select, key, |row| row.get(0)).optional()? {
        return Ok(id);
    }
    conn.execute(insert, values)?;
    Ok(conn.last_insert_rowid())
}

/// Full English weekday name as stored in `dim_date`
fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Warehouse wrapper with connection pooling
#[derive(Clone)]
pub struct Warehouse {
    pool: DbPool,
    path: PathBuf,
}

impl Warehouse {
    /// Create (or open) a warehouse file and bring its schema up to date
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(4).build(manager)?;

        let warehouse = Self {
            pool,
            path: path.to_path_buf(),
        };
        warehouse.run_migrations()?;

        info!(path = %path.display(), "Warehouse ready");
        Ok(warehouse)
    }

    /// Open an existing warehouse without creating or migrating it
    ///
    /// Any failure to reach the file or find the fact table is a
    /// connectivity error.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Connectivity(format!(
                "warehouse {} does not exist",
                path.display()
            )));
        }

        let manager = SqliteConnectionManager::file(path).with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        );
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| Error::Connectivity(format!("{}: {}", path.display(), e)))?;

        let warehouse = Self {
            pool,
            path: path.to_path_buf(),
        };

        let conn = warehouse
            .conn()
            .map_err(|e| Error::Connectivity(e.to_string()))?;
        let has_facts: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'fact_sales')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::Connectivity(format!("{}: {}", path.display(), e)))?;
        if !has_facts {
            return Err(Error::Connectivity(format!(
                "{} is not a sales warehouse (fact_sales missing)",
                path.display()
            )));
        }
        drop(conn);

        Ok(warehouse)
    }

    /// Create a throwaway warehouse (for testing)
    ///
    /// Uses a temporary file so every pooled connection sees the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "pulse_test_{}_{}.db",
            std::process::id(),
            id
        ));

        let _ = std::fs::remove_file(&path);

        Self::create(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS dim_retailer (
                retailer_id INTEGER PRIMARY KEY,
                retailer_name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS dim_date (
                date_id INTEGER PRIMARY KEY,
                invoice_date TEXT NOT NULL UNIQUE,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                quarter TEXT NOT NULL,
                day INTEGER NOT NULL,
                weekday TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS dim_location (
                location_id INTEGER PRIMARY KEY,
                region TEXT NOT NULL,
                state TEXT NOT NULL,
                city TEXT NOT NULL,
                UNIQUE(region, state, city)
            );

            -- price_per_unit is nullable; loads coalesce it to 100
            CREATE TABLE IF NOT EXISTS dim_product (
                product_id INTEGER PRIMARY KEY,
                product_category TEXT NOT NULL,
                price_per_unit REAL
            );

            CREATE TABLE IF NOT EXISTS dim_gender (
                gender_id INTEGER PRIMARY KEY,
                gender_type TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS dim_sales_method (
                sales_method_id INTEGER PRIMARY KEY,
                sales_method TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS fact_sales (
                sales_id INTEGER PRIMARY KEY,
                retailer_id INTEGER NOT NULL REFERENCES dim_retailer(retailer_id),
                date_id INTEGER NOT NULL REFERENCES dim_date(date_id),
                location_id INTEGER NOT NULL REFERENCES dim_location(location_id),
                product_id INTEGER NOT NULL REFERENCES dim_product(product_id),
                gender_id INTEGER NOT NULL REFERENCES dim_gender(gender_id),
                sales_method_id INTEGER NOT NULL REFERENCES dim_sales_method(sales_method_id),
                units_sold INTEGER NOT NULL,
                total_sales REAL NOT NULL,
                operating_profit REAL NOT NULL,
                operating_margin REAL NOT NULL,
                import_hash TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_fact_sales_date ON fact_sales(date_id);
            CREATE INDEX IF NOT EXISTS idx_dim_date_invoice ON dim_date(invoice_date);
            "#,
        )?;

        Ok(())
    }

    /// Insert one sale and its dimension rows
    ///
    /// Returns `None` when a sale with the same import hash already exists.
    /// Dimension and fact rows are written in one transaction.
    pub fn insert_sale(&self, record: &SalesRecord, import_hash: &str) -> Result<Option<i64>> {
        let mut conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT sales_id FROM fact_sales WHERE import_hash = ?",
                params![import_hash],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(None);
        }

        let tx = conn.transaction()?;
        let invoice_date = record.invoice_date.to_string();
        let retailer_id = dimension_id(
            &tx,
            "SELECT retailer_id FROM dim_retailer WHERE retailer_name = ?1",
            params![record.retailer],
            "INSERT INTO dim_retailer (retailer_name) VALUES (?1)",
            params![record.retailer],
        )?;
        let date_id = dimension_id(
            &tx,
            "SELECT date_id FROM dim_date WHERE invoice_date = ?1",
            params![invoice_date],
            "INSERT INTO dim_date (invoice_date, year, month, quarter, day, weekday) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                invoice_date,
                record.year,
                record.month,
                record.quarter.as_str(),
                record.day,
                weekday_name(record.weekday),
            ],
        )?;
        let location = params![record.location.region, record.location.state, record.location.city];
        let location_id = dimension_id(
            &tx,
            "SELECT location_id FROM dim_location WHERE region = ?1 AND state = ?2 AND city = ?3",
            location,
            "INSERT INTO dim_location (region, state, city) VALUES (?1, ?2, ?3)",
            location,
        )?;
        let product = params![record.product_category, record.price_per_unit];
        let product_id = dimension_id(
            &tx,
            "SELECT product_id FROM dim_product WHERE product_category = ?1 AND price_per_unit IS ?2",
            product,
            "INSERT INTO dim_product (product_category, price_per_unit) VALUES (?1, ?2)",
            product,
        )?;
        let gender_id = dimension_id(
            &tx,
            "SELECT gender_id FROM dim_gender WHERE gender_type = ?1",
            params![record.gender.as_str()],
            "INSERT INTO dim_gender (gender_type) VALUES (?1)",
            params![record.gender.as_str()],
        )?;
        let sales_method_id = dimension_id(
            &tx,
            "SELECT sales_method_id FROM dim_sales_method WHERE sales_method = ?1",
            params![record.sales_method.as_str()],
            "INSERT INTO dim_sales_method (sales_method) VALUES (?1)",
            params![record.sales_method.as_str()],
        )?;

        tx.execute(
            r#"
            INSERT INTO fact_sales (retailer_id, date_id, location_id, product_id, gender_id, sales_method_id,
                                    units_sold, total_sales, operating_profit, operating_margin, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                retailer_id,
                date_id,
                location_id,
                product_id,
                gender_id,
                sales_method_id,
                record.units_sold as i64,
                record.total_sales,
                record.operating_profit,
                record.operating_margin,
                import_hash,
            ],
        )?;

        let sales_id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Some(sales_id))
    }

    /// Run the star-schema join and type every row
    ///
    /// Rows that cannot be typed or fail [`SalesRecord::validate`] are
    /// skipped with a warning; the second value is how many were skipped.
    pub fn load_sales(&self) -> Result<(Vec<SalesRecord>, usize)> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(SALES_QUERY)?;
        let raw = stmt
            .query_map([], RawSale::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(raw.len());
        let mut skipped = 0;
        for row in raw {
            match row.into_record().and_then(|r| r.validate().map(|_| r)) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, "Skipping invalid sales row");
                    skipped += 1;
                }
            }
        }

        info!(
            path = %self.path.display(),
            loaded = records.len(),
            skipped,
            "Loaded sales from warehouse"
        );
        Ok((records, skipped))
    }

    /// Row counts and invoice date coverage
    pub fn stats(&self) -> Result<WarehouseStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?)
        };

        let (first_date, last_date): (Option<String>, Option<String>) = conn.query_row(
            r#"
            SELECT MIN(dd.invoice_date), MAX(dd.invoice_date)
            FROM fact_sales fs JOIN dim_date dd ON fs.date_id = dd.date_id
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(WarehouseStats {
            sales: count("fact_sales")?,
            retailers: count("dim_retailer")?,
            locations: count("dim_location")?,
            products: count("dim_product")?,
            first_date,
            last_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(day: u32, retailer: &str) -> SalesRecord {
        SalesRecord::on(NaiveDate::from_ymd_opt(2021, 3, day).unwrap())
            .with_retailer(retailer)
            .with_location(Location::new("West", "California", "Los Angeles"))
            .with_product("Men's Street Footwear", Some(50.0))
            .with_gender(Gender::Men)
            .with_sales_method(SalesMethod::Online)
            .with_amounts(10, 5000.0, 1500.0)
            .with_margin(30.0)
    }

    #[test]
    fn test_insert_and_load_roundtrip() {
        let warehouse = Warehouse::in_memory().unwrap();
        let id = warehouse.insert_sale(&sample(5, "Foot Locker"), "hash-1").unwrap();
        assert!(id.is_some());

        let (records, skipped) = warehouse.load_sales().unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(records.len(), 1);
        let loaded = &records[0];
        assert_eq!(loaded.retailer, "Foot Locker");
        assert_eq!(loaded.weekday, Weekday::Fri);
        assert_eq!(loaded.quarter, Quarter::Q1);
        assert_eq!(loaded.sales_method, SalesMethod::Online);
        assert_eq!(loaded.price_per_unit, Some(50.0));
    }

    #[test]
    fn test_duplicate_hash_is_skipped() {
        let warehouse = Warehouse::in_memory().unwrap();
        assert!(warehouse.insert_sale(&sample(5, "Amazon"), "same").unwrap().is_some());
        assert!(warehouse.insert_sale(&sample(6, "Amazon"), "same").unwrap().is_none());
        assert_eq!(warehouse.stats().unwrap().sales, 1);
    }

    #[test]
    fn test_dimensions_are_shared() {
        let warehouse = Warehouse::in_memory().unwrap();
        warehouse.insert_sale(&sample(5, "Amazon"), "a").unwrap();
        warehouse.insert_sale(&sample(5, "Amazon"), "b").unwrap();
        warehouse.insert_sale(&sample(6, "Walmart"), "c").unwrap();

        let stats = warehouse.stats().unwrap();
        assert_eq!(stats.sales, 3);
        assert_eq!(stats.retailers, 2);
        assert_eq!(stats.locations, 1);
        assert_eq!(stats.products, 1);
        assert_eq!(stats.first_date.as_deref(), Some("2021-03-05"));
        assert_eq!(stats.last_date.as_deref(), Some("2021-03-06"));
    }

    #[test]
    fn test_missing_price_coalesces_to_default() {
        let warehouse = Warehouse::in_memory().unwrap();
        let record = sample(5, "Kohl's").with_product("Women's Apparel", None);
        warehouse.insert_sale(&record, "no-price").unwrap();

        let (records, _) = warehouse.load_sales().unwrap();
        assert_eq!(records[0].price_per_unit, Some(DEFAULT_PRICE_PER_UNIT));
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let warehouse = Warehouse::in_memory().unwrap();
        warehouse.insert_sale(&sample(5, "Amazon"), "good").unwrap();
        warehouse.insert_sale(&sample(6, "Amazon"), "bad").unwrap();
        warehouse
            .conn()
            .unwrap()
            .execute("UPDATE dim_date SET month = 7 WHERE invoice_date = '2021-03-06'", [])
            .unwrap();

        let (records, skipped) = warehouse.load_sales().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_open_existing_missing_file_is_connectivity_error() {
        let result = Warehouse::open_existing("/nonexistent/dir/pulse.db");
        assert!(matches!(result, Err(Error::Connectivity(_))));
    }

    #[test]
    fn test_open_existing_rejects_foreign_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE notes (id INTEGER);")
            .unwrap();
        assert!(matches!(
            Warehouse::open_existing(&path),
            Err(Error::Connectivity(_))
        ));
    }

    #[test]
    fn test_open_existing_reads_created_warehouse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.db");
        Warehouse::create(&path)
            .unwrap()
            .insert_sale(&sample(5, "Amazon"), "x")
            .unwrap();

        let warehouse = Warehouse::open_existing(&path).unwrap();
        assert_eq!(warehouse.load_sales().unwrap().0.len(), 1);
    }
}
