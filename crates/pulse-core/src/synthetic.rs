//! Seeded sample dataset served when the warehouse is unreachable
//!
//! Calendar fields are derived from the sampled invoice date, and each
//! city comes with its own state and region, so every generated record
//! passes [`SalesRecord::validate`].

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::models::{Gender, Location, SalesMethod, SalesRecord};

/// Rows in the fallback dataset
pub const SYNTHETIC_ROWS: usize = 1000;
/// Seed the fallback dataset is generated from
pub const SYNTHETIC_SEED: u64 = 42;

const RETAILERS: [&str; 5] = ["West Gear", "Foot Locker", "Sports Direct", "Kohl's", "Amazon"];

const LOCATIONS: [(&str, &str, &str); 6] = [
    ("Northeast", "New York", "New York"),
    ("West", "California", "Los Angeles"),
    ("Midwest", "Illinois", "Chicago"),
    ("South", "Texas", "Houston"),
    ("West", "Arizona", "Phoenix"),
    ("Southeast", "Florida", "Miami"),
];

const CATEGORIES: [&str; 3] = [
    "Men's Street Footwear",
    "Women's Apparel",
    "Men's Athletic Footwear",
];

const GENDERS: [Gender; 2] = [Gender::Men, Gender::Women];

const METHODS: [SalesMethod; 3] = [SalesMethod::InStore, SalesMethod::Online, SalesMethod::Outlet];

/// Generate `rows` sales over 2020-01-01..=2021-12-31 from `seed`
///
/// The same seed always yields the same records.
pub fn generate_synthetic(rows: usize, seed: u64) -> Vec<SalesRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let first_day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    let last_day = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap_or_default();
    let span = (last_day - first_day).num_days();

    (0..rows)
        .map(|i| {
            let date = first_day + Duration::days(rng.gen_range(0..=span));
            let (region, state, city) = LOCATIONS[rng.gen_range(0..LOCATIONS.len())];
            let retailer = RETAILERS.choose(&mut rng).copied().unwrap_or(RETAILERS[0]);
            let category = CATEGORIES.choose(&mut rng).copied().unwrap_or(CATEGORIES[0]);

            SalesRecord::on(date)
                .with_id(i as i64)
                .with_retailer(retailer)
                .with_location(Location::new(region, state, city))
                .with_product(category, Some(rng.gen_range(50.0..200.0)))
                .with_gender(GENDERS[rng.gen_range(0..GENDERS.len())])
                .with_sales_method(METHODS[rng.gen_range(0..METHODS.len())])
                .with_amounts(
                    rng.gen_range(1..100),
                    rng.gen_range(1000.0..50000.0),
                    rng.gen_range(200.0..15000.0),
                )
                .with_margin(rng.gen_range(10.0..50.0))
        })
        .collect()
}
