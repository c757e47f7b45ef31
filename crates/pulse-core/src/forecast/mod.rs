//! Monthly sales forecasting
//!
//! The monthly series is split in index order (first 80% train, rest
//! test). The chosen regressor is fitted on the training part, scored by
//! mean absolute error on the test part, and asked for the value one index
//! past the end. The trend always comes from a least-squares line over the
//! whole series, whichever regressor made the prediction.

mod forest;
mod linear;

pub use forest::RandomForest;
pub use linear::LinearFit;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Forecast, MonthlyPoint, PredictionResult, Trend};

/// Fewest monthly points a forecast is attempted on
pub const MIN_FORECAST_POINTS: usize = 3;

/// Share of the series used for training
const TRAIN_FRACTION: f64 = 0.8;

/// A fitted single-feature model
pub trait Regressor {
    fn predict(&self, x: f64) -> f64;
}

/// Regressor used for the prediction and MAE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    RandomForest,
    Linear,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RandomForest => "random_forest",
            Self::Linear => "linear",
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "random_forest" | "forest" | "rf" => Ok(Self::RandomForest),
            "linear" | "ols" => Ok(Self::Linear),
            _ => Err(format!(
                "Unknown forecast algorithm: {} (valid: random_forest, linear)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Forecast parameters, normally read from the `[forecast]` config table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub algorithm: Algorithm,
    pub n_estimators: usize,
    pub seed: u64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::RandomForest,
            n_estimators: 100,
            seed: 42,
        }
    }
}

impl ForecastConfig {
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Predict next-month sales from a monthly series
///
/// Fewer than three points is reported as [`Forecast::InsufficientData`],
/// not as an error.
pub fn forecast(series: &[MonthlyPoint], config: &ForecastConfig) -> Result<Forecast> {
    let n = series.len();
    if n < MIN_FORECAST_POINTS {
        debug!(months = n, "Not enough history to forecast");
        return Ok(Forecast::InsufficientData { months: n });
    }

    if let Some(bad) = series.iter().find(|p| !p.total_sales.is_finite()) {
        return Err(Error::Computation(format!(
            "non-finite sales value at index {}",
            bad.index
        )));
    }

    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.total_sales))
        .collect();

    let train_size = (TRAIN_FRACTION * n as f64).floor() as usize;
    let (train, test) = points.split_at(train_size);

    let model: Box<dyn Regressor> = match config.algorithm {
        Algorithm::RandomForest => Box::new(RandomForest::fit(train, config.n_estimators, config.seed)?),
        Algorithm::Linear => Box::new(LinearFit::fit(train)?),
    };

    let mae = test
        .iter()
        .map(|(x, y)| (model.predict(*x) - y).abs())
        .sum::<f64>()
        / test.len() as f64;
    let prediction = model.predict(n as f64);

    let trend = Trend::from_slope(LinearFit::fit(&points)?.slope);

    if !prediction.is_finite() || !mae.is_finite() {
        return Err(Error::Computation("forecast produced a non-finite value".into()));
    }

    debug!(
        algorithm = config.algorithm.as_str(),
        months = n,
        train = train_size,
        prediction,
        mae,
        trend = trend.as_str(),
        "Forecast complete"
    );

    Ok(Forecast::Available(PredictionResult {
        prediction,
        trend,
        mae,
    }))
}
