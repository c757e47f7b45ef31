//! Error types for Pulse

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The warehouse could not be reached. Recovered by the synthetic fallback.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Degenerate input: empty record set, zero totals, missing history.
    #[error("Insufficient data: {0}")]
    Data(String),

    /// Regression fit failure or non-finite values.
    #[error("Computation error: {0}")]
    Computation(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// True for errors that only make a single dashboard widget unavailable
    pub fn is_widget_local(&self) -> bool {
        matches!(self, Self::Data(_) | Self::Computation(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
