//! Configuration loading
//!
//! Config is resolved in order:
//! 1. An explicit path (`--config`)
//! 2. An override in the config dir (~/.config/pulse/pulse.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Missing tables and keys keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::forecast::ForecastConfig;
use crate::source::SourceConfig;

/// Embedded default config (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/pulse.toml");

/// Presentation settings for monetary amounts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub currency_symbol: String,
    /// Multiplier applied to USD amounts before display
    pub usd_rate: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            usd_rate: 1.0,
        }
    }
}

impl DisplayConfig {
    /// Format an amount already expressed in USD millions, e.g. `$3.2M`
    pub fn millions(&self, usd_millions: f64) -> String {
        format!("{}{:.1}M", self.currency_symbol, usd_millions * self.usd_rate)
    }

    /// Format a plain USD amount with two decimals
    pub fn amount(&self, usd: f64) -> String {
        format!("{}{:.2}", self.currency_symbol, usd * self.usd_rate)
    }
}

/// HTTP adapter settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Full Pulse configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub forecast: ForecastConfig,
    pub display: DisplayConfig,
    pub server: ServerSettings,
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pulse").join("pulse.toml"))
}

impl Config {
    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.forecast.n_estimators == 0 {
            return Err(Error::Config("forecast.n_estimators must be at least 1".into()));
        }
        if !config.display.usd_rate.is_finite() || config.display.usd_rate <= 0.0 {
            return Err(Error::Config("display.usd_rate must be positive".into()));
        }
        Ok(config)
    }

    /// Load configuration (explicit path, then override, then embedded default)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {}", path.display(), e))
            })?;
            debug!(path = %path.display(), "Loaded config");
            return Self::parse(&content);
        }

        if let Some(path) = default_config_path().filter(|p| p.exists()) {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read config {}: {}", path.display(), e))
            })?;
            debug!(path = %path.display(), "Loaded config override");
            return Self::parse(&content);
        }

        Self::parse(DEFAULT_CONFIG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::Algorithm;
    use std::io::Write;

    #[test]
    fn test_parse_default_config() {
        let config = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.forecast, ForecastConfig::default());
        assert!(config.source.fallback_to_synthetic);
        assert_eq!(config.source.database, Some(PathBuf::from("pulse.db")));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.display.currency_symbol, "$");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::parse("[forecast]\nalgorithm = \"linear\"\n").unwrap();
        assert_eq!(config.forecast.algorithm, Algorithm::Linear);
        assert_eq!(config.forecast.n_estimators, 100);
        assert_eq!(config.forecast.seed, 42);
        assert_eq!(config.server, ServerSettings::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::parse("[forecast]\nn_estimators = 0\n"),
            Err(Error::Config(_))
        ));
        assert!(Config::parse("[display]\nusd_rate = -2.0\n").is_err());
        assert!(Config::parse("[forecast]\nalgorithm = \"arima\"\n").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[display]\ncurrency_symbol = \"Rp \"\nusd_rate = 15000.0").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.display.millions(2.0), "Rp 30000.0M");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/pulse.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_display_formatting() {
        let display = DisplayConfig::default();
        assert_eq!(display.millions(3.0), "$3.0M");
        assert_eq!(display.amount(99.5), "$99.50");
    }
}
