//! Application configuration.
//!
//! Loaded from a TOML file. Every section and field has a default, so an
//! empty file is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::analytics::ExpectedMoveMethod;
use crate::backtest::{ExitConfig, SyntheticStudyConfig, ValuationConstants};
use crate::earnings::SignificanceConfig;
use crate::scoring::ScoringConfig;
use crate::strategy::StrategyConfig;
use crate::validation::FilterConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Analytics inputs not tied to a single chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub expected_move_method: ExpectedMoveMethod,
    /// Falls back to 5% with a warning when unset.
    pub risk_free_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    pub filters: FilterConfig,
    pub analytics: AnalyticsConfig,
    pub scoring: ScoringConfig,
    pub exit: ExitConfig,
    pub valuation: ValuationConstants,
    pub significance: SignificanceConfig,
    pub study: SyntheticStudyConfig,
}

impl AppConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&raw)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}
