//! Analysis configuration.
//!
//! Loaded from TOML; every field has a default so an absent file or a
//! partial file both work.
//!
//! ```toml
//! period = "6mo"
//! risk_free_rate = 0.045
//! benchmark = "SPY"
//!
//! [diversification]
//! bucket_unclassified = true
//!
//! [rebalance]
//! noise_threshold = 0.02
//! ```

use crate::types::Period;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// History window used for risk metrics
    pub period: Period,
    /// Annual risk-free rate for the Sharpe ratio (e.g. 0.04 for 4%)
    pub risk_free_rate: f64,
    /// Rescale the weights of tickers that have return history so they sum to 1
    pub renormalize_after_exclusion: bool,
    /// Benchmark ticker for portfolio beta (e.g. "SPY")
    pub benchmark: Option<String>,
    pub diversification: DiversificationConfig,
    pub rebalance: RebalanceConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period: Period::OneYear,
            risk_free_rate: 0.04,
            renormalize_after_exclusion: false,
            benchmark: None,
            diversification: DiversificationConfig::default(),
            rebalance: RebalanceConfig::default(),
        }
    }
}

/// Sector allocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DiversificationConfig {
    /// Collect positions without a sector under "Unclassified" instead of
    /// leaving them out of the allocation
    pub bucket_unclassified: bool,
}

/// Rebalancing display settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Weight differences at or below this are treated as noise when displaying
    pub noise_threshold: f64,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            noise_threshold: 0.02,
        }
    }
}

impl AnalysisConfig {
    /// Get the default config file path.
    ///
    /// Default path: `<platform config dir>/folio/config.toml`
    /// Can be overridden with `FOLIO_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FOLIO_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("folio/config.toml"))
            .unwrap_or_else(|| PathBuf::from("folio.toml"))
    }

    /// Load from the default path, falling back to defaults if the file is missing.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load from a specific path, falling back to defaults if the file is missing.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidInput(
                "risk_free_rate must be finite".to_string(),
            ));
        }
        if !(self.rebalance.noise_threshold >= 0.0 && self.rebalance.noise_threshold < 1.0) {
            return Err(Error::InvalidInput(format!(
                "rebalance.noise_threshold must be in [0, 1), got {}",
                self.rebalance.noise_threshold
            )));
        }
        if matches!(&self.benchmark, Some(b) if b.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "benchmark must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Benchmark ticker, upper-cased.
    pub fn benchmark_ticker(&self) -> Option<String> {
        self.benchmark.as_deref().map(|b| b.trim().to_uppercase())
    }
}
