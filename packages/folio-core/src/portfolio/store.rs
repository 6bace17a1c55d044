//! Holdings persistence.

use crate::types::{Holding, Portfolio};
use crate::Result;
use chrono::Utc;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Holdings book backed by a JSON file.
///
/// The analysis functions never touch this; it exists so the CLI can keep a
/// portfolio between runs. Library callers can build a [`Portfolio`] directly.
#[derive(Debug)]
pub struct HoldingsStore {
    /// Path to the holdings JSON file (empty for in-memory stores)
    path: PathBuf,
    portfolio: Portfolio,
}

impl HoldingsStore {
    /// Open the store at the default path.
    ///
    /// Default path: `<platform data dir>/folio/holdings.json`
    /// Can be overridden with `FOLIO_HOLDINGS_FILE` environment variable.
    pub fn open() -> Result<Self> {
        Self::with_path(Self::default_path())
    }

    /// Open a store at a custom path. A missing file starts empty.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let portfolio = Self::load_from_path(&path)?;
        Ok(Self { path, portfolio })
    }

    /// Create an in-memory store (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            portfolio: Portfolio::default(),
        }
    }

    /// Get the default holdings file path.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FOLIO_HOLDINGS_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.data_dir().join("folio/holdings.json"))
            .unwrap_or_else(|| PathBuf::from("holdings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_path(path: &Path) -> Result<Portfolio> {
        if !path.exists() {
            tracing::debug!("No holdings file at {}, starting empty", path.display());
            return Ok(Portfolio::default());
        }

        let content = fs::read_to_string(path)?;
        let data: serde_json::Value = serde_json::from_str(&content)?;

        // A bare list of holdings is accepted as well as the full document.
        // Both decode through validation.
        let portfolio = if data.is_array() {
            let holdings: Vec<Holding> = serde_json::from_value(data)?;
            Portfolio::from_holdings(holdings)?
        } else {
            serde_json::from_value(data)?
        };

        tracing::debug!(
            "Loaded {} holdings from {}",
            portfolio.len(),
            path.display()
        );
        Ok(portfolio)
    }

    /// Save the current holdings to disk.
    pub fn save(&mut self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let now = Utc::now();
        if self.portfolio.created_at.is_none() {
            self.portfolio.created_at = Some(now);
        }
        self.portfolio.updated_at = Some(now);

        let content = serde_json::to_string_pretty(&self.portfolio)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Discard in-memory changes and reload from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.portfolio = Self::load_from_path(&self.path)?;
        Ok(())
    }

    pub fn get(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn get_mut(&mut self) -> &mut Portfolio {
        &mut self.portfolio
    }
}
