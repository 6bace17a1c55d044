//! Market data read from a directory of CSV exports.
//!
//! Layout:
//!
//! ```text
//! <dir>/AAPL.csv   date,open,high,low,close,volume
//! <dir>/MSFT.csv
//! <dir>/info.csv   ticker,name,sector,industry,market_cap,pe_ratio
//! ```
//!
//! Headers exported by common quote tools (`Date`, `Close`, ...) are accepted
//! as well. Only `date` and `close` are required per row.

use super::MarketData;
use crate::types::{Period, PriceBar, PriceSeries, StockInfo};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

const INFO_FILE: &str = "info.csv";

#[derive(Debug, Deserialize)]
struct BarRecord {
    #[serde(alias = "Date")]
    date: NaiveDate,
    #[serde(alias = "Open", default)]
    open: Option<f64>,
    #[serde(alias = "High", default)]
    high: Option<f64>,
    #[serde(alias = "Low", default)]
    low: Option<f64>,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: Option<f64>,
}

impl From<BarRecord> for PriceBar {
    fn from(r: BarRecord) -> Self {
        PriceBar {
            date: r.date,
            open: r.open.unwrap_or(r.close),
            high: r.high.unwrap_or(r.close),
            low: r.low.unwrap_or(r.close),
            close: r.close,
            volume: r.volume.map(|v| v.max(0.0) as u64).unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoRecord {
    ticker: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    pe_ratio: Option<f64>,
}

/// [`MarketData`] backed by per-ticker CSV files.
///
/// The latest price of a ticker is the last close in its file.
#[derive(Debug, Clone)]
pub struct CsvMarketData {
    dir: PathBuf,
    infos: HashMap<String, StockInfo>,
}

impl CsvMarketData {
    /// Open a data directory, reading `info.csv` if present.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(Error::InvalidInput(format!(
                "data directory not found: {}",
                dir.display()
            )));
        }

        let info_path = dir.join(INFO_FILE);
        let infos = if info_path.exists() {
            read_infos(&info_path)?
        } else {
            tracing::debug!("No {} in {}", INFO_FILE, dir.display());
            HashMap::new()
        };

        Ok(Self { dir, infos })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the full history file for `ticker`.
    ///
    /// A missing file or an unusable ticker symbol is `UnresolvedTicker`.
    pub fn read_history(&self, ticker: &str) -> Result<PriceSeries> {
        let ticker = ticker.trim().to_uppercase();
        let valid_symbol = !ticker.is_empty()
            && ticker
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
        if !valid_symbol {
            return Err(Error::UnresolvedTicker(ticker));
        }

        let path = self.dir.join(format!("{}.csv", ticker));
        if !path.exists() {
            return Err(Error::UnresolvedTicker(ticker));
        }

        let file = File::open(&path)?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));
        let bars = reader
            .deserialize::<BarRecord>()
            .map(|row| row.map(PriceBar::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(PriceSeries::new(&ticker, bars))
    }
}

fn read_infos(path: &Path) -> Result<HashMap<String, StockInfo>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let mut infos = HashMap::new();
    for row in reader.deserialize::<InfoRecord>() {
        let record = row?;
        infos.insert(
            record.ticker.trim().to_uppercase(),
            StockInfo {
                name: record.name,
                sector: record.sector,
                industry: record.industry,
                market_cap: record.market_cap,
                pe_ratio: record.pe_ratio,
            },
        );
    }
    Ok(infos)
}

impl MarketData for CsvMarketData {
    fn history(&self, ticker: &str, period: Period) -> Option<PriceSeries> {
        match self.read_history(ticker) {
            Ok(series) => Some(series.trailing(period)).filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::warn!("History unavailable for {}: {}", ticker, e);
                None
            }
        }
    }

    fn latest_price(&self, ticker: &str) -> Option<f64> {
        match self.read_history(ticker) {
            Ok(series) => series.last_close(),
            Err(e) => {
                tracing::warn!("Price unavailable for {}: {}", ticker, e);
                None
            }
        }
    }

    fn info(&self, ticker: &str) -> Option<StockInfo> {
        self.infos.get(&ticker.trim().to_uppercase()).cloned()
    }
}
