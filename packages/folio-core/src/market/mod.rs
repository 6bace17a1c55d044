//! Market data boundary.
//!
//! The analytics never fetch anything themselves: prices, histories and
//! sector information come through [`MarketData`]. A lookup that fails for
//! any reason (unknown ticker, network error, timeout) is reported as `None`
//! and the ticker is excluded downstream.

mod csv_files;
mod snapshot;

pub use csv_files::CsvMarketData;
pub use snapshot::MarketSnapshot;

use crate::types::{Period, PriceSeries, StockInfo};
use std::collections::HashMap;

/// Source of historical prices, latest prices and reference data.
pub trait MarketData {
    /// Daily price history for `ticker` over `period`, oldest first.
    fn history(&self, ticker: &str, period: Period) -> Option<PriceSeries>;

    /// Latest available price for `ticker`.
    fn latest_price(&self, ticker: &str) -> Option<f64>;

    /// Static reference data (sector, industry, ...) for `ticker`.
    fn info(&self, ticker: &str) -> Option<StockInfo>;
}

impl<T: MarketData + ?Sized> MarketData for &T {
    fn history(&self, ticker: &str, period: Period) -> Option<PriceSeries> {
        (**self).history(ticker, period)
    }

    fn latest_price(&self, ticker: &str) -> Option<f64> {
        (**self).latest_price(ticker)
    }

    fn info(&self, ticker: &str) -> Option<StockInfo> {
        (**self).info(ticker)
    }
}

/// In-memory market data, assembled with builder calls.
///
/// Latest prices fall back to the last close of a ticker's history when no
/// explicit price was set.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    histories: HashMap<String, PriceSeries>,
    prices: HashMap<String, f64>,
    infos: HashMap<String, StockInfo>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, series: PriceSeries) -> Self {
        self.insert_history(series);
        self
    }

    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.prices.insert(ticker.to_uppercase(), price);
        self
    }

    pub fn with_info(mut self, ticker: &str, info: StockInfo) -> Self {
        self.infos.insert(ticker.to_uppercase(), info);
        self
    }

    /// Shorthand for `with_info` carrying only a sector.
    pub fn with_sector(self, ticker: &str, sector: &str) -> Self {
        self.with_info(ticker, StockInfo::with_sector(sector))
    }

    pub fn insert_history(&mut self, series: PriceSeries) {
        self.histories.insert(series.ticker.clone(), series);
    }
}

impl MarketData for StaticMarketData {
    fn history(&self, ticker: &str, period: Period) -> Option<PriceSeries> {
        self.histories
            .get(&ticker.to_uppercase())
            .map(|series| series.trailing(period))
            .filter(|series| !series.is_empty())
    }

    fn latest_price(&self, ticker: &str) -> Option<f64> {
        let key = ticker.to_uppercase();
        self.prices
            .get(&key)
            .copied()
            .or_else(|| self.histories.get(&key).and_then(|s| s.last_close()))
    }

    fn info(&self, ticker: &str) -> Option<StockInfo> {
        self.infos.get(&ticker.to_uppercase()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_static_price_falls_back_to_last_close() {
        let market = StaticMarketData::new()
            .with_history(PriceSeries::from_closes(
                "AAPL",
                &[(date(2024, 1, 2), 180.0), (date(2024, 1, 3), 182.5)],
            ))
            .with_price("MSFT", 410.0);

        assert_eq!(market.latest_price("aapl"), Some(182.5));
        assert_eq!(market.latest_price("MSFT"), Some(410.0));
        assert_eq!(market.latest_price("TSLA"), None);
    }

    #[test]
    fn test_static_history_and_info() {
        let market = StaticMarketData::new()
            .with_history(PriceSeries::from_closes(
                "AAPL",
                &[(date(2023, 1, 2), 130.0), (date(2024, 1, 2), 180.0)],
            ))
            .with_sector("AAPL", "Technology");

        let history = market.history("AAPL", Period::SixMonths).unwrap();
        assert_eq!(history.closes(), vec![180.0]);
        assert!(market.history("MSFT", Period::OneYear).is_none());

        let info = market.info("aapl").unwrap();
        assert_eq!(info.resolved_sector(), Some("Technology"));
    }
}
