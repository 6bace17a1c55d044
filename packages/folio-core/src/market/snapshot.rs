//! Frozen, prefetched market data for one analysis run.

use super::MarketData;
use crate::types::{Period, PriceSeries, StockInfo};
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct TickerData {
    latest_price: Option<f64>,
    history: Option<PriceSeries>,
    info: Option<StockInfo>,
}

impl TickerData {
    fn fetch_price<P: MarketData + ?Sized>(provider: &P, ticker: &str) -> Option<f64> {
        let latest_price = provider
            .latest_price(ticker)
            .filter(|p| p.is_finite() && *p > 0.0);
        if latest_price.is_none() {
            tracing::warn!("No usable price for {}", ticker);
        }
        latest_price
    }

    fn fetch<P: MarketData + ?Sized>(provider: &P, ticker: &str, period: Period) -> Self {
        let latest_price = Self::fetch_price(provider, ticker);

        let history = provider.history(ticker, period);
        if history.is_none() {
            tracing::debug!("No {} history for {}", period, ticker);
        }

        Self {
            latest_price,
            history,
            info: provider.info(ticker),
        }
    }
}

/// Market data fetched once for a fixed set of tickers.
///
/// Each ticker is fetched independently and in parallel; a failed ticker
/// never aborts the others. The snapshot then serves as a [`MarketData`]
/// so every engine in one run reads the same numbers.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    period: Period,
    entries: BTreeMap<String, TickerData>,
}

impl MarketSnapshot {
    /// Fetch price, history and info for every ticker.
    ///
    /// Blocks until all fetches have settled. Callers that need a per-ticker
    /// timeout should enforce it inside their provider and return `None`.
    pub fn load<P>(provider: &P, tickers: &[String], period: Period) -> Self
    where
        P: MarketData + Sync + ?Sized,
    {
        tracing::debug!("Fetching market data for {} tickers", tickers.len());

        let entries: BTreeMap<String, TickerData> = tickers
            .par_iter()
            .map(|ticker| {
                let ticker = ticker.trim().to_uppercase();
                let data = TickerData::fetch(provider, &ticker, period);
                (ticker, data)
            })
            .collect();

        Self { period, entries }
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Fetch latest prices only; history and info stay empty.
    ///
    /// For callers such as rebalancing that never read history.
    pub fn load_prices<P>(provider: &P, tickers: &[String]) -> Self
    where
        P: MarketData + Sync + ?Sized,
    {
        tracing::debug!("Fetching latest prices for {} tickers", tickers.len());

        let entries: BTreeMap<String, TickerData> = tickers
            .par_iter()
            .map(|ticker| {
                let ticker = ticker.trim().to_uppercase();
                let data = TickerData {
                    latest_price: TickerData::fetch_price(provider, &ticker),
                    ..Default::default()
                };
                (ticker, data)
            })
            .collect();

        Self {
            period: Period::default(),
            entries,
        }
    }

    /// Tickers whose latest price could not be resolved, sorted.
    pub fn unresolved(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, data)| data.latest_price.is_none())
            .map(|(ticker, _)| ticker.clone())
            .collect()
    }

    fn entry(&self, ticker: &str) -> Option<&TickerData> {
        self.entries.get(&ticker.trim().to_uppercase())
    }
}

impl MarketData for MarketSnapshot {
    fn history(&self, ticker: &str, period: Period) -> Option<PriceSeries> {
        let history = self.entry(ticker)?.history.as_ref()?;
        if period == self.period {
            Some(history.clone())
        } else {
            Some(history.trailing(period)).filter(|s| !s.is_empty())
        }
    }

    fn latest_price(&self, ticker: &str) -> Option<f64> {
        self.entry(ticker)?.latest_price
    }

    fn info(&self, ticker: &str) -> Option<StockInfo> {
        self.entry(ticker)?.info.clone()
    }
}
