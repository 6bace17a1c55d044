//! Core data types for Folio portfolio analytics.

use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A holding entered by the user: shares owned of one ticker.
///
/// Deserialization goes through [`Holding::new`], so a decoded holding is
/// always valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "HoldingRecord")]
pub struct Holding {
    /// Stock ticker symbol (uppercase)
    pub ticker: String,
    /// Number of shares owned
    pub shares: f64,
    /// Price paid per share (if known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
}

impl Holding {
    /// Create a validated holding. The ticker is trimmed and upper-cased.
    pub fn new(ticker: &str, shares: f64, purchase_price: Option<f64>) -> Result<Self> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(Error::InvalidHolding("ticker must not be empty".to_string()));
        }
        if !shares.is_finite() || shares <= 0.0 {
            return Err(Error::InvalidHolding(format!(
                "{}: shares must be positive, got {}",
                ticker, shares
            )));
        }
        if let Some(price) = purchase_price {
            if !price.is_finite() || price <= 0.0 {
                return Err(Error::InvalidHolding(format!(
                    "{}: purchase price must be positive, got {}",
                    ticker, price
                )));
            }
        }

        Ok(Self {
            ticker,
            shares,
            purchase_price,
        })
    }
}

/// Unvalidated wire form of a [`Holding`].
#[derive(Debug, Deserialize)]
struct HoldingRecord {
    ticker: String,
    shares: f64,
    #[serde(default)]
    purchase_price: Option<f64>,
}

impl TryFrom<HoldingRecord> for Holding {
    type Error = Error;

    fn try_from(record: HoldingRecord) -> Result<Self> {
        Holding::new(&record.ticker, record.shares, record.purchase_price)
    }
}

/// A caller-owned set of holdings, one per ticker.
///
/// Holdings can only enter through [`Portfolio::add_holding`] or
/// [`Portfolio::from_holdings`]; a decoded portfolio with a repeated ticker
/// is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(try_from = "PortfolioRecord")]
pub struct Portfolio {
    /// Holdings in insertion order
    holdings: Vec<Holding>,
    /// When the portfolio was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the portfolio was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PortfolioRecord {
    #[serde(default)]
    holdings: Vec<Holding>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PortfolioRecord> for Portfolio {
    type Error = Error;

    fn try_from(record: PortfolioRecord) -> Result<Self> {
        let mut portfolio = Portfolio::from_holdings(record.holdings)?;
        portfolio.created_at = record.created_at;
        portfolio.updated_at = record.updated_at;
        Ok(portfolio)
    }
}

impl Portfolio {
    /// Create a new empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a portfolio from holdings, rejecting a repeated ticker.
    pub fn from_holdings(holdings: impl IntoIterator<Item = Holding>) -> Result<Self> {
        let mut portfolio = Self::new();
        for holding in holdings {
            let (_, replaced) =
                portfolio.add_holding(&holding.ticker, holding.shares, holding.purchase_price)?;
            if replaced {
                return Err(Error::InvalidHolding(format!(
                    "duplicate ticker {}",
                    holding.ticker.trim().to_uppercase()
                )));
            }
        }
        Ok(portfolio)
    }

    /// Add a holding, replacing any existing holding for the same ticker.
    ///
    /// There is no share accumulation: the last write wins.
    /// Returns the stored holding and whether it replaced an existing one.
    pub fn add_holding(
        &mut self,
        ticker: &str,
        shares: f64,
        purchase_price: Option<f64>,
    ) -> Result<(Holding, bool)> {
        let holding = Holding::new(ticker, shares, purchase_price)?;

        if let Some(existing) = self
            .holdings
            .iter_mut()
            .find(|h| h.ticker == holding.ticker)
        {
            *existing = holding.clone();
            Ok((holding, true))
        } else {
            self.holdings.push(holding.clone());
            Ok((holding, false))
        }
    }

    /// Remove a holding by ticker.
    pub fn remove_holding(&mut self, ticker: &str) -> Result<Holding> {
        let ticker_upper = ticker.trim().to_uppercase();

        match self.holdings.iter().position(|h| h.ticker == ticker_upper) {
            Some(idx) => Ok(self.holdings.remove(idx)),
            None => Err(Error::HoldingNotFound(ticker_upper)),
        }
    }

    /// Find a holding by ticker (case-insensitive).
    pub fn find_holding(&self, ticker: &str) -> Option<&Holding> {
        let ticker_upper = ticker.trim().to_uppercase();
        self.holdings.iter().find(|h| h.ticker == ticker_upper)
    }

    /// Get all holdings.
    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Tickers of all holdings, in insertion order.
    pub fn tickers(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.ticker.clone()).collect()
    }

    /// Remove every holding.
    pub fn clear(&mut self) {
        self.holdings.clear();
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

/// Lookback period for historical data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    /// Short label, e.g. `"6mo"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }

    /// Calendar days covered by the period.
    pub fn days(&self) -> i64 {
        match self {
            Period::OneMonth => 30,
            Period::ThreeMonths => 91,
            Period::SixMonths => 182,
            Period::OneYear => 365,
            Period::TwoYears => 730,
            Period::FiveYears => 1826,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == label)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "unknown period '{}', expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y",
                    s
                ))
            })
    }
}

/// One daily OHLCV observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// A bar where every price field equals `close`.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Date-ordered price history for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Create a series, sorting bars by date.
    pub fn new(ticker: &str, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            ticker: ticker.to_uppercase(),
            bars,
        }
    }

    /// Build a series from `(date, close)` pairs.
    pub fn from_closes(ticker: &str, closes: &[(NaiveDate, f64)]) -> Self {
        let bars = closes
            .iter()
            .map(|&(date, close)| PriceBar::from_close(date, close))
            .collect();
        Self::new(ticker, bars)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Keep only the bars inside `period`, counted back from the last bar.
    pub fn trailing(&self, period: Period) -> Self {
        let Some(last) = self.bars.last() else {
            return self.clone();
        };
        let cutoff = last.date - Duration::days(period.days());

        Self {
            ticker: self.ticker.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date > cutoff)
                .copied()
                .collect(),
        }
    }
}

/// Dated simple returns. Each value is the return realized on its date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(Error::InvalidInput(format!(
                "return series has {} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        Ok(Self { dates, values })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(date, return)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }
}

/// Static reference data for a ticker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StockInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
}

impl StockInfo {
    pub fn with_sector(sector: &str) -> Self {
        Self {
            sector: Some(sector.to_string()),
            ..Default::default()
        }
    }

    /// The sector, unless missing, blank, or the provider's `N/A` placeholder.
    pub fn resolved_sector(&self) -> Option<&str> {
        self.sector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("n/a"))
    }
}

/// A valued position derived from a holding and its current price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Stock ticker symbol (uppercase)
    pub ticker: String,
    /// Number of shares owned
    pub shares: f64,
    /// Latest resolved market price
    pub current_price: f64,
    /// shares * current_price
    pub position_value: f64,
    /// Price paid per share (if known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    /// Unrealized gain/loss in dollars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_loss: Option<f64>,
    /// Unrealized gain/loss percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain_loss_pct: Option<f64>,
    /// Share of total portfolio value, in [0, 1]
    pub weight: f64,
}

/// Portfolio valuation over the positions whose price resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Valuation {
    pub total_value: f64,
    pub positions: Vec<Position>,
    /// Sum of unrealized gain/loss over positions with a purchase price
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_gain_loss: Option<f64>,
    /// `total_gain_loss` as a percentage of `total_value`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_gain_loss_pct: Option<f64>,
}

impl Valuation {
    /// Find a position by ticker (case-insensitive).
    pub fn position(&self, ticker: &str) -> Option<&Position> {
        let ticker_upper = ticker.trim().to_uppercase();
        self.positions.iter().find(|p| p.ticker == ticker_upper)
    }

    /// Position weights keyed by ticker.
    pub fn weights(&self) -> BTreeMap<String, f64> {
        self.positions
            .iter()
            .map(|p| (p.ticker.clone(), p.weight))
            .collect()
    }

    pub fn tickers(&self) -> Vec<String> {
        self.positions.iter().map(|p| p.ticker.clone()).collect()
    }
}

/// Coarse risk classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Medium => "Medium Risk",
            RiskLevel::High => "High Risk",
        };
        f.write_str(label)
    }
}

/// Risk metrics computed from the weighted portfolio return series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskMetrics {
    /// Mean daily return * 252
    pub annual_return: f64,
    /// Annualized volatility (decimal, e.g. 0.18 for 18%)
    pub volatility: f64,
    /// Annualized Sharpe ratio; `None` when volatility is zero
    pub sharpe_ratio: Option<f64>,
    /// Historical 95% VaR as a positive daily loss fraction
    pub var95: f64,
    /// Mean of returns at or below the 5% quantile, as a positive loss fraction
    pub cvar95: f64,
    /// Largest peak-to-trough decline (decimal)
    pub max_drawdown: f64,
    /// Beta against the configured benchmark
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    pub risk_level: RiskLevel,
    /// Number of aligned daily returns the metrics were computed from
    pub observations: usize,
}

/// Sector allocation and concentration summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiversificationReport {
    pub num_holdings: usize,
    pub num_sectors: usize,
    pub sector_allocation: BTreeMap<String, f64>,
    pub top_position_weight: f64,
    pub top3_weight: f64,
    /// Heuristic score in [0, 10], one decimal
    pub diversification_score: f64,
}

/// Trade direction for a rebalancing recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// Per-ticker trade needed to move from the current to the target weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RebalancingRecommendation {
    pub current_weight: f64,
    pub target_weight: f64,
    /// target_weight - current_weight
    pub difference_pct: f64,
    pub dollar_difference: f64,
    pub shares_to_trade: f64,
    pub action: TradeAction,
}

/// The consolidated analysis returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub valuation: Valuation,
    pub diversification: DiversificationReport,
    /// Absent when no usable return history was available
    pub risk_metrics: Option<RiskMetrics>,
    /// Tickers excluded because their price could not be resolved
    pub unresolved: Vec<String>,
}

/// API response wrapper used by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_holding_new_normalizes_ticker() {
        let holding = Holding::new("  aapl ", 10.0, Some(150.0)).unwrap();
        assert_eq!(holding.ticker, "AAPL");
        assert_eq!(holding.shares, 10.0);
        assert_eq!(holding.purchase_price, Some(150.0));
    }

    #[test]
    fn test_holding_rejects_invalid_values() {
        assert!(matches!(
            Holding::new("", 1.0, None),
            Err(Error::InvalidHolding(_))
        ));
        assert!(matches!(
            Holding::new("AAPL", 0.0, None),
            Err(Error::InvalidHolding(_))
        ));
        assert!(matches!(
            Holding::new("AAPL", 5.0, Some(-1.0)),
            Err(Error::InvalidHolding(_))
        ));
    }

    #[test]
    fn test_add_holding_last_write_wins() {
        let mut portfolio = Portfolio::new();
        let (_, replaced) = portfolio.add_holding("AAPL", 10.0, Some(150.0)).unwrap();
        assert!(!replaced);

        portfolio.add_holding("MSFT", 15.0, None).unwrap();
        let (holding, replaced) = portfolio.add_holding("aapl", 3.0, None).unwrap();

        assert!(replaced);
        assert_eq!(holding.shares, 3.0);
        assert_eq!(portfolio.len(), 2);
        // Replacement keeps the original slot and drops the old purchase price
        assert_eq!(portfolio.holdings()[0].ticker, "AAPL");
        assert_eq!(portfolio.holdings()[0].shares, 3.0);
        assert!(portfolio.holdings()[0].purchase_price.is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut portfolio = Portfolio::new();
        portfolio.add_holding("AAPL", 10.0, None).unwrap();
        portfolio.add_holding("GOOGL", 5.0, None).unwrap();

        let removed = portfolio.remove_holding("aapl").unwrap();
        assert_eq!(removed.ticker, "AAPL");
        assert!(portfolio.find_holding("AAPL").is_none());
        assert!(matches!(
            portfolio.remove_holding("TSLA"),
            Err(Error::HoldingNotFound(_))
        ));

        portfolio.clear();
        assert!(portfolio.is_empty());
    }

    #[test]
    fn test_decoded_holding_is_validated() {
        let holding: Holding =
            serde_json::from_str(r#"{"ticker": " msft ", "shares": 2}"#).unwrap();
        assert_eq!(holding.ticker, "MSFT");
        assert!(holding.purchase_price.is_none());

        let negative = serde_json::from_str::<Holding>(r#"{"ticker": "aapl", "shares": -5}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn test_decoded_portfolio_is_validated() {
        let bad_shares = serde_json::from_str::<Portfolio>(
            r#"{"holdings": [{"ticker": "aapl", "shares": -5}, {"ticker": "MSFT", "shares": 1}]}"#,
        );
        assert!(bad_shares.is_err());

        let duplicate = serde_json::from_str::<Portfolio>(
            r#"{"holdings": [{"ticker": "AAPL", "shares": 1}, {"ticker": "aapl", "shares": 2}]}"#,
        );
        assert!(duplicate.unwrap_err().to_string().contains("duplicate ticker AAPL"));

        let portfolio: Portfolio =
            serde_json::from_str(r#"{"holdings": [{"ticker": "nvda", "shares": 4}]}"#).unwrap();
        assert_eq!(portfolio.tickers(), vec!["NVDA"]);
    }

    #[test]
    fn test_from_holdings_rejects_duplicates() {
        let aapl = Holding::new("AAPL", 1.0, None).unwrap();
        let result = Portfolio::from_holdings(vec![aapl.clone(), aapl]);
        assert!(matches!(result, Err(Error::InvalidHolding(_))));
    }

    #[test]
    fn test_period_parse_and_display() {
        assert_eq!("6mo".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!("1Y".parse::<Period>().unwrap(), Period::OneYear);
        assert!("10y".parse::<Period>().is_err());
        assert_eq!(Period::FiveYears.to_string(), "5y");
        assert_eq!(Period::default(), Period::OneYear);

        let json = serde_json::to_string(&Period::ThreeMonths).unwrap();
        assert_eq!(json, "\"3mo\"");
    }

    #[test]
    fn test_price_series_sorted_and_trailing() {
        let series = PriceSeries::from_closes(
            "spy",
            &[
                (date(2024, 3, 1), 103.0),
                (date(2024, 1, 1), 101.0),
                (date(2024, 2, 15), 102.0),
            ],
        );
        assert_eq!(series.ticker, "SPY");
        assert_eq!(series.closes(), vec![101.0, 102.0, 103.0]);
        assert_eq!(series.last_close(), Some(103.0));

        let month = series.trailing(Period::OneMonth);
        assert_eq!(month.closes(), vec![102.0, 103.0]);
    }

    #[test]
    fn test_return_series_length_mismatch() {
        let result = ReturnSeries::new(vec![date(2024, 1, 2)], vec![0.01, 0.02]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_resolved_sector() {
        assert_eq!(
            StockInfo::with_sector("Technology").resolved_sector(),
            Some("Technology")
        );
        assert_eq!(StockInfo::with_sector("N/A").resolved_sector(), None);
        assert_eq!(StockInfo::with_sector("  ").resolved_sector(), None);
        assert_eq!(StockInfo::default().resolved_sector(), None);
    }

    #[test]
    fn test_trade_action_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&TradeAction::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&TradeAction::Hold).unwrap(), "\"HOLD\"");
        assert_eq!(RiskLevel::Medium.to_string(), "Medium Risk");
    }

    #[test]
    fn test_api_response() {
        let response: ApiResponse<String> = ApiResponse::ok("test".to_string());
        assert!(response.ok);
        assert_eq!(response.data, Some("test".to_string()));

        let err_response: ApiResponse<String> = ApiResponse::err("error");
        assert!(!err_response.ok);
        assert_eq!(err_response.error, Some("error".to_string()));
    }
}
