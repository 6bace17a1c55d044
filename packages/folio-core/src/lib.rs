//! Folio Core - Portfolio risk and allocation analytics.
//!
//! This crate turns a set of holdings plus historical price data into a
//! consolidated portfolio report:
//!
//! - **Valuation**: Position values, weights, and unrealized gain/loss
//! - **Risk metrics**: Volatility, Sharpe ratio, historical VaR, max drawdown, beta
//! - **Diversification**: Sector allocation and a bounded 0-10 score
//! - **Rebalancing**: Trade deltas toward target (default equal) weights
//! - **Explainer context**: Report fields flattened for a conversational assistant
//!
//! Market data is supplied by the caller through the [`market::MarketData`]
//! trait; the crate never talks to the network itself.
//!
//! # Example
//!
//! ```rust,no_run
//! use folio_core::market::StaticMarketData;
//! use folio_core::portfolio::generate_report;
//! use folio_core::{AnalysisConfig, Portfolio};
//!
//! let mut portfolio = Portfolio::new();
//! portfolio.add_holding("AAPL", 10.0, Some(150.0)).unwrap();
//! portfolio.add_holding("MSFT", 15.0, Some(300.0)).unwrap();
//!
//! let market = StaticMarketData::new()
//!     .with_price("AAPL", 160.0)
//!     .with_price("MSFT", 290.0);
//!
//! let report = generate_report(&portfolio, &market, &AnalysisConfig::default()).unwrap();
//! println!("Total value: ${:.2}", report.valuation.total_value);
//! ```

pub mod config;
pub mod explain;
pub mod market;
pub mod portfolio;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use config::{AnalysisConfig, DiversificationConfig, RebalanceConfig};
pub use explain::{ContextValue, Explainer, ReportContext};
pub use types::{
    ApiResponse, DiversificationReport, Holding, Period, Portfolio, PortfolioReport, Position,
    PriceBar, PriceSeries, RebalancingRecommendation, ReturnSeries, RiskLevel, RiskMetrics,
    StockInfo, TradeAction, Valuation,
};

// Re-export main functionality
pub use market::{CsvMarketData, MarketData, MarketSnapshot, StaticMarketData};
pub use portfolio::{
    actionable, analyze_diversification, assess_risk_level, beta, daily_returns,
    generate_report, max_drawdown, recommend_rebalancing, sharpe_ratio, value_at_risk,
    value_portfolio, volatility, weighted_portfolio_returns, HoldingsStore,
};

/// Error types for folio-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid holding: {0}")]
    InvalidHolding(String),

    #[error("Holding not found: {0}")]
    HoldingNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Empty portfolio: {0}")]
    EmptyPortfolio(String),

    #[error("Unresolved ticker: {0}")]
    UnresolvedTicker(String),
}

/// Result type for folio-core operations.
pub type Result<T> = std::result::Result<T, Error>;
