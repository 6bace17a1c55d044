//! Portfolio analytics.
//!
//! Valuation, return aggregation, risk metrics, diversification scoring and
//! rebalancing, plus the report that ties them together.

mod diversification;
mod rebalance;
mod report;
mod returns;
mod risk;
mod store;
mod valuation;

pub use diversification::{analyze_diversification, diversification_score, UNCLASSIFIED};
pub use rebalance::{actionable, recommend_rebalancing};
pub use report::{calculate_portfolio_risk, generate_report, rebalance_portfolio};
pub use returns::{daily_returns, simple_returns, weighted_portfolio_returns};
pub use risk::{
    assess_risk_level, beta, calculate_risk_metrics, conditional_var, max_drawdown,
    max_drawdown_from_prices, sharpe_ratio, value_at_risk, volatility, REPORT_CONFIDENCE,
    TRADING_DAYS,
};
pub use store::HoldingsStore;
pub use valuation::value_portfolio;
