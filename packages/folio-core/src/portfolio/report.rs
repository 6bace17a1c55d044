//! Consolidated portfolio report.

use super::diversification::analyze_diversification;
use super::rebalance::recommend_rebalancing;
use super::returns::{daily_returns, weighted_portfolio_returns};
use super::risk::{beta, calculate_risk_metrics};
use super::valuation::value_portfolio;
use crate::config::AnalysisConfig;
use crate::market::{MarketData, MarketSnapshot};
use crate::types::{
    Portfolio, PortfolioReport, RebalancingRecommendation, ReturnSeries, RiskMetrics, Valuation,
};
use crate::{Error, Result};
use chrono::Utc;
use std::collections::BTreeMap;

/// Build the full report for a portfolio.
///
/// Market data for every holding (and the benchmark, if configured) is
/// fetched once up front, then valuation, diversification and risk metrics
/// are computed from that snapshot.
///
/// Fails only when valuation fails (`EmptyPortfolio`). Risk metrics are
/// `None` when no usable return history exists; valuation and
/// diversification are still reported.
pub fn generate_report<M>(
    portfolio: &Portfolio,
    market: &M,
    config: &AnalysisConfig,
) -> Result<PortfolioReport>
where
    M: MarketData + Sync + ?Sized,
{
    let mut tickers = portfolio.tickers();
    if let Some(benchmark) = config.benchmark_ticker() {
        if !tickers.contains(&benchmark) {
            tickers.push(benchmark);
        }
    }
    let snapshot = MarketSnapshot::load(market, &tickers, config.period);

    let valuation = value_portfolio(portfolio.holdings(), &snapshot)?;
    let diversification =
        analyze_diversification(&valuation, &snapshot, &config.diversification);

    let risk_metrics = match calculate_portfolio_risk(&valuation, &snapshot, config) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            tracing::warn!("Risk metrics unavailable: {}", e);
            None
        }
    };

    // The benchmark may be unresolved too; only held tickers are reported.
    let unresolved: Vec<String> = snapshot
        .unresolved()
        .into_iter()
        .filter(|ticker| portfolio.find_holding(ticker).is_some())
        .collect();

    tracing::info!(
        "Report ready: {} positions, total {:.2}, {} unresolved",
        valuation.positions.len(),
        valuation.total_value,
        unresolved.len()
    );

    Ok(PortfolioReport {
        generated_at: Utc::now(),
        period: config.period,
        valuation,
        diversification,
        risk_metrics,
        unresolved,
    })
}

/// Risk metrics of the value-weighted portfolio return series.
///
/// Each position's history becomes a return series; positions without
/// enough history are skipped. The weighted series is built once and every
/// metric is read from it, never averaged across assets.
pub fn calculate_portfolio_risk<M>(
    valuation: &Valuation,
    market: &M,
    config: &AnalysisConfig,
) -> Result<RiskMetrics>
where
    M: MarketData + ?Sized,
{
    let mut per_ticker: BTreeMap<String, ReturnSeries> = BTreeMap::new();
    for position in &valuation.positions {
        let Some(history) = market.history(&position.ticker, config.period) else {
            continue;
        };
        match daily_returns(&history) {
            Ok(returns) => {
                per_ticker.insert(position.ticker.clone(), returns);
            }
            Err(e) => tracing::debug!("Skipping {} returns: {}", position.ticker, e),
        }
    }

    if per_ticker.is_empty() {
        return Err(Error::InsufficientData(
            "no return history loaded for any position".to_string(),
        ));
    }

    let portfolio_returns = weighted_portfolio_returns(
        &per_ticker,
        &valuation.weights(),
        config.renormalize_after_exclusion,
    )?;
    let mut metrics = calculate_risk_metrics(portfolio_returns.values(), config.risk_free_rate)?;

    if let Some(benchmark) = config.benchmark_ticker() {
        metrics.beta = market
            .history(&benchmark, config.period)
            .and_then(|history| daily_returns(&history).ok())
            .and_then(|benchmark_returns| beta(&portfolio_returns, &benchmark_returns));
        if metrics.beta.is_none() {
            tracing::warn!("Beta against {} unavailable", benchmark);
        }
    }

    Ok(metrics)
}

/// Value a portfolio and recommend trades toward `target_weights`
/// (equal weight when `None`).
///
/// Only latest prices are fetched. Holdings without a price are left out of
/// the valuation, so equal weights are split among the priced holdings.
pub fn rebalance_portfolio<M>(
    portfolio: &Portfolio,
    market: &M,
    target_weights: Option<&BTreeMap<String, f64>>,
) -> Result<BTreeMap<String, RebalancingRecommendation>>
where
    M: MarketData + Sync + ?Sized,
{
    let snapshot = MarketSnapshot::load_prices(market, &portfolio.tickers());
    let valuation = value_portfolio(portfolio.holdings(), &snapshot)?;
    recommend_rebalancing(&valuation, target_weights)
}
