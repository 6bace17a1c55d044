//! Portfolio risk metrics calculation.
//!
//! Provides volatility, Sharpe ratio, historical VaR/CVaR, max drawdown, beta,
//! and a coarse risk classification. All inputs are daily simple returns;
//! annualization uses 252 trading days.

use super::returns::{align_pair, simple_returns};
use crate::stats::{mean, percentile, sample_covariance, sample_std, sample_variance};
use crate::types::{ReturnSeries, RiskLevel, RiskMetrics};
use crate::{Error, Result};

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Confidence level of the VaR/CVaR fields in [`RiskMetrics`].
pub const REPORT_CONFIDENCE: f64 = 0.95;

/// Calculate risk metrics for one (portfolio) return series.
///
/// # Arguments
///
/// * `returns` - Daily returns (e.g., 0.01 for a 1% day)
/// * `risk_free_rate` - Annual risk-free rate (e.g., 0.04 for 4%)
///
/// # Returns
///
/// `RiskMetrics` without beta, or `InsufficientData` with fewer than 2 returns.
pub fn calculate_risk_metrics(returns: &[f64], risk_free_rate: f64) -> Result<RiskMetrics> {
    if returns.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "need at least 2 returns for risk metrics, got {}",
            returns.len()
        )));
    }

    let annual_return = mean(returns)? * TRADING_DAYS;
    let volatility = volatility(returns, true)?;
    let sharpe_ratio = sharpe_ratio(returns, risk_free_rate, true)?;
    let risk_level = assess_risk_level(sharpe_ratio, volatility);

    Ok(RiskMetrics {
        annual_return,
        volatility,
        sharpe_ratio,
        var95: value_at_risk(returns, REPORT_CONFIDENCE)?,
        cvar95: conditional_var(returns, REPORT_CONFIDENCE)?,
        max_drawdown: max_drawdown(returns),
        beta: None,
        risk_level,
        observations: returns.len(),
    })
}

/// Sample standard deviation of returns, optionally annualized by sqrt(252).
pub fn volatility(returns: &[f64], annualize: bool) -> Result<f64> {
    let std = sample_std(returns)?;
    Ok(if annualize {
        std * TRADING_DAYS.sqrt()
    } else {
        std
    })
}

/// Calculate the Sharpe ratio from returns.
///
/// # Arguments
///
/// * `returns` - Daily returns
/// * `risk_free_rate` - Risk-free rate in the same units as the result
///   (annual when `annualize` is true)
/// * `annualize` - Scale mean by 252 and std by sqrt(252)
///
/// # Returns
///
/// `Ok(None)` when the returns have zero variance (e.g. a constant price)
/// or a non-finite one: the ratio is undefined there, not zero or infinite.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, annualize: bool) -> Result<Option<f64>> {
    let mut mean_return = mean(returns)?;
    let mut std_return = sample_std(returns)?;

    if !std_return.is_finite() || std_return <= f64::EPSILON {
        return Ok(None);
    }

    if annualize {
        mean_return *= TRADING_DAYS;
        std_return *= TRADING_DAYS.sqrt();
    }

    Ok(Some((mean_return - risk_free_rate) / std_return))
}

fn check_confidence(confidence: f64) -> Result<()> {
    if confidence <= 0.0 || confidence >= 1.0 {
        return Err(Error::InvalidInput(format!(
            "confidence level must be between 0 and 1, got {}",
            confidence
        )));
    }
    Ok(())
}

/// Historical Value at Risk.
///
/// The `(1 - confidence)` quantile of the empirical return distribution
/// (linear interpolation), reported as a positive loss magnitude.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Result<f64> {
    check_confidence(confidence)?;
    Ok(percentile(returns, 1.0 - confidence)?.abs())
}

/// Historical Conditional VaR (expected shortfall).
///
/// Mean of the returns at or below the VaR quantile, as a positive magnitude.
pub fn conditional_var(returns: &[f64], confidence: f64) -> Result<f64> {
    check_confidence(confidence)?;
    let cutoff = percentile(returns, 1.0 - confidence)?;

    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= cutoff).collect();
    if tail.is_empty() {
        // Interpolated cutoff can sit below every observation only by rounding
        return Ok(cutoff.abs());
    }
    Ok(mean(&tail)?.abs())
}

/// Calculate maximum drawdown from a series of returns.
///
/// Builds the growth index `C[t] = prod(1 + r[i])`, tracks its running peak,
/// and returns the deepest `(peak - C) / peak` as a decimal (0.15 for 15%).
/// Never negative; 0 for an empty or never-declining path.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut running_max = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0;

    for r in returns {
        cumulative *= 1.0 + r;
        if cumulative > running_max {
            running_max = cumulative;
        }
        let drawdown = (running_max - cumulative) / running_max;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }

    max_drawdown
}

/// Maximum drawdown of a price path, via its simple returns.
pub fn max_drawdown_from_prices(prices: &[f64]) -> Result<f64> {
    Ok(max_drawdown(&simple_returns(prices)?))
}

/// Classify risk from the annualized Sharpe ratio and volatility.
///
/// | Level  | Sharpe | Volatility |
/// |--------|--------|------------|
/// | Low    | > 1.0  | < 20%      |
/// | Medium | > 0.5  | < 30%      |
/// | High   | otherwise           |
///
/// An undefined Sharpe ratio never qualifies for Low or Medium.
pub fn assess_risk_level(sharpe: Option<f64>, volatility: f64) -> RiskLevel {
    match sharpe {
        Some(s) if s > 1.0 && volatility < 0.20 => RiskLevel::Low,
        Some(s) if s > 0.5 && volatility < 0.30 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Beta of an asset against a market, over the dates both series share.
///
/// Returns `None` with fewer than 2 shared dates or a flat market.
pub fn beta(asset: &ReturnSeries, market: &ReturnSeries) -> Option<f64> {
    let (asset_returns, market_returns) = align_pair(asset, market);
    if asset_returns.len() < 2 {
        return None;
    }

    let covariance = sample_covariance(&asset_returns, &market_returns).ok()?;
    let market_variance = sample_variance(&market_returns).ok()?;
    if market_variance <= 0.0 {
        return None;
    }

    Some(covariance / market_variance)
}
