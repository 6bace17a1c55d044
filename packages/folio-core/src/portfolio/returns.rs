//! Price-to-return transforms.

use crate::types::{PriceSeries, ReturnSeries};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Simple returns `r[i] = p[i] / p[i-1] - 1`.
///
/// The first observation has no predecessor and is dropped, so the result is
/// one shorter than the input.
pub fn simple_returns(prices: &[f64]) -> Result<Vec<f64>> {
    if prices.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "need at least 2 prices to compute returns, got {}",
            prices.len()
        )));
    }

    if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
        return Err(Error::InvalidInput(format!(
            "prices must be positive to compute returns, got {}",
            bad
        )));
    }

    Ok(prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
}

/// Daily simple returns of a price series, dated by the later observation.
pub fn daily_returns(series: &PriceSeries) -> Result<ReturnSeries> {
    let values = simple_returns(&series.closes()).map_err(|e| match e {
        Error::InsufficientData(msg) => Error::InsufficientData(format!("{}: {}", series.ticker, msg)),
        other => other,
    })?;
    let dates = series.bars[1..].iter().map(|b| b.date).collect();
    ReturnSeries::new(dates, values)
}

/// Combine per-ticker returns into one weighted portfolio return series.
///
/// Series are aligned on the dates common to every contributing ticker (inner
/// join); then `r[t] = sum(weight[k] * r[k][t])`.
///
/// Tickers with a weight but no return series are skipped. Without
/// `renormalize` their weight is simply lost, so the effective weights can sum
/// to less than 1. With `renormalize` the remaining weights are rescaled to
/// sum to 1.
pub fn weighted_portfolio_returns(
    per_ticker: &BTreeMap<String, ReturnSeries>,
    weights: &BTreeMap<String, f64>,
    renormalize: bool,
) -> Result<ReturnSeries> {
    let mut contributing: Vec<(&str, f64, &ReturnSeries)> = weights
        .iter()
        .filter_map(|(ticker, &weight)| {
            per_ticker
                .get(ticker)
                .filter(|series| !series.is_empty())
                .map(|series| (ticker.as_str(), weight, series))
        })
        .collect();

    for ticker in weights.keys().filter(|t| !per_ticker.contains_key(*t)) {
        tracing::debug!("No return series for {}, skipping its weight", ticker);
    }

    if contributing.is_empty() {
        return Err(Error::InsufficientData(
            "no return series for any weighted ticker".to_string(),
        ));
    }

    if renormalize {
        let total: f64 = contributing.iter().map(|(_, w, _)| w).sum();
        if total > 0.0 {
            for entry in contributing.iter_mut() {
                entry.1 /= total;
            }
        }
    }

    let lookups: Vec<HashMap<NaiveDate, f64>> = contributing
        .iter()
        .map(|(_, _, series)| series.iter().collect())
        .collect();

    let mut common: BTreeSet<NaiveDate> = contributing[0].2.dates().iter().copied().collect();
    for lookup in &lookups[1..] {
        common.retain(|date| lookup.contains_key(date));
    }

    let values = common
        .iter()
        .map(|date| {
            contributing
                .iter()
                .zip(&lookups)
                .map(|((_, weight, _), lookup)| weight * lookup[date])
                .sum::<f64>()
        })
        .collect();

    ReturnSeries::new(common.into_iter().collect(), values)
}

/// Inner-join two return series on date.
pub(crate) fn align_pair(a: &ReturnSeries, b: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    let lookup: HashMap<NaiveDate, f64> = b.iter().collect();
    a.iter()
        .filter_map(|(date, ra)| lookup.get(&date).map(|&rb| (ra, rb)))
        .unzip()
}
