//! Rebalancing toward target weights.

use crate::types::{RebalancingRecommendation, TradeAction, Valuation};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Trades smaller than this many shares count as HOLD.
const SHARE_TOLERANCE: f64 = 1e-9;

/// Compute the trade that moves each position to its target weight.
///
/// With no `target_weights`, every valued position targets `1 / n`. Target
/// keys are matched case-insensitively; a valued position missing from the
/// targets gets a target of 0 (sell out). Targets for tickers that are not in
/// the valuation have no price to trade at and are ignored.
pub fn recommend_rebalancing(
    valuation: &Valuation,
    target_weights: Option<&BTreeMap<String, f64>>,
) -> Result<BTreeMap<String, RebalancingRecommendation>> {
    let targets: BTreeMap<String, f64> = match target_weights {
        Some(weights) => {
            let mut normalized = BTreeMap::new();
            for (ticker, &weight) in weights {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(Error::InvalidInput(format!(
                        "target weight for {} must be a non-negative number, got {}",
                        ticker, weight
                    )));
                }
                normalized.insert(ticker.trim().to_uppercase(), weight);
            }
            for ticker in normalized.keys() {
                if valuation.position(ticker).is_none() {
                    tracing::debug!("Ignoring target for {}: no valued position", ticker);
                }
            }
            normalized
        }
        None => {
            let equal = 1.0 / valuation.positions.len().max(1) as f64;
            valuation
                .positions
                .iter()
                .map(|p| (p.ticker.clone(), equal))
                .collect()
        }
    };

    let recommendations = valuation
        .positions
        .iter()
        .map(|position| {
            let target_weight = targets.get(&position.ticker).copied().unwrap_or(0.0);
            let difference = target_weight - position.weight;
            let dollar_difference = difference * valuation.total_value;
            let shares_to_trade = dollar_difference / position.current_price;

            let action = if shares_to_trade > SHARE_TOLERANCE {
                TradeAction::Buy
            } else if shares_to_trade < -SHARE_TOLERANCE {
                TradeAction::Sell
            } else {
                TradeAction::Hold
            };

            (
                position.ticker.clone(),
                RebalancingRecommendation {
                    current_weight: position.weight,
                    target_weight,
                    difference_pct: difference,
                    dollar_difference,
                    shares_to_trade,
                    action,
                },
            )
        })
        .collect();

    Ok(recommendations)
}

/// Recommendations worth showing: weight difference strictly above `threshold`.
///
/// This is a display policy; the full set from [`recommend_rebalancing`] is
/// unaffected.
pub fn actionable(
    recommendations: &BTreeMap<String, RebalancingRecommendation>,
    threshold: f64,
) -> BTreeMap<String, RebalancingRecommendation> {
    recommendations
        .iter()
        .filter(|(_, rec)| rec.difference_pct.abs() > threshold)
        .map(|(ticker, rec)| (ticker.clone(), rec.clone()))
        .collect()
}
