//! Position valuation and weights.

use crate::market::MarketData;
use crate::types::{Holding, Position, Valuation};
use crate::{Error, Result};
use std::collections::BTreeSet;

/// Value every holding at its latest price.
///
/// Holdings whose price cannot be resolved are left out entirely: they get no
/// position and add nothing to the total, so the remaining weights still sum
/// to 1. Fails with `EmptyPortfolio` when there are no holdings or none of
/// them resolve, and with `InvalidHolding` for an invalid or repeated one.
pub fn value_portfolio<M>(holdings: &[Holding], market: &M) -> Result<Valuation>
where
    M: MarketData + ?Sized,
{
    if holdings.is_empty() {
        return Err(Error::EmptyPortfolio("no holdings".to_string()));
    }
    let holdings = checked_holdings(holdings)?;

    let mut positions = Vec::with_capacity(holdings.len());
    let mut total_value = 0.0;

    for holding in &holdings {
        let current_price = match market
            .latest_price(&holding.ticker)
            .filter(|p| p.is_finite() && *p > 0.0)
        {
            Some(price) => price,
            None => {
                tracing::warn!("Excluding {}: price unavailable", holding.ticker);
                continue;
            }
        };

        let position_value = holding.shares * current_price;
        total_value += position_value;

        let gain_loss = holding
            .purchase_price
            .map(|purchase| (current_price - purchase) * holding.shares);
        let gain_loss_pct = holding
            .purchase_price
            .map(|purchase| (current_price / purchase - 1.0) * 100.0);

        positions.push(Position {
            ticker: holding.ticker.clone(),
            shares: holding.shares,
            current_price,
            position_value,
            purchase_price: holding.purchase_price,
            gain_loss,
            gain_loss_pct,
            weight: 0.0,
        });
    }

    if positions.is_empty() || total_value <= 0.0 {
        return Err(Error::EmptyPortfolio(format!(
            "none of {} holdings resolved to a price",
            holdings.len()
        )));
    }

    for position in positions.iter_mut() {
        position.weight = position.position_value / total_value;
    }

    let total_gain_loss = positions
        .iter()
        .filter_map(|p| p.gain_loss)
        .reduce(|a, b| a + b);
    let total_gain_loss_pct = total_gain_loss.map(|gain| gain / total_value * 100.0);

    tracing::debug!(
        "Valued {} of {} holdings at {:.2}",
        positions.len(),
        holdings.len(),
        total_value
    );

    Ok(Valuation {
        total_value,
        positions,
        total_gain_loss,
        total_gain_loss_pct,
    })
}

/// Re-validate holdings (their fields are public) and reject repeated tickers.
fn checked_holdings(holdings: &[Holding]) -> Result<Vec<Holding>> {
    let mut seen = BTreeSet::new();
    holdings
        .iter()
        .map(|h| {
            let holding = Holding::new(&h.ticker, h.shares, h.purchase_price)?;
            if !seen.insert(holding.ticker.clone()) {
                return Err(Error::InvalidHolding(format!(
                    "duplicate ticker {}",
                    holding.ticker
                )));
            }
            Ok(holding)
        })
        .collect()
}
