//! Sector allocation and diversification scoring.
//!
//! The score is a heuristic for retail display, not a calibrated risk
//! measure: it grows with holding and sector count and is knocked down by
//! concentration.

use crate::config::DiversificationConfig;
use crate::market::MarketData;
use crate::types::{DiversificationReport, Valuation};
use std::collections::BTreeMap;

/// Bucket name for positions without sector data (when bucketing is enabled).
pub const UNCLASSIFIED: &str = "Unclassified";

const MAX_SCORE: f64 = 10.0;
const POINTS_PER_HOLDING: f64 = 0.5;
const POINTS_PER_SECTOR: f64 = 1.5;
const TOP_POSITION_LIMIT: f64 = 0.40;
const TOP_POSITION_PENALTY: f64 = 2.0;
const TOP3_LIMIT: f64 = 0.70;
const TOP3_PENALTY: f64 = 1.0;

/// Summarize sector exposure and concentration of a valuation.
///
/// Positions whose sector cannot be resolved are left out of the allocation,
/// or collected under [`UNCLASSIFIED`] when `config.bucket_unclassified` is
/// set. The unclassified bucket never counts as a sector for scoring.
pub fn analyze_diversification<M>(
    valuation: &Valuation,
    market: &M,
    config: &DiversificationConfig,
) -> DiversificationReport
where
    M: MarketData + ?Sized,
{
    let mut sector_values: BTreeMap<String, f64> = BTreeMap::new();

    for position in &valuation.positions {
        let sector = market
            .info(&position.ticker)
            .and_then(|info| info.resolved_sector().map(str::to_string));

        let bucket = match sector {
            Some(sector) => sector,
            None if config.bucket_unclassified => UNCLASSIFIED.to_string(),
            None => {
                tracing::warn!("No sector for {}, leaving it out of allocation", position.ticker);
                continue;
            }
        };
        *sector_values.entry(bucket).or_insert(0.0) += position.position_value;
    }

    let sector_allocation: BTreeMap<String, f64> = sector_values
        .into_iter()
        .map(|(sector, value)| (sector, value / valuation.total_value))
        .collect();
    let num_sectors = sector_allocation
        .keys()
        .filter(|s| s.as_str() != UNCLASSIFIED)
        .count();

    let mut weights: Vec<f64> = valuation.positions.iter().map(|p| p.weight).collect();
    weights.sort_by(|a, b| b.total_cmp(a));
    let top_position_weight = weights.first().copied().unwrap_or(0.0);
    let top3_weight: f64 = weights.iter().take(3).sum();

    let num_holdings = valuation.positions.len();

    DiversificationReport {
        num_holdings,
        num_sectors,
        sector_allocation,
        top_position_weight,
        top3_weight,
        diversification_score: diversification_score(
            num_holdings,
            num_sectors,
            top_position_weight,
            top3_weight,
        ),
    }
}

/// Score in [0, 10], rounded to one decimal.
///
/// `min(10, 0.5 * holdings + 1.5 * sectors)`, minus 2 when the largest
/// position exceeds 40%, minus 1 when the three largest exceed 70%. The top-3
/// penalty only applies above three holdings, where it can say something the
/// holding count does not.
pub fn diversification_score(
    num_holdings: usize,
    num_sectors: usize,
    top_position_weight: f64,
    top3_weight: f64,
) -> f64 {
    let mut score = (num_holdings as f64 * POINTS_PER_HOLDING
        + num_sectors as f64 * POINTS_PER_SECTOR)
        .min(MAX_SCORE);

    if top_position_weight > TOP_POSITION_LIMIT {
        score -= TOP_POSITION_PENALTY;
    }
    if num_holdings > 3 && top3_weight > TOP3_LIMIT {
        score -= TOP3_PENALTY;
    }

    (score.max(0.0) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticMarketData;
    use crate::portfolio::value_portfolio;
    use crate::types::Holding;
    use approx::assert_relative_eq;

    fn valued(market: &StaticMarketData, holdings: &[(&str, f64)]) -> Valuation {
        let holdings: Vec<Holding> = holdings
            .iter()
            .map(|&(t, shares)| Holding::new(t, shares, None).unwrap())
            .collect();
        value_portfolio(&holdings, market).unwrap()
    }

    #[test]
    fn test_three_equal_positions_three_sectors() {
        let market = StaticMarketData::new()
            .with_price("AAPL", 100.0)
            .with_price("JPM", 100.0)
            .with_price("XOM", 100.0)
            .with_sector("AAPL", "Technology")
            .with_sector("JPM", "Financial Services")
            .with_sector("XOM", "Energy");
        let valuation = valued(&market, &[("AAPL", 10.0), ("JPM", 10.0), ("XOM", 10.0)]);

        let report = analyze_diversification(&valuation, &market, &DiversificationConfig::default());

        assert_eq!(report.num_holdings, 3);
        assert_eq!(report.num_sectors, 3);
        assert_eq!(report.diversification_score, 6.0);
        assert_relative_eq!(report.top_position_weight, 1.0 / 3.0);
        assert_relative_eq!(report.top3_weight, 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.sector_allocation["Energy"], 1.0 / 3.0);
    }

    #[test]
    fn test_sector_allocation_aggregates_value() {
        let market = StaticMarketData::new()
            .with_price("AAPL", 100.0)
            .with_price("MSFT", 100.0)
            .with_price("JPM", 200.0)
            .with_sector("AAPL", "Technology")
            .with_sector("MSFT", "Technology")
            .with_sector("JPM", "Financial Services");
        let valuation = valued(&market, &[("AAPL", 1.0), ("MSFT", 1.0), ("JPM", 1.0)]);

        let report = analyze_diversification(&valuation, &market, &DiversificationConfig::default());

        assert_eq!(report.num_sectors, 2);
        assert_relative_eq!(report.sector_allocation["Technology"], 0.5);
        assert_relative_eq!(report.sector_allocation["Financial Services"], 0.5);
    }

    #[test]
    fn test_unresolved_sector_skipped_or_bucketed() {
        let market = StaticMarketData::new()
            .with_price("AAPL", 100.0)
            .with_price("MYST", 100.0)
            .with_sector("AAPL", "Technology")
            .with_sector("MYST", "N/A");
        let valuation = valued(&market, &[("AAPL", 3.0), ("MYST", 1.0)]);

        let skipped = analyze_diversification(&valuation, &market, &DiversificationConfig::default());
        assert_eq!(skipped.num_sectors, 1);
        assert_eq!(skipped.sector_allocation.len(), 1);
        assert_relative_eq!(skipped.sector_allocation["Technology"], 0.75);

        let config = DiversificationConfig {
            bucket_unclassified: true,
        };
        let bucketed = analyze_diversification(&valuation, &market, &config);
        assert_eq!(bucketed.num_sectors, 1);
        assert_relative_eq!(bucketed.sector_allocation[UNCLASSIFIED], 0.25);
        assert_eq!(bucketed.diversification_score, skipped.diversification_score);
    }

    #[test]
    fn test_concentration_penalties() {
        let market = StaticMarketData::new()
            .with_price("A", 1.0)
            .with_price("B", 1.0)
            .with_price("C", 1.0)
            .with_price("D", 1.0)
            .with_price("E", 1.0)
            .with_sector("A", "Technology")
            .with_sector("B", "Technology")
            .with_sector("C", "Energy")
            .with_sector("D", "Energy")
            .with_sector("E", "Energy");
        let valuation = valued(
            &market,
            &[("A", 50.0), ("B", 20.0), ("C", 10.0), ("D", 10.0), ("E", 10.0)],
        );

        let report = analyze_diversification(&valuation, &market, &DiversificationConfig::default());

        // 5 * 0.5 + 2 * 1.5 = 5.5, -2 (top 50%), -1 (top 3 = 80%)
        assert_relative_eq!(report.top3_weight, 0.8, epsilon = 1e-12);
        assert_eq!(report.diversification_score, 2.5);
    }

    #[test]
    fn test_score_drops_by_two_when_top_position_crosses_limit() {
        let below = diversification_score(6, 3, 0.39, 0.6);
        let above = diversification_score(6, 3, 0.41, 0.6);
        assert_eq!(below, 7.5);
        assert_eq!(below - above, 2.0);
    }

    #[test]
    fn test_score_monotonic_in_sectors_and_capped() {
        let mut previous = 0.0;
        for sectors in 0..12 {
            let score = diversification_score(8, sectors, 0.2, 0.5);
            assert!(score >= previous);
            assert!(score <= 10.0);
            previous = score;
        }
        assert_eq!(diversification_score(30, 11, 0.05, 0.15), 10.0);
    }

    #[test]
    fn test_score_floors_at_zero() {
        assert_eq!(diversification_score(1, 0, 1.0, 1.0), 0.0);
        assert_eq!(diversification_score(1, 1, 1.0, 1.0), 0.0);
        assert_eq!(diversification_score(4, 0, 0.9, 1.0), 0.0);
    }
}
