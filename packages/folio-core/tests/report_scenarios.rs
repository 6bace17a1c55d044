//! End-to-end report scenarios through the public API.

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use folio_core::explain::ReportContext;
use folio_core::portfolio::rebalance_portfolio;
use folio_core::{
    generate_report, AnalysisConfig, CsvMarketData, Error, Portfolio, PriceSeries, RiskLevel,
    StaticMarketData, TradeAction,
};
use std::fs;
use tempfile::tempdir;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// Daily closes compounding a repeating return pattern.
fn series(ticker: &str, first: f64, pattern: &[f64], days: usize) -> PriceSeries {
    let mut closes = Vec::with_capacity(days);
    let mut price = first;
    for i in 0..days {
        closes.push((start() + Duration::days(i as i64), price));
        price *= 1.0 + pattern[i % pattern.len()];
    }
    PriceSeries::from_closes(ticker, &closes)
}

fn portfolio(entries: &[(&str, f64, Option<f64>)]) -> Portfolio {
    let mut portfolio = Portfolio::new();
    for &(ticker, shares, price) in entries {
        portfolio.add_holding(ticker, shares, price).unwrap();
    }
    portfolio
}

#[test]
fn valuation_of_two_holdings() {
    let market = StaticMarketData::new()
        .with_price("AAPL", 160.0)
        .with_price("MSFT", 290.0);
    let holdings = portfolio(&[("AAPL", 10.0, Some(150.0)), ("MSFT", 15.0, Some(300.0))]);

    let report = generate_report(&holdings, &market, &AnalysisConfig::default()).unwrap();
    let valuation = &report.valuation;

    assert_eq!(valuation.total_value, 5950.0);
    assert_eq!(valuation.position("AAPL").unwrap().position_value, 1600.0);
    assert_eq!(valuation.position("MSFT").unwrap().position_value, 4350.0);
    assert_relative_eq!(valuation.position("AAPL").unwrap().weight, 0.2689, epsilon = 1e-4);
    assert_eq!(valuation.position("AAPL").unwrap().gain_loss, Some(100.0));
    assert_eq!(valuation.position("MSFT").unwrap().gain_loss, Some(-150.0));
    assert_eq!(valuation.total_gain_loss, Some(-50.0));
    assert_relative_eq!(valuation.total_gain_loss_pct.unwrap(), -0.8403, epsilon = 1e-4);
}

#[test]
fn three_equal_positions_in_three_sectors_score_six() {
    let market = StaticMarketData::new()
        .with_price("AAPL", 50.0)
        .with_price("JPM", 50.0)
        .with_price("XOM", 50.0)
        .with_sector("AAPL", "Technology")
        .with_sector("JPM", "Financial Services")
        .with_sector("XOM", "Energy");
    let holdings = portfolio(&[("AAPL", 4.0, None), ("JPM", 4.0, None), ("XOM", 4.0, None)]);

    let report = generate_report(&holdings, &market, &AnalysisConfig::default()).unwrap();

    assert_eq!(report.diversification.num_holdings, 3);
    assert_eq!(report.diversification.num_sectors, 3);
    assert_eq!(report.diversification.diversification_score, 6.0);
}

#[test]
fn failed_ticker_is_excluded_not_fatal() {
    let market = StaticMarketData::new()
        .with_history(series("AAPL", 180.0, &[0.01, -0.005, 0.003], 40))
        .with_history(series("MSFT", 400.0, &[-0.004, 0.006], 40));
    let holdings = portfolio(&[
        ("AAPL", 10.0, None),
        ("DELISTED", 500.0, Some(1.0)),
        ("MSFT", 5.0, None),
    ]);

    let report = generate_report(&holdings, &market, &AnalysisConfig::default()).unwrap();

    assert_eq!(report.unresolved, vec!["DELISTED"]);
    assert_eq!(report.valuation.positions.len(), 2);
    let weight_sum: f64 = report.valuation.positions.iter().map(|p| p.weight).sum();
    assert!((weight_sum - 1.0).abs() < 1e-9);
    assert_eq!(report.diversification.num_holdings, 2);

    let metrics = report.risk_metrics.expect("risk metrics from remaining holdings");
    assert_eq!(metrics.observations, 39);
}

#[test]
fn nothing_resolves_is_an_empty_portfolio() {
    let market = StaticMarketData::new();
    let holdings = portfolio(&[("GONE", 1.0, None)]);

    let result = generate_report(&holdings, &market, &AnalysisConfig::default());
    assert!(matches!(result, Err(Error::EmptyPortfolio(_))));
}

#[test]
fn constant_prices_have_undefined_sharpe() {
    let market = StaticMarketData::new().with_history(series("BOND", 100.0, &[0.0], 30));
    let holdings = portfolio(&[("BOND", 50.0, Some(100.0))]);

    let report = generate_report(&holdings, &market, &AnalysisConfig::default()).unwrap();
    let metrics = report.risk_metrics.as_ref().unwrap();

    assert_eq!(metrics.volatility, 0.0);
    assert_eq!(metrics.sharpe_ratio, None);
    assert_eq!(metrics.max_drawdown, 0.0);
    assert_eq!(metrics.risk_level, RiskLevel::High);

    let context = ReportContext::from_report(&report);
    assert_eq!(context.get("sharpe_ratio").unwrap().to_string(), "undefined");
}

#[test]
fn equal_value_holdings_need_no_trades() {
    let market = StaticMarketData::new()
        .with_price("A", 25.0)
        .with_price("B", 50.0)
        .with_price("C", 100.0)
        .with_price("D", 10.0);
    let holdings = portfolio(&[("A", 40.0, None), ("B", 20.0, None), ("C", 10.0, None), ("D", 100.0, None)]);

    let recs = rebalance_portfolio(&holdings, &market, None).unwrap();

    assert_eq!(recs.len(), 4);
    for rec in recs.values() {
        assert_eq!(rec.target_weight, 0.25);
        assert_eq!(rec.action, TradeAction::Hold);
    }
}

#[test]
fn report_from_csv_directory() {
    let dir = tempdir().unwrap();
    let mut aapl = String::from("Date,Open,High,Low,Close,Volume\n");
    let mut xom = String::from("date,close\n");
    for i in 0..60 {
        let date = start() + Duration::days(i);
        let a = 150.0 + (i % 7) as f64 - (i % 3) as f64 * 0.5 + i as f64 * 0.2;
        let x = 110.0 - (i % 5) as f64 + (i % 2) as f64 * 0.75;
        aapl.push_str(&format!("{},{a},{a},{a},{a},1000\n", date));
        xom.push_str(&format!("{},{x}\n", date));
    }
    fs::write(dir.path().join("AAPL.csv"), aapl).unwrap();
    fs::write(dir.path().join("XOM.csv"), xom).unwrap();
    fs::write(
        dir.path().join("info.csv"),
        "ticker,name,sector\nAAPL,Apple Inc.,Technology\nXOM,Exxon Mobil,Energy\n",
    )
    .unwrap();

    let market = CsvMarketData::open(dir.path()).unwrap();
    let holdings = portfolio(&[("AAPL", 10.0, Some(140.0)), ("xom", 20.0, None), ("NOFILE", 3.0, None)]);

    let report = generate_report(&holdings, &market, &AnalysisConfig::default()).unwrap();

    assert_eq!(report.unresolved, vec!["NOFILE"]);
    assert_eq!(report.diversification.num_sectors, 2);
    let allocation: f64 = report.diversification.sector_allocation.values().sum();
    assert_relative_eq!(allocation, 1.0, epsilon = 1e-9);

    let metrics = report.risk_metrics.as_ref().unwrap();
    assert_eq!(metrics.observations, 59);
    assert!(metrics.volatility > 0.0);
    assert!(metrics.var95 >= 0.0);
    assert!(metrics.cvar95 >= metrics.var95);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["period"], "1y");
    assert_eq!(json["risk_metrics"]["observations"], 59);
    assert!(json["risk_metrics"]["risk_level"].is_string());
}

#[test]
fn rebalance_splits_equal_weight_among_priced_holdings() {
    let market = StaticMarketData::new()
        .with_price("AAPL", 100.0)
        .with_price("MSFT", 200.0);
    let holdings = portfolio(&[("AAPL", 30.0, None), ("MSFT", 5.0, None), ("DELISTED", 10.0, None)]);

    let recs = rebalance_portfolio(&holdings, &market, None).unwrap();

    assert_eq!(recs.len(), 2);
    assert!(!recs.contains_key("DELISTED"));
    assert_eq!(recs["AAPL"].target_weight, 0.5);
    assert_eq!(recs["MSFT"].target_weight, 0.5);
    assert_eq!(recs["AAPL"].action, TradeAction::Sell);
    assert_eq!(recs["MSFT"].action, TradeAction::Buy);
}
