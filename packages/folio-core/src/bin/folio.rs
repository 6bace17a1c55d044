//! Folio CLI - portfolio report and rebalancing from local price files.
//!
//! Every command prints a JSON `ApiResponse` on stdout; logs go to stderr.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use folio_core::explain::{system_prompt, ReportContext};
use folio_core::portfolio::{actionable, generate_report, rebalance_portfolio, HoldingsStore};
use folio_core::{AnalysisConfig, ApiResponse, CsvMarketData, Period};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Portfolio risk, diversification and rebalancing")]
#[command(version)]
struct Cli {
    /// Analysis config file (defaults to $FOLIO_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Holdings file (defaults to $FOLIO_HOLDINGS_FILE or the platform data dir)
    #[arg(long, global = true)]
    holdings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the holdings book
    Holdings {
        #[command(subcommand)]
        action: HoldingsAction,
    },
    /// Full portfolio report
    Report {
        /// Directory with <TICKER>.csv price files and optional info.csv
        #[arg(short, long)]
        data_dir: PathBuf,
        /// History window (1mo, 3mo, 6mo, 1y, 2y, 5y)
        #[arg(short, long)]
        period: Option<Period>,
    },
    /// Trades toward target weights (equal weight by default)
    Rebalance {
        /// Directory with <TICKER>.csv price files
        #[arg(short, long)]
        data_dir: PathBuf,
        /// Target weight, repeatable (e.g. --target AAPL=0.6)
        #[arg(short, long = "target", value_parser = parse_target)]
        targets: Vec<(String, f64)>,
        /// Include recommendations below the noise threshold
        #[arg(long)]
        all: bool,
    },
    /// Report fields and system prompt for a conversational explainer
    Context {
        /// Directory with <TICKER>.csv price files and optional info.csv
        #[arg(short, long)]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum HoldingsAction {
    /// List all holdings
    List,
    /// Add or replace a holding
    Add {
        /// Ticker symbol
        ticker: String,
        /// Number of shares
        #[arg(short = 'n', long)]
        shares: f64,
        /// Purchase price per share
        #[arg(short, long)]
        price: Option<f64>,
    },
    /// Remove a holding
    Remove {
        /// Ticker symbol
        ticker: String,
    },
    /// Remove every holding
    Clear,
}

fn parse_target(s: &str) -> Result<(String, f64), String> {
    let (ticker, weight) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TICKER=WEIGHT, got '{}'", s))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight in '{}'", s))?;
    Ok((ticker.trim().to_uppercase(), weight))
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(data) => {
            println!("{}", render(&ApiResponse::ok(data)));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", render(&ApiResponse::<()>::err(format!("{:#}", e))));
            ExitCode::FAILURE
        }
    }
}

fn render<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response)
        .unwrap_or_else(|e| format!(r#"{{"ok": false, "error": "serialization failed: {}"}}"#, e))
}

fn run(cli: Cli) -> anyhow::Result<serde_json::Value> {
    let config_path = cli.config.unwrap_or_else(AnalysisConfig::default_path);
    let holdings_path = cli.holdings.unwrap_or_else(HoldingsStore::default_path);

    match cli.command {
        Commands::Holdings { action } => handle_holdings(action, holdings_path),
        Commands::Report { data_dir, period } => {
            let mut config = load_config(&config_path)?;
            if let Some(period) = period {
                config.period = period;
            }
            handle_report(&data_dir, holdings_path, &config)
        }
        Commands::Rebalance {
            data_dir,
            targets,
            all,
        } => {
            let config = load_config(&config_path)?;
            handle_rebalance(&data_dir, holdings_path, &config, targets, all)
        }
        Commands::Context { data_dir } => {
            let config = load_config(&config_path)?;
            handle_context(&data_dir, holdings_path, &config)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<AnalysisConfig> {
    AnalysisConfig::load_from_path(path)
        .with_context(|| format!("loading config from {}", path.display()))
}

fn open_store(path: PathBuf) -> anyhow::Result<HoldingsStore> {
    let display = path.display().to_string();
    HoldingsStore::with_path(path).with_context(|| format!("opening holdings at {}", display))
}

fn handle_holdings(action: HoldingsAction, path: PathBuf) -> anyhow::Result<serde_json::Value> {
    let mut store = open_store(path)?;

    match action {
        HoldingsAction::List => Ok(json!({
            "holdings": store.get().holdings(),
            "count": store.get().len(),
            "updated_at": store.get().updated_at,
        })),
        HoldingsAction::Add {
            ticker,
            shares,
            price,
        } => {
            let (holding, replaced) = store.get_mut().add_holding(&ticker, shares, price)?;
            store.save()?;
            Ok(json!({
                "holding": holding,
                "action": if replaced { "replaced" } else { "added" },
            }))
        }
        HoldingsAction::Remove { ticker } => {
            let removed = store.get_mut().remove_holding(&ticker)?;
            store.save()?;
            Ok(json!({ "removed": removed }))
        }
        HoldingsAction::Clear => {
            let count = store.get().len();
            store.get_mut().clear();
            store.save()?;
            Ok(json!({ "cleared": count }))
        }
    }
}

fn handle_report(
    data_dir: &Path,
    holdings_path: PathBuf,
    config: &AnalysisConfig,
) -> anyhow::Result<serde_json::Value> {
    let store = open_store(holdings_path)?;
    let market = CsvMarketData::open(data_dir)?;
    let report = generate_report(store.get(), &market, config)?;
    Ok(serde_json::to_value(report)?)
}

fn handle_rebalance(
    data_dir: &Path,
    holdings_path: PathBuf,
    config: &AnalysisConfig,
    targets: Vec<(String, f64)>,
    all: bool,
) -> anyhow::Result<serde_json::Value> {
    let store = open_store(holdings_path)?;
    let market = CsvMarketData::open(data_dir)?;

    let targets: BTreeMap<String, f64> = targets.into_iter().collect();
    let target_weights = if targets.is_empty() {
        None
    } else {
        let sum: f64 = targets.values().sum();
        if (sum - 1.0).abs() > 1e-6 {
            tracing::warn!("Target weights sum to {:.4}, not 1", sum);
        }
        Some(&targets)
    };

    let recommendations = rebalance_portfolio(store.get(), &market, target_weights)?;
    let total = recommendations.len();
    let shown = if all {
        recommendations
    } else {
        actionable(&recommendations, config.rebalance.noise_threshold)
    };

    Ok(json!({
        "recommendations": shown,
        "hidden": total - shown.len(),
        "noise_threshold": if all { 0.0 } else { config.rebalance.noise_threshold },
    }))
}

fn handle_context(
    data_dir: &Path,
    holdings_path: PathBuf,
    config: &AnalysisConfig,
) -> anyhow::Result<serde_json::Value> {
    let store = open_store(holdings_path)?;
    if store.get().is_empty() {
        return Err(anyhow!("no holdings; add some with `folio holdings add`"));
    }
    let market = CsvMarketData::open(data_dir)?;
    let report = generate_report(store.get(), &market, config)?;
    let context = ReportContext::from_report(&report);

    Ok(json!({
        "context": context,
        "system_prompt": system_prompt(Some(&context)),
    }))
}
