//! Context handed to a conversational explainer.
//!
//! The crate does not ship a language-model client. It flattens a
//! [`PortfolioReport`] into a small key/value map and renders the system
//! prompt; an [`Explainer`] implementation owns the actual conversation.

use crate::types::PortfolioReport;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single context value: free text or a number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ContextValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Text(text) => write!(f, "{}", text),
            ContextValue::Number(value) => write!(f, "{}", (value * 1e4).round() / 1e4),
        }
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<usize> for ContextValue {
    fn from(value: usize) -> Self {
        ContextValue::Number(value as f64)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Text(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Text(value)
    }
}

/// Flattened report fields, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ReportContext(BTreeMap<String, ContextValue>);

impl ReportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the headline fields out of a report.
    ///
    /// Risk fields are only present when the report has risk metrics, and
    /// `total_gain_loss` only when some position has a cost basis. An
    /// undefined Sharpe ratio is passed as the text `"undefined"`.
    pub fn from_report(report: &PortfolioReport) -> Self {
        let mut context = Self::new();
        context.insert("total_value", report.valuation.total_value);
        if let Some(gain_loss) = report.valuation.total_gain_loss {
            context.insert("total_gain_loss", gain_loss);
        }
        context.insert("num_holdings", report.diversification.num_holdings);
        context.insert(
            "diversification_score",
            report.diversification.diversification_score,
        );

        if let Some(metrics) = &report.risk_metrics {
            context.insert("risk_level", metrics.risk_level.to_string());
            match metrics.sharpe_ratio {
                Some(sharpe) => context.insert("sharpe_ratio", sharpe),
                None => context.insert("sharpe_ratio", "undefined"),
            }
            context.insert("volatility", metrics.volatility);
            context.insert("annual_return", metrics.annual_return);
            context.insert("max_drawdown", metrics.max_drawdown);
        }

        context
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ContextValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.0.iter()
    }

    fn number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(ContextValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    fn text_or(&self, key: &str, fallback: &str) -> String {
        self.get(key)
            .map(ToString::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }
}

const PREAMBLE: &str = "You are a financial advisor assistant helping retail investors \
understand their portfolios.

Guidelines:
- Explain metrics in plain language
- Give practical suggestions grounded in the portfolio data
- Cover risk, diversification and rebalancing when relevant
- Be encouraging but candid about risk
- Quote the client's own numbers where they help

Keep answers to two or three short paragraphs unless asked for more detail.";

/// Render the system prompt, with a portfolio block when context is given.
pub fn system_prompt(context: Option<&ReportContext>) -> String {
    let mut prompt = PREAMBLE.to_string();

    if let Some(context) = context {
        let total = context.number("total_value").unwrap_or(0.0);
        let holdings = context.number("num_holdings").unwrap_or(0.0);

        prompt.push_str("\n\nPortfolio:\n");
        prompt.push_str(&format!("- Total Value: ${}\n", format_currency(total)));
        if let Some(gain_loss) = context.number("total_gain_loss") {
            prompt.push_str(&format!("- Total Gain/Loss: ${}\n", format_currency(gain_loss)));
        }
        prompt.push_str(&format!(
            "- Risk Level: {}\n",
            context.text_or("risk_level", "Unknown")
        ));
        prompt.push_str(&format!(
            "- Sharpe Ratio: {}\n",
            context.text_or("sharpe_ratio", "N/A")
        ));
        prompt.push_str(&format!(
            "- Volatility: {}\n",
            context.text_or("volatility", "N/A")
        ));
        prompt.push_str(&format!(
            "- Diversification Score: {}/10\n",
            context.text_or("diversification_score", "N/A")
        ));
        prompt.push_str(&format!("- Number of Holdings: {}\n", holdings as u64));
        prompt.push_str("\nTailor the advice to this portfolio.");
    }

    prompt
}

/// `1234567.891` -> `1,234,567.89`
fn format_currency(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

/// Answers questions about a portfolio.
///
/// Implementations are responsible for their own transport, timeouts and
/// conversation history.
pub trait Explainer {
    fn ask(&self, question: &str, context: &ReportContext) -> Result<String>;
}
