use std::{env::var, path::PathBuf};

use anyhow::{Context, Result};
use stock::Symbol;

const DEFAULT_SYMBOLS: &str = "AAPL";
const DEFAULT_CHART_DIR: &str = "charts";

#[derive(Clone, Debug)]
pub struct Config {
    pub symbols: Vec<Symbol>,
    pub chart_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let symbols = var("DASHBOARD_SYMBOLS").unwrap_or_else(|_| DEFAULT_SYMBOLS.to_string());

        Ok(Self {
            symbols: parse_symbols(&symbols).context("DASHBOARD_SYMBOLS")?,
            chart_dir: var("DASHBOARD_CHART_DIR")
                .unwrap_or_else(|_| DEFAULT_CHART_DIR.to_string())
                .into(),
        })
    }
}

/// Comma-separated tickers, e.g. `TSLA, msft`. Blank items are skipped.
pub fn parse_symbols(raw: &str) -> Result<Vec<Symbol>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| Symbol::parse(s).map_err(Into::into))
        .collect()
}
