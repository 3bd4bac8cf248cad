//! Instrument universe: ticker list parsing and the default universe.

use std::collections::HashSet;

/// Fifteen large-cap NSE names used when no universe is configured.
pub const DEFAULT_UNIVERSE: [&str; 15] = [
    "RELIANCE.NS",
    "TCS.NS",
    "INFY.NS",
    "HDFC.NS",
    "ICICIBANK.NS",
    "AXISBANK.NS",
    "KOTAKBANK.NS",
    "LT.NS",
    "WIPRO.NS",
    "HCL.NS",
    "BAJAJFINSV.NS",
    "MARUTI.NS",
    "BHARTIARTL.NS",
    "SUNPHARMA.NS",
    "DRREDDY.NS",
];

pub fn default_universe() -> Vec<String> {
    DEFAULT_UNIVERSE.iter().map(|t| t.to_string()).collect()
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Parses a comma-separated ticker list, preserving order. Order matters: it
/// breaks score ties during ranking.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}
