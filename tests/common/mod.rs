#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use pitback::domain::error::PitbackError;
pub use pitback::domain::price::{PricePoint, PriceSeries};
use pitback::domain::screener::ScreenConfig;
use pitback::ports::data_port::DataPort;
use std::collections::HashMap;
use std::sync::Mutex;

pub const BENCHMARK: &str = "^BENCH";

/// In-memory data port. With `ignore_window` set it returns every stored
/// point regardless of the requested range, to prove the core filters.
pub struct MockDataPort {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
    pub ignore_window: bool,
    pub requests: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            ignore_window: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_series(mut self, ticker: &str, series: PriceSeries) -> Self {
        self.data.insert(ticker.to_string(), series);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }

    pub fn leaky(mut self) -> Self {
        self.ignore_window = true;
        self
    }

    pub fn requests(&self) -> Vec<(String, NaiveDate, NaiveDate)> {
        self.requests.lock().unwrap().clone()
    }
}

impl DataPort for MockDataPort {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PitbackError> {
        self.requests
            .lock()
            .unwrap()
            .push((ticker.to_string(), start, end));

        if let Some(reason) = self.errors.get(ticker) {
            return Err(PitbackError::unavailable(ticker, reason.clone()));
        }
        let series = self.data.get(ticker).cloned().unwrap_or_default();
        if self.ignore_window {
            Ok(series)
        } else {
            Ok(series.window(start, end))
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, PitbackError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One close per calendar day from `start`, `close(i)` for day index `i`.
pub fn daily_series(start: NaiveDate, days: i64, close: impl Fn(i64) -> f64) -> PriceSeries {
    PriceSeries::from_points(
        (0..days)
            .map(|i| PricePoint {
                date: start + Duration::days(i),
                close: close(i),
            })
            .collect(),
    )
}

/// Steady daily climb through the first half of 2024.
pub fn rising() -> PriceSeries {
    daily_series(ymd(2024, 1, 1), 182, |i| 100.0 + i as f64)
}

/// Steady daily decline through the first half of 2024.
pub fn falling() -> PriceSeries {
    daily_series(ymd(2024, 1, 1), 182, |i| 300.0 - i as f64)
}

pub fn flat(level: f64) -> PriceSeries {
    daily_series(ymd(2024, 1, 1), 182, move |_| level)
}

/// Short windows so that a few months of synthetic data are enough.
pub fn small_screen() -> ScreenConfig {
    ScreenConfig {
        lookback_days: 60,
        trend_window: 10,
        momentum_period: 5,
        ..ScreenConfig::default()
    }
}

pub fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|t| t.to_string()).collect()
}
