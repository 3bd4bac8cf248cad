//! Technical indicators used by the scorer.
//!
//! - `IndicatorPoint`: a single dated value, `None` while the window is warming up
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series aligned one-to-one with the input prices
//! - `IndicatorSet`: close, trend and momentum series for one instrument

pub mod rsi;
pub mod sma;

use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Value at the final position, `None` if undefined there or if empty.
    pub fn latest(&self) -> Option<f64> {
        self.values.last().and_then(|p| p.value)
    }

    pub(crate) fn undefined(indicator_type: IndicatorType, series: &PriceSeries) -> Self {
        Self {
            indicator_type,
            values: series
                .points()
                .iter()
                .map(|p| IndicatorPoint {
                    date: p.date,
                    value: None,
                })
                .collect(),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}

/// Aligned close/trend/momentum series for one instrument at one decision date.
///
/// Built fresh for every screen and never cached across dates.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    pub close: PriceSeries,
    pub trend: IndicatorSeries,
    pub momentum: IndicatorSeries,
}

impl IndicatorSet {
    pub fn compute(close: PriceSeries, trend_window: usize, momentum_period: usize) -> Self {
        let trend = sma::calculate_sma(&close, trend_window);
        let momentum = rsi::calculate_rsi(&close, momentum_period);
        Self {
            close,
            trend,
            momentum,
        }
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.close.last().map(|p| p.close)
    }

    pub fn latest_trend(&self) -> Option<f64> {
        self.trend.latest()
    }

    pub fn latest_momentum(&self) -> Option<f64> {
        self.momentum.latest()
    }
}
