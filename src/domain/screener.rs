//! Point-in-time screening of a universe.
//!
//! A screen as of date `D` only ever sees prices in `[D - lookback, D)`. The
//! window is requested from the data port and enforced again here, so a port
//! that over-delivers cannot leak prices at or after `D` into the ranking.

use crate::domain::error::PitbackError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::scorer::{
    DEFAULT_MOMENTUM_WEIGHT, DEFAULT_TREND_THRESHOLD_PCT, DEFAULT_TREND_WEIGHT, Rating, Scorer,
};
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate};
use rayon::prelude::*;
use std::fmt;
use tracing::debug;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 260;
pub const DEFAULT_TREND_WINDOW: usize = 50;
pub const DEFAULT_MOMENTUM_PERIOD: usize = 14;
/// Upper bound for the lookback window, roughly a century.
pub const MAX_LOOKBACK_DAYS: u32 = 36_525;

/// Scoring and indicator parameters for a screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenConfig {
    pub lookback_days: u32,
    pub trend_window: usize,
    pub momentum_period: usize,
    pub trend_weight: f64,
    pub momentum_weight: f64,
    pub trend_threshold_pct: f64,
    pub parallel: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            trend_window: DEFAULT_TREND_WINDOW,
            momentum_period: DEFAULT_MOMENTUM_PERIOD,
            trend_weight: DEFAULT_TREND_WEIGHT,
            momentum_weight: DEFAULT_MOMENTUM_WEIGHT,
            trend_threshold_pct: DEFAULT_TREND_THRESHOLD_PCT,
            parallel: false,
        }
    }
}

impl ScreenConfig {
    pub fn build(&self) -> Result<Screener, PitbackError> {
        let scorer = Scorer::with_threshold(
            self.trend_weight,
            self.momentum_weight,
            self.trend_threshold_pct,
        )?;
        Ok(
            Screener::new(scorer, self.lookback_days, self.trend_window, self.momentum_period)?
                .with_parallel(self.parallel),
        )
    }
}

/// A scored instrument. Entry price is the last close strictly before the
/// decision date.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub ticker: String,
    pub score: f64,
    pub entry_price: f64,
    pub trend_value: f64,
    pub momentum_value: f64,
}

impl Pick {
    pub fn rating(&self) -> Rating {
        Rating::from_score(self.score)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    DataUnavailable(String),
    EmptyHistory,
    IndicatorUndefined,
    OutOfDateRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub ticker: String,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedInstrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            SkipReason::DataUnavailable(reason) => {
                write!(f, "Download failed for {}: {}", self.ticker, reason)
            }
            SkipReason::EmptyHistory => write!(f, "No history for {}", self.ticker),
            SkipReason::IndicatorUndefined => {
                write!(f, "Scoring skipped for {}: insufficient history", self.ticker)
            }
            SkipReason::OutOfDateRange => {
                write!(f, "Lookback window for {} is out of date range", self.ticker)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScreenOutcome {
    pub as_of: NaiveDate,
    /// Sorted by score descending, ties in universe order.
    pub ranked: Vec<Pick>,
    pub skipped: Vec<SkippedInstrument>,
}

impl ScreenOutcome {
    pub fn top(&self, n: usize) -> &[Pick] {
        &self.ranked[..n.min(self.ranked.len())]
    }
}

#[derive(Debug, Clone)]
pub struct Screener {
    scorer: Scorer,
    lookback_days: u32,
    trend_window: usize,
    momentum_period: usize,
    parallel: bool,
}

impl Screener {
    pub fn new(
        scorer: Scorer,
        lookback_days: u32,
        trend_window: usize,
        momentum_period: usize,
    ) -> Result<Self, PitbackError> {
        if lookback_days == 0 {
            return Err(PitbackError::invalid(
                "backtest",
                "lookback_days",
                "lookback_days must be positive",
            ));
        }
        if lookback_days > MAX_LOOKBACK_DAYS {
            return Err(PitbackError::invalid(
                "backtest",
                "lookback_days",
                format!("lookback_days must be at most {}", MAX_LOOKBACK_DAYS),
            ));
        }
        if trend_window == 0 {
            return Err(PitbackError::invalid(
                "scoring",
                "trend_window",
                "trend_window must be positive",
            ));
        }
        if momentum_period == 0 {
            return Err(PitbackError::invalid(
                "scoring",
                "momentum_period",
                "momentum_period must be positive",
            ));
        }
        Ok(Self {
            scorer,
            lookback_days,
            trend_window,
            momentum_period,
            parallel: false,
        })
    }

    /// Fetch and score instruments on the rayon pool. Ranking is unaffected.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn screen(
        &self,
        data_port: &dyn DataPort,
        universe: &[String],
        as_of: NaiveDate,
    ) -> ScreenOutcome {
        let evaluated: Vec<Result<Pick, SkippedInstrument>> = if self.parallel {
            universe
                .par_iter()
                .map(|ticker| self.evaluate(data_port, ticker, as_of))
                .collect()
        } else {
            universe
                .iter()
                .map(|ticker| self.evaluate(data_port, ticker, as_of))
                .collect()
        };

        let mut ranked = Vec::with_capacity(evaluated.len());
        let mut skipped = Vec::new();
        for result in evaluated {
            match result {
                Ok(pick) => ranked.push(pick),
                Err(skip) => {
                    debug!(as_of = %as_of, "{}", skip);
                    skipped.push(skip);
                }
            }
        }

        // sort_by is stable: equal scores keep universe order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            as_of = %as_of,
            ranked = ranked.len(),
            skipped = skipped.len(),
            "screen complete"
        );

        ScreenOutcome {
            as_of,
            ranked,
            skipped,
        }
    }

    fn evaluate(
        &self,
        data_port: &dyn DataPort,
        ticker: &str,
        as_of: NaiveDate,
    ) -> Result<Pick, SkippedInstrument> {
        let skip = |reason| SkippedInstrument {
            ticker: ticker.to_string(),
            reason,
        };

        let start = as_of
            .checked_sub_signed(Duration::days(i64::from(self.lookback_days)))
            .ok_or_else(|| skip(SkipReason::OutOfDateRange))?;
        let history = data_port
            .fetch(ticker, start, as_of)
            .map_err(|e| skip(SkipReason::DataUnavailable(e.to_string())))?
            .window(start, as_of);

        if history.is_empty() {
            return Err(skip(SkipReason::EmptyHistory));
        }

        let indicators = IndicatorSet::compute(history, self.trend_window, self.momentum_period);
        let (Some(entry_price), Some(trend_value), Some(momentum_value)) = (
            indicators.latest_close(),
            indicators.latest_trend(),
            indicators.latest_momentum(),
        ) else {
            return Err(skip(SkipReason::IndicatorUndefined));
        };

        Ok(Pick {
            ticker: ticker.to_string(),
            score: self
                .scorer
                .score(entry_price, Some(trend_value), Some(momentum_value)),
            entry_price,
            trend_value,
            momentum_value,
        })
    }
}
