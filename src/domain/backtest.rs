//! Point-in-time monthly backtest.
//!
//! A run moves through CONFIGURED -> RUNNING -> SUMMARIZED. Construction
//! validates every parameter, so configuration problems surface before any
//! period runs. Each period then goes through screen -> select -> measure ->
//! record in strict chronological order:
//!
//! 1. screen the universe with prices in `[D - lookback, D)` only
//! 2. keep the top N picks
//! 3. measure each pick over `[D, D + holding + buffer)`, dropping picks with
//!    fewer than two forward prices
//! 4. record the equal-weighted portfolio return against the benchmark
//!
//! Every configured period yields exactly one [`PeriodResult`]. Data problems
//! only ever shrink a period, they never abort the run.

use crate::domain::calendar::{DEFAULT_DECISION_DAY, MonthlySchedule, period_label};
use crate::domain::error::PitbackError;
use crate::domain::metrics::{SummaryStats, mean};
use crate::domain::price::percent_return;
use crate::domain::screener::{Pick, ScreenConfig, Screener};
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, info_span, warn};

pub const DEFAULT_BENCHMARK: &str = "^NSEI";
pub const MIN_FORWARD_POINTS: usize = 2;
/// Upper bound for holding and buffer lengths, roughly a century.
pub const MAX_HOLDING_DAYS: u32 = 36_525;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub months: usize,
    pub top_n: usize,
    pub holding_days: u32,
    pub start_year: i32,
    pub start_month: u32,
    pub decision_day: u32,
    /// Extra calendar days on the forward window to absorb non-trading days.
    pub forward_buffer_days: u32,
    pub benchmark: String,
    pub screen: ScreenConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            months: 12,
            top_n: 3,
            holding_days: 30,
            start_year: 2024,
            start_month: 2,
            decision_day: DEFAULT_DECISION_DAY,
            forward_buffer_days: 10,
            benchmark: DEFAULT_BENCHMARK.to_string(),
            screen: ScreenConfig::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), PitbackError> {
        if self.months == 0 {
            return Err(PitbackError::invalid("backtest", "months", "months must be positive"));
        }
        validate_common(
            "backtest",
            self.top_n,
            self.holding_days,
            self.start_month,
            self.decision_day,
            &self.benchmark,
        )?;
        if self.forward_buffer_days > MAX_HOLDING_DAYS {
            return Err(PitbackError::invalid(
                "backtest",
                "forward_buffer_days",
                format!("forward_buffer_days must be at most {}", MAX_HOLDING_DAYS),
            ));
        }
        self.forward_days().map(|_| ())
    }

    /// Holding period plus buffer.
    pub fn forward_days(&self) -> Result<u32, PitbackError> {
        self.holding_days
            .checked_add(self.forward_buffer_days)
            .ok_or_else(|| {
                PitbackError::invalid(
                    "backtest",
                    "forward_buffer_days",
                    "holding_days + forward_buffer_days overflows",
                )
            })
    }

    pub fn schedule(&self) -> MonthlySchedule {
        MonthlySchedule::new(self.start_year, self.start_month, self.months)
            .with_day(self.decision_day)
    }
}

pub(crate) fn validate_common(
    section: &str,
    top_n: usize,
    holding_days: u32,
    start_month: u32,
    decision_day: u32,
    benchmark: &str,
) -> Result<(), PitbackError> {
    if top_n == 0 {
        return Err(PitbackError::invalid(section, "top_n", "top_n must be positive"));
    }
    if holding_days == 0 {
        return Err(PitbackError::invalid(
            section,
            "holding_days",
            "holding_days must be positive",
        ));
    }
    if holding_days > MAX_HOLDING_DAYS {
        return Err(PitbackError::invalid(
            section,
            "holding_days",
            format!("holding_days must be at most {}", MAX_HOLDING_DAYS),
        ));
    }
    if !(1..=12).contains(&start_month) {
        return Err(PitbackError::invalid(
            section,
            "start_month",
            "start_month must be between 1 and 12",
        ));
    }
    if !(1..=31).contains(&decision_day) {
        return Err(PitbackError::invalid(
            section,
            "decision_day",
            "decision_day must be between 1 and 31",
        ));
    }
    if benchmark.trim().is_empty() {
        return Err(PitbackError::invalid(
            section,
            "benchmark",
            "benchmark symbol must not be empty",
        ));
    }
    Ok(())
}

/// Outcome of one decision date.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResult {
    pub label: String,
    pub decision_date: NaiveDate,
    pub portfolio_return: f64,
    pub benchmark_return: f64,
    pub outperformance: f64,
    /// Picks whose forward return was actually measured.
    pub instruments: usize,
}

impl PeriodResult {
    /// All-zero row for a period with nothing to hold.
    pub fn neutral(decision_date: NaiveDate) -> Self {
        Self {
            label: period_label(decision_date),
            decision_date,
            portfolio_return: 0.0,
            benchmark_return: 0.0,
            outperformance: 0.0,
            instruments: 0,
        }
    }
}

/// A pick whose forward return was measured.
#[derive(Debug, Clone, PartialEq)]
pub struct PickOutcome {
    pub period: String,
    pub ticker: String,
    pub score: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub return_pct: f64,
}

/// Append-only log of recoverable failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorLog {
    entries: Vec<String>,
}

impl ErrorLog {
    pub fn record(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        warn!("{}", entry);
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub periods: Vec<PeriodResult>,
    pub picks: Vec<PickOutcome>,
    pub errors: Vec<String>,
    pub stats: SummaryStats,
}

impl BacktestResult {
    /// True if at least one period measured at least one instrument.
    pub fn has_results(&self) -> bool {
        self.periods.iter().any(|p| p.instruments > 0)
    }
}

/// The screen/select/measure contract shared by the backtest and the
/// walk-forward validator.
pub(crate) struct PeriodEvaluator<'a> {
    pub screener: &'a Screener,
    pub universe: &'a [String],
    pub benchmark: &'a str,
    pub top_n: usize,
    /// Calendar length of the forward window, buffer included.
    pub forward_days: u32,
}

pub(crate) struct PeriodEvaluation {
    pub result: PeriodResult,
    pub picks: Vec<PickOutcome>,
}

impl PeriodEvaluator<'_> {
    pub fn evaluate(
        &self,
        data_port: &dyn DataPort,
        decision_date: NaiveDate,
        log: &mut ErrorLog,
    ) -> PeriodEvaluation {
        let label = period_label(decision_date);
        let _span = info_span!("period", %label).entered();

        let screen = self.screener.screen(data_port, self.universe, decision_date);
        for skipped in &screen.skipped {
            log.record(format!("{}: {}", label, skipped));
        }

        let selected = screen.top(self.top_n);
        if selected.is_empty() {
            info!("no candidates, recording neutral period");
            return PeriodEvaluation {
                result: PeriodResult::neutral(decision_date),
                picks: Vec::new(),
            };
        }
        debug!(
            picks = ?selected.iter().map(|p| p.ticker.as_str()).collect::<Vec<_>>(),
            "selected"
        );

        let picks: Vec<PickOutcome> = selected
            .iter()
            .filter_map(|pick| self.measure(data_port, pick, decision_date, &label, log))
            .collect();

        let returns: Vec<f64> = picks.iter().map(|p| p.return_pct).collect();
        let portfolio_return = mean(&returns);
        let benchmark_return = self.benchmark_return(data_port, decision_date, &label, log);
        let outperformance = portfolio_return - benchmark_return;

        info!(
            portfolio = format_args!("{:+.2}%", portfolio_return),
            benchmark = format_args!("{:+.2}%", benchmark_return),
            alpha = format_args!("{:+.2}%", outperformance),
            measured = picks.len(),
            "period recorded"
        );

        PeriodEvaluation {
            result: PeriodResult {
                label,
                decision_date,
                portfolio_return,
                benchmark_return,
                outperformance,
                instruments: picks.len(),
            },
            picks,
        }
    }

    /// `None` when the window runs past the representable calendar.
    fn forward_end(&self, decision_date: NaiveDate) -> Option<NaiveDate> {
        decision_date.checked_add_signed(Duration::days(i64::from(self.forward_days)))
    }

    fn measure(
        &self,
        data_port: &dyn DataPort,
        pick: &Pick,
        decision_date: NaiveDate,
        label: &str,
        log: &mut ErrorLog,
    ) -> Option<PickOutcome> {
        let Some(end) = self.forward_end(decision_date) else {
            log.record(format!(
                "{}: Forward window for {} is out of date range",
                label, pick.ticker
            ));
            return None;
        };
        let forward = match data_port.fetch(&pick.ticker, decision_date, end) {
            Ok(series) => series.window(decision_date, end),
            Err(e) => {
                log.record(format!("{}: Future download failed for {}: {}", label, pick.ticker, e));
                return None;
            }
        };
        if forward.len() < MIN_FORWARD_POINTS {
            log.record(format!(
                "{}: Insufficient forward data for {} ({} points)",
                label,
                pick.ticker,
                forward.len()
            ));
            return None;
        }

        let exit_price = forward.last().map(|p| p.close)?;
        Some(PickOutcome {
            period: label.to_string(),
            ticker: pick.ticker.clone(),
            score: pick.score,
            entry_price: pick.entry_price,
            exit_price,
            return_pct: percent_return(pick.entry_price, exit_price),
        })
    }

    fn benchmark_return(
        &self,
        data_port: &dyn DataPort,
        decision_date: NaiveDate,
        label: &str,
        log: &mut ErrorLog,
    ) -> f64 {
        let Some(end) = self.forward_end(decision_date) else {
            log.record(format!("{}: Benchmark window is out of date range", label));
            return 0.0;
        };
        let series = match data_port.fetch(self.benchmark, decision_date, end) {
            Ok(series) => series.window(decision_date, end),
            Err(e) => {
                log.record(format!("{}: Benchmark download failed: {}", label, e));
                return 0.0;
            }
        };
        match (series.first(), series.last()) {
            (Some(first), Some(last)) if series.len() >= MIN_FORWARD_POINTS => {
                percent_return(first.close, last.close)
            }
            _ => {
                log.record(format!(
                    "{}: Insufficient benchmark data for {} ({} points)",
                    label,
                    self.benchmark,
                    series.len()
                ));
                0.0
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    screener: Screener,
    universe: Vec<String>,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig, universe: Vec<String>) -> Result<Self, PitbackError> {
        config.validate()?;
        if universe.is_empty() {
            return Err(PitbackError::ConfigMissing {
                section: "universe".to_string(),
                key: "codes".to_string(),
            });
        }
        let screener = config.screen.build()?;
        Ok(Self {
            config,
            screener,
            universe,
        })
    }

    /// Runs every period in order. Identical config and data give an
    /// identical result.
    pub fn run(&self, data_port: &dyn DataPort) -> BacktestResult {
        let evaluator = PeriodEvaluator {
            screener: &self.screener,
            universe: &self.universe,
            benchmark: &self.config.benchmark,
            top_n: self.config.top_n,
            forward_days: self
                .config
                .holding_days
                .saturating_add(self.config.forward_buffer_days),
        };

        let total = self.config.months;
        info!(
            months = total,
            top_n = self.config.top_n,
            holding_days = self.config.holding_days,
            universe = self.universe.len(),
            lookback_days = self.config.screen.lookback_days,
            "starting backtest"
        );

        let mut periods = Vec::with_capacity(total);
        let mut picks = Vec::new();
        let mut log = ErrorLog::default();

        for (idx, decision_date) in self.config.schedule().into_iter().enumerate() {
            info!("[{:2}/{}] screening as of {}", idx + 1, total, decision_date);
            let evaluation = evaluator.evaluate(data_port, decision_date, &mut log);
            periods.push(evaluation.result);
            picks.extend(evaluation.picks);
        }

        let stats = SummaryStats::compute(&periods);
        info!(
            periods = periods.len(),
            errors = log.len(),
            "backtest complete"
        );

        BacktestResult {
            periods,
            picks,
            errors: log.into_entries(),
            stats,
        }
    }
}
