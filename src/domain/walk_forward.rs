//! Walk-forward validation.
//!
//! The first `train_months` of the nominal range are reserved. Evaluation then
//! steps forward `test_months` at a time until `total_months` is exhausted,
//! running the same screen/select/measure contract as the backtest with a
//! forward window of exactly `holding_days`.

use crate::domain::backtest::{
    DEFAULT_BENCHMARK, ErrorLog, PeriodEvaluator, PickOutcome, validate_common,
};
use crate::domain::calendar::{DEFAULT_DECISION_DAY, MonthlySchedule};
use crate::domain::error::PitbackError;
use crate::domain::screener::{ScreenConfig, Screener};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardConfig {
    pub train_months: usize,
    pub test_months: usize,
    pub total_months: usize,
    pub start_year: i32,
    pub start_month: u32,
    pub decision_day: u32,
    pub top_n: usize,
    pub holding_days: u32,
    pub benchmark: String,
    pub screen: ScreenConfig,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_months: 6,
            test_months: 1,
            total_months: 12,
            start_year: 2024,
            start_month: 1,
            decision_day: DEFAULT_DECISION_DAY,
            top_n: 3,
            holding_days: 30,
            benchmark: DEFAULT_BENCHMARK.to_string(),
            screen: ScreenConfig::default(),
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), PitbackError> {
        if self.test_months == 0 {
            return Err(PitbackError::invalid(
                "walk_forward",
                "test_months",
                "test_months must be positive",
            ));
        }
        if self.total_months <= self.train_months {
            return Err(PitbackError::invalid(
                "walk_forward",
                "total_months",
                "total_months must exceed train_months",
            ));
        }
        validate_common(
            "walk_forward",
            self.top_n,
            self.holding_days,
            self.start_month,
            self.decision_day,
            &self.benchmark,
        )
    }

    /// Decision dates at month offsets `train + k * test`, `k >= 0`, below `total`.
    pub fn decision_dates(&self) -> Vec<NaiveDate> {
        let schedule = MonthlySchedule::new(self.start_year, self.start_month, self.total_months)
            .with_day(self.decision_day);
        (self.train_months..self.total_months)
            .step_by(self.test_months.max(1))
            .filter_map(|offset| schedule.date_at(offset))
            .collect()
    }
}

/// One evaluated walk-forward period. `edge` is portfolio minus benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardRow {
    pub label: String,
    pub portfolio: f64,
    pub benchmark: f64,
    pub edge: f64,
    pub instruments: usize,
}

#[derive(Debug, Clone)]
pub struct WalkForwardResult {
    pub rows: Vec<WalkForwardRow>,
    pub picks: Vec<PickOutcome>,
    pub errors: Vec<String>,
}

impl WalkForwardResult {
    pub fn has_results(&self) -> bool {
        self.rows.iter().any(|r| r.instruments > 0)
    }
}

#[derive(Debug, Clone)]
pub struct WalkForwardValidator {
    config: WalkForwardConfig,
    screener: Screener,
    universe: Vec<String>,
}

impl WalkForwardValidator {
    pub fn new(config: WalkForwardConfig, universe: Vec<String>) -> Result<Self, PitbackError> {
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

    pub fn run(&self, data_port: &dyn DataPort) -> WalkForwardResult {
        let evaluator = PeriodEvaluator {
            screener: &self.screener,
            universe: &self.universe,
            benchmark: &self.config.benchmark,
            top_n: self.config.top_n,
            forward_days: self.config.holding_days,
        };

        let dates = self.config.decision_dates();
        info!(
            train = self.config.train_months,
            test = self.config.test_months,
            periods = dates.len(),
            top_n = self.config.top_n,
            "starting walk-forward validation"
        );

        let mut rows = Vec::with_capacity(dates.len());
        let mut picks = Vec::new();
        let mut log = ErrorLog::default();

        for decision_date in dates {
            let evaluation = evaluator.evaluate(data_port, decision_date, &mut log);
            let period = evaluation.result;
            rows.push(WalkForwardRow {
                label: period.label,
                portfolio: period.portfolio_return,
                benchmark: period.benchmark_return,
                edge: period.outperformance,
                instruments: period.instruments,
            });
            picks.extend(evaluation.picks);
        }

        info!(periods = rows.len(), errors = log.len(), "walk-forward complete");

        WalkForwardResult {
            rows,
            picks,
            errors: log.into_entries(),
        }
    }
}
