//! Configuration validation.
//!
//! Checks raw INI values before any run is built so that the first offending
//! `[section] key` is reported. Absent keys fall back to their defaults and are
//! validated as such.

use crate::domain::backtest::MAX_HOLDING_DAYS;
use crate::domain::error::PitbackError;
use crate::domain::screener::MAX_LOOKBACK_DAYS;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;

const WEIGHT_TOLERANCE: f64 = 1e-9;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), PitbackError> {
    validate_min_int(config, "backtest", "months", 12, 1)?;
    validate_days(config, "backtest", "lookback_days", 260, 1, MAX_LOOKBACK_DAYS)?;
    validate_min_int(config, "backtest", "top_n", 3, 1)?;
    validate_days(config, "backtest", "holding_days", 30, 1, MAX_HOLDING_DAYS)?;
    validate_days(config, "backtest", "forward_buffer_days", 10, 0, MAX_HOLDING_DAYS)?;
    validate_month(config, "backtest", 2)?;
    validate_decision_day(config, "backtest")?;
    validate_benchmark(config, "backtest")?;
    Ok(())
}

pub fn validate_scoring_config(config: &dyn ConfigPort) -> Result<(), PitbackError> {
    validate_weights(config)?;
    validate_min_int(config, "scoring", "trend_window", 50, 1)?;
    validate_min_int(config, "scoring", "momentum_period", 14, 1)?;
    let threshold = config.get_double("scoring", "trend_threshold_pct", 1.0);
    if threshold < 0.0 {
        return Err(PitbackError::invalid(
            "scoring",
            "trend_threshold_pct",
            "trend_threshold_pct must be non-negative",
        ));
    }
    Ok(())
}

pub fn validate_walk_forward_config(config: &dyn ConfigPort) -> Result<(), PitbackError> {
    let train = validate_min_int(config, "walk_forward", "train_months", 6, 0)?;
    validate_min_int(config, "walk_forward", "test_months", 1, 1)?;
    let total = validate_min_int(config, "walk_forward", "total_months", 12, 1)?;
    if total <= train {
        return Err(PitbackError::invalid(
            "walk_forward",
            "total_months",
            "total_months must exceed train_months",
        ));
    }
    validate_min_int(config, "walk_forward", "top_n", 3, 1)?;
    validate_days(config, "walk_forward", "holding_days", 30, 1, MAX_HOLDING_DAYS)?;
    validate_month(config, "walk_forward", 1)?;
    validate_decision_day(config, "walk_forward")?;
    validate_benchmark(config, "walk_forward")?;
    Ok(())
}

pub fn validate_universe_config(config: &dyn ConfigPort) -> Result<(), PitbackError> {
    match config.get_string("universe", "codes") {
        None => Ok(()),
        Some(codes) => parse_tickers(&codes)
            .map(|_| ())
            .map_err(|e| PitbackError::invalid("universe", "codes", e.to_string())),
    }
}

fn validate_min_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    minimum: i64,
) -> Result<i64, PitbackError> {
    let value = config.get_int(section, key, default);
    if value < minimum {
        let reason = if minimum == 0 {
            format!("{} must be non-negative", key)
        } else {
            format!("{} must be at least {}", key, minimum)
        };
        return Err(PitbackError::invalid(section, key, reason));
    }
    Ok(value)
}

fn validate_days(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    minimum: i64,
    maximum: u32,
) -> Result<i64, PitbackError> {
    let value = validate_min_int(config, section, key, default, minimum)?;
    if value > i64::from(maximum) {
        return Err(PitbackError::invalid(
            section,
            key,
            format!("{} must be at most {}", key, maximum),
        ));
    }
    Ok(value)
}

fn validate_month(config: &dyn ConfigPort, section: &str, default: i64) -> Result<(), PitbackError> {
    let value = config.get_int(section, "start_month", default);
    if !(1..=12).contains(&value) {
        return Err(PitbackError::invalid(
            section,
            "start_month",
            "start_month must be between 1 and 12",
        ));
    }
    Ok(())
}

fn validate_decision_day(config: &dyn ConfigPort, section: &str) -> Result<(), PitbackError> {
    let value = config.get_int(section, "decision_day", 15);
    if !(1..=31).contains(&value) {
        return Err(PitbackError::invalid(
            section,
            "decision_day",
            "decision_day must be between 1 and 31",
        ));
    }
    Ok(())
}

fn validate_benchmark(config: &dyn ConfigPort, section: &str) -> Result<(), PitbackError> {
    match config.get_string(section, "benchmark") {
        Some(s) if s.trim().is_empty() => Err(PitbackError::invalid(
            section,
            "benchmark",
            "benchmark symbol must not be empty",
        )),
        _ => Ok(()),
    }
}

fn validate_weights(config: &dyn ConfigPort) -> Result<(), PitbackError> {
    let trend = config.get_double("scoring", "trend_weight", 0.4);
    let momentum = config.get_double("scoring", "momentum_weight", 0.6);
    if trend < 0.0 {
        return Err(PitbackError::invalid(
            "scoring",
            "trend_weight",
            "trend_weight must be non-negative",
        ));
    }
    if momentum < 0.0 {
        return Err(PitbackError::invalid(
            "scoring",
            "momentum_weight",
            "momentum_weight must be non-negative",
        ));
    }
    if (trend + momentum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(PitbackError::invalid(
            "scoring",
            "trend_weight",
            format!("weights must sum to 1.0 (got {} + {})", trend, momentum),
        ));
    }
    Ok(())
}
