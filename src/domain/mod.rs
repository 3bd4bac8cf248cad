//! Core domain types and logic.

pub mod analysis;
pub mod backtest;
pub mod calendar;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod price;
pub mod scorer;
pub mod screener;
pub mod universe;
pub mod walk_forward;
