//! Result export port.

use crate::domain::backtest::{PeriodResult, PickOutcome};
use crate::domain::error::PitbackError;
use crate::domain::walk_forward::WalkForwardRow;

/// Tabular sinks for a finished run.
pub trait ReportPort {
    /// One row per decision period.
    fn write_periods(&self, periods: &[PeriodResult]) -> Result<(), PitbackError>;

    /// One row per realized pick.
    fn write_picks(&self, picks: &[PickOutcome]) -> Result<(), PitbackError>;

    /// One line per recoverable failure. An empty run leaves no log behind.
    fn write_errors(&self, errors: &[String]) -> Result<(), PitbackError>;

    fn write_walk_forward(&self, rows: &[WalkForwardRow]) -> Result<(), PitbackError>;

    fn write_walk_forward_picks(&self, picks: &[PickOutcome]) -> Result<(), PitbackError>;

    fn write_walk_forward_errors(&self, errors: &[String]) -> Result<(), PitbackError>;
}
