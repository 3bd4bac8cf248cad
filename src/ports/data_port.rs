//! Market-data access port.

use crate::domain::error::PitbackError;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;

/// Fetch-by-date-range market data collaborator.
///
/// Implementations return points with `start <= date < end` only. A failed
/// fetch is an error, never a partially filled series. The benchmark is
/// served through the same port under its own symbol.
pub trait DataPort: Send + Sync {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PitbackError>;

    fn list_symbols(&self) -> Result<Vec<String>, PitbackError>;
}
