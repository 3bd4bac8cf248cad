//! CSV file market-data adapter.
//!
//! One `<TICKER>.csv` per instrument. The header row must carry `date`
//! (YYYY-MM-DD) and `close` columns; any other columns are ignored.

use crate::domain::error::PitbackError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }

    fn read_series(&self, ticker: &str) -> Result<PriceSeries, PitbackError> {
        let path = self.csv_path(ticker);
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| {
                PitbackError::unavailable(ticker, format!("failed to read {}: {}", path.display(), e))
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| PitbackError::unavailable(ticker, format!("CSV parse error: {}", e)))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| PitbackError::unavailable(ticker, format!("missing {} column", name)))
        };
        let date_idx = column("date")?;
        let close_idx = column("close")?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result
                .map_err(|e| PitbackError::unavailable(ticker, format!("CSV parse error: {}", e)))?;

            let date_str = record.get(date_idx).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                PitbackError::unavailable(ticker, format!("invalid date {:?}: {}", date_str, e))
            })?;

            let close_str = record.get(close_idx).unwrap_or_default();
            let close: f64 = close_str.parse().map_err(|e| {
                PitbackError::unavailable(ticker, format!("invalid close {:?}: {}", close_str, e))
            })?;
            if !close.is_finite() {
                return Err(PitbackError::unavailable(
                    ticker,
                    format!("non-finite close on {}", date),
                ));
            }

            points.push(PricePoint { date, close });
        }

        Ok(PriceSeries::from_points(points))
    }
}

impl DataPort for CsvAdapter {
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, PitbackError> {
        let series = self.read_series(ticker)?.window(start, end);
        debug!(ticker, %start, %end, points = series.len(), "loaded csv prices");
        Ok(series)
    }

    fn list_symbols(&self) -> Result<Vec<String>, PitbackError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                symbols.push(ticker.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
