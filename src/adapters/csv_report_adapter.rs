//! CSV report adapter.
//!
//! Writes run results into an output directory and reads the period and
//! walk-forward tables back for analysis. Floats are rounded to two decimals
//! on export, so a read-back value is within 0.005 of what was computed.

use crate::domain::analysis::{RegimeSummary, WalkForwardMetrics};
use crate::domain::backtest::{PeriodResult, PickOutcome};
use crate::domain::error::PitbackError;
use crate::domain::metrics::DrawdownPoint;
use crate::domain::scorer::round2;
use crate::domain::screener::ScreenOutcome;
use crate::domain::walk_forward::WalkForwardRow;
use crate::ports::report_port::ReportPort;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PERIODS_FILE: &str = "backtest_results.csv";
pub const PICKS_FILE: &str = "backtest_picks.csv";
pub const ERRORS_FILE: &str = "backtest_errors.log";
pub const WALK_FORWARD_FILE: &str = "walkforward_results.csv";
pub const WALK_FORWARD_PICKS_FILE: &str = "walkforward_picks.csv";
pub const WALK_FORWARD_ERRORS_FILE: &str = "walkforward_errors.log";
pub const METRICS_FILE: &str = "walkforward_metrics.csv";
pub const REGIME_FILE: &str = "regime_summary.csv";
pub const DRAWDOWN_FILE: &str = "drawdown_curve.csv";

/// One exported period row as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    #[serde(rename = "Month")]
    pub label: String,
    #[serde(rename = "Portfolio_Return_%")]
    pub portfolio_return: f64,
    #[serde(rename = "Benchmark_Return_%")]
    pub benchmark_return: f64,
    #[serde(rename = "Outperformance_%")]
    pub outperformance: f64,
    #[serde(rename = "Num_Stocks")]
    pub instruments: usize,
}

impl From<&PeriodResult> for PeriodRecord {
    fn from(p: &PeriodResult) -> Self {
        Self {
            label: p.label.clone(),
            portfolio_return: round2(p.portfolio_return),
            benchmark_return: round2(p.benchmark_return),
            outperformance: round2(p.outperformance),
            instruments: p.instruments,
        }
    }
}

#[derive(Debug, Serialize)]
struct PickRecord<'a> {
    #[serde(rename = "Month")]
    period: &'a str,
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Score")]
    score: f64,
    #[serde(rename = "Entry_Price")]
    entry_price: f64,
    #[serde(rename = "Exit_Price")]
    exit_price: f64,
    #[serde(rename = "Return_%")]
    return_pct: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct WalkForwardRecord {
    month: String,
    portfolio: f64,
    benchmark: f64,
    edge: f64,
    instruments: usize,
}

impl From<&WalkForwardRow> for WalkForwardRecord {
    fn from(r: &WalkForwardRow) -> Self {
        Self {
            month: r.label.clone(),
            portfolio: round2(r.portfolio),
            benchmark: round2(r.benchmark),
            edge: round2(r.edge),
            instruments: r.instruments,
        }
    }
}

impl From<WalkForwardRecord> for WalkForwardRow {
    fn from(r: WalkForwardRecord) -> Self {
        Self {
            label: r.month,
            portfolio: r.portfolio,
            benchmark: r.benchmark,
            edge: r.edge,
            instruments: r.instruments,
        }
    }
}

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    fn writer(&self, file_name: &str) -> Result<csv::Writer<fs::File>, PitbackError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(csv::Writer::from_path(self.path(file_name))?)
    }

    fn serialize_all<T: Serialize>(
        &self,
        file_name: &str,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<(), PitbackError> {
        let mut wtr = self.writer(file_name)?;
        let mut count = 0usize;
        for row in rows {
            wtr.serialize(row)?;
            count += 1;
        }
        wtr.flush()?;
        info!(file = %self.path(file_name).display(), rows = count, "wrote report");
        Ok(())
    }

    fn write_picks_to(&self, file_name: &str, picks: &[PickOutcome]) -> Result<(), PitbackError> {
        self.serialize_all(
            file_name,
            picks.iter().map(|p| PickRecord {
                period: &p.period,
                ticker: &p.ticker,
                score: round2(p.score),
                entry_price: round2(p.entry_price),
                exit_price: round2(p.exit_price),
                return_pct: round2(p.return_pct),
            }),
        )
    }

    /// Replaces `file_name` with `errors`, or removes a stale log when there
    /// are none.
    fn write_log(&self, file_name: &str, errors: &[String]) -> Result<(), PitbackError> {
        let path = self.path(file_name);
        if errors.is_empty() {
            if path.exists() {
                fs::remove_file(&path)?;
                debug!(file = %path.display(), "removed stale error log");
            }
            return Ok(());
        }
        fs::create_dir_all(&self.output_dir)?;
        let mut file = fs::File::create(&path)?;
        for line in errors {
            writeln!(file, "{}", line)?;
        }
        info!(file = %path.display(), lines = errors.len(), "wrote error log");
        Ok(())
    }

    pub fn read_periods(&self) -> Result<Vec<PeriodRecord>, PitbackError> {
        let mut rdr = csv::Reader::from_path(self.path(PERIODS_FILE))?;
        rdr.deserialize()
            .map(|r| r.map_err(PitbackError::from))
            .collect()
    }

    pub fn read_walk_forward(&self) -> Result<Vec<WalkForwardRow>, PitbackError> {
        let mut rdr = csv::Reader::from_path(self.path(WALK_FORWARD_FILE))?;
        rdr.deserialize::<WalkForwardRecord>()
            .map(|r| r.map(WalkForwardRow::from).map_err(PitbackError::from))
            .collect()
    }

    pub fn write_metrics(&self, metrics: &WalkForwardMetrics) -> Result<(), PitbackError> {
        let mut wtr = self.writer(METRICS_FILE)?;
        wtr.write_record(["metric", "value"])?;
        let rows = [
            ("portfolio_mean", metrics.portfolio_mean),
            ("portfolio_std", metrics.portfolio_std),
            ("portfolio_sharpe", metrics.portfolio_sharpe),
            ("benchmark_mean", metrics.benchmark_mean),
            ("benchmark_std", metrics.benchmark_std),
            ("win_rate", metrics.win_rate),
            ("avg_edge", metrics.avg_edge),
            ("total_edge", metrics.total_edge),
        ];
        for (name, value) in rows {
            wtr.write_record([name.to_string(), format!("{:.4}", value)])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_regimes(&self, regimes: &[RegimeSummary]) -> Result<(), PitbackError> {
        let mut wtr = self.writer(REGIME_FILE)?;
        wtr.write_record(["regime", "periods", "portfolio", "benchmark", "edge"])?;
        for r in regimes {
            wtr.write_record([
                &r.regime.to_string(),
                &r.periods.to_string(),
                &format!("{:.2}", r.portfolio),
                &format!("{:.2}", r.benchmark),
                &format!("{:.2}", r.edge),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_drawdown(
        &self,
        rows: &[WalkForwardRow],
        curve: &[DrawdownPoint],
    ) -> Result<(), PitbackError> {
        let mut wtr = self.writer(DRAWDOWN_FILE)?;
        wtr.write_record(["month", "equity", "drawdown"])?;
        for (row, point) in rows.iter().zip(curve) {
            wtr.write_record([
                &row.label,
                &format!("{:.4}", point.equity),
                &format!("{:.2}", point.drawdown),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_periods(&self, periods: &[PeriodResult]) -> Result<(), PitbackError> {
        self.serialize_all(PERIODS_FILE, periods.iter().map(PeriodRecord::from))
    }

    fn write_picks(&self, picks: &[PickOutcome]) -> Result<(), PitbackError> {
        self.write_picks_to(PICKS_FILE, picks)
    }

    fn write_errors(&self, errors: &[String]) -> Result<(), PitbackError> {
        self.write_log(ERRORS_FILE, errors)
    }

    fn write_walk_forward(&self, rows: &[WalkForwardRow]) -> Result<(), PitbackError> {
        self.serialize_all(WALK_FORWARD_FILE, rows.iter().map(WalkForwardRecord::from))
    }

    fn write_walk_forward_picks(&self, picks: &[PickOutcome]) -> Result<(), PitbackError> {
        self.write_picks_to(WALK_FORWARD_PICKS_FILE, picks)
    }

    fn write_walk_forward_errors(&self, errors: &[String]) -> Result<(), PitbackError> {
        self.write_log(WALK_FORWARD_ERRORS_FILE, errors)
    }
}

/// Writes a ranked screen to `path`.
pub fn write_screen(path: &Path, outcome: &ScreenOutcome) -> Result<(), PitbackError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "rank", "ticker", "price", "trend", "momentum", "score", "rating",
    ])?;
    for (idx, pick) in outcome.ranked.iter().enumerate() {
        wtr.write_record([
            &(idx + 1).to_string(),
            &pick.ticker,
            &format!("{:.2}", pick.entry_price),
            &format!("{:.2}", pick.trend_value),
            &format!("{:.2}", pick.momentum_value),
            &format!("{:.2}", pick.score),
            &pick.rating().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::screener::Pick;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn period(label: &str, portfolio: f64, benchmark: f64, instruments: usize) -> PeriodResult {
        PeriodResult {
            label: label.to_string(),
            decision_date: NaiveDate::from_ymd_opt(2024, 2, 15).unwrap(),
            portfolio_return: portfolio,
            benchmark_return: benchmark,
            outperformance: portfolio - benchmark,
            instruments,
        }
    }

    #[test]
    fn periods_round_trip_within_rounding() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let periods = vec![
            period("Feb 2024", 3.14159, 1.00499, 3),
            period("Mar 2024", 0.0, 0.0, 0),
        ];

        adapter.write_periods(&periods).unwrap();
        let back = adapter.read_periods().unwrap();

        assert_eq!(back.len(), 2);
        for (orig, read) in periods.iter().zip(&back) {
            assert_eq!(read.label, orig.label);
            assert_eq!(read.instruments, orig.instruments);
            assert!((read.portfolio_return - orig.portfolio_return).abs() <= 0.005);
            assert!((read.benchmark_return - orig.benchmark_return).abs() <= 0.005);
            assert!((read.outperformance - orig.outperformance).abs() <= 0.005);
        }
    }

    #[test]
    fn period_headers_match_export_layout() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        adapter.write_periods(&[period("Feb 2024", 1.0, 0.5, 2)]).unwrap();

        let content = fs::read_to_string(adapter.path(PERIODS_FILE)).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "Month,Portfolio_Return_%,Benchmark_Return_%,Outperformance_%,Num_Stocks"
        );
    }

    #[test]
    fn picks_are_written_with_headers() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().join("nested"));
        adapter
            .write_picks(&[PickOutcome {
                period: "Feb 2024".into(),
                ticker: "TCS.NS".into(),
                score: 0.7,
                entry_price: 3500.123,
                exit_price: 3600.0,
                return_pct: 2.853,
            }])
            .unwrap();

        let content = fs::read_to_string(adapter.path(PICKS_FILE)).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Month,Ticker,Score,Entry_Price,Exit_Price,Return_%"
        );
        assert_eq!(lines.next().unwrap(), "Feb 2024,TCS.NS,0.7,3500.12,3600.0,2.85");
    }

    #[test]
    fn error_log_only_written_when_non_empty() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());

        adapter.write_errors(&[]).unwrap();
        assert!(!adapter.path(ERRORS_FILE).exists());

        adapter
            .write_errors(&["Feb 2024: No history for LT.NS".to_string()])
            .unwrap();
        let content = fs::read_to_string(adapter.path(ERRORS_FILE)).unwrap();
        assert_eq!(content, "Feb 2024: No history for LT.NS\n");
    }

    #[test]
    fn clean_run_removes_stale_error_log() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        adapter
            .write_errors(&["Feb 2024: No history for LT.NS".to_string()])
            .unwrap();
        assert!(adapter.path(ERRORS_FILE).exists());

        adapter.write_errors(&[]).unwrap();
        assert!(!adapter.path(ERRORS_FILE).exists());
    }

    #[test]
    fn walk_forward_logs_and_picks_use_their_own_files() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        adapter
            .write_errors(&["Feb 2024: No history for LT.NS".to_string()])
            .unwrap();

        adapter
            .write_walk_forward_errors(&["Jul 2024: Benchmark download failed".to_string()])
            .unwrap();
        adapter
            .write_walk_forward_picks(&[PickOutcome {
                period: "Jul 2024".into(),
                ticker: "INFY.NS".into(),
                score: 1.0,
                entry_price: 1500.0,
                exit_price: 1530.0,
                return_pct: 2.0,
            }])
            .unwrap();

        let backtest_log = fs::read_to_string(adapter.path(ERRORS_FILE)).unwrap();
        assert!(backtest_log.contains("LT.NS"));
        let wf_log = fs::read_to_string(adapter.path(WALK_FORWARD_ERRORS_FILE)).unwrap();
        assert_eq!(wf_log, "Jul 2024: Benchmark download failed\n");

        let picks = fs::read_to_string(adapter.path(WALK_FORWARD_PICKS_FILE)).unwrap();
        assert_eq!(picks.lines().nth(1).unwrap(), "Jul 2024,INFY.NS,1.0,1500.0,1530.0,2.0");
        assert!(!adapter.path(PICKS_FILE).exists());
    }

    #[test]
    fn walk_forward_round_trip() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        let rows = vec![WalkForwardRow {
            label: "Jul 2024".into(),
            portfolio: 4.256,
            benchmark: 1.5,
            edge: 2.756,
            instruments: 3,
        }];

        adapter.write_walk_forward(&rows).unwrap();
        let back = adapter.read_walk_forward().unwrap();

        assert_eq!(back.len(), 1);
        assert_eq!(back[0].label, "Jul 2024");
        assert!((back[0].portfolio - 4.256).abs() <= 0.005);
        assert!((back[0].edge - 2.756).abs() <= 0.005);
        assert_eq!(back[0].instruments, 3);
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(dir.path().to_path_buf());
        assert!(adapter.read_walk_forward().is_err());
    }

    #[test]
    fn screen_export_ranks_from_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("screen.csv");
        let outcome = ScreenOutcome {
            as_of: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            ranked: vec![Pick {
                ticker: "INFY.NS".into(),
                score: 1.0,
                entry_price: 1500.0,
                trend_value: 1450.0,
                momentum_value: 65.0,
            }],
            skipped: vec![],
        };

        write_screen(&path, &outcome).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "rank,ticker,price,trend,momentum,score,rating");
        assert_eq!(lines[1], "1,INFY.NS,1500.00,1450.00,65.00,1.00,STRONG_BUY");
    }
}
