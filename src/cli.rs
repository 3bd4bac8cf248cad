//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{self, CsvReportAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{regime_summary, walk_forward_metrics};
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::domain::config_validation::{
    validate_backtest_config, validate_scoring_config, validate_universe_config,
    validate_walk_forward_config,
};
use crate::domain::error::PitbackError;
use crate::domain::metrics::drawdown_curve;
use crate::domain::screener::{ScreenConfig, ScreenOutcome};
use crate::domain::universe::{default_universe, parse_tickers};
use crate::domain::walk_forward::{WalkForwardConfig, WalkForwardResult, WalkForwardValidator};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "pitback", about = "Point-in-time stock screen backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command that touches market data.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// INI configuration file; built-in defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory of <TICKER>.csv price files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Comma-separated ticker list, overrides [universe] codes
    #[arg(long)]
    pub codes: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
    #[arg(long)]
    pub months: Option<usize>,
    #[arg(long)]
    pub lookback_days: Option<u32>,
    #[arg(long)]
    pub top_n: Option<usize>,
    #[arg(long)]
    pub holding_days: Option<u32>,
    #[arg(long)]
    pub start_year: Option<i32>,
    #[arg(long)]
    pub start_month: Option<u32>,
    /// Fetch and score instruments in parallel
    #[arg(long)]
    pub parallel: bool,
}

impl BacktestArgs {
    pub fn apply(&self, config: &mut BacktestConfig) {
        if let Some(v) = self.months {
            config.months = v;
        }
        if let Some(v) = self.lookback_days {
            config.screen.lookback_days = v;
        }
        if let Some(v) = self.top_n {
            config.top_n = v;
        }
        if let Some(v) = self.holding_days {
            config.holding_days = v;
        }
        if let Some(v) = self.start_year {
            config.start_year = v;
        }
        if let Some(v) = self.start_month {
            config.start_month = v;
        }
        if self.parallel {
            config.screen.parallel = true;
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct WalkForwardArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
    #[arg(long)]
    pub train_months: Option<usize>,
    #[arg(long)]
    pub test_months: Option<usize>,
    #[arg(long)]
    pub total_months: Option<usize>,
    #[arg(long)]
    pub top_n: Option<usize>,
    #[arg(long)]
    pub holding_days: Option<u32>,
    #[arg(long)]
    pub start_year: Option<i32>,
    #[arg(long)]
    pub start_month: Option<u32>,
    #[arg(long)]
    pub parallel: bool,
}

impl WalkForwardArgs {
    pub fn apply(&self, config: &mut WalkForwardConfig) {
        if let Some(v) = self.train_months {
            config.train_months = v;
        }
        if let Some(v) = self.test_months {
            config.test_months = v;
        }
        if let Some(v) = self.total_months {
            config.total_months = v;
        }
        if let Some(v) = self.top_n {
            config.top_n = v;
        }
        if let Some(v) = self.holding_days {
            config.holding_days = v;
        }
        if let Some(v) = self.start_year {
            config.start_year = v;
        }
        if let Some(v) = self.start_month {
            config.start_month = v;
        }
        if self.parallel {
            config.screen.parallel = true;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the monthly point-in-time backtest
    Backtest(BacktestArgs),
    /// Run walk-forward validation
    WalkForward(WalkForwardArgs),
    /// Rank the universe as of a date
    Screen {
        #[command(flatten)]
        source: SourceArgs,
        /// Decision date (YYYY-MM-DD); only prices before it are used
        #[arg(long)]
        date: NaiveDate,
        /// Show only the best N instruments
        #[arg(long)]
        top: Option<usize>,
        /// Write the ranking to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        parallel: bool,
    },
    /// Summarize an exported walk-forward table
    Analyze {
        /// Directory holding walkforward_results.csv; outputs land here too
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Check a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest(args) => run_backtest(&args),
        Command::WalkForward(args) => run_walk_forward(&args),
        Command::Screen {
            source,
            date,
            top,
            output,
            parallel,
        } => run_screen(&source, date, top, output.as_deref(), parallel),
        Command::Analyze { dir } => run_analyze(&dir),
        Command::Validate { config, data_dir } => run_validate(&config, data_dir.as_deref()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

/// Loads the INI file, or an empty configuration when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, PitbackError> {
    match path {
        Some(p) => {
            info!(path = %p.display(), "loading config");
            FileConfigAdapter::from_file(p)
        }
        None => FileConfigAdapter::from_string(""),
    }
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<usize, PitbackError> {
    let value = config.get_int(section, key, default);
    usize::try_from(value)
        .map_err(|_| PitbackError::invalid(section, key, format!("{} must be non-negative", key)))
}

fn get_u32(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<u32, PitbackError> {
    let value = config.get_int(section, key, default);
    u32::try_from(value)
        .map_err(|_| PitbackError::invalid(section, key, format!("{} is out of range", key)))
}

fn get_i32(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i32, PitbackError> {
    let value = config.get_int(section, key, default);
    i32::try_from(value)
        .map_err(|_| PitbackError::invalid(section, key, format!("{} is out of range", key)))
}

pub fn build_screen_config(config: &dyn ConfigPort) -> Result<ScreenConfig, PitbackError> {
    let defaults = ScreenConfig::default();
    Ok(ScreenConfig {
        lookback_days: get_u32(config, "backtest", "lookback_days", defaults.lookback_days.into())?,
        trend_window: get_usize(config, "scoring", "trend_window", defaults.trend_window as i64)?,
        momentum_period: get_usize(
            config,
            "scoring",
            "momentum_period",
            defaults.momentum_period as i64,
        )?,
        trend_weight: config.get_double("scoring", "trend_weight", defaults.trend_weight),
        momentum_weight: config.get_double("scoring", "momentum_weight", defaults.momentum_weight),
        trend_threshold_pct: config.get_double(
            "scoring",
            "trend_threshold_pct",
            defaults.trend_threshold_pct,
        ),
        parallel: config.get_bool("backtest", "parallel_fetch", defaults.parallel),
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, PitbackError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        months: get_usize(config, "backtest", "months", defaults.months as i64)?,
        top_n: get_usize(config, "backtest", "top_n", defaults.top_n as i64)?,
        holding_days: get_u32(config, "backtest", "holding_days", defaults.holding_days.into())?,
        start_year: get_i32(config, "backtest", "start_year", defaults.start_year.into())?,
        start_month: get_u32(config, "backtest", "start_month", defaults.start_month.into())?,
        decision_day: get_u32(config, "backtest", "decision_day", defaults.decision_day.into())?,
        forward_buffer_days: get_u32(
            config,
            "backtest",
            "forward_buffer_days",
            defaults.forward_buffer_days.into(),
        )?,
        benchmark: config
            .get_string("backtest", "benchmark")
            .unwrap_or(defaults.benchmark),
        screen: build_screen_config(config)?,
    })
}

/// `top_n`, `decision_day` and `benchmark` fall back to `[backtest]` when the
/// `[walk_forward]` section does not set them.
pub fn build_walk_forward_config(
    config: &dyn ConfigPort,
) -> Result<WalkForwardConfig, PitbackError> {
    let defaults = WalkForwardConfig::default();
    let top_n = config.get_int("backtest", "top_n", defaults.top_n as i64);
    let decision_day = config.get_int("backtest", "decision_day", defaults.decision_day.into());
    Ok(WalkForwardConfig {
        train_months: get_usize(config, "walk_forward", "train_months", defaults.train_months as i64)?,
        test_months: get_usize(config, "walk_forward", "test_months", defaults.test_months as i64)?,
        total_months: get_usize(config, "walk_forward", "total_months", defaults.total_months as i64)?,
        start_year: get_i32(config, "walk_forward", "start_year", defaults.start_year.into())?,
        start_month: get_u32(config, "walk_forward", "start_month", defaults.start_month.into())?,
        decision_day: get_u32(config, "walk_forward", "decision_day", decision_day)?,
        top_n: get_usize(config, "walk_forward", "top_n", top_n)?,
        holding_days: get_u32(config, "walk_forward", "holding_days", defaults.holding_days.into())?,
        benchmark: config
            .get_string("walk_forward", "benchmark")
            .or_else(|| config.get_string("backtest", "benchmark"))
            .unwrap_or(defaults.benchmark),
        screen: build_screen_config(config)?,
    })
}

/// Override, then `[universe] codes`, then the built-in universe.
pub fn resolve_universe(
    codes_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, PitbackError> {
    let codes = match codes_override {
        Some(codes) => codes.to_string(),
        None => match config.get_string("universe", "codes") {
            Some(codes) => codes,
            None => return Ok(default_universe()),
        },
    };
    parse_tickers(&codes).map_err(|e| PitbackError::invalid("universe", "codes", e.to_string()))
}

pub fn resolve_data_dir(data_dir: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    match data_dir {
        Some(p) => p.to_path_buf(),
        None if config.has("data", "path") => config
            .get_string("data", "path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        None => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

fn run_backtest(args: &BacktestArgs) -> Result<(), PitbackError> {
    let adapter = load_config(args.source.config.as_deref())?;
    validate_backtest_config(&adapter)?;
    validate_scoring_config(&adapter)?;
    validate_universe_config(&adapter)?;

    let mut config = build_backtest_config(&adapter)?;
    args.apply(&mut config);
    let universe = resolve_universe(args.source.codes.as_deref(), &adapter)?;

    let data_port = CsvAdapter::new(resolve_data_dir(args.source.data_dir.as_deref(), &adapter));
    let report = CsvReportAdapter::new(args.output_dir.clone());

    let result = run_backtest_pipeline(&data_port, &report, config, universe)?;
    print_backtest_summary(&result);
    Ok(())
}

/// Runs the backtest against `data_port`, exports through `report`, and fails
/// with [`PitbackError::NoResults`] when no period measured an instrument.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report: &dyn ReportPort,
    config: BacktestConfig,
    universe: Vec<String>,
) -> Result<BacktestResult, PitbackError> {
    let engine = BacktestEngine::new(config, universe)?;
    let result = engine.run(data_port);

    report.write_periods(&result.periods)?;
    report.write_picks(&result.picks)?;
    report.write_errors(&result.errors)?;

    if !result.has_results() {
        return Err(PitbackError::NoResults {
            periods: result.periods.len(),
        });
    }
    Ok(result)
}

fn print_backtest_summary(result: &BacktestResult) {
    println!("\n=== Monthly Results ===");
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>6}",
        "Month", "Portfolio", "Benchmark", "Alpha", "Picks"
    );
    for p in &result.periods {
        println!(
            "{:<10} {:>9.2}% {:>9.2}% {:>+9.2}% {:>6}",
            p.label, p.portfolio_return, p.benchmark_return, p.outperformance, p.instruments
        );
    }

    let s = &result.stats;
    println!("\n=== Summary ===");
    println!("Periods:            {}", s.periods);
    println!("Total Return:       {:.2}%", s.total_return);
    println!("Mean Return:        {:.2}%", s.mean_return);
    println!("Median Return:      {:.2}%", s.median_return);
    println!("Std Dev:            {:.2}%", s.std_return);
    println!("Win Rate:           {:.1}%", s.win_rate * 100.0);
    println!("Beat Benchmark:     {:.1}%", s.beat_rate * 100.0);
    println!("Sharpe Ratio:       {:.2}", s.sharpe_ratio);
    println!("Sortino Ratio:      {:.2}", s.sortino_ratio);
    println!("Max Drawdown:       {:.2}%", s.max_drawdown);
    println!("Benchmark Total:    {:.2}%", s.benchmark_total);
    println!("Total Alpha:        {:+.2}%", s.total_outperformance);
    println!("Avg Alpha:          {:+.2}%", s.avg_outperformance);
    if let Some((label, r)) = &s.best_period {
        println!("Best Period:        {} ({:+.2}%)", label, r);
    }
    if let Some((label, r)) = &s.worst_period {
        println!("Worst Period:       {} ({:+.2}%)", label, r);
    }
    if !result.errors.is_empty() {
        println!("\n{} recoverable errors logged", result.errors.len());
    }
}

fn run_walk_forward(args: &WalkForwardArgs) -> Result<(), PitbackError> {
    let adapter = load_config(args.source.config.as_deref())?;
    validate_walk_forward_config(&adapter)?;
    validate_scoring_config(&adapter)?;
    validate_universe_config(&adapter)?;

    let mut config = build_walk_forward_config(&adapter)?;
    args.apply(&mut config);
    let universe = resolve_universe(args.source.codes.as_deref(), &adapter)?;

    let data_port = CsvAdapter::new(resolve_data_dir(args.source.data_dir.as_deref(), &adapter));
    let report = CsvReportAdapter::new(args.output_dir.clone());

    let result = run_walk_forward_pipeline(&data_port, &report, config, universe)?;
    print_walk_forward_summary(&result);
    Ok(())
}

pub fn run_walk_forward_pipeline(
    data_port: &dyn DataPort,
    report: &dyn ReportPort,
    config: WalkForwardConfig,
    universe: Vec<String>,
) -> Result<WalkForwardResult, PitbackError> {
    let validator = WalkForwardValidator::new(config, universe)?;
    let result = validator.run(data_port);

    report.write_walk_forward(&result.rows)?;
    report.write_walk_forward_picks(&result.picks)?;
    report.write_walk_forward_errors(&result.errors)?;

    if !result.has_results() {
        return Err(PitbackError::NoResults {
            periods: result.rows.len(),
        });
    }
    Ok(result)
}

fn print_walk_forward_summary(result: &WalkForwardResult) {
    println!("\n=== Walk-Forward Periods ===");
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>6}",
        "Month", "Portfolio", "Benchmark", "Edge", "Picks"
    );
    for r in &result.rows {
        println!(
            "{:<10} {:>9.2}% {:>9.2}% {:>+9.2}% {:>6}",
            r.label, r.portfolio, r.benchmark, r.edge, r.instruments
        );
    }
    let metrics = walk_forward_metrics(&result.rows);
    println!("\nAvg Edge:   {:+.2}%", metrics.avg_edge);
    println!("Win Rate:   {:.1}%", metrics.win_rate * 100.0);
}

fn run_screen(
    source: &SourceArgs,
    date: NaiveDate,
    top: Option<usize>,
    output: Option<&Path>,
    parallel: bool,
) -> Result<(), PitbackError> {
    let adapter = load_config(source.config.as_deref())?;
    validate_backtest_config(&adapter)?;
    validate_scoring_config(&adapter)?;
    validate_universe_config(&adapter)?;

    let mut screen_config = build_screen_config(&adapter)?;
    if parallel {
        screen_config.parallel = true;
    }
    let universe = resolve_universe(source.codes.as_deref(), &adapter)?;
    let data_port = CsvAdapter::new(resolve_data_dir(source.data_dir.as_deref(), &adapter));

    let outcome = run_screen_pipeline(&data_port, &screen_config, &universe, date, top)?;

    if let Some(path) = output {
        csv_report_adapter::write_screen(path, &outcome)?;
        info!(path = %path.display(), "ranking written");
    }
    print_screen(&outcome);
    Ok(())
}

/// Screens `universe` as of `date`, keeping at most `top` picks.
pub fn run_screen_pipeline(
    data_port: &dyn DataPort,
    screen_config: &ScreenConfig,
    universe: &[String],
    date: NaiveDate,
    top: Option<usize>,
) -> Result<ScreenOutcome, PitbackError> {
    let screener = screen_config.build()?;
    let mut outcome = screener.screen(data_port, universe, date);
    if let Some(n) = top {
        outcome.ranked.truncate(n);
    }
    if outcome.ranked.is_empty() {
        return Err(PitbackError::NoResults { periods: 1 });
    }
    Ok(outcome)
}

fn print_screen(outcome: &ScreenOutcome) {
    println!("\n=== Screen as of {} ===", outcome.as_of);
    println!(
        "{:>4} {:<14} {:>10} {:>10} {:>8} {:>6} {:<10}",
        "Rank", "Ticker", "Price", "Trend", "Momentum", "Score", "Rating"
    );
    for (idx, pick) in outcome.ranked.iter().enumerate() {
        println!(
            "{:>4} {:<14} {:>10.2} {:>10.2} {:>8.2} {:>6.2} {:<10}",
            idx + 1,
            pick.ticker,
            pick.entry_price,
            pick.trend_value,
            pick.momentum_value,
            pick.score,
            pick.rating()
        );
    }
    if !outcome.skipped.is_empty() {
        println!("\n{} instruments skipped", outcome.skipped.len());
    }
}

fn run_analyze(dir: &Path) -> Result<(), PitbackError> {
    let report = CsvReportAdapter::new(dir.to_path_buf());
    info!(path = %report.path(csv_report_adapter::WALK_FORWARD_FILE).display(), "reading walk-forward table");
    let rows = report.read_walk_forward()?;
    if rows.is_empty() {
        return Err(PitbackError::NoResults { periods: 0 });
    }

    let metrics = walk_forward_metrics(&rows);
    let regimes = regime_summary(&rows);
    let portfolio: Vec<f64> = rows.iter().map(|r| r.portfolio).collect();
    let curve = drawdown_curve(&portfolio);

    report.write_metrics(&metrics)?;
    report.write_regimes(&regimes)?;
    report.write_drawdown(&rows, &curve)?;

    println!("\n=== Walk-Forward Metrics ({} periods) ===", rows.len());
    println!("Portfolio Mean:   {:+.2}%", metrics.portfolio_mean);
    println!("Portfolio Std:    {:.2}%", metrics.portfolio_std);
    println!("Sharpe (proxy):   {:.2}", metrics.portfolio_sharpe);
    println!("Benchmark Mean:   {:+.2}%", metrics.benchmark_mean);
    println!("Benchmark Std:    {:.2}%", metrics.benchmark_std);
    println!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    println!("Avg Edge:         {:+.2}%", metrics.avg_edge);
    println!("Total Edge:       {:+.2}%", metrics.total_edge);

    println!("\n=== Regimes ===");
    for r in &regimes {
        println!(
            "{:<5} {:>3} periods  portfolio {:+.2}%  benchmark {:+.2}%  edge {:+.2}%",
            r.regime.to_string(),
            r.periods,
            r.portfolio,
            r.benchmark,
            r.edge
        );
    }
    Ok(())
}

pub fn run_validate(config_path: &Path, data_dir: Option<&Path>) -> Result<(), PitbackError> {
    let adapter = load_config(Some(config_path))?;
    validate_backtest_config(&adapter)?;
    validate_scoring_config(&adapter)?;
    validate_walk_forward_config(&adapter)?;
    validate_universe_config(&adapter)?;

    let backtest = build_backtest_config(&adapter)?;
    backtest.validate()?;
    backtest.screen.build()?;
    let walk_forward = build_walk_forward_config(&adapter)?;
    walk_forward.validate()?;
    let universe = resolve_universe(None, &adapter)?;

    println!("Configuration is valid");
    println!(
        "  backtest:     {} months from {}-{:02}, top {}, hold {} days (+{} buffer)",
        backtest.months,
        backtest.start_year,
        backtest.start_month,
        backtest.top_n,
        backtest.holding_days,
        backtest.forward_buffer_days
    );
    println!(
        "  walk-forward: train {} / test {} / total {} months, {} decision dates",
        walk_forward.train_months,
        walk_forward.test_months,
        walk_forward.total_months,
        walk_forward.decision_dates().len()
    );
    println!(
        "  scoring:      trend {:.2} x SMA({}), momentum {:.2} x RSI({})",
        backtest.screen.trend_weight,
        backtest.screen.trend_window,
        backtest.screen.momentum_weight,
        backtest.screen.momentum_period
    );
    println!("  benchmark:    {}", backtest.benchmark);
    println!("  universe:     {}", universe.join(", "));

    let dir = resolve_data_dir(data_dir, &adapter);
    match CsvAdapter::new(dir.clone()).list_symbols() {
        Ok(symbols) => {
            let missing: Vec<&String> = universe
                .iter()
                .chain(std::iter::once(&backtest.benchmark))
                .filter(|t| !symbols.contains(*t))
                .collect();
            if missing.is_empty() {
                println!("  data:         all instruments present in {}", dir.display());
            } else {
                for ticker in &missing {
                    warn!(ticker = %ticker, dir = %dir.display(), "no price file");
                }
                println!("  data:         {} instruments missing in {}", missing.len(), dir.display());
            }
        }
        Err(e) => warn!(dir = %dir.display(), "cannot list price files: {e}"),
    }
    Ok(())
}
