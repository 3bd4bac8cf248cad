//! Performance statistics over per-period returns.
//!
//! All returns are percentages (5.0 means +5%). Rates are fractions in [0, 1].

use crate::domain::backtest::PeriodResult;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub periods: usize,
    pub total_return: f64,
    pub mean_return: f64,
    pub median_return: f64,
    pub std_return: f64,
    pub win_rate: f64,
    pub beat_rate: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub benchmark_total: f64,
    pub benchmark_mean: f64,
    pub total_outperformance: f64,
    pub avg_outperformance: f64,
    pub best_period: Option<(String, f64)>,
    pub worst_period: Option<(String, f64)>,
}

impl SummaryStats {
    pub fn compute(periods: &[PeriodResult]) -> Self {
        let returns: Vec<f64> = periods.iter().map(|p| p.portfolio_return).collect();
        let benchmark: Vec<f64> = periods.iter().map(|p| p.benchmark_return).collect();
        let outperformance: Vec<f64> = periods.iter().map(|p| p.outperformance).collect();

        let mean_return = mean(&returns);
        let std_return = population_std(&returns);

        let sharpe_ratio = if std_return > 0.0 {
            mean_return / std_return
        } else {
            0.0
        };

        let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        let downside_std = population_std(&negative);
        let sortino_ratio = if downside_std > 0.0 {
            mean_return / downside_std
        } else {
            0.0
        };

        let best_period = periods
            .iter()
            .max_by(|a, b| a.portfolio_return.total_cmp(&b.portfolio_return))
            .map(|p| (p.label.clone(), p.portfolio_return));
        let worst_period = periods
            .iter()
            .min_by(|a, b| a.portfolio_return.total_cmp(&b.portfolio_return))
            .map(|p| (p.label.clone(), p.portfolio_return));

        SummaryStats {
            periods: periods.len(),
            total_return: returns.iter().sum(),
            mean_return,
            median_return: median(&returns),
            std_return,
            win_rate: fraction(&returns, |r| r > 0.0),
            beat_rate: fraction(&outperformance, |r| r > 0.0),
            sharpe_ratio,
            sortino_ratio,
            max_drawdown: max_drawdown(&returns),
            benchmark_total: benchmark.iter().sum(),
            benchmark_mean: mean(&benchmark),
            total_outperformance: outperformance.iter().sum(),
            avg_outperformance: mean(&outperformance),
            best_period,
            worst_period,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownPoint {
    pub equity: f64,
    /// Decline from the running peak, as a non-positive percentage.
    pub drawdown: f64,
}

/// Compounded equity curve starting at 1.0 with its running drawdown.
pub fn drawdown_curve(returns: &[f64]) -> Vec<DrawdownPoint> {
    let mut equity = 1.0_f64;
    let mut peak = f64::MIN;
    returns
        .iter()
        .map(|r| {
            equity *= 1.0 + r / 100.0;
            peak = peak.max(equity);
            let drawdown = if peak > 0.0 {
                (equity - peak) / peak * 100.0
            } else {
                0.0
            };
            DrawdownPoint { equity, drawdown }
        })
        .collect()
}

/// Deepest point of [`drawdown_curve`], 0 for an empty or never-declining series.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    drawdown_curve(returns)
        .iter()
        .map(|p| p.drawdown)
        .fold(0.0, f64::min)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

pub(crate) fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64).sqrt()
}

fn fraction(values: &[f64], pred: impl Fn(f64) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|v| pred(**v)).count() as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn period(label: &str, portfolio: f64, benchmark: f64) -> PeriodResult {
        PeriodResult {
            label: label.to_string(),
            decision_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            portfolio_return: portfolio,
            benchmark_return: benchmark,
            outperformance: portfolio - benchmark,
            instruments: 3,
        }
    }

    #[test]
    fn drawdown_example() {
        let curve = drawdown_curve(&[5.0, -10.0, 2.0]);
        assert_relative_eq!(curve[0].equity, 1.05, epsilon = 1e-12);
        assert_relative_eq!(curve[1].equity, 0.945, epsilon = 1e-12);
        assert_relative_eq!(curve[2].equity, 0.9639, epsilon = 1e-12);
        assert_relative_eq!(curve[0].drawdown, 0.0);
        assert_relative_eq!(curve[1].drawdown, -10.0, epsilon = 1e-9);
        assert_relative_eq!(curve[2].drawdown, -8.2, epsilon = 1e-9);
        assert_relative_eq!(max_drawdown(&[5.0, -10.0, 2.0]), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_from_first_period_loss() {
        // the first period itself sets the peak
        assert_relative_eq!(max_drawdown(&[-5.0, -5.0]), -5.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_empty_and_rising() {
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn summary_basic() {
        let periods = vec![
            period("Jan 2024", 5.0, 2.0),
            period("Feb 2024", -10.0, -4.0),
            period("Mar 2024", 2.0, 3.0),
        ];
        let stats = SummaryStats::compute(&periods);

        assert_eq!(stats.periods, 3);
        assert_relative_eq!(stats.total_return, -3.0);
        assert_relative_eq!(stats.mean_return, -1.0);
        assert_relative_eq!(stats.median_return, 2.0);
        assert_relative_eq!(stats.win_rate, 2.0 / 3.0);
        // outperformance: +3, -6, -1
        assert_relative_eq!(stats.beat_rate, 1.0 / 3.0);
        assert_relative_eq!(stats.benchmark_total, 1.0);
        assert_relative_eq!(stats.total_outperformance, -4.0);
        assert_relative_eq!(stats.max_drawdown, -10.0, epsilon = 1e-9);
        assert_eq!(stats.best_period, Some(("Jan 2024".to_string(), 5.0)));
        assert_eq!(stats.worst_period, Some(("Feb 2024".to_string(), -10.0)));
    }

    #[test]
    fn summary_std_and_sharpe() {
        let periods = vec![period("A", 2.0, 0.0), period("B", 4.0, 0.0)];
        let stats = SummaryStats::compute(&periods);
        assert_relative_eq!(stats.std_return, 1.0);
        assert_relative_eq!(stats.sharpe_ratio, 3.0);
        assert_eq!(stats.sortino_ratio, 0.0);
    }

    #[test]
    fn summary_sortino_uses_negative_periods() {
        let periods = vec![
            period("A", 6.0, 0.0),
            period("B", -1.0, 0.0),
            period("C", -3.0, 0.0),
        ];
        let stats = SummaryStats::compute(&periods);
        // mean 2/3, std of [-1, -3] = 1
        assert_relative_eq!(stats.sortino_ratio, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn summary_flat_returns_have_zero_ratios() {
        let periods = vec![period("A", 0.0, 0.0), period("B", 0.0, 0.0)];
        let stats = SummaryStats::compute(&periods);
        assert_eq!(stats.sharpe_ratio, 0.0);
        assert_eq!(stats.sortino_ratio, 0.0);
        assert_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn summary_empty() {
        let stats = SummaryStats::compute(&[]);
        assert_eq!(stats.periods, 0);
        assert_eq!(stats.mean_return, 0.0);
        assert_eq!(stats.best_period, None);
    }

    #[test]
    fn median_even_count() {
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        assert_relative_eq!(sample_std(&[2.0, 4.0]), 2.0_f64.sqrt());
        assert_eq!(sample_std(&[2.0]), 0.0);
    }
}
