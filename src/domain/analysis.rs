//! Post-run analysis over exported walk-forward rows: aggregate metrics and
//! benchmark-regime segmentation.

use crate::domain::metrics::{mean, sample_std};
use crate::domain::walk_forward::WalkForwardRow;
use std::fmt;

/// Benchmark return (percent) above which a period counts as a bull regime,
/// and below whose negation it counts as bear.
pub const REGIME_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct WalkForwardMetrics {
    pub portfolio_mean: f64,
    pub portfolio_std: f64,
    pub portfolio_sharpe: f64,
    pub benchmark_mean: f64,
    pub benchmark_std: f64,
    /// Fraction of periods where the portfolio beat the benchmark.
    pub win_rate: f64,
    pub avg_edge: f64,
    pub total_edge: f64,
}

pub fn walk_forward_metrics(rows: &[WalkForwardRow]) -> WalkForwardMetrics {
    let portfolio: Vec<f64> = rows.iter().map(|r| r.portfolio).collect();
    let benchmark: Vec<f64> = rows.iter().map(|r| r.benchmark).collect();
    let edge: Vec<f64> = rows.iter().map(|r| r.portfolio - r.benchmark).collect();

    let portfolio_mean = mean(&portfolio);
    let portfolio_std = sample_std(&portfolio);
    let win_rate = if rows.is_empty() {
        0.0
    } else {
        rows.iter().filter(|r| r.portfolio > r.benchmark).count() as f64 / rows.len() as f64
    };

    WalkForwardMetrics {
        portfolio_mean,
        portfolio_std,
        portfolio_sharpe: if portfolio_std != 0.0 {
            portfolio_mean / portfolio_std
        } else {
            0.0
        },
        benchmark_mean: mean(&benchmark),
        benchmark_std: sample_std(&benchmark),
        win_rate,
        avg_edge: mean(&edge),
        total_edge: edge.iter().sum(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regime {
    Bull,
    Flat,
    Bear,
}

impl Regime {
    pub fn classify(benchmark_return: f64) -> Self {
        if benchmark_return > REGIME_THRESHOLD {
            Regime::Bull
        } else if benchmark_return < -REGIME_THRESHOLD {
            Regime::Bear
        } else {
            Regime::Flat
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Bull => write!(f, "Bull"),
            Regime::Flat => write!(f, "Flat"),
            Regime::Bear => write!(f, "Bear"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeSummary {
    pub regime: Regime,
    pub periods: usize,
    pub portfolio: f64,
    pub benchmark: f64,
    pub edge: f64,
}

/// Mean portfolio, benchmark and edge per regime. Only regimes that occur are
/// reported, in Bull, Flat, Bear order.
pub fn regime_summary(rows: &[WalkForwardRow]) -> Vec<RegimeSummary> {
    [Regime::Bull, Regime::Flat, Regime::Bear]
        .into_iter()
        .filter_map(|regime| {
            let members: Vec<&WalkForwardRow> = rows
                .iter()
                .filter(|r| Regime::classify(r.benchmark) == regime)
                .collect();
            if members.is_empty() {
                return None;
            }
            let portfolio: Vec<f64> = members.iter().map(|r| r.portfolio).collect();
            let benchmark: Vec<f64> = members.iter().map(|r| r.benchmark).collect();
            let edge: Vec<f64> = members.iter().map(|r| r.portfolio - r.benchmark).collect();
            Some(RegimeSummary {
                regime,
                periods: members.len(),
                portfolio: mean(&portfolio),
                benchmark: mean(&benchmark),
                edge: mean(&edge),
            })
        })
        .collect()
}
