//! RSI (Relative Strength Index), the momentum indicator.
//!
//! Deltas are split into gains (positive deltas) and losses (negated negative
//! deltas), each averaged with a simple rolling mean over `n` deltas:
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! - avg_loss == 0, avg_gain > 0: RSI = 100
//! - avg_loss == 0, avg_gain == 0: undefined (flat window)
//!
//! Warmup: first n points are undefined (need n deltas).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PriceSeries;

pub fn calculate_rsi(series: &PriceSeries, period: usize) -> IndicatorSeries {
    if period == 0 || series.len() < 2 {
        return IndicatorSeries::undefined(IndicatorType::Rsi(period), series);
    }

    let closes = series.closes();
    // gains[k] / losses[k] belong to the change from point k to point k+1
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let values = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let value = if i >= period {
                let from = i - period;
                let avg_gain = gains[from..i].iter().sum::<f64>() / period as f64;
                let avg_loss = losses[from..i].iter().sum::<f64>() / period as f64;
                rsi_from_averages(avg_gain, avg_loss)
            } else {
                None
            };
            IndicatorPoint {
                date: point.date,
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return None;
        }
        return Some(100.0);
    }
    let rsi = 100.0 - (100.0 / (1.0 + avg_gain / avg_loss));
    rsi.is_finite().then(|| rsi.clamp(0.0, 100.0))
}
