//! Simple Moving Average, the trend indicator.
//!
//! SMA(n)[i] = mean(P[i-n+1..=i]). Warmup: first (n-1) points are undefined.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::price::PriceSeries;

pub fn calculate_sma(series: &PriceSeries, window: usize) -> IndicatorSeries {
    if window == 0 {
        return IndicatorSeries::undefined(IndicatorType::Sma(window), series);
    }

    let closes = series.closes();
    let values = series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let value = if i + 1 >= window {
                Some(closes[i + 1 - window..=i].iter().sum::<f64>() / window as f64)
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
        indicator_type: IndicatorType::Sma(window),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PricePoint;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_series(prices: &[f64]) -> PriceSeries {
        PriceSeries::from_points(
            prices
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                    close,
                })
                .collect(),
        )
    }

    #[test]
    fn sma_warmup() {
        let series = calculate_sma(&make_series(&[10.0, 20.0, 30.0, 40.0]), 3);
        assert_eq!(series.values[0].value, None);
        assert_eq!(series.values[1].value, None);
        assert!(series.values[2].value.is_some());
        assert!(series.values[3].value.is_some());
    }

    #[test]
    fn sma_values() {
        let series = calculate_sma(&make_series(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        assert_relative_eq!(series.values[2].value.unwrap(), 20.0);
        assert_relative_eq!(series.values[3].value.unwrap(), 30.0);
        assert_relative_eq!(series.values[4].value.unwrap(), 40.0);
        assert_relative_eq!(series.latest().unwrap(), 40.0);
    }

    #[test]
    fn sma_window_one_is_identity() {
        let series = calculate_sma(&make_series(&[5.0, 7.0]), 1);
        assert_eq!(series.values[0].value, Some(5.0));
        assert_eq!(series.values[1].value, Some(7.0));
    }

    #[test]
    fn sma_zero_window_is_undefined() {
        let series = calculate_sma(&make_series(&[5.0, 7.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn sma_window_longer_than_series() {
        let series = calculate_sma(&make_series(&[1.0, 2.0, 3.0]), 50);
        assert_eq!(series.latest(), None);
        assert_eq!(series.indicator_type, IndicatorType::Sma(50));
    }
}
