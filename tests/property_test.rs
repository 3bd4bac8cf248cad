//! Property tests for the scoring bounds and the momentum indicator range.

mod common;

use common::*;
use pitback::domain::indicator::rsi::calculate_rsi;
use pitback::domain::indicator::sma::calculate_sma;
use pitback::domain::scorer::{Rating, Scorer};
use proptest::prelude::*;

proptest! {
    #[test]
    fn score_stays_in_unit_range(
        trend_weight in 0.0f64..=1.0,
        price in 0.01f64..1.0e6,
        trend in proptest::option::of(-1.0e6f64..1.0e6),
        momentum in proptest::option::of(-50.0f64..150.0),
    ) {
        let scorer = Scorer::new(trend_weight, 1.0 - trend_weight).unwrap();
        let score = scorer.score(price, trend, momentum);
        prop_assert!((-1.0..=1.0).contains(&score), "score {} out of range", score);
    }

    #[test]
    fn rating_bands_are_monotonic(a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
        let rank = |r: Rating| match r {
            Rating::Sell => 0,
            Rating::Hold => 1,
            Rating::Buy => 2,
            Rating::StrongBuy => 3,
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(Rating::from_score(lo)) <= rank(Rating::from_score(hi)));
    }

    #[test]
    fn rsi_is_bounded_or_undefined(
        closes in proptest::collection::vec(0.5f64..500.0, 1..120),
        period in 1usize..30,
    ) {
        let series = daily_series(ymd(2024, 1, 1), closes.len() as i64, |i| closes[i as usize]);
        let rsi = calculate_rsi(&series, period);

        prop_assert_eq!(rsi.values.len(), closes.len());
        for (i, point) in rsi.values.iter().enumerate() {
            if let Some(v) = point.value {
                prop_assert!(i >= period);
                prop_assert!((0.0..=100.0).contains(&v), "rsi {} out of range", v);
            }
        }
    }

    #[test]
    fn sma_stays_within_window_extremes(
        closes in proptest::collection::vec(1.0f64..1000.0, 1..80),
        window in 1usize..20,
    ) {
        let series = daily_series(ymd(2024, 1, 1), closes.len() as i64, |i| closes[i as usize]);
        let sma = calculate_sma(&series, window);

        for (i, point) in sma.values.iter().enumerate() {
            if let Some(v) = point.value {
                let slice = &closes[i + 1 - window..=i];
                let min = slice.iter().copied().fold(f64::INFINITY, f64::min);
                let max = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(v >= min - 1e-9 && v <= max + 1e-9);
            } else {
                prop_assert!(i + 1 < window);
            }
        }
    }
}
