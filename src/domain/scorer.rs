//! Trend + momentum scoring.
//!
//! score = w_trend * trend_signal + w_momentum * momentum_signal, rounded to 2dp.
//! With trend_signal in {-1, 0, +1}, momentum_signal in {-0.5, 0, +1} and
//! non-negative weights summing to 1, the score lies in [-1, 1].

use crate::domain::error::PitbackError;
use std::fmt;

pub const DEFAULT_TREND_WEIGHT: f64 = 0.4;
pub const DEFAULT_MOMENTUM_WEIGHT: f64 = 0.6;
pub const DEFAULT_TREND_THRESHOLD_PCT: f64 = 1.0;

pub const MOMENTUM_STRONG: f64 = 60.0;
pub const MOMENTUM_WEAK: f64 = 40.0;

const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSignal {
    Up,
    Neutral,
    Down,
}

impl TrendSignal {
    pub fn value(self) -> f64 {
        match self {
            TrendSignal::Up => 1.0,
            TrendSignal::Neutral => 0.0,
            TrendSignal::Down => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentumSignal {
    Strong,
    Neutral,
    Weak,
}

impl MomentumSignal {
    pub fn value(self) -> f64 {
        match self {
            MomentumSignal::Strong => 1.0,
            MomentumSignal::Neutral => 0.0,
            MomentumSignal::Weak => -0.5,
        }
    }
}

/// Ordered score bands, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rating {
    StrongBuy,
    Buy,
    Hold,
    Sell,
}

impl Rating {
    /// `>= 0.7` strong buy, `>= 0.3` buy, `> -0.3` hold, otherwise sell.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            Rating::StrongBuy
        } else if score >= 0.3 {
            Rating::Buy
        } else if score > -0.3 {
            Rating::Hold
        } else {
            Rating::Sell
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rating::StrongBuy => "STRONG_BUY",
            Rating::Buy => "BUY",
            Rating::Hold => "HOLD",
            Rating::Sell => "SELL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scorer {
    trend_weight: f64,
    momentum_weight: f64,
    trend_threshold_pct: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            trend_weight: DEFAULT_TREND_WEIGHT,
            momentum_weight: DEFAULT_MOMENTUM_WEIGHT,
            trend_threshold_pct: DEFAULT_TREND_THRESHOLD_PCT,
        }
    }
}

impl Scorer {
    pub fn new(trend_weight: f64, momentum_weight: f64) -> Result<Self, PitbackError> {
        Self::with_threshold(trend_weight, momentum_weight, DEFAULT_TREND_THRESHOLD_PCT)
    }

    pub fn with_threshold(
        trend_weight: f64,
        momentum_weight: f64,
        trend_threshold_pct: f64,
    ) -> Result<Self, PitbackError> {
        for (key, weight) in [
            ("trend_weight", trend_weight),
            ("momentum_weight", momentum_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PitbackError::invalid(
                    "scoring",
                    key,
                    "weight must be a non-negative number",
                ));
            }
        }
        if (trend_weight + momentum_weight - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(PitbackError::invalid(
                "scoring",
                "trend_weight",
                format!(
                    "weights must sum to 1.0 (got {} + {})",
                    trend_weight, momentum_weight
                ),
            ));
        }
        if !trend_threshold_pct.is_finite() || trend_threshold_pct < 0.0 {
            return Err(PitbackError::invalid(
                "scoring",
                "trend_threshold_pct",
                "threshold must be a non-negative number",
            ));
        }
        Ok(Self {
            trend_weight,
            momentum_weight,
            trend_threshold_pct,
        })
    }

    /// Price relative to its trend value, neutral inside +/- threshold percent.
    pub fn trend_signal(&self, price: f64, trend_value: Option<f64>) -> TrendSignal {
        let trend = match trend_value {
            Some(t) if t.is_finite() && t != 0.0 => t,
            _ => return TrendSignal::Neutral,
        };
        if !price.is_finite() {
            return TrendSignal::Neutral;
        }

        let diff_pct = (price - trend) / trend * 100.0;
        if diff_pct > self.trend_threshold_pct {
            TrendSignal::Up
        } else if diff_pct < -self.trend_threshold_pct {
            TrendSignal::Down
        } else {
            TrendSignal::Neutral
        }
    }

    pub fn momentum_signal(&self, momentum_value: Option<f64>) -> MomentumSignal {
        let momentum = match momentum_value {
            Some(m) if !m.is_nan() => m.clamp(0.0, 100.0),
            _ => return MomentumSignal::Neutral,
        };
        if momentum > MOMENTUM_STRONG {
            MomentumSignal::Strong
        } else if momentum < MOMENTUM_WEAK {
            MomentumSignal::Weak
        } else {
            MomentumSignal::Neutral
        }
    }

    pub fn score(&self, price: f64, trend_value: Option<f64>, momentum_value: Option<f64>) -> f64 {
        let trend = self.trend_signal(price, trend_value).value();
        let momentum = self.momentum_signal(momentum_value).value();
        round2(self.trend_weight * trend + self.momentum_weight * momentum)
    }

    pub fn interpret(&self, score: f64) -> Rating {
        Rating::from_score(score)
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn strong_buy_example() {
        let scorer = Scorer::default();
        assert_eq!(scorer.trend_signal(500.0, Some(480.0)), TrendSignal::Up);
        assert_eq!(scorer.momentum_signal(Some(65.0)), MomentumSignal::Strong);
        let score = scorer.score(500.0, Some(480.0), Some(65.0));
        assert_relative_eq!(score, 1.0);
        assert_eq!(scorer.interpret(score), Rating::StrongBuy);
    }

    #[test]
    fn sell_example_weak_momentum() {
        let scorer = Scorer::default();
        assert_eq!(scorer.trend_signal(300.0, Some(310.0)), TrendSignal::Down);
        assert_eq!(scorer.momentum_signal(Some(35.0)), MomentumSignal::Weak);
        let score = scorer.score(300.0, Some(310.0), Some(35.0));
        assert_relative_eq!(score, -0.7);
        assert_eq!(scorer.interpret(score), Rating::Sell);
    }

    #[test]
    fn sell_example_just_below_threshold() {
        let scorer = Scorer::default();
        // (400 - 405) / 405 = -1.23%
        assert_eq!(scorer.trend_signal(400.0, Some(405.0)), TrendSignal::Down);
        assert_eq!(scorer.momentum_signal(Some(50.0)), MomentumSignal::Neutral);
        let score = scorer.score(400.0, Some(405.0), Some(50.0));
        assert_relative_eq!(score, -0.4);
        assert_eq!(scorer.interpret(score), Rating::Sell);
    }

    #[test]
    fn trend_inside_threshold_is_neutral() {
        let scorer = Scorer::default();
        assert_eq!(scorer.trend_signal(101.0, Some(100.0)), TrendSignal::Neutral);
        assert_eq!(scorer.trend_signal(99.0, Some(100.0)), TrendSignal::Neutral);
        assert_eq!(scorer.trend_signal(101.5, Some(100.0)), TrendSignal::Up);
    }

    #[test]
    fn missing_inputs_are_neutral() {
        let scorer = Scorer::default();
        assert_eq!(scorer.trend_signal(100.0, None), TrendSignal::Neutral);
        assert_eq!(scorer.trend_signal(100.0, Some(0.0)), TrendSignal::Neutral);
        assert_eq!(scorer.trend_signal(f64::NAN, Some(90.0)), TrendSignal::Neutral);
        assert_eq!(scorer.momentum_signal(None), MomentumSignal::Neutral);
        assert_eq!(scorer.momentum_signal(Some(f64::NAN)), MomentumSignal::Neutral);
        assert_relative_eq!(scorer.score(100.0, None, None), 0.0);
    }

    #[test]
    fn momentum_is_clamped() {
        let scorer = Scorer::default();
        assert_eq!(scorer.momentum_signal(Some(150.0)), MomentumSignal::Strong);
        assert_eq!(scorer.momentum_signal(Some(-20.0)), MomentumSignal::Weak);
    }

    #[test]
    fn momentum_boundaries_are_exclusive() {
        let scorer = Scorer::default();
        assert_eq!(scorer.momentum_signal(Some(60.0)), MomentumSignal::Neutral);
        assert_eq!(scorer.momentum_signal(Some(40.0)), MomentumSignal::Neutral);
    }

    #[test]
    fn rating_band_boundaries() {
        assert_eq!(Rating::from_score(1.0), Rating::StrongBuy);
        assert_eq!(Rating::from_score(0.7), Rating::StrongBuy);
        assert_eq!(Rating::from_score(0.69), Rating::Buy);
        assert_eq!(Rating::from_score(0.3), Rating::Buy);
        assert_eq!(Rating::from_score(0.29), Rating::Hold);
        assert_eq!(Rating::from_score(-0.29), Rating::Hold);
        assert_eq!(Rating::from_score(-0.3), Rating::Sell);
        assert_eq!(Rating::from_score(-1.0), Rating::Sell);
    }

    #[test]
    fn rating_display() {
        assert_eq!(Rating::StrongBuy.to_string(), "STRONG_BUY");
        assert_eq!(Rating::Hold.to_string(), "HOLD");
        assert!(Rating::StrongBuy < Rating::Sell);
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(Scorer::new(0.5, 0.5).is_ok());
        assert!(Scorer::new(1.0, 0.0).is_ok());
        let err = Scorer::new(0.5, 0.6).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn negative_weights_rejected() {
        assert!(Scorer::new(-0.5, 1.5).is_err());
        assert!(Scorer::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(Scorer::with_threshold(0.4, 0.6, -1.0).is_err());
        assert!(Scorer::with_threshold(0.4, 0.6, 0.0).is_ok());
    }
}
