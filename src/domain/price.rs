//! Daily close series for a single instrument.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Chronologically increasing (date, close) pairs with no duplicate dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series from unordered points. Points are sorted by date and
    /// duplicate dates collapse to the last occurrence.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }
        Self { points: deduped }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Keeps only points with `start <= date < end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date < end)
                .copied()
                .collect(),
        }
    }
}

/// Percentage return from `entry` to `exit`. A missing or zero entry yields 0.
pub fn percent_return(entry: f64, exit: f64) -> f64 {
    if !entry.is_finite() || !exit.is_finite() || entry == 0.0 {
        return 0.0;
    }
    (exit - entry) / entry * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn from_points_sorts_and_dedups() {
        let series = PriceSeries::from_points(vec![
            PricePoint { date: d(3), close: 12.0 },
            PricePoint { date: d(1), close: 10.0 },
            PricePoint { date: d(3), close: 13.0 },
            PricePoint { date: d(2), close: 11.0 },
        ]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 11.0, 13.0]);
    }

    #[test]
    fn window_is_half_open() {
        let series = PriceSeries::from_points(
            (1..=5).map(|i| PricePoint { date: d(i), close: i as f64 }).collect(),
        );
        let w = series.window(d(2), d(4));
        assert_eq!(w.closes(), vec![2.0, 3.0]);
    }

    #[test]
    fn percent_return_basic() {
        assert!((percent_return(100.0, 110.0) - 10.0).abs() < 1e-12);
        assert!((percent_return(200.0, 150.0) + 25.0).abs() < 1e-12);
    }

    #[test]
    fn percent_return_guards_bad_entry() {
        assert_eq!(percent_return(0.0, 110.0), 0.0);
        assert_eq!(percent_return(f64::NAN, 110.0), 0.0);
        assert_eq!(percent_return(100.0, f64::NAN), 0.0);
    }
}
