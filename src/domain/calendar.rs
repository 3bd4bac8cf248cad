//! Monthly decision-date schedule.
//!
//! Steps one calendar month at a time from a start (year, month) and yields a
//! fixed day of each month. Months where that day does not exist (day 31 in
//! April, day 30 in February) are skipped rather than clamped.

use chrono::NaiveDate;

pub const DEFAULT_DECISION_DAY: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthlySchedule {
    pub start_year: i32,
    pub start_month: u32,
    pub day: u32,
    pub months: usize,
}

impl MonthlySchedule {
    pub fn new(start_year: i32, start_month: u32, months: usize) -> Self {
        Self {
            start_year,
            start_month,
            day: DEFAULT_DECISION_DAY,
            months,
        }
    }

    pub fn with_day(mut self, day: u32) -> Self {
        self.day = day;
        self
    }

    /// (year, month) for the month `offset` months after the start.
    pub fn month_at(&self, offset: usize) -> Option<(i32, u32)> {
        let base = i64::from(self.start_year) * 12 + i64::from(self.start_month) - 1;
        let index = base.checked_add(i64::try_from(offset).ok()?)?;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
        Some((year, month))
    }

    /// Decision date for the month `offset` months after the start, if that
    /// day exists in the month.
    pub fn date_at(&self, offset: usize) -> Option<NaiveDate> {
        let (year, month) = self.month_at(offset)?;
        NaiveDate::from_ymd_opt(year, month, self.day)
    }

    /// Restartable: every call yields the same finite sequence.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.months).filter_map(|offset| self.date_at(offset))
    }
}

impl IntoIterator for MonthlySchedule {
    type Item = NaiveDate;
    type IntoIter = std::vec::IntoIter<NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.dates().collect::<Vec<_>>().into_iter()
    }
}

/// Label used in result tables, e.g. "Feb 2024".
pub fn period_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fifteenth_of_each_month() {
        let schedule = MonthlySchedule::new(2024, 2, 3);
        let dates: Vec<_> = schedule.dates().collect();
        assert_eq!(dates, vec![ymd(2024, 2, 15), ymd(2024, 3, 15), ymd(2024, 4, 15)]);
    }

    #[test]
    fn crosses_year_boundary() {
        let schedule = MonthlySchedule::new(2024, 11, 4);
        let dates: Vec<_> = schedule.dates().collect();
        assert_eq!(
            dates,
            vec![
                ymd(2024, 11, 15),
                ymd(2024, 12, 15),
                ymd(2025, 1, 15),
                ymd(2025, 2, 15)
            ]
        );
    }

    #[test]
    fn impossible_days_are_skipped() {
        let schedule = MonthlySchedule::new(2023, 1, 4).with_day(31);
        let dates: Vec<_> = schedule.dates().collect();
        assert_eq!(dates, vec![ymd(2023, 1, 31), ymd(2023, 3, 31)]);
    }

    #[test]
    fn day_zero_yields_nothing() {
        let schedule = MonthlySchedule::new(2024, 1, 2).with_day(0);
        assert_eq!(schedule.dates().count(), 0);
    }

    #[test]
    fn restartable() {
        let schedule = MonthlySchedule::new(2024, 2, 12);
        let first: Vec<_> = schedule.dates().collect();
        let second: Vec<_> = schedule.into_iter().collect();
        assert_eq!(first.len(), 12);
        assert_eq!(first, second);
    }

    #[test]
    fn month_at_offsets() {
        let schedule = MonthlySchedule::new(2024, 1, 0);
        assert_eq!(schedule.month_at(0), Some((2024, 1)));
        assert_eq!(schedule.month_at(11), Some((2024, 12)));
        assert_eq!(schedule.month_at(12), Some((2025, 1)));
        assert_eq!(schedule.month_at(25), Some((2026, 2)));
    }

    #[test]
    fn label_format() {
        assert_eq!(period_label(ymd(2024, 2, 15)), "Feb 2024");
    }
}
