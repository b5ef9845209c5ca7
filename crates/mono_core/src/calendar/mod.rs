//! Calendar month/week layout for the scrollable calendar view.
//!
//! # Responsibility
//! - Model year-months and the configured first weekday.
//! - Split a month into the weeks needed to lay out a full grid.
//! - Memoize month layouts by offset from a fixed start month.
//!
//! # Invariants
//! - Supported range is `1970-01..=2100-12`.
//! - Week 1 of a month always contains day 1.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub mod cache;
pub mod month;

pub use cache::MonthCache;
pub use month::{week_of_month, Month, Week};

pub const MIN_YEAR_MONTH: YearMonth = YearMonth {
    year: 1970,
    month: 1,
};
pub const MAX_YEAR_MONTH: YearMonth = YearMonth {
    year: 2100,
    month: 12,
};

/// First day of a calendar week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn first_weekday(self) -> Weekday {
        match self {
            Self::Sunday => Weekday::Sun,
            Self::Monday => Weekday::Mon,
        }
    }

    /// Number of grid cells before `date` in its week.
    pub fn days_into_week(self, date: NaiveDate) -> u32 {
        match self {
            Self::Sunday => date.weekday().num_days_from_sunday(),
            Self::Monday => date.weekday().num_days_from_monday(),
        }
    }
}

/// Calendar month key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "YearMonthParts", into = "YearMonthParts")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

#[derive(Serialize, Deserialize)]
struct YearMonthParts {
    year: i32,
    month: u32,
}

impl TryFrom<YearMonthParts> for YearMonth {
    type Error = String;

    fn try_from(value: YearMonthParts) -> Result<Self, Self::Error> {
        YearMonth::new(value.year, value.month)
            .ok_or_else(|| format!("invalid year-month {}-{}", value.year, value.month))
    }
}

impl From<YearMonth> for YearMonthParts {
    fn from(value: YearMonth) -> Self {
        Self {
            year: value.year,
            month: value.month,
        }
    }
}

impl YearMonth {
    /// Returns `None` for a month outside `1..=12` or a year chrono cannot
    /// represent.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> NaiveDate {
        // Constructors only admit months whose first day exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn days_in_month(self) -> u32 {
        match self.plus_months(1) {
            Some(next) => (next.first_day() - self.first_day()).num_days() as u32,
            None => 31,
        }
    }

    /// Shifts by `delta` months (negative moves backwards).
    pub fn plus_months(self, delta: i32) -> Option<Self> {
        let index = self.month_index().checked_add(i64::from(delta))?;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = (index.rem_euclid(12) + 1) as u32;
        Self::new(year, month)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(self, other: YearMonth) -> i64 {
        other.month_index() - self.month_index()
    }

    pub fn is_supported(self) -> bool {
        (MIN_YEAR_MONTH..=MAX_YEAR_MONTH).contains(&self)
    }

    fn month_index(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::{WeekStart, YearMonth, MAX_YEAR_MONTH, MIN_YEAR_MONTH};
    use chrono::NaiveDate;

    #[test]
    fn rejects_invalid_month() {
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn month_arithmetic_crosses_years() {
        let jan = YearMonth::new(2024, 1).unwrap();
        assert_eq!(jan.plus_months(-1), YearMonth::new(2023, 12));
        assert_eq!(jan.plus_months(13), YearMonth::new(2025, 2));
        assert_eq!(jan.months_until(YearMonth::new(2025, 2).unwrap()), 13);
        assert_eq!(MIN_YEAR_MONTH.months_until(MAX_YEAR_MONTH), 131 * 12 - 1);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(YearMonth::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(YearMonth::new(2100, 2).unwrap().days_in_month(), 28);
        assert_eq!(YearMonth::new(2023, 12).unwrap().days_in_month(), 31);
    }

    #[test]
    fn days_into_week_follows_week_start() {
        // 2024-09-01 is a Sunday.
        let date = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert_eq!(WeekStart::Sunday.days_into_week(date), 0);
        assert_eq!(WeekStart::Monday.days_into_week(date), 6);
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(YearMonth::new(987, 3).unwrap().to_string(), "0987-03");
    }
}
