//! Month and week layout values.

use crate::calendar::{WeekStart, YearMonth};
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

/// One grid row of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Week {
    /// 1-based week-of-month.
    pub week_number: u32,
    pub year_month: YearMonth,
}

impl Week {
    /// The seven dates of this row, including days spilling over from the
    /// adjacent months.
    pub fn days(&self, week_start: WeekStart) -> [NaiveDate; 7] {
        let first = self.year_month.first_day();
        let leading = i64::from(week_start.days_into_week(first));
        let row_start =
            first - Duration::days(leading) + Duration::days(7 * i64::from(self.week_number - 1));
        std::array::from_fn(|index| row_start + Duration::days(index as i64))
    }
}

/// Layout of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Month {
    pub year_month: YearMonth,
    pub week_start: WeekStart,
    pub weeks: Vec<Week>,
}

impl Month {
    pub fn build(year_month: YearMonth, week_start: WeekStart) -> Self {
        let leading = week_start.days_into_week(year_month.first_day());
        let week_count = (leading + year_month.days_in_month()).div_ceil(7);
        let weeks = (1..=week_count)
            .map(|week_number| Week {
                week_number,
                year_month,
            })
            .collect();
        Self {
            year_month,
            week_start,
            weeks,
        }
    }

    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    /// Week row holding `date`, when the date belongs to this month.
    pub fn week_of(&self, date: NaiveDate) -> Option<&Week> {
        if YearMonth::from_date(date) != self.year_month {
            return None;
        }
        let number = week_of_month(date, self.week_start);
        self.weeks.iter().find(|week| week.week_number == number)
    }

    /// Full grid, one array of seven dates per week.
    pub fn grid(&self) -> Vec<[NaiveDate; 7]> {
        self.weeks
            .iter()
            .map(|week| week.days(self.week_start))
            .collect()
    }
}

/// 1-based week-of-month of `date` under `week_start`.
pub fn week_of_month(date: NaiveDate, week_start: WeekStart) -> u32 {
    let first = YearMonth::from_date(date).first_day();
    let leading = week_start.days_into_week(first);
    (leading + date.day() - 1) / 7 + 1
}

#[cfg(test)]
mod tests {
    use super::{week_of_month, Month};
    use crate::calendar::{WeekStart, YearMonth};
    use chrono::NaiveDate;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn february_starting_on_sunday_fits_four_weeks() {
        // 2015-02-01 is a Sunday and February 2015 has 28 days.
        let month = Month::build(ym(2015, 2), WeekStart::Sunday);
        assert_eq!(month.week_count(), 4);
    }

    #[test]
    fn month_with_late_start_needs_six_weeks() {
        // 2024-06-01 is a Saturday: one leading row plus spill-over.
        let month = Month::build(ym(2024, 6), WeekStart::Sunday);
        assert_eq!(month.week_count(), 6);
        assert_eq!(Month::build(ym(2024, 6), WeekStart::Monday).week_count(), 5);
    }

    #[test]
    fn grid_includes_adjacent_month_days() {
        let month = Month::build(ym(2024, 6), WeekStart::Sunday);
        let grid = month.grid();
        assert_eq!(grid[0][0], NaiveDate::from_ymd_opt(2024, 5, 26).unwrap());
        assert_eq!(grid[0][6], NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(grid[5][6], NaiveDate::from_ymd_opt(2024, 7, 6).unwrap());
    }

    #[test]
    fn week_of_locates_dates_inside_month_only() {
        let month = Month::build(ym(2024, 6), WeekStart::Sunday);
        let june_2 = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(month.week_of(june_2).map(|w| w.week_number), Some(2));
        assert_eq!(week_of_month(june_2, WeekStart::Sunday), 2);
        assert!(month
            .week_of(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .is_none());
    }
}
