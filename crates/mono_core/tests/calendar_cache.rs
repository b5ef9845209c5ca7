use chrono::NaiveDate;
use mono_core::{Month, MonthCache, WeekStart, YearMonth};
use std::sync::Arc;

fn ym(year: i32, month: u32) -> YearMonth {
    YearMonth::new(year, month).unwrap()
}

#[test]
fn same_offset_returns_the_same_allocation() {
    let mut cache = MonthCache::new(ym(2026, 10), WeekStart::Sunday);

    let first = cache.month_at(3).unwrap();
    let again = cache.month_at(3).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(first.year_month, ym(2027, 1));
    assert_eq!(cache.len(), 1);
}

#[test]
fn offsets_outside_supported_range_yield_nothing() {
    let mut cache = MonthCache::new(ym(2026, 10), WeekStart::Sunday);
    let range = cache.offset_range();

    assert!(cache.month_at(*range.start()).is_some());
    assert!(cache.month_at(*range.end()).is_some());
    assert!(cache.month_at(range.start() - 1).is_none());
    assert!(cache.month_at(range.end() + 1).is_none());
    assert_eq!(cache.year_month_at(*range.start()), Some(ym(1970, 1)));
    assert_eq!(cache.year_month_at(*range.end()), Some(ym(2100, 12)));
    assert_eq!(cache.len(), 2);
}

#[test]
fn offset_of_inverts_year_month_at() {
    let cache = MonthCache::new(ym(2026, 10), WeekStart::Monday);
    for offset in [-120, -1, 0, 1, 37] {
        let year_month = cache.year_month_at(offset).unwrap();
        assert_eq!(cache.offset_of(year_month), Some(offset));
    }
}

#[test]
fn clear_drops_entries_and_rebuilds_equal_values() {
    let mut cache = MonthCache::new(ym(2026, 10), WeekStart::Sunday);
    let before = cache.month_at(0).unwrap();
    cache.clear();
    assert!(cache.is_empty());

    let after = cache.month_at(0).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(*before, *after);
}

#[test]
fn month_grid_covers_every_day_once() {
    let month = Month::build(ym(2026, 2), WeekStart::Sunday);
    let in_month: Vec<NaiveDate> = month
        .grid()
        .into_iter()
        .flatten()
        .filter(|date| YearMonth::from_date(*date) == month.year_month)
        .collect();

    assert_eq!(in_month.len(), 28);
    assert_eq!(in_month.first(), Some(&NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
    assert_eq!(in_month.last(), Some(&NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()));
}

#[test]
fn week_start_changes_layout() {
    // 2026-03-01 is a Sunday.
    let sunday_first = Month::build(ym(2026, 3), WeekStart::Sunday);
    let monday_first = Month::build(ym(2026, 3), WeekStart::Monday);

    assert_eq!(sunday_first.week_count(), 5);
    assert_eq!(monday_first.week_count(), 6);
    assert_eq!(
        monday_first.grid()[0][6],
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    );
}
