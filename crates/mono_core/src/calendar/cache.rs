//! Offset-keyed memo of month layouts.
//!
//! # Invariants
//! - Offsets are relative to `start`; offset 0 is the start month.
//! - Only months inside `1970-01..=2100-12` are materialized.
//! - An entry is built on first access and stays until `clear`.

use crate::calendar::month::Month;
use crate::calendar::{WeekStart, YearMonth, MAX_YEAR_MONTH, MIN_YEAR_MONTH};
use log::debug;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub struct MonthCache {
    start: YearMonth,
    week_start: WeekStart,
    months: HashMap<i32, Arc<Month>>,
}

impl MonthCache {
    pub fn new(start: YearMonth, week_start: WeekStart) -> Self {
        Self {
            start,
            week_start,
            months: HashMap::new(),
        }
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    /// Offsets that map to supported months.
    pub fn offset_range(&self) -> RangeInclusive<i32> {
        let first = self.start.months_until(MIN_YEAR_MONTH);
        let last = self.start.months_until(MAX_YEAR_MONTH);
        (first as i32)..=(last as i32)
    }

    pub fn year_month_at(&self, offset: i32) -> Option<YearMonth> {
        self.start
            .plus_months(offset)
            .filter(|year_month| year_month.is_supported())
    }

    pub fn offset_of(&self, year_month: YearMonth) -> Option<i32> {
        if !year_month.is_supported() {
            return None;
        }
        i32::try_from(self.start.months_until(year_month)).ok()
    }

    /// Returns the memoized month at `offset`, building it on first access.
    ///
    /// Repeated calls return the same allocation.
    pub fn month_at(&mut self, offset: i32) -> Option<Arc<Month>> {
        if let Some(month) = self.months.get(&offset) {
            return Some(Arc::clone(month));
        }
        let year_month = self.year_month_at(offset)?;
        let month = Arc::new(Month::build(year_month, self.week_start));
        self.months.insert(offset, Arc::clone(&month));
        Some(month)
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn clear(&mut self) {
        debug!(
            "event=calendar_cache_clear module=calendar status=ok entries={}",
            self.months.len()
        );
        self.months.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::MonthCache;
    use crate::calendar::{WeekStart, YearMonth, MAX_YEAR_MONTH, MIN_YEAR_MONTH};
    use std::sync::Arc;

    #[test]
    fn same_offset_is_reference_stable() {
        let mut cache = MonthCache::new(YearMonth::new(2024, 1).unwrap(), WeekStart::Sunday);
        let first = cache.month_at(5).unwrap();
        let second = cache.month_at(5).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.year_month, YearMonth::new(2024, 6).unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn offsets_outside_supported_range_yield_none() {
        let mut cache = MonthCache::new(MIN_YEAR_MONTH, WeekStart::Sunday);
        let range = cache.offset_range();
        assert_eq!(*range.start(), 0);
        assert!(cache.month_at(-1).is_none());
        assert_eq!(
            cache.month_at(*range.end()).unwrap().year_month,
            MAX_YEAR_MONTH
        );
        assert!(cache.month_at(*range.end() + 1).is_none());
        assert!(cache.month_at(i32::MAX).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn offset_of_inverts_year_month_at() {
        let cache = MonthCache::new(YearMonth::new(2000, 6).unwrap(), WeekStart::Monday);
        let target = YearMonth::new(1999, 1).unwrap();
        let offset = cache.offset_of(target).unwrap();
        assert_eq!(offset, -17);
        assert_eq!(cache.year_month_at(offset), Some(target));
        assert!(cache.offset_of(YearMonth::new(1969, 12).unwrap()).is_none());
    }

    #[test]
    fn clear_drops_entries_and_rebuilds_equal_values() {
        let mut cache = MonthCache::new(YearMonth::new(2024, 1).unwrap(), WeekStart::Sunday);
        let before = cache.month_at(0).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        let after = cache.month_at(0).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(*before, *after);
    }
}
