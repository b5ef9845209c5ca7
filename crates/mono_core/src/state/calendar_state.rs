//! State holder for the calendar screen.

use crate::calendar::{Month, MonthCache, WeekStart, YearMonth};
use crate::live::Subscription;
use crate::model::bucket::tasks_due_on;
use crate::model::task::Task;
use crate::repo::task_repo::TaskQuery;
use crate::repo::RepoResult;
use crate::service::task_service::TaskService;
use crate::state::lock;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

pub struct CalendarState {
    cache: MonthCache,
    selected: NaiveDate,
    tasks: Arc<Mutex<Vec<Task>>>,
    subscription: Option<Subscription>,
}

impl CalendarState {
    pub fn attach(
        tasks: &TaskService,
        start: YearMonth,
        week_start: WeekStart,
        selected: NaiveDate,
    ) -> RepoResult<Self> {
        let latest = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&latest);
        let subscription = tasks
            .observe_all(&TaskQuery::all())?
            .subscribe(move |items: &Vec<Task>| *lock(&sink) = items.clone());

        Ok(Self {
            cache: MonthCache::new(start, week_start),
            selected,
            tasks: latest,
            subscription: Some(subscription),
        })
    }

    pub fn month_at(&mut self, offset: i32) -> Option<Arc<Month>> {
        self.cache.month_at(offset)
    }

    /// Offset of the month holding the selected date.
    pub fn selected_offset(&self) -> Option<i32> {
        self.cache.offset_of(YearMonth::from_date(self.selected))
    }

    pub fn cached_months(&self) -> usize {
        self.cache.len()
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected = date;
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    pub fn tasks_on_selected(&self) -> Vec<Task> {
        tasks_due_on(&lock(&self.tasks), self.selected)
    }

    /// Dates inside `year_month` that have at least one task.
    pub fn marked_dates(&self, year_month: YearMonth) -> BTreeSet<NaiveDate> {
        lock(&self.tasks)
            .iter()
            .filter_map(|task| task.date)
            .filter(|date| YearMonth::from_date(*date) == year_month)
            .collect()
    }

    /// Ends the route: drops cached layouts and stops observing tasks.
    pub fn dispose(&mut self) {
        self.cache.clear();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
