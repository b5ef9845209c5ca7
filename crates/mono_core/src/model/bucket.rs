//! View-level grouping of tasks into list sections.
//!
//! # Invariants
//! - Every input task lands in exactly one bucket.
//! - Completed tasks go to `completed` regardless of their date.
//! - Each bucket is ordered by date, time, creation time, then id.

use crate::model::task::Task;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Section a task is rendered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskBucket {
    Overdue,
    Today,
    Upcoming,
    NoDate,
    Completed,
}

/// Tasks partitioned into sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskBuckets {
    pub overdue: Vec<Task>,
    pub today: Vec<Task>,
    pub upcoming: Vec<Task>,
    pub no_date: Vec<Task>,
    pub completed: Vec<Task>,
}

impl TaskBuckets {
    /// Number of tasks across all sections.
    pub fn len(&self) -> usize {
        self.overdue.len()
            + self.today.len()
            + self.upcoming.len()
            + self.no_date.len()
            + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns which section holds the task with `task_id`.
    pub fn bucket_of(&self, task_id: &str) -> Option<TaskBucket> {
        [
            (TaskBucket::Overdue, &self.overdue),
            (TaskBucket::Today, &self.today),
            (TaskBucket::Upcoming, &self.upcoming),
            (TaskBucket::NoDate, &self.no_date),
            (TaskBucket::Completed, &self.completed),
        ]
        .into_iter()
        .find(|(_, tasks)| tasks.iter().any(|task| task.id == task_id))
        .map(|(bucket, _)| bucket)
    }
}

/// Classifies one task relative to `today`.
pub fn bucket_for(task: &Task, today: NaiveDate) -> TaskBucket {
    if task.is_completed {
        return TaskBucket::Completed;
    }
    match task.date {
        None => TaskBucket::NoDate,
        Some(date) => match date.cmp(&today) {
            Ordering::Less => TaskBucket::Overdue,
            Ordering::Equal => TaskBucket::Today,
            Ordering::Greater => TaskBucket::Upcoming,
        },
    }
}

/// Partitions `tasks` into sections relative to `today`.
pub fn group_tasks(tasks: &[Task], today: NaiveDate) -> TaskBuckets {
    let mut buckets = TaskBuckets::default();
    for task in tasks {
        let target = match bucket_for(task, today) {
            TaskBucket::Overdue => &mut buckets.overdue,
            TaskBucket::Today => &mut buckets.today,
            TaskBucket::Upcoming => &mut buckets.upcoming,
            TaskBucket::NoDate => &mut buckets.no_date,
            TaskBucket::Completed => &mut buckets.completed,
        };
        target.push(task.clone());
    }

    for section in [
        &mut buckets.overdue,
        &mut buckets.today,
        &mut buckets.upcoming,
        &mut buckets.no_date,
        &mut buckets.completed,
    ] {
        section.sort_by(compare_schedule);
    }
    buckets
}

/// Returns tasks due on `date`, ordered by time (untimed tasks last).
pub fn tasks_due_on(tasks: &[Task], date: NaiveDate) -> Vec<Task> {
    let mut due: Vec<Task> = tasks
        .iter()
        .filter(|task| task.date == Some(date))
        .cloned()
        .collect();
    due.sort_by(compare_schedule);
    due
}

fn compare_schedule(left: &Task, right: &Task) -> Ordering {
    // `None` sorts after any concrete date/time.
    fn key<T: Ord + Copy>(value: Option<T>) -> (bool, Option<T>) {
        (value.is_none(), value)
    }
    key(left.date)
        .cmp(&key(right.date))
        .then_with(|| key(left.time).cmp(&key(right.time)))
        .then_with(|| left.created_at.cmp(&right.created_at))
        .then_with(|| left.id.cmp(&right.id))
}

#[cfg(test)]
mod tests {
    use super::{bucket_for, group_tasks, tasks_due_on, TaskBucket};
    use crate::model::task::Task;
    use chrono::{NaiveDate, NaiveTime};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn dated(title: &str, date: Option<NaiveDate>) -> Task {
        let mut task = Task::new(title);
        task.date = date;
        task
    }

    #[test]
    fn classifies_relative_to_today() {
        let today = day(10);
        assert_eq!(bucket_for(&dated("a", Some(day(9))), today), TaskBucket::Overdue);
        assert_eq!(bucket_for(&dated("b", Some(day(10))), today), TaskBucket::Today);
        assert_eq!(bucket_for(&dated("c", Some(day(11))), today), TaskBucket::Upcoming);
        assert_eq!(bucket_for(&dated("d", None), today), TaskBucket::NoDate);

        let mut done = dated("e", Some(day(9)));
        done.is_completed = true;
        assert_eq!(bucket_for(&done, today), TaskBucket::Completed);
    }

    #[test]
    fn every_task_lands_in_one_bucket() {
        let tasks = vec![
            dated("a", Some(day(1))),
            dated("b", None),
            dated("c", Some(day(20))),
        ];
        let buckets = group_tasks(&tasks, day(10));
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.bucket_of(&tasks[1].id), Some(TaskBucket::NoDate));
        assert_eq!(buckets.bucket_of("missing"), None);
    }

    #[test]
    fn due_on_orders_untimed_last() {
        let mut early = dated("early", Some(day(5)));
        early.time = NaiveTime::from_hms_opt(7, 0, 0);
        let untimed = dated("untimed", Some(day(5)));
        let mut late = dated("late", Some(day(5)));
        late.time = NaiveTime::from_hms_opt(21, 0, 0);
        let other_day = dated("other", Some(day(6)));

        let due = tasks_due_on(&[untimed, late, other_day, early], day(5));
        let titles: Vec<&str> = due.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "late", "untimed"]);
    }
}
