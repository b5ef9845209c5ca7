//! State holder for list-style screens (all tasks, one list, bookmarks).
//!
//! Intents that complete or remove tasks keep the alarm table in step, the
//! same way the detail screen does.

use crate::live::Subscription;
use crate::model::bucket::{group_tasks, TaskBuckets};
use crate::model::task::Task;
use crate::reminder::{AlarmOutcome, AlarmPlatform, AlarmScheduler};
use crate::repo::task_repo::{EntityKind, TaskQuery};
use crate::repo::{RepoError, RepoResult};
use crate::service::task_service::TaskService;
use crate::state::lock;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

/// Snapshot rendered by a list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListUiState {
    /// `false` until the first emission arrived.
    pub loaded: bool,
    pub buckets: TaskBuckets,
}

#[derive(Default)]
struct Latest {
    loaded: bool,
    tasks: Vec<Task>,
}

pub struct TaskListState<P: AlarmPlatform> {
    tasks: TaskService,
    scheduler: Arc<AlarmScheduler<P>>,
    query: TaskQuery,
    today: NaiveDate,
    latest: Arc<Mutex<Latest>>,
    subscription: Option<Subscription>,
}

impl<P: AlarmPlatform> TaskListState<P> {
    /// Subscribes to tasks matching `query`; sections are relative to `today`.
    pub fn attach(
        tasks: TaskService,
        scheduler: Arc<AlarmScheduler<P>>,
        query: TaskQuery,
        today: NaiveDate,
    ) -> RepoResult<Self> {
        let latest = Arc::new(Mutex::new(Latest::default()));
        let sink = Arc::clone(&latest);
        let subscription = tasks.observe_all(&query)?.subscribe(move |items: &Vec<Task>| {
            let mut latest = lock(&sink);
            latest.loaded = true;
            latest.tasks = items.clone();
        });

        Ok(Self {
            tasks,
            scheduler,
            query,
            today,
            latest,
            subscription: Some(subscription),
        })
    }

    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    /// Moves the section boundaries, e.g. after midnight.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn ui_state(&self) -> TaskListUiState {
        let latest = lock(&self.latest);
        TaskListUiState {
            loaded: latest.loaded,
            buckets: group_tasks(&latest.tasks, self.today),
        }
    }

    /// Flips completion and re-syncs the task's alarm; completing cancels it.
    pub fn toggle_completed(
        &self,
        task_id: &str,
        now: NaiveDateTime,
    ) -> RepoResult<AlarmOutcome> {
        let mut task = self.current(task_id)?;
        task.is_completed = !task.is_completed;
        if !self.tasks.set_completed(task_id, task.is_completed)? {
            self.scheduler.cancel_task(task_id);
            return Err(RepoError::not_found(EntityKind::Task, task_id));
        }
        Ok(self.scheduler.sync_task(&task, now))
    }

    pub fn toggle_bookmarked(&self, task_id: &str) -> RepoResult<bool> {
        let current = self.current(task_id)?;
        self.tasks.set_bookmarked(task_id, !current.is_bookmarked)
    }

    /// Clears completed tasks within this screen's query only and cancels
    /// their alarms. Returns how many were removed.
    pub fn clear_completed(&self) -> RepoResult<usize> {
        let removed = self.tasks.clear_completed(&self.query)?;
        for task_id in &removed {
            self.scheduler.cancel_task(task_id);
        }
        Ok(removed.len())
    }

    /// Deletes the task (with its sub-tasks) and cancels its alarm.
    pub fn delete(&self, task_id: &str) -> RepoResult<bool> {
        let removed = self.tasks.delete(task_id)?;
        self.scheduler.cancel_task(task_id);
        Ok(removed)
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Ends the route: stops observing. Pending writes are unaffected.
    pub fn dispose(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    fn current(&self, task_id: &str) -> RepoResult<Task> {
        lock(&self.latest)
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found(EntityKind::Task, task_id))
    }
}
