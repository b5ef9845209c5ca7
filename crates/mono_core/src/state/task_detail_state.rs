//! State holder for the task detail/edit screen.
//!
//! Edits accumulate in a draft [`TaskPatch`] and are saved against the
//! revision the screen last saw, so a concurrent write is reported as
//! `Conflict` instead of being overwritten.

use crate::live::Subscription;
use crate::model::task::Task;
use crate::reminder::{AlarmOutcome, AlarmPlatform, AlarmScheduler};
use crate::repo::task_repo::{EntityKind, TaskPatch};
use crate::repo::{RepoError, RepoResult};
use crate::service::sub_task_service::{SubTaskPatch, SubTaskService};
use crate::service::task_service::TaskService;
use crate::state::lock;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::{Arc, Mutex};

pub struct TaskDetailState<P: AlarmPlatform> {
    task_id: String,
    tasks: TaskService,
    sub_tasks: SubTaskService,
    scheduler: Arc<AlarmScheduler<P>>,
    /// Outer `None`: nothing received yet. Inner `None`: task does not exist.
    current: Arc<Mutex<Option<Option<Task>>>>,
    draft: TaskPatch,
    subscription: Option<Subscription>,
}

impl<P: AlarmPlatform> TaskDetailState<P> {
    pub fn attach(
        task_id: &str,
        tasks: TaskService,
        sub_tasks: SubTaskService,
        scheduler: Arc<AlarmScheduler<P>>,
    ) -> RepoResult<Self> {
        let current = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&current);
        let subscription = tasks
            .observe_one(task_id)?
            .subscribe(move |task: &Option<Task>| {
                *lock(&sink) = Some(task.clone());
            });

        Ok(Self {
            task_id: task_id.to_string(),
            tasks,
            sub_tasks,
            scheduler,
            current,
            draft: TaskPatch::default(),
            subscription: Some(subscription),
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Latest persisted task with the unsaved draft applied.
    pub fn task(&self) -> Option<Task> {
        let mut task = lock(&self.current).clone().flatten()?;
        self.draft.apply_to(&mut task);
        Some(task)
    }

    /// `true` once the store has reported that the task does not exist.
    pub fn is_missing(&self) -> bool {
        matches!(*lock(&self.current), Some(None))
    }

    pub fn draft(&self) -> &TaskPatch {
        &self.draft
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.draft != TaskPatch::default()
    }

    pub fn edit_title(&mut self, title: impl Into<String>) {
        self.draft.title = Some(title.into());
    }

    pub fn edit_detail(&mut self, detail: impl Into<String>) {
        self.draft.detail = Some(detail.into());
    }

    pub fn edit_schedule(&mut self, date: Option<NaiveDate>, time: Option<NaiveTime>) {
        self.draft.date = Some(date);
        self.draft.time = Some(time);
    }

    pub fn edit_reminder(&mut self, reminder: bool) {
        self.draft.reminder = Some(reminder);
    }

    pub fn edit_list(&mut self, task_list_id: Option<String>) {
        self.draft.task_list_id = Some(task_list_id);
    }

    pub fn edit_color(&mut self, color: Option<u32>) {
        self.draft.color = Some(color);
    }

    pub fn edit_attachments(&mut self, attachments: Vec<String>) {
        self.draft.attachments = Some(attachments);
    }

    pub fn edit_recordings(&mut self, recordings: Vec<String>) {
        self.draft.recordings = Some(recordings);
    }

    pub fn discard_changes(&mut self) {
        self.draft = TaskPatch::default();
    }

    /// Persists the draft and re-syncs the task's alarm.
    ///
    /// # Errors
    /// - `NotFound` when the task no longer exists.
    /// - `Conflict` when the task changed since this screen last saw it; the
    ///   draft is kept so the caller can retry after reviewing.
    pub fn save(&mut self, now: NaiveDateTime) -> RepoResult<(Task, AlarmOutcome)> {
        let base_revision = self.persisted()?.revision;
        let mut patch = self.draft.clone();
        patch.expected_revision = Some(base_revision);

        let task = self.tasks.update(&self.task_id, &patch)?;
        self.draft = TaskPatch::default();
        let outcome = self.scheduler.sync_task(&task, now);
        Ok((task, outcome))
    }

    /// Flips completion; completing a task cancels its alarm.
    pub fn toggle_completed(&self, now: NaiveDateTime) -> RepoResult<AlarmOutcome> {
        let mut task = self.persisted()?;
        task.is_completed = !task.is_completed;
        self.tasks.set_completed(&self.task_id, task.is_completed)?;
        Ok(self.scheduler.sync_task(&task, now))
    }

    pub fn toggle_bookmarked(&self) -> RepoResult<bool> {
        let task = self.persisted()?;
        self.tasks.set_bookmarked(&self.task_id, !task.is_bookmarked)
    }

    pub fn add_sub_task(&self) -> RepoResult<String> {
        self.sub_tasks.create(&self.task_id)
    }

    pub fn rename_sub_task(&self, sub_task_id: &str, title: &str) -> RepoResult<()> {
        let patch = SubTaskPatch {
            title: Some(title.to_string()),
            ..SubTaskPatch::default()
        };
        self.sub_tasks.update(sub_task_id, &patch).map(|_| ())
    }

    pub fn toggle_sub_task(&self, sub_task_id: &str) -> RepoResult<()> {
        let current = self
            .sub_tasks
            .get(sub_task_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::SubTask, sub_task_id))?;
        let patch = SubTaskPatch {
            is_completed: Some(!current.is_completed),
            ..SubTaskPatch::default()
        };
        self.sub_tasks.update(sub_task_id, &patch).map(|_| ())
    }

    pub fn delete_sub_task(&self, sub_task_id: &str) -> RepoResult<bool> {
        self.sub_tasks.delete(sub_task_id)
    }

    /// Deletes the task (with its sub-tasks) and cancels its alarm.
    pub fn delete(&self) -> RepoResult<bool> {
        let removed = self.tasks.delete(&self.task_id)?;
        self.scheduler.cancel_task(&self.task_id);
        Ok(removed)
    }

    pub fn dispose(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }

    fn persisted(&self) -> RepoResult<Task> {
        lock(&self.current)
            .clone()
            .flatten()
            .ok_or_else(|| RepoError::not_found(EntityKind::Task, self.task_id.as_str()))
    }
}
