//! Task use-case service.
//!
//! # Responsibility
//! - Create, update, toggle, clear and delete tasks.
//! - Provide live list/detail read models.
//!
//! # Invariants
//! - `update` fails with `NotFound` for unknown ids; it never silently no-ops.
//! - Deleting a task removes its sub-tasks in the same statement (cascade).
//! - Log events carry ids and counts only, never titles or details.

use crate::live::{Observable, Table};
use crate::model::task::{Task, TaskId};
use crate::repo::task_repo::{SqliteTaskRepository, TaskPatch, TaskQuery, TaskRepository};
use crate::repo::RepoResult;
use crate::store::MonoStore;
use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};
use std::sync::Arc;

/// Tables a task read model depends on (tasks embed their sub-tasks).
const TASK_READ_TABLES: &[Table] = &[Table::Task, Table::SubTasks];

/// Request model for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub title: String,
    pub detail: String,
    pub is_bookmarked: bool,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub task_list_id: Option<String>,
    pub reminder: bool,
}

impl CreateTaskRequest {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Task service facade over the shared store.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<MonoStore>,
}

impl TaskService {
    pub fn new(store: Arc<MonoStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MonoStore> {
        &self.store
    }

    /// Live list of tasks matching `query`.
    ///
    /// Identical queries share one upstream; every write to tasks or sub-tasks
    /// re-emits the full matching list.
    pub fn observe_all(&self, query: &TaskQuery) -> RepoResult<Observable<Vec<Task>>> {
        let key = format!("task.all:{}", query.cache_key());
        let query = query.clone();
        self.store.observe(&key, TASK_READ_TABLES, move |conn| {
            SqliteTaskRepository::try_new(conn)?.list_tasks(&query)
        })
    }

    /// Live view of one task. Emits `None` while the id does not exist.
    pub fn observe_one(&self, id: &str) -> RepoResult<Observable<Option<Task>>> {
        let key = format!("task.one:{id}");
        let id = id.to_string();
        self.store.observe(&key, TASK_READ_TABLES, move |conn| {
            SqliteTaskRepository::try_new(conn)?.get_task(&id)
        })
    }

    pub fn get(&self, id: &str) -> RepoResult<Option<Task>> {
        self.store
            .read(|conn| SqliteTaskRepository::try_new(conn)?.get_task(id))
    }

    pub fn list(&self, query: &TaskQuery) -> RepoResult<Vec<Task>> {
        self.store
            .read(|conn| SqliteTaskRepository::try_new(conn)?.list_tasks(query))
    }

    /// Persists a new active task and returns its freshly generated id.
    pub fn create(&self, request: &CreateTaskRequest) -> RepoResult<TaskId> {
        let mut task = Task::new(request.title.clone());
        task.detail = request.detail.clone();
        task.is_bookmarked = request.is_bookmarked;
        task.date = request.date;
        task.time = request.time;
        task.task_list_id = request.task_list_id.clone();
        task.reminder = request.reminder;

        let id = self.store.write(&[Table::Task], |conn| {
            SqliteTaskRepository::try_new(conn)?.create_task(&task)
        })?;
        info!("event=task_create module=service status=ok task_id={id}");
        Ok(id)
    }

    /// Fetches the task, applies `patch` and re-persists it.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `Conflict` when `patch.expected_revision` is stale.
    pub fn update(&self, id: &str, patch: &TaskPatch) -> RepoResult<Task> {
        let task = self.store.write(&[Table::Task], |conn| {
            SqliteTaskRepository::try_new(conn)?.apply_patch(id, patch)
        })?;
        info!(
            "event=task_update module=service status=ok task_id={id} revision={}",
            task.revision
        );
        Ok(task)
    }

    /// Returns `false` when the id does not exist.
    pub fn set_completed(&self, id: &str, is_completed: bool) -> RepoResult<bool> {
        let changed = self.store.write(&[Table::Task], |conn| {
            SqliteTaskRepository::try_new(conn)?.set_completed(id, is_completed)
        })?;
        debug!("event=task_set_completed module=service status=ok task_id={id} value={is_completed} changed={changed}");
        Ok(changed)
    }

    /// Returns `false` when the id does not exist.
    pub fn set_bookmarked(&self, id: &str, is_bookmarked: bool) -> RepoResult<bool> {
        let changed = self.store.write(&[Table::Task], |conn| {
            SqliteTaskRepository::try_new(conn)?.set_bookmarked(id, is_bookmarked)
        })?;
        debug!("event=task_set_bookmarked module=service status=ok task_id={id} value={is_bookmarked} changed={changed}");
        Ok(changed)
    }

    /// Returns `false` when the id does not exist.
    pub fn set_reminder(&self, id: &str, reminder: bool) -> RepoResult<bool> {
        let changed = self.store.write(&[Table::Task], |conn| {
            SqliteTaskRepository::try_new(conn)?.set_reminder(id, reminder)
        })?;
        debug!("event=task_set_reminder module=service status=ok task_id={id} value={reminder} changed={changed}");
        Ok(changed)
    }

    /// Deletes completed tasks matching `query`; returns the removed ids so
    /// callers can cancel their alarms.
    pub fn clear_completed(&self, query: &TaskQuery) -> RepoResult<Vec<TaskId>> {
        let removed = self.store.write(&[Table::Task, Table::SubTasks], |conn| {
            SqliteTaskRepository::try_new(conn)?.clear_completed(query)
        })?;
        info!(
            "event=task_clear_completed module=service status=ok removed={}",
            removed.len()
        );
        Ok(removed)
    }

    /// Deletes the task and its sub-tasks. Returns `false` for unknown ids.
    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        let removed = self.store.write(&[Table::Task, Table::SubTasks], |conn| {
            SqliteTaskRepository::try_new(conn)?.delete_task(id)
        })?;
        info!("event=task_delete module=service status=ok task_id={id} removed={removed}");
        Ok(removed)
    }
}
