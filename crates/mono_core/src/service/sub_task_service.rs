//! Sub-task use-case service.

use crate::live::{Observable, Table};
use crate::model::sub_task::SubTask;
use crate::repo::sub_task_repo::{SqliteSubTaskRepository, SubTaskRepository};
use crate::repo::task_repo::EntityKind;
use crate::repo::{RepoError, RepoResult};
use crate::store::MonoStore;
use log::info;
use std::sync::Arc;

/// Field-level overrides for a sub-task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubTaskPatch {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub position: Option<i64>,
}

#[derive(Clone)]
pub struct SubTaskService {
    store: Arc<MonoStore>,
}

impl SubTaskService {
    pub fn new(store: Arc<MonoStore>) -> Self {
        Self { store }
    }

    /// Appends a blank sub-task to `task_id` and returns its id.
    ///
    /// Fails with `NotFound` when the parent task does not exist.
    pub fn create(&self, task_id: &str) -> RepoResult<String> {
        let id = self.store.write(&[Table::SubTasks], |conn| {
            let repo = SqliteSubTaskRepository::try_new(conn)?;
            let sub_task = SubTask::new(task_id, repo.next_position(task_id)?);
            repo.create_sub_task(&sub_task)
        })?;
        info!("event=sub_task_create module=service status=ok task_id={task_id} sub_task_id={id}");
        Ok(id)
    }

    /// Fetches the sub-task, copies `patch` over it and re-persists it.
    pub fn update(&self, id: &str, patch: &SubTaskPatch) -> RepoResult<SubTask> {
        self.store.write(&[Table::SubTasks], |conn| {
            let repo = SqliteSubTaskRepository::try_new(conn)?;
            let mut sub_task = repo
                .get_sub_task(id)?
                .ok_or_else(|| RepoError::not_found(EntityKind::SubTask, id))?;
            if let Some(title) = &patch.title {
                sub_task.title = title.clone();
            }
            if let Some(is_completed) = patch.is_completed {
                sub_task.is_completed = is_completed;
            }
            if let Some(position) = patch.position {
                sub_task.position = position;
            }
            repo.update_sub_task(&sub_task)?;
            Ok(sub_task)
        })
    }

    pub fn get(&self, id: &str) -> RepoResult<Option<SubTask>> {
        self.store
            .read(|conn| SqliteSubTaskRepository::try_new(conn)?.get_sub_task(id))
    }

    pub fn list_for_task(&self, task_id: &str) -> RepoResult<Vec<SubTask>> {
        self.store
            .read(|conn| SqliteSubTaskRepository::try_new(conn)?.list_for_task(task_id))
    }

    pub fn observe_for_task(&self, task_id: &str) -> RepoResult<Observable<Vec<SubTask>>> {
        let key = format!("sub_tasks:{task_id}");
        let task_id = task_id.to_string();
        // Task deletion cascades into sub_tasks, so task writes matter too.
        self.store
            .observe(&key, &[Table::SubTasks, Table::Task], move |conn| {
                SqliteSubTaskRepository::try_new(conn)?.list_for_task(&task_id)
            })
    }

    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        let removed = self.store.write(&[Table::SubTasks], |conn| {
            SqliteSubTaskRepository::try_new(conn)?.delete_sub_task(id)
        })?;
        info!("event=sub_task_delete module=service status=ok sub_task_id={id} removed={removed}");
        Ok(removed)
    }

    pub fn delete_many(&self, ids: &[String]) -> RepoResult<usize> {
        let removed = self.store.write(&[Table::SubTasks], |conn| {
            SqliteSubTaskRepository::try_new(conn)?.delete_sub_tasks(ids)
        })?;
        info!(
            "event=sub_task_delete_many module=service status=ok requested={} removed={removed}",
            ids.len()
        );
        Ok(removed)
    }
}
