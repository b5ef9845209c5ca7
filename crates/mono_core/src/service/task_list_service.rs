//! Task list use-case service.
//!
//! # Invariants
//! - New lists start with a blank name.
//! - Deleting lists detaches (never deletes) their tasks.

use crate::live::{Observable, Table};
use crate::model::task::new_entity_id;
use crate::model::task_list::TaskList;
use crate::repo::task_list_repo::{SqliteTaskListRepository, TaskListRepository};
use crate::repo::RepoResult;
use crate::store::MonoStore;
use log::info;
use std::sync::Arc;

#[derive(Clone)]
pub struct TaskListService {
    store: Arc<MonoStore>,
}

impl TaskListService {
    pub fn new(store: Arc<MonoStore>) -> Self {
        Self { store }
    }

    /// Creates a list with a blank name.
    pub fn create(&self) -> RepoResult<TaskList> {
        self.create_named("")
    }

    pub fn create_named(&self, name: &str) -> RepoResult<TaskList> {
        let id = new_entity_id();
        let list = self.store.write(&[Table::TaskLists], |conn| {
            SqliteTaskListRepository::try_new(conn)?.create_list(&id, name.trim())
        })?;
        info!("event=task_list_create module=service status=ok list_id={id}");
        Ok(list)
    }

    /// Fails with `NotFound` when the list does not exist.
    pub fn rename(&self, id: &str, name: &str) -> RepoResult<()> {
        self.store.write(&[Table::TaskLists], |conn| {
            SqliteTaskListRepository::try_new(conn)?.rename_list(id, name.trim())
        })
    }

    pub fn get(&self, id: &str) -> RepoResult<Option<TaskList>> {
        self.store
            .read(|conn| SqliteTaskListRepository::try_new(conn)?.get_list(id))
    }

    pub fn list(&self) -> RepoResult<Vec<TaskList>> {
        self.store
            .read(|conn| SqliteTaskListRepository::try_new(conn)?.list_lists())
    }

    pub fn observe_all(&self) -> RepoResult<Observable<Vec<TaskList>>> {
        self.store.observe("task_lists", &[Table::TaskLists], |conn| {
            SqliteTaskListRepository::try_new(conn)?.list_lists()
        })
    }

    /// Deletes the list; its tasks keep existing with no list.
    pub fn delete(&self, id: &str) -> RepoResult<bool> {
        let removed = self.store.write(&[Table::TaskLists, Table::Task], |conn| {
            SqliteTaskListRepository::try_new(conn)?.delete_list(id)
        })?;
        info!("event=task_list_delete module=service status=ok list_id={id} removed={removed}");
        Ok(removed)
    }

    pub fn delete_many(&self, ids: &[String]) -> RepoResult<usize> {
        let removed = self.store.write(&[Table::TaskLists, Table::Task], |conn| {
            SqliteTaskListRepository::try_new(conn)?.delete_lists(ids)
        })?;
        info!(
            "event=task_list_delete_many module=service status=ok requested={} removed={removed}",
            ids.len()
        );
        Ok(removed)
    }
}
