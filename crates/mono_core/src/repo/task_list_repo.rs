//! Task list repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Deleting a list never deletes tasks. Member tasks are detached first with
//!   their `revision` bumped, so stale task edits surface as `Conflict`;
//!   `ON DELETE SET NULL` remains as the schema-level backstop.
//! - Listing order is deterministic: `created_at ASC, id ASC`.

use crate::model::task_list::TaskList;
use crate::repo::task_repo::{EntityKind, RepoError, RepoResult};
use crate::repo::{ensure_schema_ready, now_epoch_ms, placeholders};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TASK_LIST_SELECT_SQL: &str = "SELECT
    id,
    name,
    created_at,
    updated_at
FROM task_lists";

/// Repository interface for task list operations.
pub trait TaskListRepository {
    fn create_list(&self, id: &str, name: &str) -> RepoResult<TaskList>;
    fn rename_list(&self, id: &str, name: &str) -> RepoResult<()>;
    fn get_list(&self, id: &str) -> RepoResult<Option<TaskList>>;
    fn list_lists(&self) -> RepoResult<Vec<TaskList>>;
    /// Returns `false` when the id did not exist.
    fn delete_list(&self, id: &str) -> RepoResult<bool> {
        let removed = self.delete_with_detach(&[id.to_string()])?;
        Ok(removed > 0)
    }

    fn delete_lists(&self, ids: &[String]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.delete_with_detach(ids)
    }
}

impl SqliteTaskListRepository<'_> {
    /// Detaches member tasks as a regular task write, then deletes the lists.
    fn delete_with_detach(&self, ids: &[String]) -> RepoResult<usize> {
        let in_clause = placeholders(ids.len());
        let tx = self.conn.unchecked_transaction()?;

        let mut bind_values: Vec<Value> = vec![Value::Integer(now_epoch_ms())];
        bind_values.extend(ids.iter().cloned().map(Value::Text));
        tx.execute(
            &format!(
                "UPDATE task
                 SET task_list_id = NULL, revision = revision + 1, updated_at = ?
                 WHERE task_list_id IN ({in_clause});"
            ),
            params_from_iter(bind_values),
        )?;
        let removed = tx.execute(
            &format!("DELETE FROM task_lists WHERE id IN ({in_clause});"),
            params_from_iter(ids.iter()),
        )?;

        tx.commit()?;
        Ok(removed)
    }
}

fn parse_task_list_row(row: &Row<'_>) -> RepoResult<TaskList> {
    Ok(TaskList {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
