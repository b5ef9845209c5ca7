//! Sub-task repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A sub-task can only be created under an existing task.
//! - Listing order is deterministic: `position ASC, created_at ASC, id ASC`.

use crate::db::codec::{bool_to_int, int_to_bool};
use crate::model::sub_task::SubTask;
use crate::repo::task_repo::{EntityKind, RepoError, RepoResult};
use crate::repo::{ensure_schema_ready, now_epoch_ms, placeholders};
use rusqlite::{params, params_from_iter, Connection, Row};

const SUB_TASK_SELECT_SQL: &str = "SELECT
    id,
    task_id,
    title,
    is_completed,
    position,
    created_at
FROM sub_tasks";

/// Repository interface for sub-task operations.
pub trait SubTaskRepository {
    fn create_sub_task(&self, sub_task: &SubTask) -> RepoResult<String>;
    /// Position after the current last sub-task of `task_id`.
    fn next_position(&self, task_id: &str) -> RepoResult<i64>;
    fn update_sub_task(&self, sub_task: &SubTask) -> RepoResult<()>;
    fn get_sub_task(&self, id: &str) -> RepoResult<Option<SubTask>>;
    fn list_for_task(&self, task_id: &str) -> RepoResult<Vec<SubTask>>;
    /// Returns `false` when the id did not exist.
    fn delete_sub_task(&self, id: &str) -> RepoResult<bool>;
    /// Returns the number of removed rows.
    fn delete_sub_tasks(&self, ids: &[String]) -> RepoResult<usize>;
}

/// SQLite-backed sub-task repository.
pub struct SqliteSubTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SubTaskRepository for SqliteSubTaskRepository<'_> {
    fn create_sub_task(&self, sub_task: &SubTask) -> RepoResult<String> {
        let parent_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM task WHERE id = ?1);",
            [sub_task.task_id.as_str()],
            |row| row.get(0),
        )?;
        if parent_exists != 1 {
            return Err(RepoError::not_found(
                EntityKind::Task,
                sub_task.task_id.as_str(),
            ));
        }

        self.conn.execute(
            "INSERT INTO sub_tasks (
                id,
                task_id,
                title,
                is_completed,
                position,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                sub_task.id.as_str(),
                sub_task.task_id.as_str(),
                sub_task.title.as_str(),
                bool_to_int(sub_task.is_completed),
                sub_task.position,
                now_epoch_ms(),
            ],
        )?;
        Ok(sub_task.id.clone())
    }

    fn next_position(&self, task_id: &str) -> RepoResult<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM sub_tasks WHERE task_id = ?1;",
            [task_id],
            |row| row.get(0),
        )?;
        Ok(position)
    }

    fn update_sub_task(&self, sub_task: &SubTask) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE sub_tasks
             SET
                title = ?2,
                is_completed = ?3,
                position = ?4
             WHERE id = ?1;",
            params![
                sub_task.id.as_str(),
                sub_task.title.as_str(),
                bool_to_int(sub_task.is_completed),
                sub_task.position,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(
                EntityKind::SubTask,
                sub_task.id.as_str(),
            ));
        }
        Ok(())
    }

    fn get_sub_task(&self, id: &str) -> RepoResult<Option<SubTask>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUB_TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_sub_task_row(row)?));
        }
        Ok(None)
    }

    fn list_for_task(&self, task_id: &str) -> RepoResult<Vec<SubTask>> {
        load_sub_tasks(self.conn, task_id)
    }

    fn delete_sub_task(&self, id: &str) -> RepoResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM sub_tasks WHERE id = ?1;", [id])?;
        Ok(removed > 0)
    }

    fn delete_sub_tasks(&self, ids: &[String]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = self.conn.execute(
            &format!(
                "DELETE FROM sub_tasks WHERE id IN ({});",
                placeholders(ids.len())
            ),
            params_from_iter(ids.iter()),
        )?;
        Ok(removed)
    }
}

/// Loads the ordered sub-tasks owned by `task_id`.
pub(crate) fn load_sub_tasks(conn: &Connection, task_id: &str) -> RepoResult<Vec<SubTask>> {
    let mut stmt = conn.prepare(&format!(
        "{SUB_TASK_SELECT_SQL}
         WHERE task_id = ?1
         ORDER BY position ASC, created_at ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([task_id])?;
    let mut sub_tasks = Vec::new();
    while let Some(row) = rows.next()? {
        sub_tasks.push(parse_sub_task_row(row)?);
    }
    Ok(sub_tasks)
}

fn parse_sub_task_row(row: &Row<'_>) -> RepoResult<SubTask> {
    let raw_completed: i64 = row.get("is_completed")?;
    let is_completed = int_to_bool(raw_completed).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid is_completed value `{raw_completed}` in sub_tasks.is_completed"
        ))
    })?;

    Ok(SubTask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        title: row.get("title")?,
        is_completed,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
    })
}
