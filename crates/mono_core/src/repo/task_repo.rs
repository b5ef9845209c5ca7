//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and filtered listing over the `task` table.
//! - Map rows (including JSON list columns and sub-tasks) to [`Task`].
//!
//! # Invariants
//! - Every write bumps `revision` and `updated_at`.
//! - `update_task` with an expected revision never overwrites a newer row.
//! - Deleting a task cascades to `sub_tasks` through the foreign key.

use crate::db::codec::{
    bool_to_int, date_to_db, decode_string_list, encode_string_list, int_to_bool, parse_date,
    parse_time, time_to_db,
};
use crate::db::DbError;
use crate::model::task::{Task, TaskId, TaskValidationError};
use crate::repo::sub_task_repo::load_sub_tasks;
use crate::repo::{ensure_schema_ready, now_epoch_ms, placeholders};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    detail,
    date,
    time,
    is_completed,
    is_bookmarked,
    task_list_id,
    color,
    attachments,
    recordings,
    reminder,
    revision,
    created_at,
    updated_at
FROM task";

const TASK_ORDER_SQL: &str = " ORDER BY
    is_completed ASC,
    date IS NULL,
    date ASC,
    time IS NULL,
    time ASC,
    created_at ASC,
    id ASC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity named by a [`RepoError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Task,
    SubTask,
    TaskList,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Task => "task",
            Self::SubTask => "sub-task",
            Self::TaskList => "task list",
        };
        f.write_str(label)
    }
}

/// Error shared by all repositories and services.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    /// Target row does not exist.
    NotFound { entity: EntityKind, id: String },
    /// Stored revision moved past the revision the caller edited.
    Conflict {
        id: String,
        expected: i64,
        actual: i64,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "task {id} was modified concurrently: expected revision {expected}, found {actual}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::Conflict { .. }
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter shared by live list views and bulk clear.
///
/// `Hash` so identical queries can share one live subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TaskQuery {
    /// Restrict to tasks in any of these lists. `Some(empty)` matches nothing.
    pub list_ids: Option<BTreeSet<String>>,
    pub bookmarked: Option<bool>,
}

impl TaskQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn bookmarks() -> Self {
        Self {
            list_ids: None,
            bookmarked: Some(true),
        }
    }

    pub fn in_lists<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            list_ids: Some(ids.into_iter().map(Into::into).collect()),
            bookmarked: None,
        }
    }

    /// Cache key for live-query sharing.
    pub fn cache_key(&self) -> String {
        let lists = match &self.list_ids {
            None => "*".to_string(),
            Some(ids) => ids.iter().cloned().collect::<Vec<_>>().join(","),
        };
        let bookmarked = match self.bookmarked {
            None => "*",
            Some(true) => "1",
            Some(false) => "0",
        };
        format!("lists={lists};bookmarked={bookmarked}")
    }

    fn push_filters(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(ids) = &self.list_ids {
            if ids.is_empty() {
                sql.push_str(" AND 0");
            } else {
                sql.push_str(&format!(" AND task_list_id IN ({})", placeholders(ids.len())));
                bind_values.extend(ids.iter().cloned().map(Value::Text));
            }
        }
        if let Some(bookmarked) = self.bookmarked {
            sql.push_str(" AND is_bookmarked = ?");
            bind_values.push(Value::Integer(bool_to_int(bookmarked)));
        }
    }
}

/// Field-level overrides applied by [`TaskRepository::apply_patch`].
///
/// `None` keeps the stored value. Clearable fields use a nested option:
/// `Some(None)` clears, `Some(Some(v))` sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub date: Option<Option<NaiveDate>>,
    pub time: Option<Option<NaiveTime>>,
    pub is_completed: Option<bool>,
    pub is_bookmarked: Option<bool>,
    pub task_list_id: Option<Option<String>>,
    pub color: Option<Option<u32>>,
    pub attachments: Option<Vec<String>>,
    pub recordings: Option<Vec<String>>,
    pub reminder: Option<bool>,
    /// Revision the edit was based on. `None` means last-write-wins.
    pub expected_revision: Option<i64>,
}

impl TaskPatch {
    /// Copies every overridden field onto `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(detail) = &self.detail {
            task.detail = detail.clone();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(time) = self.time {
            task.time = time;
        }
        if let Some(is_completed) = self.is_completed {
            task.is_completed = is_completed;
        }
        if let Some(is_bookmarked) = self.is_bookmarked {
            task.is_bookmarked = is_bookmarked;
        }
        if let Some(task_list_id) = &self.task_list_id {
            task.task_list_id = task_list_id.clone();
        }
        if let Some(color) = self.color {
            task.color = color;
        }
        if let Some(attachments) = &self.attachments {
            task.attachments = attachments.clone();
        }
        if let Some(recordings) = &self.recordings {
            task.recordings = recordings.clone();
        }
        if let Some(reminder) = self.reminder {
            task.reminder = reminder;
        }
    }
}

/// Repository interface for task CRUD operations.
pub trait TaskRepository {
    /// Inserts the task row. Sub-tasks are persisted by the sub-task repository.
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    /// Re-persists every column and returns the new revision.
    fn update_task(&self, task: &Task, expected_revision: Option<i64>) -> RepoResult<i64>;
    fn get_task(&self, id: &str) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskQuery) -> RepoResult<Vec<Task>>;
    /// Narrow update; returns `false` when no row matched.
    fn set_completed(&self, id: &str, is_completed: bool) -> RepoResult<bool>;
    /// Narrow update; returns `false` when no row matched.
    fn set_bookmarked(&self, id: &str, is_bookmarked: bool) -> RepoResult<bool>;
    /// Narrow update; returns `false` when no row matched.
    fn set_reminder(&self, id: &str, reminder: bool) -> RepoResult<bool>;
    /// Deletes completed tasks matching `query`; returns the removed ids.
    fn clear_completed(&self, query: &TaskQuery) -> RepoResult<Vec<TaskId>>;
    /// Returns `false` when the id did not exist.
    fn delete_task(&self, id: &str) -> RepoResult<bool>;

    /// Fetches the current row, applies `patch` and re-persists it.
    ///
    /// # Errors
    /// - `NotFound` when `id` does not exist.
    /// - `Conflict` when `patch.expected_revision` is stale.
    fn apply_patch(&self, id: &str, patch: &TaskPatch) -> RepoResult<Task> {
        let mut task = self
            .get_task(id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Task, id))?;
        if let Some(expected) = patch.expected_revision {
            if expected != task.revision {
                return Err(RepoError::Conflict {
                    id: id.to_string(),
                    expected,
                    actual: task.revision,
                });
            }
        }
        patch.apply_to(&mut task);
        task.revision = self.update_task(&task, patch.expected_revision)?;
        Ok(task)
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn set_flag(&self, column: &'static str, id: &str, value: bool) -> RepoResult<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE task
                 SET
                    {column} = ?2,
                    revision = revision + 1,
                    updated_at = ?3
                 WHERE id = ?1;"
            ),
            params![id, bool_to_int(value), now_epoch_ms()],
        )?;
        Ok(changed > 0)
    }

    fn stored_revision(&self, id: &str) -> RepoResult<Option<i64>> {
        let revision = self
            .conn
            .query_row("SELECT revision FROM task WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(revision)
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        task.validate()?;
        let now = now_epoch_ms();

        self.conn.execute(
            "INSERT INTO task (
                id,
                title,
                detail,
                date,
                time,
                is_completed,
                is_bookmarked,
                task_list_id,
                color,
                attachments,
                recordings,
                reminder,
                revision,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 1, ?13, ?13);",
            params![
                task.id.as_str(),
                task.title.as_str(),
                task.detail.as_str(),
                task.date.map(date_to_db),
                task.time.map(time_to_db),
                bool_to_int(task.is_completed),
                bool_to_int(task.is_bookmarked),
                task.task_list_id.as_deref(),
                task.color.map(i64::from),
                encode_list(&task.attachments, "attachments")?,
                encode_list(&task.recordings, "recordings")?,
                bool_to_int(task.reminder),
                now,
            ],
        )?;

        Ok(task.id.clone())
    }

    fn update_task(&self, task: &Task, expected_revision: Option<i64>) -> RepoResult<i64> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE task
             SET
                title = ?2,
                detail = ?3,
                date = ?4,
                time = ?5,
                is_completed = ?6,
                is_bookmarked = ?7,
                task_list_id = ?8,
                color = ?9,
                attachments = ?10,
                recordings = ?11,
                reminder = ?12,
                revision = revision + 1,
                updated_at = ?13
             WHERE id = ?1
               AND (?14 IS NULL OR revision = ?14);",
            params![
                task.id.as_str(),
                task.title.as_str(),
                task.detail.as_str(),
                task.date.map(date_to_db),
                task.time.map(time_to_db),
                bool_to_int(task.is_completed),
                bool_to_int(task.is_bookmarked),
                task.task_list_id.as_deref(),
                task.color.map(i64::from),
                encode_list(&task.attachments, "attachments")?,
                encode_list(&task.recordings, "recordings")?,
                bool_to_int(task.reminder),
                now_epoch_ms(),
                expected_revision,
            ],
        )?;

        match (changed, self.stored_revision(&task.id)?) {
            (0, None) => Err(RepoError::not_found(EntityKind::Task, task.id.as_str())),
            (0, Some(actual)) => Err(RepoError::Conflict {
                id: task.id.clone(),
                expected: expected_revision.unwrap_or(actual),
                actual,
            }),
            (_, Some(revision)) => Ok(revision),
            (_, None) => Err(RepoError::not_found(EntityKind::Task, task.id.as_str())),
        }
    }

    fn get_task(&self, id: &str) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, query: &TaskQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        query.push_filters(&mut sql, &mut bind_values);
        sql.push_str(TASK_ORDER_SQL);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(self.conn, row)?);
        }
        Ok(tasks)
    }

    fn set_completed(&self, id: &str, is_completed: bool) -> RepoResult<bool> {
        self.set_flag("is_completed", id, is_completed)
    }

    fn set_bookmarked(&self, id: &str, is_bookmarked: bool) -> RepoResult<bool> {
        self.set_flag("is_bookmarked", id, is_bookmarked)
    }

    fn set_reminder(&self, id: &str, reminder: bool) -> RepoResult<bool> {
        self.set_flag("reminder", id, reminder)
    }

    fn clear_completed(&self, query: &TaskQuery) -> RepoResult<Vec<TaskId>> {
        let mut sql = String::from("DELETE FROM task WHERE is_completed = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        query.push_filters(&mut sql, &mut bind_values);
        sql.push_str(" RETURNING id;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut removed = Vec::new();
        while let Some(row) = rows.next()? {
            removed.push(row.get::<_, String>(0)?);
        }
        removed.sort();
        Ok(removed)
    }

    fn delete_task(&self, id: &str) -> RepoResult<bool> {
        let removed = self.conn.execute("DELETE FROM task WHERE id = ?1;", [id])?;
        Ok(removed > 0)
    }
}

fn encode_list(values: &[String], column: &str) -> RepoResult<Option<String>> {
    encode_string_list(values)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode task.{column}: {err}")))
}

fn parse_task_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Task> {
    let id: String = row.get("id")?;

    let date = match row.get::<_, Option<String>>("date")? {
        Some(value) => Some(parse_date(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid date `{value}` in task.date"))
        })?),
        None => None,
    };
    let time = match row.get::<_, Option<String>>("time")? {
        Some(value) => Some(parse_time(&value).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid time `{value}` in task.time"))
        })?),
        None => None,
    };
    let color = match row.get::<_, Option<i64>>("color")? {
        Some(value) => Some(u32::try_from(value).map_err(|_| {
            RepoError::InvalidData(format!("invalid color `{value}` in task.color"))
        })?),
        None => None,
    };

    let task = Task {
        sub_tasks: load_sub_tasks(conn, &id)?,
        title: row.get("title")?,
        detail: row.get("detail")?,
        date,
        time,
        is_completed: parse_flag(row, "is_completed")?,
        is_bookmarked: parse_flag(row, "is_bookmarked")?,
        task_list_id: row.get("task_list_id")?,
        color,
        attachments: parse_list(row, "attachments")?,
        recordings: parse_list(row, "recordings")?,
        reminder: parse_flag(row, "reminder")?,
        revision: row.get("revision")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        id,
    };
    task.validate()?;
    Ok(task)
}

fn parse_flag(row: &Row<'_>, column: &str) -> RepoResult<bool> {
    let raw: i64 = row.get(column)?;
    int_to_bool(raw).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid {column} value `{raw}` in task.{column}"))
    })
}

fn parse_list(row: &Row<'_>, column: &str) -> RepoResult<Vec<String>> {
    let raw: Option<String> = row.get(column)?;
    decode_string_list(raw.as_deref())
        .map_err(|err| RepoError::InvalidData(format!("invalid JSON in task.{column}: {err}")))
}
