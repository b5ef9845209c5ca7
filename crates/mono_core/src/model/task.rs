//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record shared by list, detail and calendar
//!   views.
//! - Validate references stored alongside a task.
//!
//! # Invariants
//! - `id` is non-blank, unique and never changes after creation.
//! - `revision` starts at 1 and grows by one on every persisted write.
//! - `sub_tasks` is ordered by position and always belongs to this task.

use crate::model::sub_task::SubTask;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque task identifier.
pub type TaskId = String;

/// Generates a fresh identifier for any persisted entity.
///
/// Backed by random v4 UUIDs; uniqueness is not re-checked against storage.
pub fn new_entity_id() -> String {
    Uuid::new_v4().to_string()
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub detail: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub is_completed: bool,
    pub is_bookmarked: bool,
    /// Owning task list. `None` for inbox tasks and after the list is deleted.
    pub task_list_id: Option<String>,
    pub sub_tasks: Vec<SubTask>,
    /// ARGB color tag.
    pub color: Option<u32>,
    pub attachments: Vec<String>,
    pub recordings: Vec<String>,
    /// Pending-notification flag. Cleared once the reminder has fired.
    pub reminder: bool,
    pub revision: i64,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Task {
    /// Builds an unsaved, active task with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            title: title.into(),
            detail: String::new(),
            date: None,
            time: None,
            is_completed: false,
            is_bookmarked: false,
            task_list_id: None,
            sub_tasks: Vec::new(),
            color: None,
            attachments: Vec::new(),
            recordings: Vec::new(),
            reminder: false,
            revision: 1,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Due instant when both date and time are set.
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        match (self.date, self.time) {
            (Some(date), Some(time)) => Some(date.and_time(time)),
            _ => None,
        }
    }

    /// Checks invariants that must hold before a write and after a read.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.trim().is_empty() {
            return Err(TaskValidationError::BlankId);
        }
        if let Some(index) = self.attachments.iter().position(|v| v.trim().is_empty()) {
            return Err(TaskValidationError::BlankAttachment { index });
        }
        if let Some(index) = self.recordings.iter().position(|v| v.trim().is_empty()) {
            return Err(TaskValidationError::BlankRecording { index });
        }
        if let Some(sub_task) = self.sub_tasks.iter().find(|s| s.task_id != self.id) {
            return Err(TaskValidationError::ForeignSubTask {
                sub_task_id: sub_task.id.clone(),
            });
        }
        Ok(())
    }
}

/// Domain validation failures for [`Task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankId,
    BlankAttachment { index: usize },
    BlankRecording { index: usize },
    ForeignSubTask { sub_task_id: String },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "task id must not be blank"),
            Self::BlankAttachment { index } => {
                write!(f, "attachment reference at index {index} is blank")
            }
            Self::BlankRecording { index } => {
                write!(f, "recording reference at index {index} is blank")
            }
            Self::ForeignSubTask { sub_task_id } => {
                write!(f, "sub-task {sub_task_id} belongs to another task")
            }
        }
    }
}

impl Error for TaskValidationError {}
