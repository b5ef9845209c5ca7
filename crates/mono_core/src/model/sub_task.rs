//! Sub-task (checklist item) model.

use crate::model::task::new_entity_id;
use serde::{Deserialize, Serialize};

/// Child checklist item scoped to exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub task_id: String,
    pub title: String,
    pub is_completed: bool,
    /// Order key inside the parent task.
    pub position: i64,
    pub created_at: i64,
}

impl SubTask {
    /// Builds an unsaved sub-task with a blank title.
    pub fn new(task_id: impl Into<String>, position: i64) -> Self {
        Self {
            id: new_entity_id(),
            task_id: task_id.into(),
            title: String::new(),
            is_completed: false,
            position,
            created_at: 0,
        }
    }
}
