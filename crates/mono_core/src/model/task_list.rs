//! Task list (group) model.

use serde::{Deserialize, Serialize};

/// User-defined bucket that tasks may reference by id.
///
/// Lists do not embed their tasks; deleting a list leaves its tasks in place
/// with `task_list_id = None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub updated_at: i64,
}
