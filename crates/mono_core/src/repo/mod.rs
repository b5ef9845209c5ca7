//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define CRUD contracts for tasks, sub-tasks and task lists.
//! - Isolate SQL details and row mapping from services.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.
//! - Write paths validate domain records before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use chrono::Utc;
use rusqlite::Connection;

pub mod sub_task_repo;
pub mod task_list_repo;
pub mod task_repo;

pub use task_repo::{EntityKind, RepoError, RepoResult};

/// Rejects connections that were not bootstrapped through `db::open_*`.
pub(crate) fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Builds `?, ?, ?` for an `IN (...)` clause of `count` values.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
