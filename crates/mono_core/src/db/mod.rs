//! SQLite storage for tasks, sub-tasks and task lists.
//!
//! # Responsibility
//! - Open connections with foreign keys enforced and migrations applied.
//! - Own the column codecs repositories share (string lists as JSON, ISO
//!   dates and times, 0/1 flags).
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`; a newer database
//!   is rejected instead of being downgraded.
//! - `sub_tasks` cascade with their task and `task.task_list_id` is nulled
//!   with its list; both rely on foreign keys, so a connection that cannot
//!   enforce them is refused.
//! - Repositories never see a connection before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod codec;
pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// `PRAGMA foreign_keys` did not stick on this connection.
    ForeignKeysUnavailable,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ForeignKeysUnavailable => write!(
                f,
                "foreign keys are not enforced; sub-task cascade and list detach would break"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::ForeignKeysUnavailable => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
