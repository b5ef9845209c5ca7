//! Shared database handle used by services.
//!
//! # Responsibility
//! - Own the single SQLite connection and serialize access to it.
//! - Route every write through live-query invalidation.
//!
//! # Invariants
//! - The connection lock is never held while subscriber callbacks run.
//! - A failed write does not invalidate any live query.
//! - Idle live queries are swept lazily on each write.

use crate::config::CoreConfig;
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::live::{InvalidationTracker, Observable, Table};
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default grace period for unobserved live queries.
pub const DEFAULT_LIVE_QUERY_GRACE: Duration = Duration::from_secs(5);

pub struct MonoStore {
    conn: Mutex<Connection>,
    tracker: InvalidationTracker,
}

impl MonoStore {
    /// Opens (and migrates) a file database.
    pub fn open(path: impl AsRef<Path>, grace: Duration) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?, grace))
    }

    /// Opens a fresh in-memory database with the default grace period.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(
            open_db_in_memory()?,
            DEFAULT_LIVE_QUERY_GRACE,
        ))
    }

    /// Opens the database described by `config`.
    pub fn from_config(config: &CoreConfig) -> DbResult<Self> {
        Self::open(config.resolved_db_path(), config.live_query_grace())
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, grace: Duration) -> Self {
        Self {
            conn: Mutex::new(conn),
            tracker: InvalidationTracker::new(grace),
        }
    }

    /// Runs a read-only closure against the connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let conn = self.lock_conn();
        f(&conn)
    }

    /// Runs a write, then re-runs live queries that depend on `touched`.
    pub fn write<T>(
        &self,
        touched: &[Table],
        f: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let (result, pending) = {
            let conn = self.lock_conn();
            let result = f(&conn)?;
            self.tracker.sweep_idle(Instant::now());
            let pending = self.tracker.invalidate(&conn, touched);
            (result, pending)
        };
        pending.emit();
        Ok(result)
    }

    /// Registers (or reuses) a live query under `key`.
    pub fn observe<T, F>(&self, key: &str, tables: &[Table], load: F) -> RepoResult<Observable<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&Connection) -> RepoResult<T> + Send + 'static,
    {
        let conn = self.lock_conn();
        self.tracker.observe(&conn, key, tables, load)
    }

    pub fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
