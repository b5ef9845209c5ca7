//! Table-level invalidation of live queries.
//!
//! # Responsibility
//! - Register live queries keyed by a stable query key.
//! - Re-run the live queries that read a table after that table is written.
//! - Tear down unobserved live queries once their grace period has elapsed.
//!
//! # Invariants
//! - One key maps to at most one upstream subject (multicast).
//! - Lock order is connection first, registry second.
//! - Re-run results are returned as [`PendingEmissions`] and published only
//!   after the caller releases the connection.

use crate::live::subject::{Observable, Subject};
use crate::repo::RepoResult;
use log::{debug, warn};
use rusqlite::Connection;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Tables a live query can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Task,
    SubTasks,
    TaskLists,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::SubTasks => "sub_tasks",
            Self::TaskLists => "task_lists",
        }
    }
}

type Emission = Box<dyn FnOnce() + Send>;
type Refresh = Box<dyn Fn(&Connection) -> RepoResult<Emission> + Send>;
type IdleProbe = Box<dyn Fn() -> Option<Instant> + Send>;

struct LiveQuery {
    tables: Vec<Table>,
    subject: Box<dyn Any + Send>,
    refresh: Refresh,
    idle_since: IdleProbe,
}

/// Publications produced by [`InvalidationTracker::invalidate`].
#[must_use = "pending emissions do nothing until emitted"]
pub struct PendingEmissions {
    emissions: Vec<Emission>,
}

impl PendingEmissions {
    pub fn len(&self) -> usize {
        self.emissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emissions.is_empty()
    }

    /// Publishes every re-run result to its subject.
    pub fn emit(self) {
        for emission in self.emissions {
            emission();
        }
    }
}

/// Registry of live queries and their table dependencies.
pub struct InvalidationTracker {
    queries: Mutex<HashMap<String, LiveQuery>>,
    grace: Duration,
}

impl InvalidationTracker {
    /// `grace` is how long an unobserved live query survives before teardown.
    pub fn new(grace: Duration) -> Self {
        Self {
            queries: Mutex::new(HashMap::new()),
            grace,
        }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Returns the live query for `key`, creating it with `load` when absent.
    ///
    /// `load` runs once immediately (its error aborts registration) and again
    /// after every write to one of `tables`.
    pub fn observe<T, F>(
        &self,
        conn: &Connection,
        key: &str,
        tables: &[Table],
        load: F,
    ) -> RepoResult<Observable<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&Connection) -> RepoResult<T> + Send + 'static,
    {
        let mut queries = self.lock_queries();
        if let Some(existing) = queries.get(key) {
            if let Some(subject) = existing.subject.downcast_ref::<Subject<T>>() {
                debug!("event=live_query_reuse module=live status=ok key={key}");
                return Ok(subject.observable());
            }
        }

        let subject = Subject::with_value(load(conn)?);
        let refresh_subject = subject.clone();
        let idle_subject = subject.clone();
        let live_query = LiveQuery {
            tables: tables.to_vec(),
            subject: Box::new(subject.clone()),
            refresh: Box::new(move |conn| {
                let value = load(conn)?;
                let version = refresh_subject.reserve_version();
                let target = refresh_subject.clone();
                Ok(Box::new(move || target.publish_at(version, value)) as Emission)
            }),
            idle_since: Box::new(move || idle_subject.idle_since()),
        };
        queries.insert(key.to_string(), live_query);
        debug!("event=live_query_register module=live status=ok key={key}");

        Ok(subject.observable())
    }

    /// Re-runs every live query that reads one of `tables`.
    ///
    /// A failing re-run keeps the previous value and is logged.
    pub fn invalidate(&self, conn: &Connection, tables: &[Table]) -> PendingEmissions {
        let queries = self.lock_queries();
        let mut emissions = Vec::new();
        for (key, query) in queries.iter() {
            if !query.tables.iter().any(|table| tables.contains(table)) {
                continue;
            }
            match (query.refresh)(conn) {
                Ok(emission) => emissions.push(emission),
                Err(err) => {
                    warn!("event=live_query_refresh module=live status=error key={key} error={err}")
                }
            }
        }
        PendingEmissions { emissions }
    }

    /// Drops live queries that have been unobserved for longer than the grace
    /// period as of `now`. Returns how many were removed.
    pub fn sweep_idle(&self, now: Instant) -> usize {
        let mut queries = self.lock_queries();
        let before = queries.len();
        let grace = self.grace;
        queries.retain(|key, query| {
            let keep = match (query.idle_since)() {
                None => true,
                Some(since) => now.saturating_duration_since(since) <= grace,
            };
            if !keep {
                debug!("event=live_query_teardown module=live status=ok key={key}");
            }
            keep
        });
        before - queries.len()
    }

    pub fn live_query_count(&self) -> usize {
        self.lock_queries().len()
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.lock_queries().contains_key(key)
    }

    fn lock_queries(&self) -> MutexGuard<'_, HashMap<String, LiveQuery>> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{InvalidationTracker, Table};
    use crate::db::open_db_in_memory;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    fn count_tasks(conn: &rusqlite::Connection) -> crate::repo::RepoResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM task;", [], |row| row.get(0))?)
    }

    #[test]
    fn same_key_shares_one_upstream() {
        let conn = open_db_in_memory().unwrap();
        let tracker = InvalidationTracker::new(Duration::from_secs(5));
        let first = tracker
            .observe(&conn, "count", &[Table::Task], count_tasks)
            .unwrap();
        let second = tracker
            .observe(&conn, "count", &[Table::Task], count_tasks)
            .unwrap();
        assert!(first.shares_upstream_with(&second));
        assert_eq!(tracker.live_query_count(), 1);
    }

    #[test]
    fn invalidate_only_reruns_dependent_queries() {
        let conn = open_db_in_memory().unwrap();
        let tracker = InvalidationTracker::new(Duration::from_secs(5));
        let tasks = tracker
            .observe(&conn, "count", &[Table::Task], count_tasks)
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = tasks.subscribe(move |value| sink.lock().unwrap().push(*value));

        conn.execute("INSERT INTO task (id) VALUES ('t1');", []).unwrap();
        assert!(tracker.invalidate(&conn, &[Table::TaskLists]).is_empty());

        let pending = tracker.invalidate(&conn, &[Table::Task]);
        assert_eq!(pending.len(), 1);
        pending.emit();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn sweep_respects_grace_period_and_active_observers() {
        let conn = open_db_in_memory().unwrap();
        let grace = Duration::from_millis(200);
        let tracker = InvalidationTracker::new(grace);
        let observed = tracker
            .observe(&conn, "observed", &[Table::Task], count_tasks)
            .unwrap();
        let _subscription = observed.subscribe(|_| {});
        tracker
            .observe(&conn, "idle", &[Table::Task], count_tasks)
            .unwrap();

        assert_eq!(tracker.sweep_idle(Instant::now()), 0);
        let later = Instant::now() + grace + Duration::from_millis(50);
        assert_eq!(tracker.sweep_idle(later), 1);
        assert!(tracker.is_registered("observed"));
        assert!(!tracker.is_registered("idle"));
    }
}
