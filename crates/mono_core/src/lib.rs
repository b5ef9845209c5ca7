//! Core domain logic for Mono, an offline-first personal task manager.
//! This crate is the single source of truth for task data and its invariants;
//! mobile shells talk to it through `mono_ffi`.

pub mod calendar;
pub mod config;
pub mod db;
pub mod live;
pub mod logging;
pub mod model;
pub mod reminder;
pub mod repo;
pub mod service;
pub mod state;
pub mod store;

pub use calendar::{Month, MonthCache, Week, WeekStart, YearMonth};
pub use config::{ConfigError, CoreConfig};
pub use live::{Observable, Subject, Subscription, Table};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::bucket::{group_tasks, tasks_due_on, TaskBucket, TaskBuckets};
pub use model::sub_task::SubTask;
pub use model::task::{Task, TaskId, TaskValidationError};
pub use model::task_list::TaskList;
pub use reminder::{
    AlarmOutcome, AlarmPayload, AlarmPlatform, AlarmRequest, AlarmScheduler, CancelReason,
    InMemoryAlarmPlatform, NotificationSink, ReceiveOutcome, ReminderReceiver, TaskNotification,
};
pub use repo::task_repo::{TaskPatch, TaskQuery};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use service::sub_task_service::{SubTaskPatch, SubTaskService};
pub use service::task_list_service::TaskListService;
pub use service::task_service::{CreateTaskRequest, TaskService};
pub use store::MonoStore;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
