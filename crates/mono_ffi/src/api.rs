//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose task, task-list, sub-task, calendar and reminder use-cases to
//!   Dart via FRB.
//! - Translate core records into flat, string-friendly DTOs.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Ids are opaque strings; dates are `YYYY-MM-DD`, times `HH:MM[:SS]`.
//! - One process-wide store backs every call so live queries stay coherent.
//! - Task writes that can change a reminder return the alarm instructions the
//!   host must apply; the host owns the platform alarm service.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;
use mono_core::reminder::{alarm_key, AlarmKey};
use mono_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AlarmOutcome, AlarmPayload, AlarmPlatform, AlarmScheduler, CancelReason, CoreConfig,
    CreateTaskRequest, MonoStore, MonthCache, NotificationSink, ReceiveOutcome, ReminderReceiver,
    SubTask, SubTaskPatch, SubTaskService, Task, TaskList, TaskListService, TaskNotification,
    TaskPatch, TaskQuery, TaskService, YearMonth,
};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];
const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE: OnceLock<Arc<MonoStore>> = OnceLock::new();
static MONTH_CACHE: OnceLock<Mutex<MonthCache>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the created or affected entity.
    pub id: Option<String>,
    /// Rows affected by bulk operations.
    pub count: u32,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
    /// Alarm changes the host must apply, in order. Empty when the call
    /// cannot affect a reminder.
    pub alarms: Vec<AlarmInstruction>,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<String>) -> Self {
        Self {
            ok: true,
            id,
            count: 0,
            message: message.into(),
            alarms: Vec::new(),
        }
    }

    fn counted(message: impl Into<String>, count: usize) -> Self {
        Self {
            ok: true,
            id: None,
            count: u32::try_from(count).unwrap_or(u32::MAX),
            message: message.into(),
            alarms: Vec::new(),
        }
    }

    fn failure(operation: &str, err: impl Display) -> Self {
        Self {
            ok: false,
            id: None,
            count: 0,
            message: failure_message(operation, err),
            alarms: Vec::new(),
        }
    }

    fn with_alarms(mut self, alarms: Vec<AlarmInstruction>) -> Self {
        self.alarms = alarms;
        self
    }
}

/// One platform alarm change, keyed like the core scheduler keys alarms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmInstruction {
    /// Platform alarm id derived from `task_id`.
    pub key: i32,
    pub task_id: String,
    /// `true`: set (or replace) an exact one-shot alarm at `at`.
    /// `false`: cancel any pending alarm for `key`.
    pub schedule: bool,
    /// Local `YYYY-MM-DDTHH:MM:SS`; only set when scheduling.
    pub at: Option<String>,
    /// Payload to hand back to [`reminder_on_alarm`] when the alarm fires.
    pub title: String,
    pub detail: String,
    /// `disabled`, `missing_schedule`, `not_in_future`, `deleted` or
    /// `task_missing` for cancels; empty when scheduling.
    pub reason: String,
}

/// Response of [`reminder_set_or_cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmSyncResponse {
    pub ok: bool,
    pub instruction: Option<AlarmInstruction>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubTaskItem {
    pub id: String,
    pub title: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub title: String,
    pub detail: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub is_completed: bool,
    pub is_bookmarked: bool,
    pub task_list_id: Option<String>,
    /// ARGB color tag.
    pub color: Option<u32>,
    pub attachments: Vec<String>,
    pub recordings: Vec<String>,
    pub reminder: bool,
    /// Pass back as `expected_revision` when saving an edit.
    pub revision: i64,
    pub sub_tasks: Vec<SubTaskItem>,
}

/// Single-task read response. `task` is `None` when the id does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResponse {
    pub ok: bool,
    pub task: Option<TaskItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TasksResponse {
    pub ok: bool,
    pub tasks: Vec<TaskItem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListItem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListsResponse {
    pub ok: bool,
    pub lists: Vec<TaskListItem>,
    pub message: String,
}

/// Input for [`task_create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub detail: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub task_list_id: Option<String>,
    pub is_bookmarked: bool,
    pub reminder: bool,
}

/// Input for [`task_update`].
///
/// `None` keeps a field. For `date`, `time` and `task_list_id` an empty
/// string clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEditInput {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub task_list_id: Option<String>,
    pub color: Option<u32>,
    pub clear_color: bool,
    pub attachments: Option<Vec<String>>,
    pub recordings: Option<Vec<String>>,
    pub reminder: Option<bool>,
    pub expected_revision: Option<i64>,
}

/// Filter for list reads and bulk clear. `list_ids = Some([])` matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub list_ids: Option<Vec<String>>,
    pub bookmarked: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMonthResponse {
    pub ok: bool,
    /// `YYYY-MM`; empty when the offset is out of range.
    pub year_month: String,
    /// One row of seven `YYYY-MM-DD` dates per week.
    pub weeks: Vec<Vec<String>>,
    /// Dates of this month that have at least one task.
    pub marked_dates: Vec<String>,
    pub message: String,
}

/// Notification the host should display after an alarm fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationItem {
    pub notification_id: i32,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub deep_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderResponse {
    pub ok: bool,
    /// `None` when notification permission was denied or the task is gone.
    pub notification: Option<NotificationItem>,
    pub message: String,
}

/// Creates a task.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created task id on success, plus the task's alarm
///   instruction against the device's local clock.
#[flutter_rust_bridge::frb(sync)]
pub fn task_create(input: TaskInput) -> ActionResponse {
    let result = (|| {
        let request = CreateTaskRequest {
            title: input.title.trim().to_string(),
            detail: input.detail,
            is_bookmarked: input.is_bookmarked,
            date: parse_optional_date(input.date.as_deref())?,
            time: parse_optional_time(input.time.as_deref())?,
            task_list_id: non_empty(input.task_list_id),
            reminder: input.reminder,
        };
        let service = task_service()?;
        let id = service.create(&request).map_err(|err| err.to_string())?;
        let alarms = resync_alarms(&service, &id, local_now())?;
        Ok::<_, String>((id, alarms))
    })();
    match result {
        Ok((id, alarms)) => ActionResponse::success("Task created.", Some(id)).with_alarms(alarms),
        Err(err) => ActionResponse::failure("task_create", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_get(id: String) -> TaskResponse {
    match task_service().and_then(|service| service.get(&id).map_err(|err| err.to_string())) {
        Ok(Some(task)) => TaskResponse {
            ok: true,
            task: Some(to_task_item(task)),
            message: String::new(),
        },
        Ok(None) => TaskResponse {
            ok: true,
            task: None,
            message: "Task not found.".to_string(),
        },
        Err(err) => TaskResponse {
            ok: false,
            task: None,
            message: failure_message("task_get", err),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_list(filter: TaskFilter) -> TasksResponse {
    let query = to_query(filter);
    match task_service().and_then(|service| service.list(&query).map_err(|err| err.to_string())) {
        Ok(tasks) => TasksResponse {
            ok: true,
            message: format!("Found {} task(s).", tasks.len()),
            tasks: tasks.into_iter().map(to_task_item).collect(),
        },
        Err(err) => TasksResponse {
            ok: false,
            tasks: Vec::new(),
            message: failure_message("task_list", err),
        },
    }
}

/// Applies an edit to an existing task.
///
/// # FFI contract
/// - Fails (never silently succeeds) when the id does not exist.
/// - Fails with a conflict message when `expected_revision` is stale.
/// - Returns the saved task's alarm instruction.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(id: String, input: TaskEditInput) -> ActionResponse {
    let result = (|| {
        let patch = to_patch(input)?;
        task_service()?
            .update(&id, &patch)
            .map_err(|err| err.to_string())
    })();
    match result {
        Ok(task) => {
            let alarm = alarm_for_task(&task, local_now());
            ActionResponse::success(
                format!("Task saved (revision {}).", task.revision),
                Some(task.id),
            )
            .with_alarms(vec![alarm])
        }
        Err(err) => ActionResponse::failure("task_update", err),
    }
}

/// Completing a task returns a cancel instruction for its alarm; reopening
/// it re-arms a still-future reminder.
#[flutter_rust_bridge::frb(sync)]
pub fn task_set_completed(id: String, is_completed: bool) -> ActionResponse {
    let result = task_service().and_then(|service| {
        let changed = service
            .set_completed(&id, is_completed)
            .map_err(|err| err.to_string())?;
        let alarms = if changed {
            resync_alarms(&service, &id, local_now())?
        } else {
            Vec::new()
        };
        Ok((changed, alarms))
    });
    match result {
        Ok((changed, alarms)) => {
            flag_response("task_set_completed", id, Ok(changed)).with_alarms(alarms)
        }
        Err(err) => flag_response("task_set_completed", id, Err(err)),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_set_bookmarked(id: String, is_bookmarked: bool) -> ActionResponse {
    let result = task_service().and_then(|service| {
        service
            .set_bookmarked(&id, is_bookmarked)
            .map_err(|err| err.to_string())
    });
    flag_response("task_set_bookmarked", id, result)
}

/// Deletes a task together with its sub-tasks and cancels its alarm.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: String) -> ActionResponse {
    match task_service().and_then(|service| service.delete(&id).map_err(|err| err.to_string())) {
        Ok(true) => {
            let cancel = AlarmInstruction::cancel(&id, "deleted");
            ActionResponse::success("Task deleted.", Some(id)).with_alarms(vec![cancel])
        }
        Ok(false) => ActionResponse::failure("task_delete", format!("task {id} not found")),
        Err(err) => ActionResponse::failure("task_delete", err),
    }
}

/// Deletes completed tasks matching `filter`; `count` holds the removed rows
/// and `alarms` one cancel instruction per removed task.
#[flutter_rust_bridge::frb(sync)]
pub fn task_clear_completed(filter: TaskFilter) -> ActionResponse {
    let query = to_query(filter);
    match task_service()
        .and_then(|service| service.clear_completed(&query).map_err(|err| err.to_string()))
    {
        Ok(removed) => {
            let alarms = removed
                .iter()
                .map(|id| AlarmInstruction::cancel(id, "deleted"))
                .collect();
            ActionResponse::counted(format!("Cleared {} task(s).", removed.len()), removed.len())
                .with_alarms(alarms)
        }
        Err(err) => ActionResponse::failure("task_clear_completed", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_list_create(name: String) -> ActionResponse {
    match list_service().and_then(|service| {
        service
            .create_named(&name)
            .map_err(|err| err.to_string())
    }) {
        Ok(list) => ActionResponse::success("List created.", Some(list.id)),
        Err(err) => ActionResponse::failure("task_list_create", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_list_rename(id: String, name: String) -> ActionResponse {
    match list_service()
        .and_then(|service| service.rename(&id, &name).map_err(|err| err.to_string()))
    {
        Ok(()) => ActionResponse::success("List renamed.", Some(id)),
        Err(err) => ActionResponse::failure("task_list_rename", err),
    }
}

/// Deletes a list. Its tasks stay and lose their list reference.
#[flutter_rust_bridge::frb(sync)]
pub fn task_list_delete(id: String) -> ActionResponse {
    match list_service().and_then(|service| service.delete(&id).map_err(|err| err.to_string())) {
        Ok(true) => ActionResponse::success("List deleted.", Some(id)),
        Ok(false) => {
            ActionResponse::failure("task_list_delete", format!("list {id} not found"))
        }
        Err(err) => ActionResponse::failure("task_list_delete", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn task_list_all() -> TaskListsResponse {
    match list_service().and_then(|service| service.list().map_err(|err| err.to_string())) {
        Ok(lists) => TaskListsResponse {
            ok: true,
            message: format!("Found {} list(s).", lists.len()),
            lists: lists.into_iter().map(to_task_list_item).collect(),
        },
        Err(err) => TaskListsResponse {
            ok: false,
            lists: Vec::new(),
            message: failure_message("task_list_all", err),
        },
    }
}

/// Appends a blank sub-task to `task_id`.
#[flutter_rust_bridge::frb(sync)]
pub fn sub_task_create(task_id: String) -> ActionResponse {
    match sub_task_service()
        .and_then(|service| service.create(&task_id).map_err(|err| err.to_string()))
    {
        Ok(id) => ActionResponse::success("Sub-task created.", Some(id)),
        Err(err) => ActionResponse::failure("sub_task_create", err),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn sub_task_rename(id: String, title: String) -> ActionResponse {
    let patch = SubTaskPatch {
        title: Some(title),
        ..SubTaskPatch::default()
    };
    sub_task_update("sub_task_rename", id, patch)
}

#[flutter_rust_bridge::frb(sync)]
pub fn sub_task_set_completed(id: String, is_completed: bool) -> ActionResponse {
    let patch = SubTaskPatch {
        is_completed: Some(is_completed),
        ..SubTaskPatch::default()
    };
    sub_task_update("sub_task_set_completed", id, patch)
}

#[flutter_rust_bridge::frb(sync)]
pub fn sub_task_delete(id: String) -> ActionResponse {
    match sub_task_service().and_then(|service| service.delete(&id).map_err(|err| err.to_string()))
    {
        Ok(true) => ActionResponse::success("Sub-task deleted.", Some(id)),
        Ok(false) => {
            ActionResponse::failure("sub_task_delete", format!("sub-task {id} not found"))
        }
        Err(err) => ActionResponse::failure("sub_task_delete", err),
    }
}

/// Month layout at `offset` from the configured calendar start month.
///
/// # FFI contract
/// - Layouts are memoized per offset for the life of the process.
/// - Offsets outside `1970-01..=2100-12` return `ok = false`.
#[flutter_rust_bridge::frb(sync)]
pub fn calendar_month(offset: i32) -> CalendarMonthResponse {
    let Some(month) = lock_month_cache().month_at(offset) else {
        return CalendarMonthResponse {
            ok: false,
            year_month: String::new(),
            weeks: Vec::new(),
            marked_dates: Vec::new(),
            message: failure_message("calendar_month", format!("offset {offset} is out of range")),
        };
    };

    let weeks = month
        .grid()
        .iter()
        .map(|week| week.iter().map(|date| format_date(*date)).collect())
        .collect();
    let (marked_dates, message) = match task_service()
        .and_then(|service| service.list(&TaskQuery::all()).map_err(|err| err.to_string()))
    {
        Ok(tasks) => (marked_dates(&tasks, month.year_month), String::new()),
        Err(err) => (Vec::new(), format!("task markers unavailable: {err}")),
    };

    CalendarMonthResponse {
        ok: true,
        year_month: month.year_month.to_string(),
        weeks,
        marked_dates,
        message,
    }
}

/// Offset of the month containing today's local date.
#[flutter_rust_bridge::frb(sync)]
pub fn calendar_current_offset() -> i32 {
    let today = YearMonth::from_date(Local::now().date_naive());
    lock_month_cache().offset_of(today).unwrap_or(0)
}

/// Decides the alarm for one task: schedule when its reminder is on, it is
/// open, and its due instant is strictly after `now` (second precision);
/// otherwise cancel.
///
/// Input semantics:
/// - `now`: local `YYYY-MM-DDTHH:MM:SS`; `None` or empty uses the device clock.
///
/// # FFI contract
/// - An unknown task id yields a cancel instruction, never an error.
/// - Malformed `now` returns `ok = false` and no instruction.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_set_or_cancel(task_id: String, now: Option<String>) -> AlarmSyncResponse {
    let result = (|| {
        let now = match parse_optional_date_time(now.as_deref())? {
            Some(now) => now,
            None => local_now(),
        };
        let task = task_service()?
            .get(&task_id)
            .map_err(|err| err.to_string())?;
        Ok::<_, String>(match task {
            Some(task) => alarm_for_task(&task, now),
            None => AlarmInstruction::cancel(&task_id, "task_missing"),
        })
    })();
    match result {
        Ok(instruction) => AlarmSyncResponse {
            ok: true,
            instruction: Some(instruction),
            message: String::new(),
        },
        Err(err) => AlarmSyncResponse {
            ok: false,
            instruction: None,
            message: failure_message("reminder_set_or_cancel", err),
        },
    }
}

/// Handles an alarm delivered by the host: builds the notification (when
/// `permission_granted`) and clears the task's reminder flag either way.
#[flutter_rust_bridge::frb(sync)]
pub fn reminder_on_alarm(
    task_id: String,
    title: String,
    detail: String,
    permission_granted: bool,
) -> ReminderResponse {
    let sink = CapturingSink {
        permission_granted,
        captured: Mutex::new(None),
    };
    let payload = AlarmPayload {
        task_id,
        title,
        detail,
    };
    let result = task_service().and_then(|service| {
        ReminderReceiver::new(&sink, service)
            .on_alarm(&payload)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(ReceiveOutcome::Posted) => ReminderResponse {
            ok: true,
            notification: sink
                .captured
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .map(to_notification_item),
            message: String::new(),
        },
        Ok(ReceiveOutcome::PermissionDenied) => ReminderResponse {
            ok: true,
            notification: None,
            message: "Notification permission denied.".to_string(),
        },
        Ok(ReceiveOutcome::TaskMissing) => ReminderResponse {
            ok: true,
            notification: None,
            message: "Task no longer exists.".to_string(),
        },
        Err(err) => ReminderResponse {
            ok: false,
            notification: None,
            message: failure_message("reminder_on_alarm", err),
        },
    }
}

struct CapturingSink {
    permission_granted: bool,
    captured: Mutex<Option<TaskNotification>>,
}

impl NotificationSink for &CapturingSink {
    fn has_permission(&self) -> bool {
        self.permission_granted
    }

    fn post(&self, notification: &TaskNotification) {
        *self
            .captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(notification.clone());
    }
}

/// Platform seam for the binding: the host applies alarms itself from the
/// returned [`AlarmInstruction`]s, so nothing is applied in-process.
struct HostAppliedAlarms;

impl AlarmPlatform for HostAppliedAlarms {
    fn schedule_exact(&self, _key: AlarmKey, _at: NaiveDateTime, _payload: AlarmPayload) {}

    fn cancel(&self, _key: AlarmKey) {}
}

impl AlarmInstruction {
    fn cancel(task_id: &str, reason: &str) -> Self {
        Self {
            key: alarm_key(task_id).0,
            task_id: task_id.to_string(),
            schedule: false,
            at: None,
            title: String::new(),
            detail: String::new(),
            reason: reason.to_string(),
        }
    }
}

fn alarm_for_task(task: &Task, now: NaiveDateTime) -> AlarmInstruction {
    match AlarmScheduler::new(HostAppliedAlarms).sync_task(task, now) {
        AlarmOutcome::Scheduled { key, at } => AlarmInstruction {
            key: key.0,
            task_id: task.id.clone(),
            schedule: true,
            at: Some(at.format(DATE_TIME_FORMAT).to_string()),
            title: task.title.clone(),
            detail: task.detail.clone(),
            reason: String::new(),
        },
        AlarmOutcome::Cancelled { reason, .. } => {
            AlarmInstruction::cancel(&task.id, cancel_reason_name(reason))
        }
    }
}

/// Re-reads `id` after a write and returns its alarm instruction.
fn resync_alarms(
    service: &TaskService,
    id: &str,
    now: NaiveDateTime,
) -> Result<Vec<AlarmInstruction>, String> {
    let task = service.get(id).map_err(|err| err.to_string())?;
    Ok(vec![match task {
        Some(task) => alarm_for_task(&task, now),
        None => AlarmInstruction::cancel(id, "task_missing"),
    }])
}

fn cancel_reason_name(reason: CancelReason) -> &'static str {
    match reason {
        CancelReason::Disabled => "disabled",
        CancelReason::MissingSchedule => "missing_schedule",
        CancelReason::NotInFuture => "not_in_future",
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Logs a failed call and builds the envelope message for it.
fn failure_message(operation: &str, err: impl Display) -> String {
    warn!("event=ffi_call module=ffi status=error op={operation} error={err}");
    format!("{operation} failed: {err}")
}

fn flag_response(operation: &str, id: String, result: Result<bool, String>) -> ActionResponse {
    match result {
        Ok(true) => ActionResponse::success("Task updated.", Some(id)),
        Ok(false) => ActionResponse::failure(operation, format!("task {id} not found")),
        Err(err) => ActionResponse::failure(operation, err),
    }
}

fn sub_task_update(operation: &str, id: String, patch: SubTaskPatch) -> ActionResponse {
    match sub_task_service()
        .and_then(|service| service.update(&id, &patch).map_err(|err| err.to_string()))
    {
        Ok(sub_task) => ActionResponse::success("Sub-task updated.", Some(sub_task.id)),
        Err(err) => ActionResponse::failure(operation, err),
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| CoreConfig::default().resolved_db_path())
        .clone()
}

fn shared_store() -> Result<Arc<MonoStore>, String> {
    if let Some(store) = STORE.get() {
        return Ok(Arc::clone(store));
    }
    let config = CoreConfig {
        db_path: Some(resolve_db_path()),
        ..CoreConfig::default()
    };
    let store = MonoStore::from_config(&config).map_err(|err| format!("DB open failed: {err}"))?;
    // A concurrent first call may have won; its store is kept.
    Ok(Arc::clone(STORE.get_or_init(|| Arc::new(store))))
}

fn task_service() -> Result<TaskService, String> {
    shared_store().map(TaskService::new)
}

fn list_service() -> Result<TaskListService, String> {
    shared_store().map(TaskListService::new)
}

fn sub_task_service() -> Result<SubTaskService, String> {
    shared_store().map(SubTaskService::new)
}

fn lock_month_cache() -> std::sync::MutexGuard<'static, MonthCache> {
    MONTH_CACHE
        .get_or_init(|| {
            let config = CoreConfig::default();
            Mutex::new(MonthCache::new(config.calendar_start, config.week_start))
        })
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn to_query(filter: TaskFilter) -> TaskQuery {
    TaskQuery {
        list_ids: filter.list_ids.map(|ids| ids.into_iter().collect()),
        bookmarked: filter.bookmarked,
    }
}

fn to_patch(input: TaskEditInput) -> Result<TaskPatch, String> {
    Ok(TaskPatch {
        title: input.title,
        detail: input.detail,
        date: input
            .date
            .map(|raw| parse_optional_date(Some(raw.as_str())))
            .transpose()?,
        time: input
            .time
            .map(|raw| parse_optional_time(Some(raw.as_str())))
            .transpose()?,
        is_completed: None,
        is_bookmarked: None,
        task_list_id: input.task_list_id.map(|raw| non_empty(Some(raw))),
        color: if input.clear_color {
            Some(None)
        } else {
            input.color.map(Some)
        },
        attachments: input.attachments,
        recordings: input.recordings,
        reminder: input.reminder,
        expected_revision: input.expected_revision,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(Some)
            .map_err(|_| format!("invalid date `{raw}`, expected YYYY-MM-DD")),
    }
}

fn parse_optional_time(raw: Option<&str>) -> Result<Option<NaiveTime>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .map(Some)
        .ok_or_else(|| format!("invalid time `{raw}`, expected HH:MM or HH:MM:SS"))
}

fn parse_optional_date_time(raw: Option<&str>) -> Result<Option<NaiveDateTime>, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(Some)
        .ok_or_else(|| format!("invalid date-time `{raw}`, expected YYYY-MM-DDTHH:MM:SS"))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn marked_dates(tasks: &[Task], year_month: YearMonth) -> Vec<String> {
    let mut dates: Vec<NaiveDate> = tasks
        .iter()
        .filter_map(|task| task.date)
        .filter(|date| YearMonth::from_date(*date) == year_month)
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates.into_iter().map(format_date).collect()
}

fn to_task_item(task: Task) -> TaskItem {
    TaskItem {
        id: task.id,
        title: task.title,
        detail: task.detail,
        date: task.date.map(format_date),
        time: task.time.map(|time| time.format("%H:%M:%S").to_string()),
        is_completed: task.is_completed,
        is_bookmarked: task.is_bookmarked,
        task_list_id: task.task_list_id,
        color: task.color,
        attachments: task.attachments,
        recordings: task.recordings,
        reminder: task.reminder,
        revision: task.revision,
        sub_tasks: task.sub_tasks.into_iter().map(to_sub_task_item).collect(),
    }
}

fn to_sub_task_item(sub_task: SubTask) -> SubTaskItem {
    SubTaskItem {
        id: sub_task.id,
        title: sub_task.title,
        is_completed: sub_task.is_completed,
    }
}

fn to_task_list_item(list: TaskList) -> TaskListItem {
    TaskListItem {
        id: list.id,
        name: list.name,
    }
}

fn to_notification_item(notification: TaskNotification) -> NotificationItem {
    NotificationItem {
        notification_id: notification.notification_id.0,
        channel_id: notification.channel_id.to_string(),
        title: notification.title,
        body: notification.body,
        deep_link: notification.deep_link,
    }
}
