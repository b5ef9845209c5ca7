//! Task reminders: one exact alarm per task and the notification posted
//! when it fires.
//!
//! # Responsibility
//! - Decide whether a task's due instant warrants a pending alarm.
//! - Hand alarms to the host platform through [`AlarmPlatform`].
//! - Turn a fired alarm into a notification and clear the task's flag.
//!
//! # Invariants
//! - At most one pending alarm exists per task (keyed by [`alarm_key`]).
//! - Only strictly-future due instants (second precision) are scheduled.

pub mod receiver;
pub mod scheduler;

pub use receiver::{
    task_deep_link, Importance, NotificationChannel, NotificationSink, ReceiveOutcome,
    ReminderReceiver, TaskNotification, TASK_REMINDER_CHANNEL,
};
pub use scheduler::{
    alarm_key, AlarmKey, AlarmOutcome, AlarmPayload, AlarmPlatform, AlarmRequest, AlarmScheduler,
    CancelReason, InMemoryAlarmPlatform, PendingAlarm,
};
