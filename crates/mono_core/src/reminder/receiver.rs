//! Fired-alarm handling: notification building and flag bookkeeping.

use crate::reminder::scheduler::{alarm_key, AlarmKey, AlarmPayload};
use crate::repo::RepoResult;
use crate::service::task_service::TaskService;
use log::{info, warn};
use std::sync::Arc;

pub const DEEP_LINK_SCHEME: &str = "mono";
const TASK_DETAIL_ROUTE: &str = "task_detail_route";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Default,
    High,
}

/// Notification channel registered once by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub importance: Importance,
}

pub const TASK_REMINDER_CHANNEL: NotificationChannel = NotificationChannel {
    id: "mono_task_reminders",
    name: "Task reminders",
    description: "Alerts when a task is due",
    importance: Importance::High,
};

/// Deep link that routes a tapped notification to the task detail screen.
pub fn task_deep_link(task_id: &str) -> String {
    format!("{DEEP_LINK_SCHEME}://{TASK_DETAIL_ROUTE}/{task_id}")
}

/// Notification ready to be posted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNotification {
    /// Same value as the alarm key so a re-fire replaces the old notification.
    pub notification_id: AlarmKey,
    pub channel_id: &'static str,
    pub title: String,
    pub body: String,
    pub deep_link: String,
    pub importance: Importance,
}

impl TaskNotification {
    pub fn from_payload(payload: &AlarmPayload) -> Self {
        Self {
            notification_id: alarm_key(&payload.task_id),
            channel_id: TASK_REMINDER_CHANNEL.id,
            title: payload.title.clone(),
            body: payload.detail.clone(),
            deep_link: task_deep_link(&payload.task_id),
            importance: TASK_REMINDER_CHANNEL.importance,
        }
    }
}

/// Host notification surface.
pub trait NotificationSink {
    /// Whether the user allows posting notifications.
    fn has_permission(&self) -> bool;
    fn post(&self, notification: &TaskNotification);
}

impl<S: NotificationSink + ?Sized> NotificationSink for Arc<S> {
    fn has_permission(&self) -> bool {
        (**self).has_permission()
    }

    fn post(&self, notification: &TaskNotification) {
        (**self).post(notification);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveOutcome {
    Posted,
    /// Nothing was shown; the task flag was still cleared.
    PermissionDenied,
    /// The task was deleted after its alarm was set; nothing was shown.
    TaskMissing,
}

/// Handles alarms delivered back by the platform.
pub struct ReminderReceiver<S: NotificationSink> {
    sink: S,
    tasks: TaskService,
}

impl<S: NotificationSink> ReminderReceiver<S> {
    pub fn new(sink: S, tasks: TaskService) -> Self {
        Self { sink, tasks }
    }

    /// Posts the reminder (when permitted) and clears the task's
    /// pending-notification flag. Alarms of deleted tasks are dropped.
    pub fn on_alarm(&self, payload: &AlarmPayload) -> RepoResult<ReceiveOutcome> {
        if self.tasks.get(&payload.task_id)?.is_none() {
            warn!(
                "event=reminder_post module=reminder status=skip task_id={} reason=task_missing",
                payload.task_id
            );
            return Ok(ReceiveOutcome::TaskMissing);
        }

        let outcome = if self.sink.has_permission() {
            self.sink.post(&TaskNotification::from_payload(payload));
            ReceiveOutcome::Posted
        } else {
            warn!(
                "event=reminder_post module=reminder status=skip task_id={} reason=permission_denied",
                payload.task_id
            );
            ReceiveOutcome::PermissionDenied
        };

        let cleared = self.tasks.set_reminder(&payload.task_id, false)?;
        info!(
            "event=reminder_fired module=reminder status=ok task_id={} outcome={outcome:?} flag_cleared={cleared}",
            payload.task_id
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::{task_deep_link, TaskNotification, TASK_REMINDER_CHANNEL};
    use crate::reminder::scheduler::{alarm_key, AlarmPayload};

    #[test]
    fn deep_link_targets_task_detail_route() {
        assert_eq!(task_deep_link("abc"), "mono://task_detail_route/abc");
    }

    #[test]
    fn notification_reuses_alarm_key_and_channel() {
        let payload = AlarmPayload {
            task_id: "t-1".to_string(),
            title: "Buy milk".to_string(),
            detail: "2 liters".to_string(),
        };
        let notification = TaskNotification::from_payload(&payload);
        assert_eq!(notification.notification_id, alarm_key("t-1"));
        assert_eq!(notification.channel_id, TASK_REMINDER_CHANNEL.id);
        assert_eq!(notification.body, "2 liters");
        assert_eq!(notification.deep_link, "mono://task_detail_route/t-1");
    }
}
