//! Alarm scheduling decisions and the platform seam.

use crate::model::task::Task;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Platform alarm identifier derived from a task id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmKey(pub i32);

impl Display for AlarmKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic key for `task_id`: 31-polynomial hash over UTF-16 units
/// with wrapping arithmetic.
pub fn alarm_key(task_id: &str) -> AlarmKey {
    let hash = task_id
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
    AlarmKey(hash)
}

/// Data delivered back when an alarm fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmPayload {
    pub task_id: String,
    pub title: String,
    pub detail: String,
}

/// Input of [`AlarmScheduler::set_or_cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub task_id: String,
    pub title: String,
    pub detail: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub enabled: bool,
}

impl AlarmRequest {
    /// Enabled while the task wants a reminder and is still open.
    pub fn for_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            detail: task.detail.clone(),
            date: task.date,
            time: task.time,
            enabled: task.reminder && !task.is_completed,
        }
    }
}

/// Why no alarm is pending after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Disabled,
    MissingSchedule,
    NotInFuture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmOutcome {
    Scheduled { key: AlarmKey, at: NaiveDateTime },
    Cancelled { key: AlarmKey, reason: CancelReason },
}

/// Host alarm service.
pub trait AlarmPlatform {
    /// Schedules (or replaces) the exact one-shot alarm for `key`.
    fn schedule_exact(&self, key: AlarmKey, at: NaiveDateTime, payload: AlarmPayload);
    /// Cancels the alarm for `key`; no-op when none is pending.
    fn cancel(&self, key: AlarmKey);
}

impl<P: AlarmPlatform + ?Sized> AlarmPlatform for Arc<P> {
    fn schedule_exact(&self, key: AlarmKey, at: NaiveDateTime, payload: AlarmPayload) {
        (**self).schedule_exact(key, at, payload);
    }

    fn cancel(&self, key: AlarmKey) {
        (**self).cancel(key);
    }
}

/// Keeps at most one alarm per task on the platform.
pub struct AlarmScheduler<P: AlarmPlatform> {
    platform: P,
}

impl<P: AlarmPlatform> AlarmScheduler<P> {
    pub fn new(platform: P) -> Self {
        Self { platform }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Schedules the alarm when enabled and strictly in the future relative
    /// to `now`; otherwise cancels any pending alarm for the task.
    pub fn set_or_cancel(&self, request: &AlarmRequest, now: NaiveDateTime) -> AlarmOutcome {
        let key = alarm_key(&request.task_id);
        let decision = if !request.enabled {
            Err(CancelReason::Disabled)
        } else {
            match (request.date, request.time) {
                (Some(date), Some(time)) => {
                    let at = truncate_to_second(date.and_time(time));
                    if at > truncate_to_second(now) {
                        Ok(at)
                    } else {
                        Err(CancelReason::NotInFuture)
                    }
                }
                _ => Err(CancelReason::MissingSchedule),
            }
        };

        match decision {
            Ok(at) => {
                self.platform.schedule_exact(
                    key,
                    at,
                    AlarmPayload {
                        task_id: request.task_id.clone(),
                        title: request.title.clone(),
                        detail: request.detail.clone(),
                    },
                );
                info!(
                    "event=alarm_schedule module=reminder status=ok task_id={} key={key}",
                    request.task_id
                );
                AlarmOutcome::Scheduled { key, at }
            }
            Err(reason) => {
                self.platform.cancel(key);
                debug!(
                    "event=alarm_cancel module=reminder status=skip task_id={} key={key} reason={reason:?}",
                    request.task_id
                );
                AlarmOutcome::Cancelled { key, reason }
            }
        }
    }

    /// [`Self::set_or_cancel`] against the device's local clock.
    pub fn set_or_cancel_now(&self, request: &AlarmRequest) -> AlarmOutcome {
        self.set_or_cancel(request, Local::now().naive_local())
    }

    /// Brings the platform in line with the current state of `task`.
    pub fn sync_task(&self, task: &Task, now: NaiveDateTime) -> AlarmOutcome {
        self.set_or_cancel(&AlarmRequest::for_task(task), now)
    }

    /// Cancels the alarm of a task that no longer exists.
    pub fn cancel_task(&self, task_id: &str) {
        self.platform.cancel(alarm_key(task_id));
    }
}

fn truncate_to_second(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

/// Pending alarm held by [`InMemoryAlarmPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlarm {
    pub at: NaiveDateTime,
    pub payload: AlarmPayload,
}

/// Process-local alarm table for hosts without a platform alarm service.
///
/// Alarms fire only when the host polls [`Self::take_due`].
#[derive(Debug, Default)]
pub struct InMemoryAlarmPlatform {
    alarms: Mutex<BTreeMap<AlarmKey, PendingAlarm>>,
}

impl InMemoryAlarmPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self, key: AlarmKey) -> Option<PendingAlarm> {
        self.lock_alarms().get(&key).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.lock_alarms().len()
    }

    /// Removes and returns every alarm due at or before `now`, earliest first.
    pub fn take_due(&self, now: NaiveDateTime) -> Vec<AlarmPayload> {
        let mut alarms = self.lock_alarms();
        let mut due: Vec<(AlarmKey, PendingAlarm)> = alarms
            .iter()
            .filter(|(_, alarm)| alarm.at <= now)
            .map(|(key, alarm)| (*key, alarm.clone()))
            .collect();
        due.sort_by(|left, right| left.1.at.cmp(&right.1.at).then(left.0.cmp(&right.0)));
        for (key, _) in &due {
            alarms.remove(key);
        }
        due.into_iter().map(|(_, alarm)| alarm.payload).collect()
    }

    fn lock_alarms(&self) -> MutexGuard<'_, BTreeMap<AlarmKey, PendingAlarm>> {
        self.alarms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AlarmPlatform for InMemoryAlarmPlatform {
    fn schedule_exact(&self, key: AlarmKey, at: NaiveDateTime, payload: AlarmPayload) {
        self.lock_alarms().insert(key, PendingAlarm { at, payload });
    }

    fn cancel(&self, key: AlarmKey) {
        self.lock_alarms().remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::{alarm_key, AlarmKey};

    #[test]
    fn alarm_key_is_deterministic_and_matches_polynomial_hash() {
        assert_eq!(alarm_key(""), AlarmKey(0));
        assert_eq!(alarm_key("a"), AlarmKey(97));
        assert_eq!(alarm_key("ab"), AlarmKey(97 * 31 + 98));
        assert_eq!(alarm_key("task-1"), alarm_key("task-1"));
        assert_ne!(alarm_key("task-1"), alarm_key("task-2"));
    }

    #[test]
    fn alarm_key_wraps_instead_of_overflowing() {
        let long_id = "f".repeat(64);
        let _ = alarm_key(&long_id);
    }
}
