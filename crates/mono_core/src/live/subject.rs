//! Replaying multicast subject with explicit subscription handles.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

/// One registered observer plus the last version it has seen.
///
/// Delivery to a single observer is serialized and never goes backwards, so
/// a replay racing with a fresh publish cannot overwrite the newer value.
struct ObserverSlot<T> {
    callback: Callback<T>,
    delivered: Mutex<u64>,
}

impl<T> ObserverSlot<T> {
    fn deliver(&self, version: u64, value: &T) {
        let mut delivered = self
            .delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if version <= *delivered {
            return;
        }
        *delivered = version;
        (self.callback)(value);
    }
}

struct SubjectState<T> {
    latest: Option<(u64, T)>,
    version: u64,
    next_observer_id: u64,
    observers: BTreeMap<u64, Arc<ObserverSlot<T>>>,
    /// Set while there are no observers.
    idle_since: Option<Instant>,
}

/// Holds the latest value and pushes every new value to all observers.
///
/// Observers must not publish into the subject they are observing.
pub struct Subject<T> {
    state: Arc<Mutex<SubjectState<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Creates an empty subject with no observers.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SubjectState {
                latest: None,
                version: 0,
                next_observer_id: 0,
                observers: BTreeMap::new(),
                idle_since: Some(Instant::now()),
            })),
        }
    }

    /// Creates a subject that replays `value` to its first observers.
    pub fn with_value(value: T) -> Self {
        let subject = Self::new();
        subject.publish(value);
        subject
    }

    /// Stores `value` as latest and pushes it to every current observer.
    pub fn publish(&self, value: T) {
        let version = self.reserve_version();
        self.publish_at(version, value);
    }

    /// Claims the next publication slot.
    ///
    /// Callers that compute a value under an external lock reserve its
    /// version there and publish later with [`Self::publish_at`].
    pub fn reserve_version(&self) -> u64 {
        let mut state = lock(&self.state);
        state.version += 1;
        state.version
    }

    /// Publishes `value` under a previously reserved `version`. A value
    /// older than the current latest is dropped.
    pub fn publish_at(&self, version: u64, value: T) {
        let observers = {
            let mut state = lock(&self.state);
            if matches!(&state.latest, Some((latest, _)) if *latest >= version) {
                return;
            }
            state.latest = Some((version, value.clone()));
            state.observers.values().cloned().collect::<Vec<_>>()
        };
        for observer in observers {
            observer.deliver(version, &value);
        }
    }

    /// Registers `callback`, replaying the latest value first when present.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let slot = Arc::new(ObserverSlot {
            callback: Box::new(callback),
            delivered: Mutex::new(0),
        });
        let (observer_id, replay) = {
            let mut state = lock(&self.state);
            let observer_id = state.next_observer_id;
            state.next_observer_id += 1;
            state.observers.insert(observer_id, Arc::clone(&slot));
            state.idle_since = None;
            (observer_id, state.latest.clone())
        };
        if let Some((version, value)) = replay {
            slot.deliver(version, &value);
        }

        let weak: Weak<Mutex<SubjectState<T>>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                let mut state = lock(&state);
                state.observers.remove(&observer_id);
                if state.observers.is_empty() {
                    state.idle_since = Some(Instant::now());
                }
            }
        })
    }

    pub fn latest(&self) -> Option<T> {
        lock(&self.state)
            .latest
            .as_ref()
            .map(|(_, value)| value.clone())
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).observers.len()
    }

    /// Instant the subject last became observer-free, `None` while observed.
    pub fn idle_since(&self) -> Option<Instant> {
        lock(&self.state).idle_since
    }

    /// Read-only handle for consumers.
    pub fn observable(&self) -> Observable<T> {
        Observable {
            subject: self.clone(),
        }
    }
}

/// Read-only side of a [`Subject`].
pub struct Observable<T> {
    subject: Subject<T>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            subject: self.subject.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subject.subscribe(callback)
    }

    pub fn latest(&self) -> Option<T> {
        self.subject.latest()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subject.subscriber_count()
    }

    /// Whether both handles share one upstream subject.
    pub fn shares_upstream_with(&self, other: &Observable<T>) -> bool {
        Arc::ptr_eq(&self.subject.state, &other.subject.state)
    }
}

/// Handle that keeps one observer registered.
///
/// Dropping the handle cancels it.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.run_cancel();
    }

    fn run_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::Subject;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(&i32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &i32| sink.lock().unwrap().push(*value))
    }

    #[test]
    fn late_subscriber_receives_latest_value_only() {
        let subject = Subject::with_value(1);
        subject.publish(2);

        let (seen, callback) = recorder();
        let _subscription = subject.subscribe(callback);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn out_of_order_publication_is_dropped() {
        let subject = Subject::new();
        let (seen, callback) = recorder();
        let _subscription = subject.subscribe(callback);

        let older = subject.reserve_version();
        let newer = subject.reserve_version();
        subject.publish_at(newer, 2);
        subject.publish_at(older, 1);

        assert_eq!(*seen.lock().unwrap(), vec![2]);
        assert_eq!(subject.latest(), Some(2));
    }

    #[test]
    fn every_subscriber_receives_every_publish() {
        let subject = Subject::new();
        let (first, first_cb) = recorder();
        let (second, second_cb) = recorder();
        let _a = subject.subscribe(first_cb);
        let _b = subject.subscribe(second_cb);

        subject.publish(10);
        subject.publish(11);

        assert_eq!(*first.lock().unwrap(), vec![10, 11]);
        assert_eq!(*second.lock().unwrap(), vec![10, 11]);
    }

    #[test]
    fn cancelled_subscription_stops_delivery_and_marks_idle() {
        let subject = Subject::new();
        let (seen, callback) = recorder();
        let subscription = subject.subscribe(callback);
        assert!(subject.idle_since().is_none());

        subject.publish(1);
        subscription.cancel();
        subject.publish(2);

        assert_eq!(*seen.lock().unwrap(), vec![1]);
        assert_eq!(subject.subscriber_count(), 0);
        assert!(subject.idle_since().is_some());
    }

    #[test]
    fn dropping_subscription_cancels_it() {
        let subject = Subject::with_value(0);
        {
            let _subscription = subject.subscribe(|_| {});
            assert_eq!(subject.subscriber_count(), 1);
        }
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn observable_handles_share_upstream() {
        let subject = Subject::with_value("x".to_string());
        let first = subject.observable();
        let second = subject.observable();
        assert!(first.shares_upstream_with(&second));
        assert!(!first.shares_upstream_with(&Subject::with_value("x".to_string()).observable()));
    }
}
