//! A hot, multicast subject that holds its latest value.
//!
//! New observers are immediately handed the current value and then every
//! later change. Notifications are queued in commit order and delivered by a
//! single caller at a time, outside the internal lock: an observer may read
//! the subject or push a new value from inside a callback, and every observer
//! still sees values in the order they were committed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::AuthKitError;

type NextFn<V> = Box<dyn Fn(&V) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&AuthKitError) + Send + Sync>;
type CompleteFn = Box<dyn Fn() + Send + Sync>;

/// Callbacks registered through `Subject::subscribe`.
pub struct Observer<V> {
    on_next: NextFn<V>,
    on_error: Option<ErrorFn>,
    on_complete: Option<CompleteFn>,
}

impl<V> Observer<V> {
    pub fn new(on_next: impl Fn(&V) + Send + Sync + 'static) -> Self {
        Observer {
            on_next: Box::new(on_next),
            on_error: None,
            on_complete: None,
        }
    }

    pub fn on_error(mut self, on_error: impl Fn(&AuthKitError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn on_complete(mut self, on_complete: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }
}

type Observers<V> = Vec<Arc<Observer<V>>>;

/// A queued delivery. The recipients are fixed when it is queued.
enum Notification<V> {
    Next(V, Observers<V>),
    Error(AuthKitError, Observers<V>),
    Complete(Observers<V>),
}

impl<V> Notification<V> {
    fn deliver(self) {
        match self {
            Notification::Next(value, observers) => {
                for observer in observers {
                    (observer.on_next)(&value);
                }
            }
            Notification::Error(error, observers) => {
                for observer in observers {
                    if let Some(on_error) = &observer.on_error {
                        on_error(&error);
                    }
                }
            }
            Notification::Complete(observers) => {
                for observer in observers {
                    if let Some(on_complete) = &observer.on_complete {
                        on_complete();
                    }
                }
            }
        }
    }
}

struct Inner<V> {
    current: V,
    observers: Vec<(u64, Arc<Observer<V>>)>,
    next_id: u64,
    completed: bool,
    queue: VecDeque<Notification<V>>,
    delivering: bool,
}

impl<V> Inner<V> {
    fn recipients(&self) -> Observers<V> {
        self.observers.iter().map(|(_, o)| o.clone()).collect()
    }

    /// Queues `notification`. Returns true when the caller must drain the
    /// queue because nobody else is delivering.
    fn enqueue(&mut self, notification: Notification<V>) -> bool {
        self.queue.push_back(notification);
        if self.delivering {
            false
        } else {
            self.delivering = true;
            true
        }
    }
}

/// Releases the delivery claim if an observer panics mid-drain.
struct DeliveryGuard<'a, V> {
    inner: &'a Mutex<Inner<V>>,
}

impl<V> Drop for DeliveryGuard<'_, V> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delivering = false;
        }
    }
}

/// Holds one value and broadcasts every change of it.
pub struct Subject<V> {
    inner: Arc<Mutex<Inner<V>>>,
}

impl<V> Subject<V>
where
    V: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: V) -> Self {
        Subject {
            inner: Arc::new(Mutex::new(Inner {
                current: initial,
                observers: Vec::new(),
                next_id: 0,
                completed: false,
                queue: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers queued notifications until the queue is empty. Only called by
    /// the holder of the delivery claim.
    fn drain(&self) {
        let _guard = DeliveryGuard { inner: &self.inner };
        loop {
            let notification = {
                let mut inner = self.lock();
                match inner.queue.pop_front() {
                    Some(notification) => notification,
                    None => {
                        inner.delivering = false;
                        return;
                    }
                }
            };
            notification.deliver();
        }
    }

    /// A copy of the current value.
    pub fn value(&self) -> V {
        self.lock().current.clone()
    }

    /// Registers an observer and replays the current value to it. The replay
    /// is delivered synchronously unless another delivery is in progress, in
    /// which case it is queued behind it.
    /// On a completed subject the observer gets the final value and `on_complete`.
    pub fn subscribe(&self, observer: Observer<V>) -> Subscription {
        let observer = Arc::new(observer);
        let (subscription, drain) = {
            let mut inner = self.lock();
            let replay = Notification::Next(inner.current.clone(), vec![observer.clone()]);
            if inner.completed {
                let drain = inner.enqueue(replay);
                inner.enqueue(Notification::Complete(vec![observer]));
                (Subscription::closed(), drain)
            } else {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.observers.push((id, observer));

                let weak = Arc::downgrade(&self.inner);
                let detach = move || {
                    if let Some(inner) = weak.upgrade() {
                        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
                        inner.observers.retain(|(observer_id, _)| *observer_id != id);
                    }
                };
                (Subscription::new(detach), inner.enqueue(replay))
            }
        };

        if drain {
            self.drain();
        }
        subscription
    }

    /// Computes the next value from the current one and publishes it if it
    /// differs. Returns the published value, or `None` when nothing changed
    /// or the subject is completed.
    ///
    /// `reducer` runs under the lock and must not touch the subject.
    pub fn next_with(&self, reducer: impl FnOnce(&V) -> V) -> Option<V> {
        self.next_with_commit(reducer, |_| {})
    }

    /// Like `next_with`, but runs `commit` with the new value under the same
    /// lock, right before it is installed. Concurrent publishers therefore
    /// commit in exactly the order their values become current.
    ///
    /// `commit` must not touch the subject.
    pub fn next_with_commit(
        &self,
        reducer: impl FnOnce(&V) -> V,
        commit: impl FnOnce(&V),
    ) -> Option<V> {
        let (value, drain) = {
            let mut inner = self.lock();
            if inner.completed {
                return None;
            }
            let next = reducer(&inner.current);
            if next == inner.current {
                return None;
            }
            commit(&next);
            inner.current = next.clone();
            let recipients = inner.recipients();
            let drain = inner.enqueue(Notification::Next(next.clone(), recipients));
            (next, drain)
        };

        if drain {
            self.drain();
        }
        Some(value)
    }

    /// Publishes `value` unless it equals the current one.
    pub fn next(&self, value: V) -> bool {
        self.next_with(move |_| value).is_some()
    }

    /// Delivers `error` to every observer that registered an error callback.
    /// The subject stays open.
    pub fn error(&self, error: &AuthKitError) {
        let drain = {
            let mut inner = self.lock();
            let recipients = inner.recipients();
            inner.enqueue(Notification::Error(error.clone(), recipients))
        };
        if drain {
            self.drain();
        }
    }

    /// Ends the stream: observers get `on_complete` and are dropped, later
    /// values are ignored. Completing twice is a no-op.
    pub fn complete(&self) {
        let drain = {
            let mut inner = self.lock();
            if inner.completed {
                return;
            }
            inner.completed = true;
            let recipients = std::mem::take(&mut inner.observers)
                .into_iter()
                .map(|(_, observer)| observer)
                .collect();
            inner.enqueue(Notification::Complete(recipients))
        };
        if drain {
            self.drain();
        }
    }

    pub fn is_completed(&self) -> bool {
        self.lock().completed
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the observer attached;
/// call `unsubscribe` to detach.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Subscription {
            detach: Some(Box::new(detach)),
        }
    }

    /// A subscription that is already detached.
    pub fn closed() -> Self {
        Subscription { detach: None }
    }

    pub fn is_closed(&self) -> bool {
        self.detach.is_none()
    }

    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
