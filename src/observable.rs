//! Observable text cell bound by the UI.

use std::fmt;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
};

use tokio::sync::watch;

/// Handle returned by [`ObservableText::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeSubscription(u64);

/// Change callback; receives the new value.
type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A mutable text cell with change subscribers.
///
/// Cells are created once per `(locale, key)` and mutated in place, so a UI
/// binding taken before a translation arrives stays valid afterwards. Only the
/// engine writes; UI code reads, subscribes, or watches.
pub struct ObservableText {
    /// Current value, also the source for async watchers.
    value: watch::Sender<String>,
    /// Synchronous change callbacks.
    subscribers: Mutex<Vec<(ChangeSubscription, ChangeCallback)>>,
    /// Next subscription id.
    next_id: AtomicU64,
}

impl ObservableText {
    pub(crate) fn new(initial: impl Into<String>) -> Self {
        let (value, _) = watch::channel(initial.into());
        Self { value, subscribers: Mutex::new(Vec::new()), next_id: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn value(&self) -> String {
        self.value.borrow().clone()
    }

    /// Replaces the value and notifies subscribers if it changed.
    ///
    /// Callbacks run on the caller's thread over a snapshot of the subscriber
    /// list, so they may subscribe or unsubscribe without deadlocking.
    pub(crate) fn set(&self, text: &str) {
        let changed = self.value.send_if_modified(|current| {
            if current == text {
                false
            } else {
                text.clone_into(current);
                true
            }
        });
        if !changed {
            return;
        }

        let snapshot: Vec<ChangeCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(text);
        }
    }

    /// Registers a callback invoked with every new value.
    pub fn on_change<F>(&self, callback: F) -> ChangeSubscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let id = ChangeSubscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns `false` if it was not registered.
    pub fn remove_on_change(&self, subscription: ChangeSubscription) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != subscription);
        subscribers.len() != before
    }

    /// Async view of the cell for UIs driven by an event loop.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<String> {
        self.value.subscribe()
    }
}

impl fmt::Debug for ObservableText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.lock().map_or(0, |s| s.len());
        f.debug_struct("ObservableText")
            .field("value", &*self.value.borrow())
            .field("subscribers", &subscribers)
            .finish_non_exhaustive()
    }
}
