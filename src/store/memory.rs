//! In-memory reference container.
//!
//! `MemoryStore` is a thread-safe [`StateContainer`] for embedded usage,
//! tests, and documentation examples. Transitions replace the whole state
//! tree; listeners are notified synchronously on the committing thread, so
//! the store exercises the same re-entrancy surface a production container
//! would.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::record::ChangeRecord;
use crate::store::traits::{Listener, StateContainer, Subscription};
use crate::value::{Snapshot, StateValue};

// The guarded data stays consistent even if a holder panicked; recover it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A minimal immutable-state container.
///
/// # Examples
///
/// ```
/// use vigil::{MemoryStore, StateContainer, StateValue};
///
/// let store = MemoryStore::new(StateValue::from(serde_json::json!({"n": 1})));
/// store.commit(StateValue::from(serde_json::json!({"n": 2})));
/// assert_eq!(store.snapshot().get("n"), Some(&StateValue::Int(2)));
/// ```
pub struct MemoryStore {
    state: Mutex<Snapshot>,
    listeners: Arc<Mutex<Vec<(u64, Listener)>>>,
    next_listener_id: AtomicU64,
    records: Mutex<Vec<ChangeRecord>>,
}

impl MemoryStore {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(initial: StateValue) -> Self {
        Self {
            state: Mutex::new(Arc::new(initial)),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Commits a transition to `next`, then notifies listeners.
    ///
    /// The state lock is released before any listener runs, so listeners
    /// may re-enter the store (read, commit, dispatch).
    pub fn commit(&self, next: StateValue) {
        *lock(&self.state) = Arc::new(next);
        self.notify();
    }

    /// Derives the next state from the current one, then commits it.
    pub fn update(&self, f: impl FnOnce(&StateValue) -> StateValue) {
        let current = self.snapshot();
        self.commit(f(&current));
    }

    /// The change-records received through [`StateContainer::dispatch`].
    #[must_use]
    pub fn dispatched(&self) -> Vec<ChangeRecord> {
        lock(&self.records).clone()
    }

    fn notify(&self) {
        // Clone the list out of the lock: a listener may subscribe,
        // unsubscribe, or commit while we walk it.
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl StateContainer for MemoryStore {
    fn snapshot(&self) -> Snapshot {
        Arc::clone(&lock(&self.state))
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners).push((id, listener));

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            lock(&listeners).retain(|(lid, _)| *lid != id);
        })
    }

    fn dispatch(&self, record: ChangeRecord) {
        lock(&self.records).push(record);
        // A dispatched record is a committed, state-preserving transition:
        // listeners fire, the snapshot stays referentially stable.
        self.notify();
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("listeners", &lock(&self.listeners).len())
            .field("dispatched_records", &lock(&self.records).len())
            .finish()
    }
}
