//! Abstract container contract.
//!
//! A container owns immutable application state and commits transitions on
//! a single logical thread of control. The watcher only needs the three
//! operations below; everything else about the container (actions,
//! reducers, persistence) stays on the container's side of the boundary.

use std::sync::{Arc, Mutex};

use crate::record::ChangeRecord;
use crate::value::Snapshot;

/// A zero-argument callback fired after every committed transition.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// The contract a watched container must implement.
pub trait StateContainer: Send + Sync {
    /// Returns the current immutable snapshot.
    ///
    /// The returned handle must be referentially distinct after any
    /// state-changing transition and referentially stable otherwise.
    fn snapshot(&self) -> Snapshot;

    /// Registers a listener fired after every committed transition.
    ///
    /// The returned [`Subscription`] permanently removes the registration
    /// when cancelled or dropped.
    fn subscribe(&self, listener: Listener) -> Subscription;

    /// Folds a change-record into the container's own transition pipeline.
    ///
    /// Called by the watcher only when the effective dispatch flag is set.
    fn dispatch(&self, record: ChangeRecord);
}

/// Cancellation handle for one container subscription.
///
/// Cancelling is idempotent; dropping the handle also cancels.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Wraps an unsubscribe action.
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Removes the registration; further calls are no-ops.
    pub fn cancel(&self) {
        let action = self.cancel.lock().ok().and_then(|mut slot| slot.take());
        if let Some(action) = action {
            action();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let active = self.cancel.lock().map(|slot| slot.is_some()).unwrap_or(false);
        f.debug_struct("Subscription").field("active", &active).finish()
    }
}
