//! Contained-failure observation.
//!
//! Selector evaluation and handler callbacks are isolated during a
//! notification cycle: a panic in one must not abort detection or stop the
//! remaining handlers. Containment trades a propagating error for silent
//! data loss, so every contained failure is logged at warn level and
//! offered to [`FaultStream`] subscribers. Delivery never blocks the
//! notification cycle: a slow subscriber loses events and the watcher
//! counts the drops.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A failure contained during a notification cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchFault {
    /// A selector panicked during evaluation; its value was treated as
    /// absent for this transition.
    #[error("selector {selector} panicked during evaluation: {detail}")]
    SelectorPanicked {
        /// Diagnostic representation of the selector.
        selector: String,
        /// Panic message.
        detail: String,
    },

    /// A custom equality predicate panicked; the value was treated as
    /// changed so the handler still fired.
    #[error("equality check for {label} panicked: {detail}")]
    EqualityPanicked {
        /// Handler label.
        label: String,
        /// Panic message.
        detail: String,
    },

    /// A handler callback panicked; later handlers in the cycle still ran.
    #[error("callback for {label} panicked: {detail}")]
    CallbackPanicked {
        /// Handler label.
        label: String,
        /// Panic message.
        detail: String,
    },
}

/// A contained failure with identity and timing envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultEvent {
    /// Unique id of this event.
    pub event_id: Uuid,
    /// When the fault was contained.
    pub timestamp: DateTime<Utc>,
    /// The fault itself.
    pub fault: WatchFault,
}

impl FaultEvent {
    fn new(fault: WatchFault) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            fault,
        }
    }
}

/// A subscription stream for contained faults.
///
/// Obtained from [`crate::Watcher::faults`]. Events arrive in containment
/// order; the buffer is bounded, and events that do not fit are dropped and
/// counted on the watcher side.
#[derive(Debug)]
pub struct FaultStream {
    rx: Receiver<FaultEvent>,
}

impl FaultStream {
    /// Receives the next fault without blocking.
    ///
    /// `None` when no fault is buffered or the watcher is gone.
    #[must_use]
    pub fn try_recv(&self) -> Option<FaultEvent> {
        self.rx.try_recv().ok()
    }

    /// Receives the next fault, waiting up to `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FaultEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Drains all currently buffered faults.
    #[must_use]
    pub fn drain(&self) -> Vec<FaultEvent> {
        self.rx.try_iter().collect()
    }
}

/// Fan-out point for fault events inside one watcher.
pub(crate) struct FaultHub {
    subscribers: Mutex<Vec<Sender<FaultEvent>>>,
    dropped: AtomicU64,
}

impl FaultHub {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn subscribe(&self, capacity: usize) -> FaultStream {
        let (tx, rx) = bounded(capacity.max(1));
        lock(&self.subscribers).push(tx);
        FaultStream { rx }
    }

    /// Reports a contained fault: logs it, then offers it to every stream.
    pub(crate) fn report(&self, fault: WatchFault) {
        tracing::warn!(target: "vigil::watch", %fault, "contained watch fault");

        let event = FaultEvent::new(fault);
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            // Stream handle dropped; forget the sender.
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Renders a panic payload for diagnostics.
pub(crate) fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
