//! WATCH subsystem: selector change detection over a container.
//!
//! A [`Watcher`] subscribes to one container and owns the registrations made
//! through [`Watcher::watch`]. On every committed transition it evaluates
//! each registered selector once, compares against the memoized previous
//! value, and notifies the handlers whose derived value moved, in
//! registration order. Runtime failures inside a cycle are contained and
//! surfaced through [`FaultStream`] rather than propagated.

/// Change detection pass over the registry.
pub(crate) mod detector;
/// Notification walk and side effects.
pub(crate) mod dispatcher;
/// Contained-failure observation hook.
pub mod faults;
/// Selector slots and handler lists.
pub(crate) mod registry;
/// Selector identity and evaluation.
pub mod selector;
/// Watcher lifecycle.
pub mod watcher;

pub use faults::{FaultEvent, FaultStream, WatchFault};
pub use selector::{Selector, SelectorId};
pub use watcher::{WatchTarget, Watcher};

use crate::value::{Snapshot, StateValue};

/// Callback invoked when a watched derived value changes.
///
/// Arguments are `(current, previous, new_state, old_state)`; `None` marks
/// the absent value.
pub type ChangeCallback =
    dyn Fn(Option<&StateValue>, Option<&StateValue>, &Snapshot, &Snapshot) + Send + Sync;
