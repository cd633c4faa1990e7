//! Notification walk.
//!
//! Walks the changed triples collected by the detector, in order. Per
//! triple: build the change-record, mirror it into the container when the
//! effective dispatch flag asks for it, log it when the effective log flag
//! asks for it, then invoke the callback. Flag precedence is handler over
//! watcher (the watcher level already folded the globals in).
//!
//! Container dispatch is synchronous and happens inside the current cycle.
//! When the container commits a transition for the record, detection
//! re-enters depth-first: the nested cycle runs to completion, then the
//! walk resumes with this cycle's remaining triples. Callbacks get the same
//! treatment. Each callback is panic-isolated; a failure is reported as a
//! fault and the walk continues.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::ResolvedFlags;
use crate::record::ChangeRecord;
use crate::store::StateContainer;
use crate::value::Snapshot;
use crate::watch::detector::Notification;
use crate::watch::faults::{panic_detail, FaultHub, WatchFault};

pub(crate) fn deliver(
    store: &Arc<dyn StateContainer>,
    flags: ResolvedFlags,
    faults: &FaultHub,
    batch: Vec<Notification>,
    new_state: &Snapshot,
    old_state: &Snapshot,
) {
    for notification in batch {
        let handler = &notification.handler;
        let record = ChangeRecord::value_changed(
            handler.label.clone(),
            handler.path.clone(),
            handler.selector_repr.clone(),
            notification.previous.clone(),
            notification.current.clone(),
        );

        if handler.should_dispatch.unwrap_or(flags.should_dispatch) {
            // May synchronously re-enter the detection cycle.
            store.dispatch(record.clone());
        }

        if handler.should_log.unwrap_or(flags.should_log) {
            tracing::info!(
                target: "vigil::watch",
                label = %handler.label,
                selector = %handler.selector_repr,
                previous = ?notification.previous,
                current = ?notification.current,
                "value changed"
            );
        }

        let invoke = || {
            (handler.callback)(
                notification.current.as_ref(),
                notification.previous.as_ref(),
                new_state,
                old_state,
            );
        };
        if let Err(payload) = catch_unwind(AssertUnwindSafe(invoke)) {
            faults.report(WatchFault::CallbackPanicked {
                label: handler.label.clone(),
                detail: panic_detail(payload.as_ref()),
            });
        }
    }
}
