//! Change detection pass.
//!
//! Runs once per container transition, while the watcher holds its registry
//! lock: every selector is evaluated exactly once against the new snapshot,
//! every slot memo is advanced, and the changed `(handler, current,
//! previous)` triples are collected for the dispatcher. No user-supplied
//! callback runs here; only selectors and equality predicates do, both with
//! panic containment so one broken registration cannot abort the cycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::value::StateValue;
use crate::watch::faults::{panic_detail, WatchFault};
use crate::watch::registry::{Handler, Registry};

/// One pending notification for the dispatcher.
pub(crate) struct Notification {
    pub handler: Arc<Handler>,
    pub current: Option<StateValue>,
    pub previous: Option<StateValue>,
}

/// Evaluates all selectors against `new_state` and collects changes.
///
/// Memos advance exactly once per selector, before any handler callback
/// runs (the dispatcher is handed an already-advanced registry). Order is
/// selector-registration order across slots, handler-registration order
/// within one.
pub(crate) fn detect(
    registry: &mut Registry,
    new_state: &StateValue,
) -> (Vec<Notification>, Vec<WatchFault>) {
    let mut notifications = Vec::new();
    let mut faults = Vec::new();

    for slot in registry.slots_mut() {
        let current = match slot.selector.evaluate_contained(new_state) {
            Ok(value) => value,
            Err(detail) => {
                faults.push(WatchFault::SelectorPanicked {
                    selector: slot.selector.repr().to_string(),
                    detail,
                });
                None
            }
        };

        let previous = std::mem::replace(&mut slot.previous, current.clone());

        for handler in &slot.handlers {
            let changed = match &handler.check_equal {
                None => current != previous,
                Some(check) => {
                    let result = catch_unwind(AssertUnwindSafe(|| {
                        check(current.as_ref(), previous.as_ref())
                    }));
                    match result {
                        Ok(equal) => !equal,
                        Err(payload) => {
                            faults.push(WatchFault::EqualityPanicked {
                                label: handler.label.clone(),
                                detail: panic_detail(payload.as_ref()),
                            });
                            // Fail open: a broken comparator stays visible.
                            true
                        }
                    }
                }
            };

            if changed {
                notifications.push(Notification {
                    handler: Arc::clone(handler),
                    current: current.clone(),
                    previous: previous.clone(),
                });
            }
        }
    }

    (notifications, faults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::selector::Selector;

    fn handler(label: &str, check_equal: Option<crate::config::EqualityCheck>) -> Arc<Handler> {
        Arc::new(Handler {
            label: label.to_string(),
            name: None,
            path: None,
            selector_repr: label.to_string(),
            check_equal,
            should_dispatch: None,
            should_log: None,
            callback: Box::new(|_, _, _, _| {}),
        })
    }

    fn state(n: i64) -> StateValue {
        StateValue::from(serde_json::json!({ "n": n }))
    }

    #[test]
    fn test_detects_changed_value() {
        let mut registry = Registry::new();
        registry.register(
            Selector::path("n").unwrap(),
            handler("n", None),
            true,
            &state(1),
        );

        let (notifications, faults) = detect(&mut registry, &state(2));
        assert!(faults.is_empty());
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].previous, Some(StateValue::Int(1)));
        assert_eq!(notifications[0].current, Some(StateValue::Int(2)));
    }

    #[test]
    fn test_unchanged_value_is_silent() {
        let mut registry = Registry::new();
        registry.register(
            Selector::path("n").unwrap(),
            handler("n", None),
            true,
            &state(1),
        );

        let (notifications, _) = detect(&mut registry, &state(1));
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_memo_advances_once_for_shared_selector() {
        let mut registry = Registry::new();
        let selector = Selector::path("n").unwrap();
        registry.register(selector.clone(), handler("h1", None), true, &state(1));
        registry.register(selector, handler("h2", None), true, &state(1));

        let (notifications, _) = detect(&mut registry, &state(2));
        // Both handlers see the identical before/after pair.
        assert_eq!(notifications.len(), 2);
        for n in &notifications {
            assert_eq!(n.previous, Some(StateValue::Int(1)));
            assert_eq!(n.current, Some(StateValue::Int(2)));
        }

        // A second identical transition is silent: the memo moved once.
        let (notifications, _) = detect(&mut registry, &state(2));
        assert!(notifications.is_empty());
    }

    #[test]
    fn test_panicking_selector_is_isolated() {
        let mut registry = Registry::new();
        registry.register(
            Selector::from_fn(|_| panic!("broken selector")),
            handler("broken", None),
            false,
            &state(1),
        );
        registry.register(
            Selector::path("n").unwrap(),
            handler("n", None),
            true,
            &state(1),
        );

        let (notifications, faults) = detect(&mut registry, &state(2));
        // The healthy selector still fires.
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].handler.label, "n");
        assert!(matches!(
            faults.as_slice(),
            [WatchFault::SelectorPanicked { .. }]
        ));
    }

    #[test]
    fn test_custom_equality_suppresses_notification() {
        let mut registry = Registry::new();
        // Only the "id" field participates in equality.
        let by_id: crate::config::EqualityCheck = Arc::new(|a, b| {
            a.and_then(|v| v.get("id")) == b.and_then(|v| v.get("id"))
        });
        registry.register(
            Selector::path("user").unwrap(),
            handler("user", Some(by_id)),
            true,
            &StateValue::from(serde_json::json!({"user": {"id": 1, "age": 30}})),
        );

        let (notifications, _) = detect(
            &mut registry,
            &StateValue::from(serde_json::json!({"user": {"id": 1, "age": 31}})),
        );
        assert!(notifications.is_empty());

        let (notifications, _) = detect(
            &mut registry,
            &StateValue::from(serde_json::json!({"user": {"id": 2, "age": 31}})),
        );
        assert_eq!(notifications.len(), 1);
    }

    #[test]
    fn test_panicking_equality_fails_open() {
        let mut registry = Registry::new();
        let broken: crate::config::EqualityCheck = Arc::new(|_, _| panic!("bad comparator"));
        registry.register(
            Selector::path("n").unwrap(),
            handler("n", Some(broken)),
            true,
            &state(1),
        );

        let (notifications, faults) = detect(&mut registry, &state(1));
        assert_eq!(notifications.len(), 1);
        assert!(matches!(
            faults.as_slice(),
            [WatchFault::EqualityPanicked { .. }]
        ));
    }
}
