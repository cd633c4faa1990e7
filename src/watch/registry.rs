//! Selector slots and handler lists.
//!
//! The registry maps each distinct selector (by identity) to its ordered
//! handler list and the shared memoized previous value. Slots keep
//! selector-registration order; handlers keep per-slot registration order.
//! Notification order during a cycle follows exactly these two orders.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::EqualityCheck;
use crate::value::StateValue;
use crate::watch::selector::{Selector, SelectorId};
use crate::watch::faults::WatchFault;
use crate::watch::ChangeCallback;

/// One registration: callback plus resolved metadata and overrides.
///
/// Immutable after creation; the mutable memo lives on the slot, shared by
/// all handlers of one selector.
pub(crate) struct Handler {
    /// Resolved display label: explicit name, else path, else selector repr.
    pub label: String,
    /// Explicit name given at registration.
    pub name: Option<String>,
    /// Originating dotted path, for path registrations.
    pub path: Option<String>,
    /// Diagnostic representation of the selector.
    pub selector_repr: String,
    /// Custom equality predicate, if any.
    pub check_equal: Option<EqualityCheck>,
    /// Per-registration dispatch override.
    pub should_dispatch: Option<bool>,
    /// Per-registration log override.
    pub should_log: Option<bool>,
    /// The registered callback.
    pub callback: Box<ChangeCallback>,
}

/// One selector with its shared memo and ordered handlers.
pub(crate) struct SelectorSlot {
    pub selector: Selector,
    pub previous: Option<StateValue>,
    pub handlers: Vec<Arc<Handler>>,
}

/// Ordered selector registry for one watcher.
pub(crate) struct Registry {
    slots: Vec<SelectorSlot>,
    index: HashMap<SelectorId, usize>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Appends a handler, creating the selector's slot if absent.
    ///
    /// With `initialize` set the baseline previous value is captured
    /// immediately from `current`, so the next transition compares against
    /// a real prior value instead of the absent one. A panicking selector
    /// leaves the baseline absent and yields the fault for reporting.
    pub(crate) fn register(
        &mut self,
        selector: Selector,
        handler: Arc<Handler>,
        initialize: bool,
        current: &StateValue,
    ) -> Option<WatchFault> {
        let idx = match self.index.get(&selector.id()) {
            Some(&idx) => idx,
            None => {
                let idx = self.slots.len();
                self.index.insert(selector.id(), idx);
                self.slots.push(SelectorSlot {
                    selector: selector.clone(),
                    previous: None,
                    handlers: Vec::new(),
                });
                idx
            }
        };

        let mut fault = None;
        if initialize {
            match selector.evaluate_contained(current) {
                Ok(value) => self.slots[idx].previous = value,
                Err(detail) => {
                    self.slots[idx].previous = None;
                    fault = Some(WatchFault::SelectorPanicked {
                        selector: selector.repr().to_string(),
                        detail,
                    });
                }
            }
        }

        self.slots[idx].handlers.push(handler);
        fault
    }

    /// Slots in selector-registration order.
    pub(crate) fn slots_mut(&mut self) -> &mut [SelectorSlot] {
        &mut self.slots
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler(label: &str) -> Arc<Handler> {
        Arc::new(Handler {
            label: label.to_string(),
            name: None,
            path: None,
            selector_repr: label.to_string(),
            check_equal: None,
            should_dispatch: None,
            should_log: None,
            callback: Box::new(|_, _, _, _| {}),
        })
    }

    fn state() -> StateValue {
        StateValue::from(serde_json::json!({"a": {"b": 1}}))
    }

    #[test]
    fn test_same_selector_shares_one_slot() {
        let mut registry = Registry::new();
        let selector = Selector::path("a.b").unwrap();

        assert!(registry
            .register(selector.clone(), noop_handler("h1"), true, &state())
            .is_none());
        assert!(registry
            .register(selector, noop_handler("h2"), true, &state())
            .is_none());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.slots_mut()[0].handlers.len(), 2);
    }

    #[test]
    fn test_registration_captures_baseline() {
        let mut registry = Registry::new();
        let selector = Selector::path("a.b").unwrap();

        registry.register(selector, noop_handler("h"), true, &state());
        assert_eq!(
            registry.slots_mut()[0].previous,
            Some(StateValue::Int(1))
        );
    }

    #[test]
    fn test_lazy_registration_leaves_baseline_absent() {
        let mut registry = Registry::new();
        let selector = Selector::path("a.b").unwrap();

        registry.register(selector, noop_handler("h"), false, &state());
        assert_eq!(registry.slots_mut()[0].previous, None);
    }

    #[test]
    fn test_handler_order_is_registration_order() {
        let mut registry = Registry::new();
        let first = Selector::path("a").unwrap();
        let second = Selector::path("a.b").unwrap();

        registry.register(second.clone(), noop_handler("h2"), true, &state());
        registry.register(first, noop_handler("h1"), true, &state());
        registry.register(second, noop_handler("h3"), true, &state());

        let slots = registry.slots_mut();
        assert_eq!(slots[0].selector.repr(), "a.b");
        assert_eq!(slots[1].selector.repr(), "a");
        let labels: Vec<&str> = slots[0].handlers.iter().map(|h| h.label.as_str()).collect();
        assert_eq!(labels, ["h2", "h3"]);
    }

    #[test]
    fn test_panicking_baseline_is_contained() {
        let mut registry = Registry::new();
        let selector = Selector::from_fn(|_| panic!("baseline boom"));

        let fault = registry.register(selector, noop_handler("h"), true, &state());
        match fault {
            Some(WatchFault::SelectorPanicked { detail, .. }) => {
                assert!(detail.contains("baseline boom"));
            }
            other => panic!("expected selector fault, got {other:?}"),
        }
        assert_eq!(registry.slots_mut()[0].previous, None);
    }
}
