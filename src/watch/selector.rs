//! Selector identity and evaluation.
//!
//! A [`Selector`] is a pure function from a state tree to a derived value,
//! wrapped with a stable identity so registrations can share one memoized
//! previous-value slot. Identity is reference identity of the constructed
//! selector, carried by a process-wide monotonically increasing id: two
//! clones of one `Selector` are the same selector, two `from_fn` calls with
//! the same closure body are not.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ValidationError;
use crate::path::PathAccessor;
use crate::value::StateValue;
use crate::watch::faults::panic_detail;

static NEXT_SELECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of one constructed selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectorId(u64);

impl std::fmt::Display for SelectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "selector#{}", self.0)
    }
}

type SelectorFn = dyn Fn(&StateValue) -> Option<StateValue> + Send + Sync;

struct SelectorInner {
    id: SelectorId,
    repr: String,
    label: Option<String>,
    path: Option<String>,
    eval: Box<SelectorFn>,
}

/// A pure derived-value function with stable identity.
///
/// Cloning is cheap and preserves identity. Selectors return
/// `Option<StateValue>`; `None` is the absent value (a missing path, or a
/// derivation that has nothing to report).
#[derive(Clone)]
pub struct Selector {
    inner: Arc<SelectorInner>,
}

impl Selector {
    fn build(
        repr: String,
        label: Option<String>,
        path: Option<String>,
        eval: Box<SelectorFn>,
    ) -> Self {
        Self {
            inner: Arc::new(SelectorInner {
                id: SelectorId(NEXT_SELECTOR_ID.fetch_add(1, Ordering::Relaxed)),
                repr,
                label,
                path,
                eval,
            }),
        }
    }

    /// Wraps an anonymous selector function.
    ///
    /// The diagnostic representation is the closure's type name.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&StateValue) -> Option<StateValue> + Send + Sync + 'static,
    {
        Self::build(std::any::type_name::<F>().to_string(), None, None, Box::new(f))
    }

    /// Wraps a selector function with a label.
    ///
    /// The label doubles as a derivable handler name when naming is
    /// required.
    pub fn named<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&StateValue) -> Option<StateValue> + Send + Sync + 'static,
    {
        let label = label.into();
        Self::build(label.clone(), Some(label), None, Box::new(f))
    }

    /// Builds a selector resolving a dotted path.
    ///
    /// # Errors
    ///
    /// Fails with the [`PathAccessor::parse`] validation errors.
    pub fn path(path: &str) -> Result<Self, ValidationError> {
        let accessor = PathAccessor::parse(path)?;
        let raw = accessor.raw().to_string();
        let eval = move |state: &StateValue| accessor.lookup(state).cloned();
        Ok(Self::build(raw.clone(), None, Some(raw), Box::new(eval)))
    }

    /// This selector's identity.
    #[must_use]
    pub fn id(&self) -> SelectorId {
        self.inner.id
    }

    /// Diagnostic representation (path, label, or closure type name).
    #[must_use]
    pub fn repr(&self) -> &str {
        &self.inner.repr
    }

    /// Label given at construction, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Originating dotted path, for path selectors.
    #[must_use]
    pub fn source_path(&self) -> Option<&str> {
        self.inner.path.as_deref()
    }

    /// Evaluates the selector against a state tree.
    ///
    /// This is the raw call: a panicking selector propagates. The detection
    /// cycle uses the contained variant instead.
    #[must_use]
    pub fn evaluate(&self, state: &StateValue) -> Option<StateValue> {
        (self.inner.eval)(state)
    }

    /// Evaluates with panic containment.
    ///
    /// A panicking selector yields `Err(detail)`; the caller reports the
    /// fault and treats the value as absent.
    pub(crate) fn evaluate_contained(
        &self,
        state: &StateValue,
    ) -> Result<Option<StateValue>, String> {
        catch_unwind(AssertUnwindSafe(|| self.evaluate(state)))
            .map_err(|payload| panic_detail(payload.as_ref()))
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Selector {}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("id", &self.inner.id)
            .field("repr", &self.inner.repr)
            .field("path", &self.inner.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_preserves_identity() {
        let a = Selector::from_fn(|s| Some(s.clone()));
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_constructions_are_distinct() {
        let a = Selector::from_fn(|s| Some(s.clone()));
        let b = Selector::from_fn(|s| Some(s.clone()));
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn test_path_selector_resolves() {
        let state = StateValue::from(serde_json::json!({"a": {"b": 1}}));
        let selector = Selector::path("a.b").unwrap();
        assert_eq!(selector.evaluate(&state), Some(StateValue::Int(1)));
        assert_eq!(selector.source_path(), Some("a.b"));
        assert_eq!(selector.repr(), "a.b");
    }

    #[test]
    fn test_path_selector_absent_is_none() {
        let state = StateValue::from(serde_json::json!({"a": 1}));
        let selector = Selector::path("a.b.c").unwrap();
        assert_eq!(selector.evaluate(&state), None);
    }

    #[test]
    fn test_path_selector_rejects_invalid_paths() {
        assert!(Selector::path("").is_err());
        assert!(Selector::path("a..b").is_err());
    }

    #[test]
    fn test_named_selector_exposes_label() {
        let selector = Selector::named("itemCount", |s| {
            s.get("items")
                .and_then(StateValue::as_list)
                .map(|items| StateValue::Int(i64::try_from(items.len()).unwrap_or(i64::MAX)))
        });
        assert_eq!(selector.label(), Some("itemCount"));
        assert_eq!(selector.repr(), "itemCount");
    }

    #[test]
    fn test_contained_evaluation_reports_panics() {
        let selector = Selector::from_fn(|_| panic!("selector exploded"));
        let err = selector.evaluate_contained(&StateValue::Null).unwrap_err();
        assert!(err.contains("selector exploded"));
    }
}
