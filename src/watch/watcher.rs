//! Watcher lifecycle.
//!
//! A [`Watcher`] binds to one container: it captures the initial snapshot
//! as the previous state, subscribes for transition notifications, and owns
//! every registration made through [`Watcher::watch`] until [`Watcher::remove`]
//! tears the subscription down.
//!
//! Selectors and equality predicates must be pure: they run while the
//! watcher holds its registry lock, so re-entering the watcher from inside
//! one is a contract violation. Callbacks and dispatch side effects run
//! with no lock held and may freely re-enter (commit transitions, register
//! more handlers, read state).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::{self, ResolvedFlags, WatchOptions, WatcherConfig};
use crate::error::{ConfigError, ValidationError, VigilResult};
use crate::store::{StateContainer, Subscription};
use crate::value::{Snapshot, StateValue};
use crate::watch::dispatcher;
use crate::watch::detector;
use crate::watch::faults::{FaultHub, FaultStream};
use crate::watch::registry::{Handler, Registry};
use crate::watch::selector::Selector;
use crate::watch::ChangeCallback;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What to watch: a dotted path or a prebuilt selector.
#[derive(Debug, Clone)]
pub enum WatchTarget {
    /// Dotted path into the state tree.
    Path(String),
    /// Arbitrary pure selector.
    Selector(Selector),
}

impl From<&str> for WatchTarget {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for WatchTarget {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Selector> for WatchTarget {
    fn from(selector: Selector) -> Self {
        Self::Selector(selector)
    }
}

struct WatcherInner {
    store: Arc<dyn StateContainer>,
    flags: ResolvedFlags,
    fault_capacity: usize,
    /// One selector per distinct path string, so repeated registrations
    /// share a memo slot.
    paths: Mutex<HashMap<String, Selector>>,
    registry: Mutex<Registry>,
    previous: Mutex<Snapshot>,
    removed: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
    faults: FaultHub,
}

/// Change-detection watcher bound to one container.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vigil::{MemoryStore, StateValue, Watcher, WatcherConfig, WatchOptions};
///
/// let store = Arc::new(MemoryStore::new(StateValue::from(
///     serde_json::json!({"a": {"b": 1}}),
/// )));
/// let watcher = Watcher::new(store.clone(), WatcherConfig::default());
///
/// watcher
///     .watch(
///         "a.b",
///         |current, previous, _new_state, _old_state| {
///             assert_eq!(previous.and_then(|v| v.as_int()), Some(1));
///             assert_eq!(current.and_then(|v| v.as_int()), Some(2));
///         },
///         WatchOptions::default(),
///     )
///     .unwrap();
///
/// store.commit(StateValue::from(serde_json::json!({"a": {"b": 2}})));
/// watcher.remove();
/// ```
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

impl Watcher {
    /// Creates a watcher bound to `store`.
    ///
    /// The current snapshot becomes the baseline previous state; the
    /// watcher is live from the first transition after this call.
    #[must_use]
    pub fn new(store: Arc<dyn StateContainer>, config: WatcherConfig) -> Self {
        let inner = Arc::new(WatcherInner {
            store: Arc::clone(&store),
            flags: ResolvedFlags::resolve(&config),
            fault_capacity: config.fault_stream_capacity.max(1),
            paths: Mutex::new(HashMap::new()),
            registry: Mutex::new(Registry::new()),
            previous: Mutex::new(store.snapshot()),
            removed: AtomicBool::new(false),
            subscription: Mutex::new(None),
            faults: FaultHub::new(),
        });

        // The listener holds a weak reference: dropping the last Watcher
        // handle silences the subscription instead of leaking a cycle
        // through the container.
        let weak: Weak<WatcherInner> = Arc::downgrade(&inner);
        let subscription = store.subscribe(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_transition();
            }
        }));
        *lock(&inner.subscription) = Some(subscription);

        Self { inner }
    }

    /// Creates a watcher bound to the process-wide default container.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoDefaultContainer`] when no default was
    /// installed via [`config::configure`].
    pub fn with_default_store(config: WatcherConfig) -> VigilResult<Self> {
        let container = config::global()
            .and_then(|g| g.container.clone())
            .ok_or(ConfigError::NoDefaultContainer)?;
        Ok(Self::new(container, config))
    }

    /// Registers interest in a path or selector.
    ///
    /// The callback receives `(current, previous, new_state, old_state)`
    /// whenever the derived value changes between consecutive transitions,
    /// judged by `options.check_equal` or structural equality.
    ///
    /// # Errors
    ///
    /// Path validation errors surface here, as does
    /// [`ValidationError::EmptyName`] for an explicit empty name and
    /// [`ValidationError::MissingName`] when the effective `require_name`
    /// flag is set and no name is derivable from the registration.
    pub fn watch<T, F>(&self, target: T, callback: F, options: WatchOptions) -> VigilResult<()>
    where
        T: Into<WatchTarget>,
        F: Fn(Option<&StateValue>, Option<&StateValue>, &Snapshot, &Snapshot)
            + Send
            + Sync
            + 'static,
    {
        self.inner.watch(target.into(), Box::new(callback), options)
    }

    /// Tears down the container subscription.
    ///
    /// Idempotent. No transition arriving after this returns triggers
    /// notifications; a cycle that already started completes.
    pub fn remove(&self) {
        self.inner.remove();
    }

    /// The container this watcher is bound to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StateContainer> {
        &self.inner.store
    }

    /// Opens a stream of contained faults (panicking selectors,
    /// comparators, callbacks).
    #[must_use]
    pub fn faults(&self) -> FaultStream {
        self.inner.faults.subscribe(self.inner.fault_capacity)
    }

    /// Number of fault events dropped because streams were full.
    #[must_use]
    pub fn dropped_faults(&self) -> u64 {
        self.inner.faults.dropped()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("removed", &self.inner.removed.load(Ordering::Acquire))
            .field("flags", &self.inner.flags)
            .finish()
    }
}

impl WatcherInner {
    fn watch(
        &self,
        target: WatchTarget,
        callback: Box<ChangeCallback>,
        options: WatchOptions,
    ) -> VigilResult<()> {
        if options.name.as_deref() == Some("") {
            return Err(ValidationError::EmptyName.into());
        }

        let selector = match target {
            WatchTarget::Path(path) => self.selector_for_path(&path)?,
            WatchTarget::Selector(selector) => selector,
        };

        // Name precedence: explicit, then the path, then a selector label.
        let derived_name = options
            .name
            .clone()
            .or_else(|| selector.source_path().map(str::to_string))
            .or_else(|| selector.label().map(str::to_string));

        if self.flags.require_name && derived_name.is_none() {
            return Err(ValidationError::MissingName {
                selector: selector.repr().to_string(),
            }
            .into());
        }

        let label = derived_name.unwrap_or_else(|| selector.repr().to_string());
        let handler = Arc::new(Handler {
            label,
            name: options.name,
            path: selector.source_path().map(str::to_string),
            selector_repr: selector.repr().to_string(),
            check_equal: options.check_equal,
            should_dispatch: options.should_dispatch,
            should_log: options.should_log,
            callback,
        });

        let initialize = options.initialize_value.unwrap_or(true);
        let current = self.store.snapshot();
        let fault = lock(&self.registry).register(selector, handler, initialize, &current);
        if let Some(fault) = fault {
            self.faults.report(fault);
        }
        Ok(())
    }

    fn selector_for_path(&self, path: &str) -> VigilResult<Selector> {
        let mut cache = lock(&self.paths);
        if let Some(selector) = cache.get(path) {
            return Ok(selector.clone());
        }
        let selector = Selector::path(path)?;
        cache.insert(path.to_string(), selector.clone());
        Ok(selector)
    }

    /// One full notification cycle.
    fn on_transition(&self) {
        if self.removed.load(Ordering::Acquire) {
            return;
        }

        let new_state = self.store.snapshot();
        // Previous state and all selector memos advance together, before
        // any handler runs: a callback that re-reads current state observes
        // the new snapshot, never a half-updated view.
        let old_state = std::mem::replace(&mut *lock(&self.previous), Arc::clone(&new_state));

        let (batch, faults) = {
            let mut registry = lock(&self.registry);
            detector::detect(&mut registry, &new_state)
        };
        for fault in faults {
            self.faults.report(fault);
        }

        // No lock is held past this point; dispatch and callbacks may
        // re-enter depth-first.
        dispatcher::deliver(
            &self.store,
            self.flags,
            &self.faults,
            batch,
            &new_state,
            &old_state,
        );
    }

    fn remove(&self) {
        if self.removed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.cancel();
        }
    }
}
