//! Process-wide default configuration lifecycle.
//!
//! Lives in its own integration binary: the defaults are a process global
//! with init-once semantics, so the whole lifecycle is exercised by one
//! sequential test.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use vigil::{
    configure, ConfigError, GlobalDefaults, MemoryStore, Selector, StateValue, VigilError,
    WatchOptions, Watcher, WatcherConfig,
};

#[test]
fn global_defaults_lifecycle() {
    // Before configuration there is no default container.
    let err = Watcher::with_default_store(WatcherConfig::default()).unwrap_err();
    assert_eq!(err, VigilError::Config(ConfigError::NoDefaultContainer));

    let store = Arc::new(MemoryStore::new(StateValue::from(
        serde_json::json!({"n": 1}),
    )));
    configure(GlobalDefaults {
        container: Some(store.clone()),
        require_name: true,
        ..GlobalDefaults::default()
    })
    .unwrap();

    // Init-once: a second call fails.
    let err = configure(GlobalDefaults::default()).unwrap_err();
    assert_eq!(err, VigilError::Config(ConfigError::AlreadyConfigured));

    // Watchers created without an explicit container read the default.
    let watcher = Watcher::with_default_store(WatcherConfig::default()).unwrap();
    assert!(Arc::ptr_eq(
        watcher.store(),
        &(store.clone() as Arc<dyn vigil::StateContainer>)
    ));

    // The global require_name flag is effective for this watcher...
    let err = watcher
        .watch(Selector::from_fn(|_| None), |_, _, _, _| {}, WatchOptions::default())
        .unwrap_err();
    assert!(err.is_validation());

    // ...but a watcher-level override still wins.
    let relaxed = Watcher::with_default_store(WatcherConfig {
        require_name: Some(false),
        ..WatcherConfig::default()
    })
    .unwrap();
    relaxed
        .watch(Selector::from_fn(|_| None), |_, _, _, _| {}, WatchOptions::default())
        .unwrap();

    // Path registrations carry a derivable name and still work end to end.
    let calls = Arc::new(AtomicU32::new(0));
    let counted = Arc::clone(&calls);
    watcher
        .watch(
            "n",
            move |_, _, _, _| {
                counted.fetch_add(1, Ordering::SeqCst);
            },
            WatchOptions::default(),
        )
        .unwrap();

    store.commit(StateValue::from(serde_json::json!({"n": 2})));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
