//! # Vigil - change detection over immutable state containers
//!
//! Vigil is a thin observer layer for applications that keep their state in
//! an externally owned, immutable container (a redux-style store, or
//! anything exposing snapshot/subscribe/dispatch). Consumers register
//! interest in a dotted path into the state tree or an arbitrary pure
//! selector of state, and get a callback exactly when the derived value
//! changes between consecutive transitions.
//!
//! ## Core Concepts
//!
//! - **Container**: the external state holder ([`StateContainer`])
//! - **Selector**: a pure function from a snapshot to a derived value
//! - **Handler**: one registered interest (callback + options)
//! - **Change-record**: the structured payload describing one detected change
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use vigil::{MemoryStore, StateValue, Watcher, WatcherConfig, WatchOptions};
//!
//! let store = Arc::new(MemoryStore::new(StateValue::from(
//!     serde_json::json!({"session": {"user": "ada"}}),
//! )));
//!
//! let watcher = Watcher::new(store.clone(), WatcherConfig::default());
//! watcher.watch(
//!     "session.user",
//!     |current, previous, _new_state, _old_state| {
//!         println!("user changed: {previous:?} -> {current:?}");
//!     },
//!     WatchOptions::default(),
//! )?;
//!
//! store.commit(StateValue::from(serde_json::json!({"session": {"user": "grace"}})));
//! watcher.remove();
//! # Ok::<(), vigil::VigilError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod path;
pub mod record;
pub mod store;
pub mod value;
pub mod watch;

// Re-export primary types at crate root for convenience
pub use config::{configure, EqualityCheck, GlobalDefaults, WatchOptions, WatcherConfig};
pub use error::{ConfigError, ValidationError, VigilError, VigilResult};
pub use path::PathAccessor;
pub use record::{ChangePayload, ChangeRecord};
pub use store::{Listener, MemoryStore, StateContainer, Subscription};
pub use value::{Snapshot, StateValue};
pub use watch::{
    ChangeCallback, FaultEvent, FaultStream, Selector, SelectorId, WatchFault, WatchTarget,
    Watcher,
};
