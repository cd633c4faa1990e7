//! Watcher and process-wide configuration.
//!
//! Flags resolve with per-handler > per-watcher > global precedence. A flag
//! left as `None` at one level defers to the next; the global level always
//! has a concrete value (default `false`).
//!
//! The global defaults exist so embedders can wire one container for a whole
//! process and create watchers without threading it through every call site.
//! They are set at most once via [`configure`]; prefer passing the container
//! explicitly where practical, which keeps code testable without process
//! fixtures.

use std::sync::{Arc, OnceLock};

use crate::error::{ConfigError, VigilResult};
use crate::store::StateContainer;
use crate::value::StateValue;

/// A custom equality predicate for one registration.
///
/// Receives the candidate current and memoized previous derived values;
/// returning `true` suppresses notification. `None` is the absent value.
pub type EqualityCheck =
    Arc<dyn Fn(Option<&StateValue>, Option<&StateValue>) -> bool + Send + Sync>;

/// Per-watcher configuration.
///
/// The three flags default to unset, deferring to the global defaults.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Mirror every detected change back into the container as a
    /// change-record transition.
    pub should_dispatch: Option<bool>,
    /// Emit every detected change to the diagnostic log.
    pub should_log: Option<bool>,
    /// Reject registrations lacking an explicit or derivable name.
    pub require_name: Option<bool>,
    /// Buffer capacity for each fault stream handed out by the watcher.
    pub fault_stream_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            should_dispatch: None,
            should_log: None,
            require_name: None,
            fault_stream_capacity: 1024,
        }
    }
}

/// Per-registration options for [`crate::Watcher::watch`].
#[derive(Clone, Default)]
pub struct WatchOptions {
    /// Explicit handler name. Must be non-empty when given.
    pub name: Option<String>,
    /// Custom equality predicate; defaults to structural equality.
    pub check_equal: Option<EqualityCheck>,
    /// Per-registration override of the watcher dispatch flag.
    pub should_dispatch: Option<bool>,
    /// Per-registration override of the watcher log flag.
    pub should_log: Option<bool>,
    /// Capture the baseline previous value at registration time.
    ///
    /// Defaults to `true` via [`WatchOptions::default`]. Opting out leaves
    /// the baseline absent, so the first transition reports a change from
    /// the absent value even when state did not move.
    pub initialize_value: Option<bool>,
}

impl WatchOptions {
    /// Options with an explicit handler name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Whether the baseline should be captured at registration (default true).
    #[must_use]
    pub fn initialize_value(&self) -> bool {
        self.initialize_value.unwrap_or(true)
    }
}

impl std::fmt::Debug for WatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchOptions")
            .field("name", &self.name)
            .field(
                "check_equal",
                &self.check_equal.as_ref().map(|_| "<custom>"),
            )
            .field("should_dispatch", &self.should_dispatch)
            .field("should_log", &self.should_log)
            .field("initialize_value", &self.initialize_value)
            .finish()
    }
}

/// Process-wide defaults read by watchers created without explicit settings.
#[derive(Clone, Default)]
pub struct GlobalDefaults {
    /// Container used by [`crate::Watcher::with_default_store`].
    pub container: Option<Arc<dyn StateContainer>>,
    /// Default dispatch flag.
    pub should_dispatch: bool,
    /// Default log flag.
    pub should_log: bool,
    /// Default name requirement.
    pub require_name: bool,
}

impl std::fmt::Debug for GlobalDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalDefaults")
            .field("container", &self.container.as_ref().map(|_| "<container>"))
            .field("should_dispatch", &self.should_dispatch)
            .field("should_log", &self.should_log)
            .field("require_name", &self.require_name)
            .finish()
    }
}

static DEFAULTS: OnceLock<GlobalDefaults> = OnceLock::new();

/// Installs the process-wide defaults.
///
/// Init-once: the first call wins for the remainder of the process.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyConfigured`] on any call after the first.
pub fn configure(defaults: GlobalDefaults) -> VigilResult<()> {
    DEFAULTS
        .set(defaults)
        .map_err(|_| ConfigError::AlreadyConfigured.into())
}

/// The installed defaults, if [`configure`] has been called.
pub(crate) fn global() -> Option<&'static GlobalDefaults> {
    DEFAULTS.get()
}

/// Watcher-level flags with the global level already folded in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedFlags {
    pub should_dispatch: bool,
    pub should_log: bool,
    pub require_name: bool,
}

impl ResolvedFlags {
    pub(crate) fn resolve(config: &WatcherConfig) -> Self {
        let global = global();
        Self {
            should_dispatch: config
                .should_dispatch
                .unwrap_or_else(|| global.is_some_and(|g| g.should_dispatch)),
            should_log: config
                .should_log
                .unwrap_or_else(|| global.is_some_and(|g| g.should_log)),
            require_name: config
                .require_name
                .unwrap_or_else(|| global.is_some_and(|g| g.require_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_config_defaults() {
        let config = WatcherConfig::default();
        assert_eq!(config.should_dispatch, None);
        assert_eq!(config.should_log, None);
        assert_eq!(config.require_name, None);
        assert_eq!(config.fault_stream_capacity, 1024);
    }

    #[test]
    fn test_watch_options_defaults() {
        let opts = WatchOptions::default();
        assert!(opts.name.is_none());
        assert!(opts.check_equal.is_none());
        assert!(opts.initialize_value());
    }

    #[test]
    fn test_watch_options_named() {
        let opts = WatchOptions::named("counter");
        assert_eq!(opts.name.as_deref(), Some("counter"));
    }

    #[test]
    fn test_watch_options_debug_elides_closure() {
        let opts = WatchOptions {
            check_equal: Some(Arc::new(|a, b| a == b)),
            ..WatchOptions::default()
        };
        let rendered = format!("{opts:?}");
        assert!(rendered.contains("<custom>"));
    }

    #[test]
    fn test_resolved_flags_prefer_watcher_level() {
        // Explicit watcher-level values win regardless of global state.
        let flags = ResolvedFlags::resolve(&WatcherConfig {
            should_dispatch: Some(true),
            should_log: Some(false),
            require_name: Some(true),
            ..WatcherConfig::default()
        });
        assert!(flags.should_dispatch);
        assert!(!flags.should_log);
        assert!(flags.require_name);
    }
}
