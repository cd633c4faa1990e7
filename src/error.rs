//! Error types for vigil.
//!
//! All errors are strongly typed using thiserror. Registration and
//! configuration errors surface synchronously to the caller; runtime
//! failures inside a notification cycle are contained instead and reported
//! as [`crate::watch::WatchFault`] events.

use thiserror::Error;

/// Validation errors raised at registration time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Watch path cannot be empty")]
    EmptyPath,

    #[error("Watch path {path:?} contains an empty segment")]
    EmptyPathSegment {
        path: String,
    },

    #[error("Handler name cannot be empty")]
    EmptyName,

    #[error("A handler name is required but none was given or derivable for selector {selector}")]
    MissingName {
        selector: String,
    },
}

/// Errors in watcher or process-wide configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Global defaults were already configured")]
    AlreadyConfigured,

    #[error("No default container configured; pass a container explicitly or call configure() first")]
    NoDefaultContainer,
}

/// Top-level error type for vigil.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VigilError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl VigilError {
    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for vigil operations.
pub type VigilResult<T> = Result<T, VigilError>;
