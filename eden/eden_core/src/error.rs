//! Error types for the Eden host.
//!
//! Each subsystem has its own error enum; the root [`Error`] wraps all of
//! them so callers at the edge of the host can handle failures uniformly.
//! Subsystem errors are `Clone` because the permission engine hands the
//! same resolution result to every coalesced caller.

use thiserror::Error;

use crate::types::{LifecycleStage, PermissionDescriptor};

/// Root error type for the Eden host.
#[derive(Debug, Error)]
pub enum Error {
    /// Permission engine errors
    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    /// Lifecycle dispatcher errors
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Plugin execution boundary errors
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// True if this error is a permission denial, wherever it was raised.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::Permission(PermissionError::Denied(_)))
    }

    /// True if this error reports a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Plugin(PluginError::ResourceNotFound(_)))
    }
}

/// Errors raised by the permission engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The descriptor is denied (either persisted or freshly decided).
    #[error("Permission denied: {0}")]
    Denied(PermissionDescriptor),

    /// No decision mechanism could resolve the prompt.
    #[error("Cannot resolve {descriptor}: {reason}")]
    ResolutionUnavailable {
        /// Descriptor whose prompt could not be resolved
        descriptor: PermissionDescriptor,

        /// Why no decision was produced
        reason: String,
    },

    /// Persisting or loading decisions failed.
    #[error("Decision store error: {0}")]
    Store(String),
}

/// Errors raised by the lifecycle dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The host tried to skip or repeat a stage.
    #[error(
        "Cannot advance to {requested}: current stage is {}",
        .current.map(|s| s.as_str()).unwrap_or("<not started>")
    )]
    OrderViolation {
        /// Stage the dispatcher was in when the advance was attempted
        current: Option<LifecycleStage>,

        /// Stage the host asked for
        requested: LifecycleStage,
    },

    /// A stage literal that is not part of the boot sequence.
    #[error("Unknown lifecycle stage: {0}")]
    UnknownStage(String),

    /// A hook locator that cannot be normalized.
    #[error("Invalid hook locator '{locator}': {reason}")]
    InvalidLocator {
        /// Locator as supplied
        locator: String,

        /// Why it was rejected
        reason: String,
    },

    /// A gating stage finished with failed hooks.
    #[error("Gating stage {stage} failed: {failed} of {total} hooks did not succeed")]
    GatingFailed {
        /// The stage that failed
        stage: LifecycleStage,

        /// Number of hooks that failed or timed out
        failed: usize,

        /// Number of hooks that ran
        total: usize,
    },
}

/// Errors raised at the plugin execution boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// A file, package or hook source does not exist.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// A hook handler failed.
    #[error("Hook {locator} failed during {stage}: {message}")]
    HookExecution {
        /// Stage the hook was running for
        stage: LifecycleStage,

        /// Normalized hook locator
        locator: String,

        /// Failure reported by the handler
        message: String,
    },

    /// A hook did not settle within the dispatcher timeout.
    #[error("Hook {locator} timed out during {stage} after {timeout_ms}ms")]
    HookTimeout {
        /// Stage the hook was running for
        stage: LifecycleStage,

        /// Normalized hook locator
        locator: String,

        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// Extension code could not be loaded.
    #[error("Failed to load extension: {0}")]
    LoadFailed(String),

    /// A handler reported an application-level failure.
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    /// An external collaborator (file system, probe) failed.
    #[error("Host operation failed: {0}")]
    Host(String),
}

/// Result type used throughout the Eden host.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_errors_roll_up() {
        let denied = PermissionError::Denied(PermissionDescriptor::Log);
        let error: Error = denied.into();
        assert!(error.is_permission_denied());

        let missing: Error = PluginError::ResourceNotFound("/nope".to_string()).into();
        assert!(missing.is_not_found());
        assert!(!missing.is_permission_denied());
    }

    #[test]
    fn test_order_violation_display() {
        let err = LifecycleError::OrderViolation {
            current: None,
            requested: LifecycleStage::OsInit,
        };
        assert_eq!(
            err.to_string(),
            "Cannot advance to os-init: current stage is <not started>"
        );

        let err = LifecycleError::OrderViolation {
            current: Some(LifecycleStage::OsStartup),
            requested: LifecycleStage::OsInit,
        };
        assert!(err.to_string().ends_with("current stage is os-startup"));
    }

    #[test]
    fn test_denied_display_names_descriptor() {
        let err = PermissionError::Denied(PermissionDescriptor::Read {
            path: Some("/etc/passwd".to_string()),
        });
        assert_eq!(err.to_string(), "Permission denied: read(/etc/passwd)");
    }
}
