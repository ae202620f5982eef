//! Error types for registry operations.

use std::fmt;

use cohort_filter::FilterError;
use thiserror::Error;

/// Errors surfaced by registry operations.
///
/// Lifecycle callback failures are not part of this enum: they are logged
/// and published as events, never returned to the caller.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required name was empty or a factory definition is malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A requirement filter could not be parsed.
    #[error("Invalid filter for capability '{capability}': {source}")]
    InvalidFilter {
        /// Capability the filter was declared for.
        capability: String,
        /// The parse error.
        #[source]
        source: FilterError,
    },

    /// The referenced factory or instance does not exist.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up (`factory` or `instance`).
        kind: &'static str,
        /// The missing name.
        name: String,
    },

    /// An instance with this name is already registered.
    #[error("Instance already exists: {0}")]
    AlreadyExists(String),

    /// The factory producer returned an error or panicked.
    #[error("Factory '{factory}' failed to produce instance '{instance}': {reason}")]
    InstantiationFailed {
        /// Factory name.
        factory: String,
        /// Requested instance name.
        instance: String,
        /// Producer error message.
        reason: String,
    },

    /// The binding pass kept re-validating instances past its iteration
    /// allowance, typically because callbacks keep re-queuing them.
    #[error("Binding pass did not settle after {iterations} iterations (waiting: {})", .pending.join(", "))]
    CyclicDependency {
        /// Number of iterations run.
        iterations: usize,
        /// Instances still waiting when the pass gave up.
        pending: Vec<String>,
    },
}

impl RegistryError {
    /// Shorthand for a missing factory.
    pub(crate) fn factory_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "factory",
            name: name.into(),
        }
    }

    /// Shorthand for a missing instance.
    pub(crate) fn instance_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "instance",
            name: name.into(),
        }
    }

    /// Whether this is a not-found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error reports a bad argument (including bad filters).
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::InvalidFilter { .. })
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// The lifecycle callback that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    /// [`Component::on_validate`](crate::Component::on_validate).
    Validate,
    /// [`Component::on_invalidate`](crate::Component::on_invalidate).
    Invalidate,
    /// [`Component::on_bind`](crate::Component::on_bind).
    Bind,
    /// [`Component::on_unbind`](crate::Component::on_unbind).
    Unbind,
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::Invalidate => "invalidate",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
        })
    }
}

/// A non-fatal lifecycle callback failure.
///
/// Caught by the registry, logged, and published as an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} callback of instance '{instance}' failed: {message}")]
pub struct CallbackFailure {
    /// Instance whose callback failed.
    pub instance: String,
    /// Which callback failed.
    pub kind: CallbackKind,
    /// Error or panic message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RegistryError::factory_not_found("db");
        assert_eq!(err.to_string(), "factory not found: db");
        assert!(err.is_not_found());
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn test_cyclic_dependency_lists_pending() {
        let err = RegistryError::CyclicDependency {
            iterations: 8,
            pending: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "Binding pass did not settle after 8 iterations (waiting: a, b)"
        );
    }

    #[test]
    fn test_callback_failure_display() {
        let failure = CallbackFailure {
            instance: "web".into(),
            kind: CallbackKind::Validate,
            message: "port in use".into(),
        };
        assert_eq!(
            failure.to_string(),
            "validate callback of instance 'web' failed: port in use"
        );
    }
}
