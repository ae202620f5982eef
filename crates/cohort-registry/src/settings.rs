//! Registry tuning knobs.

use serde::{Deserialize, Serialize};

/// Default allowance of extra iterations in one binding pass.
pub const DEFAULT_MAX_BINDING_ITERATIONS: usize = 256;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Largest event channel capacity the registry will allocate.
pub const MAX_EVENT_CAPACITY: usize = 1 << 20;

/// Behavior settings of a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Iterations a binding pass may run beyond one per instance it saw
    /// waiting. Exceeding it fails the pass with
    /// [`RegistryError::CyclicDependency`](crate::RegistryError::CyclicDependency).
    pub max_binding_iterations: usize,
    /// Turn panics in lifecycle callbacks and producers into logged failures.
    pub catch_callback_panics: bool,
    /// Buffered events per subscriber before the slowest one lags, clamped to
    /// [`MAX_EVENT_CAPACITY`].
    pub event_capacity: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            max_binding_iterations: DEFAULT_MAX_BINDING_ITERATIONS,
            catch_callback_panics: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
