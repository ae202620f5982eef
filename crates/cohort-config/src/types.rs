//! Configuration struct definitions.
//!
//! Every section uses `#[serde(default)]` so a partial file only overrides
//! the keys it names.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Component registry behavior.
    pub registry: RegistrySection,
    /// Log output.
    pub logging: LoggingSection,
}

/// Component registry behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Iterations a binding pass may run, beyond one per instance it saw
    /// waiting, before failing with a dependency cycle error.
    pub max_binding_iterations: usize,
    /// Catch panics raised by component callbacks and producers.
    pub catch_callback_panics: bool,
    /// Events buffered per subscriber.
    pub event_capacity: usize,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            max_binding_iterations: 256,
            catch_callback_panics: true,
            event_capacity: 1024,
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Output stream: `"stdout"` or `"stderr"`.
    pub target: String,
    /// Per-crate tracing directives (e.g. `["cohort_registry=debug"]`).
    pub directives: Vec<String>,
    /// Colorize output.
    pub ansi: bool,
    /// Include source file and line.
    pub file_info: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            target: "stderr".to_owned(),
            directives: Vec::new(),
            ansi: true,
            file_info: false,
        }
    }
}
