//! Prelude module - commonly used types for convenient import.
//!
//! Use `use cohort_registry::prelude::*;` to import all essential types.

// Errors
pub use crate::{RegistryError, RegistryResult};

// Registry
pub use crate::{Registry, RegistrySettings, RegistrySnapshot};

// Components and factories
pub use crate::{Component, Factory, Instance, InstanceRef, InstanceState, Passive, Requirement};

// Re-exported filter types
pub use crate::{Filter, Properties};
