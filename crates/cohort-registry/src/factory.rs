//! Factories: named blueprints producing component instances.

use std::fmt;

use cohort_filter::Properties;

use crate::component::Component;
use crate::error::{RegistryError, RegistryResult};
use crate::requirement::Requirement;

type Producer = dyn Fn(&Properties) -> anyhow::Result<Box<dyn Component>> + Send + Sync;

/// A blueprint for instances: a producer plus the capabilities its instances
/// provide and the requirement slots they declare.
///
/// # Example
///
/// ```
/// use cohort_registry::{Factory, Passive, Requirement};
///
/// let factory = Factory::new(|_| Ok(Passive))
///     .provides("http")
///     .requires("store", Requirement::new("kv"))
///     .requires("plugins", Requirement::new("plugin").aggregate().optional());
/// assert_eq!(factory.capabilities(), ["http".to_string()]);
/// assert_eq!(factory.requirements().len(), 2);
/// ```
pub struct Factory {
    producer: Box<Producer>,
    capabilities: Vec<String>,
    requirements: Vec<(String, Requirement)>,
}

impl Factory {
    /// Create a factory from a producer closure.
    ///
    /// The producer receives the instance properties, reserved keys included.
    pub fn new<C, F>(producer: F) -> Self
    where
        C: Component,
        F: Fn(&Properties) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            producer: Box::new(move |properties| {
                producer(properties).map(|component| Box::new(component) as Box<dyn Component>)
            }),
            capabilities: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Advertise a capability.
    #[must_use]
    pub fn provides(mut self, capability: impl Into<String>) -> Self {
        let capability = capability.into();
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Declare a requirement slot. Slots are resolved in declaration order.
    #[must_use]
    pub fn requires(mut self, slot: impl Into<String>, requirement: Requirement) -> Self {
        self.requirements.push((slot.into(), requirement));
        self
    }

    /// Capabilities of produced instances.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Declared slots with their requirements.
    #[must_use]
    pub fn requirements(&self) -> &[(String, Requirement)] {
        &self.requirements
    }

    /// Check names before the factory enters a registry.
    pub(crate) fn validate(&self) -> RegistryResult<()> {
        if self.capabilities.iter().any(String::is_empty) {
            return Err(RegistryError::InvalidArgument(
                "provided capability name is empty".into(),
            ));
        }

        for (index, (slot, requirement)) in self.requirements.iter().enumerate() {
            if slot.is_empty() {
                return Err(RegistryError::InvalidArgument(
                    "requirement slot name is empty".into(),
                ));
            }
            if requirement.capability().is_empty() {
                return Err(RegistryError::InvalidArgument(format!(
                    "slot '{slot}' requires an empty capability name"
                )));
            }
            if self.requirements[..index].iter().any(|(other, _)| other == slot) {
                return Err(RegistryError::InvalidArgument(format!(
                    "slot '{slot}' is declared twice"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn produce(&self, properties: &Properties) -> anyhow::Result<Box<dyn Component>> {
        (self.producer)(properties)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("capabilities", &self.capabilities)
            .field("requirements", &self.requirements)
            .finish_non_exhaustive()
    }
}
