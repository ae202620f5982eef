//! Component instances and their lifecycle state.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use cohort_filter::Properties;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::Component;
use crate::factory::Factory;
use crate::requirement::{Optionality, Requirement};
use crate::slots::DependencySlots;

/// Reserved property holding the instance name.
pub const PROP_INSTANCE_NAME: &str = "instance.name";
/// Reserved property holding the factory name.
pub const PROP_FACTORY_NAME: &str = "instance.factory";
/// Reserved property holding the provided capabilities.
pub const PROP_CAPABILITIES: &str = "instance.capabilities";

/// Shared handle to an instance.
pub type InstanceRef = Arc<Instance>;

/// Lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Produced by its factory, not yet registered.
    Created,
    /// Registered, some mandatory requirement unbound or validation pending.
    Waiting,
    /// Validate callback in progress.
    Validating,
    /// Validated and offering its capabilities.
    Running,
    /// Being removed from the registry.
    Invalidating,
    /// Removed from the registry.
    Destroyed,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Waiting => "waiting",
            Self::Validating => "validating",
            Self::Running => "running",
            Self::Invalidating => "invalidating",
            Self::Destroyed => "destroyed",
        })
    }
}

/// A component created from a factory, with its bindings and state.
pub struct Instance {
    name: String,
    factory_name: String,
    factory: Arc<Factory>,
    properties: Mutex<Properties>,
    component: Box<dyn Component>,
    state: Mutex<InstanceState>,
    slots: Mutex<DependencySlots>,
}

impl Instance {
    pub(crate) fn new(
        name: String,
        factory_name: String,
        factory: Arc<Factory>,
        properties: Properties,
        component: Box<dyn Component>,
    ) -> Self {
        Self {
            name,
            factory_name,
            factory,
            properties: Mutex::new(properties),
            component,
            state: Mutex::new(InstanceState::Created),
            slots: Mutex::new(DependencySlots::default()),
        }
    }

    /// Merge the reserved keys into user supplied properties.
    pub(crate) fn reserved_properties(
        mut properties: Properties,
        name: &str,
        factory_name: &str,
        factory: &Factory,
    ) -> Properties {
        properties.insert(PROP_INSTANCE_NAME.to_owned(), Value::from(name));
        properties.insert(PROP_FACTORY_NAME.to_owned(), Value::from(factory_name));
        properties.insert(
            PROP_CAPABILITIES.to_owned(),
            Value::from(factory.capabilities().to_vec()),
        );
        properties
    }

    /// Unique instance name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the factory that produced the instance.
    #[must_use]
    pub fn factory_name(&self) -> &str {
        &self.factory_name
    }

    /// Capabilities advertised while running.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        self.factory.capabilities()
    }

    /// Whether the instance advertises `capability`.
    #[must_use]
    pub fn provides(&self, capability: &str) -> bool {
        self.capabilities().iter().any(|c| c == capability)
    }

    /// Copy of the properties, including the reserved `instance.*` keys.
    #[must_use]
    pub fn properties(&self) -> Properties {
        self.properties.lock().clone()
    }

    /// A single property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<Value> {
        self.properties.lock().get(key).cloned()
    }

    /// Run `f` against the current properties without copying them.
    pub fn with_properties<R>(&self, f: impl FnOnce(&Properties) -> R) -> R {
        f(&self.properties.lock())
    }

    /// Named requirement slots declared by the factory.
    #[must_use]
    pub fn requirements(&self) -> &[(String, Requirement)] {
        self.factory.requirements()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> InstanceState {
        *self.state.lock()
    }

    /// Whether the instance is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == InstanceState::Running
    }

    /// Snapshot of the dependency slots.
    #[must_use]
    pub fn slots(&self) -> DependencySlots {
        self.slots.lock().clone()
    }

    /// The provider bound into `slot` (the first one for aggregates).
    #[must_use]
    pub fn dependency(&self, slot: &str) -> Option<InstanceRef> {
        self.slots.lock().first(slot).cloned()
    }

    /// Every provider bound into `slot`.
    #[must_use]
    pub fn dependencies(&self, slot: &str) -> Vec<InstanceRef> {
        self.slots.lock().providers(slot).to_vec()
    }

    /// Names of all bound providers, without duplicates, in slot order.
    #[must_use]
    pub fn depends_on(&self) -> Vec<String> {
        let slots = self.slots.lock();
        let mut names: Vec<String> = Vec::new();
        for (_, binding) in slots.iter() {
            for provider in binding.providers() {
                if !names.iter().any(|n| n == provider.name()) {
                    names.push(provider.name().to_owned());
                }
            }
        }
        names
    }

    /// The component, downcast to its concrete type.
    #[must_use]
    pub fn component<T: Component>(&self) -> Option<&T> {
        let component: &dyn Any = &*self.component;
        component.downcast_ref::<T>()
    }

    /// Whether every mandatory requirement has at least one provider.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        let slots = self.slots.lock();
        self.requirements()
            .iter()
            .filter(|(_, req)| req.optionality() == Optionality::Mandatory)
            .all(|(slot, _)| slots.is_bound(slot))
    }

    pub(crate) fn component_ref(&self) -> &dyn Component {
        &*self.component
    }

    /// Replace the properties, re-asserting the reserved keys.
    pub(crate) fn replace_properties(&self, properties: Properties) {
        let properties =
            Self::reserved_properties(properties, &self.name, &self.factory_name, &self.factory);
        *self.properties.lock() = properties;
    }

    pub(crate) fn set_state(&self, state: InstanceState) {
        *self.state.lock() = state;
    }

    pub(crate) fn with_slots<R>(&self, f: impl FnOnce(&mut DependencySlots) -> R) -> R {
        f(&mut self.slots.lock())
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("factory", &self.factory_name)
            .field("state", &self.state())
            .field("depends_on", &self.depends_on())
            .finish_non_exhaustive()
    }
}
