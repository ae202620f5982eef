//! Serializable view of a registry, for shell tooling and diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use cohort_filter::Properties;
use serde::{Deserialize, Serialize};

use crate::factory::Factory;
use crate::instance::{Instance, InstanceState};

/// A requirement slot as declared by a factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementSnapshot {
    /// Slot name.
    pub slot: String,
    /// Required capability.
    pub capability: String,
    /// Whether every matching provider is bound.
    pub aggregate: bool,
    /// Whether the slot blocks validation.
    pub optional: bool,
    /// Provider filter in string form.
    pub filter: Option<String>,
}

/// A registered factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorySnapshot {
    /// Factory name.
    pub name: String,
    /// Capabilities of its instances.
    pub provides: Vec<String>,
    /// Declared slots.
    pub requirements: Vec<RequirementSnapshot>,
}

impl FactorySnapshot {
    pub(crate) fn capture(name: &str, factory: &Factory) -> Self {
        Self {
            name: name.to_owned(),
            provides: factory.capabilities().to_vec(),
            requirements: factory
                .requirements()
                .iter()
                .map(|(slot, req)| RequirementSnapshot {
                    slot: slot.clone(),
                    capability: req.capability().to_owned(),
                    aggregate: req.is_aggregate(),
                    optional: req.is_optional(),
                    filter: req.filter().map(ToString::to_string),
                })
                .collect(),
        }
    }
}

/// A registered instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceSnapshot {
    /// Instance name.
    pub name: String,
    /// Factory name.
    pub factory: String,
    /// Lifecycle state.
    pub state: InstanceState,
    /// Advertised capabilities.
    pub capabilities: Vec<String>,
    /// Properties, reserved keys included.
    pub properties: Properties,
    /// Slot name to bound provider names.
    pub bindings: BTreeMap<String, Vec<String>>,
}

impl InstanceSnapshot {
    pub(crate) fn capture(instance: &Instance) -> Self {
        Self {
            name: instance.name().to_owned(),
            factory: instance.factory_name().to_owned(),
            state: instance.state(),
            capabilities: instance.capabilities().to_vec(),
            properties: instance.properties(),
            bindings: instance
                .slots()
                .iter()
                .map(|(slot, binding)| {
                    let providers = binding
                        .providers()
                        .iter()
                        .map(|p| p.name().to_owned())
                        .collect();
                    (slot.to_owned(), providers)
                })
                .collect(),
        }
    }
}

/// Factories and instances at one point in time, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Registered factories.
    pub factories: Vec<FactorySnapshot>,
    /// Registered instances.
    pub instances: Vec<InstanceSnapshot>,
}

impl RegistrySnapshot {
    /// Look up an instance by name.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<&InstanceSnapshot> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Names of instances in `state`.
    #[must_use]
    pub fn names_in(&self, state: InstanceState) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|i| i.state == state)
            .map(|i| i.name.as_str())
            .collect()
    }
}

impl fmt::Display for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "factories ({}):", self.factories.len())?;
        for factory in &self.factories {
            write!(f, "  {} provides [{}]", factory.name, factory.provides.join(", "))?;
            for req in &factory.requirements {
                write!(f, " {}->{}", req.slot, req.capability)?;
                if req.aggregate {
                    f.write_str("*")?;
                }
                if req.optional {
                    f.write_str("?")?;
                }
                if let Some(filter) = &req.filter {
                    write!(f, "{filter}")?;
                }
            }
            writeln!(f)?;
        }

        writeln!(f, "instances ({}):", self.instances.len())?;
        for instance in &self.instances {
            write!(f, "  {} [{}] {}", instance.name, instance.factory, instance.state)?;
            for (slot, providers) in &instance.bindings {
                write!(f, " {slot}=[{}]", providers.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
