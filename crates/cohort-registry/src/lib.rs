//! Cohort Registry - dynamic component lifecycle management.
//!
//! Components are produced by named [`Factory`] definitions. Each factory
//! advertises capabilities and declares requirement slots; the [`Registry`]
//! binds running providers into those slots and validates an instance once
//! all its mandatory slots are bound. Removing a provider unbinds its
//! consumers, which look for a replacement in the same operation.
//!
//! # Example
//!
//! ```
//! use cohort_registry::{Factory, InstanceState, Passive, Properties, Registry, Requirement};
//!
//! let registry = Registry::new();
//! registry
//!     .register_factory("store", Factory::new(|_| Ok(Passive)).provides("kv"))
//!     .unwrap();
//! registry
//!     .register_factory(
//!         "api",
//!         Factory::new(|_| Ok(Passive)).requires("store", Requirement::new("kv")),
//!     )
//!     .unwrap();
//!
//! let api = registry.instantiate("api", "api", Properties::new()).unwrap();
//! assert_eq!(api.state(), InstanceState::Waiting);
//!
//! registry.instantiate("store", "memory", Properties::new()).unwrap();
//! assert_eq!(api.state(), InstanceState::Running);
//! assert_eq!(api.dependency("store").unwrap().name(), "memory");
//!
//! registry.unregister_factory("store").unwrap();
//! assert_eq!(api.state(), InstanceState::Waiting);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod binding;
mod component;
mod error;
mod events;
mod factory;
mod instance;
mod registry;
mod requirement;
mod settings;
mod slots;
mod snapshot;
mod state;

pub use cohort_filter::{Filter, Properties};
pub use component::{Component, Passive};
pub use error::{CallbackFailure, CallbackKind, RegistryError, RegistryResult};
pub use events::{EventMetadata, EventReceiver, RegistryEvent, RegistryEventKind};
pub use factory::Factory;
pub use instance::{
    Instance, InstanceRef, InstanceState, PROP_CAPABILITIES, PROP_FACTORY_NAME,
    PROP_INSTANCE_NAME,
};
pub use registry::Registry;
pub use requirement::{Cardinality, Optionality, Requirement};
pub use settings::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_MAX_BINDING_ITERATIONS, MAX_EVENT_CAPACITY, RegistrySettings,
};
pub use slots::{Binding, DependencySlots};
pub use snapshot::{FactorySnapshot, InstanceSnapshot, RegistrySnapshot, RequirementSnapshot};
