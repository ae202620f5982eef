//! The component registry.
//!
//! Holds factories and instances and drives dependency resolution. Every
//! public operation runs under one re-entrant lock; the indices themselves
//! sit in a `RefCell` that is only borrowed between callbacks, so a
//! component may call back into the registry from its own callbacks.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::anyhow;
use cohort_filter::{Filter, Properties, filter_matches};
use parking_lot::ReentrantMutex;
use tracing::{debug, error, info, trace, warn};

use crate::binding::{self, Release};
use crate::component::Component;
use crate::error::{CallbackFailure, CallbackKind, RegistryError, RegistryResult};
use crate::events::{EventBus, EventReceiver, RegistryEventKind};
use crate::factory::Factory;
use crate::instance::{Instance, InstanceRef, InstanceState};
use crate::settings::RegistrySettings;
use crate::slots::DependencySlots;
use crate::snapshot::{FactorySnapshot, InstanceSnapshot, RegistrySnapshot};
use crate::state::RegistryState;

struct RegistryInner {
    state: ReentrantMutex<RefCell<RegistryState>>,
    settings: RegistrySettings,
    events: EventBus,
}

/// Registry of factories and instances.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    /// Create an empty registry with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(RegistrySettings::default())
    }

    /// Create an empty registry.
    #[must_use]
    pub fn with_settings(settings: RegistrySettings) -> Self {
        let events = EventBus::with_capacity(settings.event_capacity);
        Self {
            inner: Arc::new(RegistryInner {
                state: ReentrantMutex::new(RefCell::new(RegistryState::default())),
                settings,
                events,
            }),
        }
    }

    /// The settings this registry was built with.
    #[must_use]
    pub fn settings(&self) -> &RegistrySettings {
        &self.inner.settings
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// Register a factory, replacing any factory with the same name.
    ///
    /// Existing instances keep the definition they were created from.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidArgument`] if the name is empty or the
    /// factory declares an empty capability, an empty or duplicate slot.
    pub fn register_factory(&self, name: impl Into<String>, factory: Factory) -> RegistryResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::InvalidArgument("factory name is empty".into()));
        }
        factory.validate()?;

        let _op = self.inner.state.lock();
        let provides = factory.capabilities().join(",");
        let replaced = self.with_state(|s| {
            s.factories
                .insert(name.clone(), Arc::new(factory))
                .is_some()
        });

        if replaced {
            warn!(factory = %name, "Overriding existing factory");
        } else {
            info!(factory = %name, provides = %provides, "Registered factory");
        }
        self.publish(RegistryEventKind::FactoryRegistered { factory: name });
        Ok(())
    }

    /// Remove a factory after destroying every instance it produced.
    ///
    /// Unknown names are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CyclicDependency`] if rebinding dependents
    /// does not settle. The factory is removed regardless.
    pub fn unregister_factory(&self, name: &str) -> RegistryResult<()> {
        let _op = self.inner.state.lock();
        let victims = self.with_state(|s| {
            s.factories.contains_key(name).then(|| {
                s.running
                    .iter()
                    .chain(s.waiting.iter())
                    .filter(|i| i.factory_name() == name)
                    .cloned()
                    .collect::<Vec<_>>()
            })
        });
        let Some(victims) = victims else {
            debug!(factory = %name, "Ignoring unregistration of unknown factory");
            return Ok(());
        };

        let outcome = self.remove_instances(victims);
        self.with_state(|s| s.factories.remove(name));
        info!(factory = %name, "Unregistered factory");
        self.publish(RegistryEventKind::FactoryUnregistered {
            factory: name.to_owned(),
        });
        outcome
    }

    /// Create an instance and run a binding pass.
    ///
    /// The reserved `instance.*` properties override user supplied ones. The
    /// instance starts waiting and is running on return if every mandatory
    /// requirement could be bound and validation succeeded.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidArgument`] if either name is empty
    /// - [`RegistryError::NotFound`] if the factory is unknown
    /// - [`RegistryError::AlreadyExists`] if the instance name is taken
    /// - [`RegistryError::InstantiationFailed`] if the producer fails
    /// - [`RegistryError::CyclicDependency`] if the binding pass does not
    ///   settle; the instance is registered nonetheless
    pub fn instantiate(
        &self,
        factory_name: &str,
        name: &str,
        properties: Properties,
    ) -> RegistryResult<InstanceRef> {
        if factory_name.is_empty() {
            return Err(RegistryError::InvalidArgument("factory name is empty".into()));
        }
        if name.is_empty() {
            return Err(RegistryError::InvalidArgument("instance name is empty".into()));
        }

        let _op = self.inner.state.lock();
        let factory = self.with_state(|s| {
            let factory = s
                .factories
                .get(factory_name)
                .cloned()
                .ok_or_else(|| RegistryError::factory_not_found(factory_name))?;
            if s.instances.contains_key(name) {
                return Err(RegistryError::AlreadyExists(name.to_owned()));
            }
            Ok(factory)
        })?;

        let properties = Instance::reserved_properties(properties, name, factory_name, &factory);
        let component = self
            .guarded(|| factory.produce(&properties))
            .map_err(|error| {
                let reason = format!("{error:#}");
                warn!(factory = %factory_name, instance = %name, error = %reason, "Factory producer failed");
                RegistryError::InstantiationFailed {
                    factory: factory_name.to_owned(),
                    instance: name.to_owned(),
                    reason,
                }
            })?;

        let instance = Arc::new(Instance::new(
            name.to_owned(),
            factory_name.to_owned(),
            factory,
            properties,
            component,
        ));

        // The producer may have re-entered and claimed the name.
        self.with_state(|s| {
            if s.instances.contains_key(name) {
                return Err(RegistryError::AlreadyExists(name.to_owned()));
            }
            s.insert(&instance);
            Ok(())
        })?;
        instance.set_state(InstanceState::Waiting);

        info!(instance = %name, factory = %factory_name, "Created instance");
        self.publish(RegistryEventKind::InstanceCreated {
            instance: name.to_owned(),
            factory: factory_name.to_owned(),
        });

        self.binding_pass()?;
        Ok(instance)
    }

    /// Destroy an instance, notifying and rebinding its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no such instance exists, or
    /// [`RegistryError::CyclicDependency`] if rebinding does not settle.
    pub fn remove_instance(&self, name: &str) -> RegistryResult<()> {
        let _op = self.inner.state.lock();
        let instance = self
            .with_state(|s| s.instances.get(name).cloned())
            .ok_or_else(|| RegistryError::instance_not_found(name))?;
        self.remove_instances(vec![instance])
    }

    /// Replace the properties of an instance and re-evaluate filters.
    ///
    /// The reserved `instance.*` keys are re-asserted. Consumers whose
    /// filter no longer accepts the instance are unbound (and demoted if that
    /// leaves them unsatisfied), then a binding pass lets filtered consumers
    /// pick the instance up.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no such instance exists, or
    /// [`RegistryError::CyclicDependency`] if rebinding does not settle.
    pub fn update_properties(&self, name: &str, properties: Properties) -> RegistryResult<()> {
        let _op = self.inner.state.lock();
        let instance = self
            .with_state(|s| s.instances.get(name).cloned())
            .ok_or_else(|| RegistryError::instance_not_found(name))?;

        instance.replace_properties(properties);
        debug!(instance = %name, "Updated instance properties");
        self.publish(RegistryEventKind::PropertiesUpdated {
            instance: name.to_owned(),
        });

        let release = self.with_state(|s| binding::revoke(s, &instance));
        self.notify_unbound(&release);
        let outcome = self.binding_pass();
        self.invalidate_unreplaced(&release.demoted);
        outcome
    }

    /// Look up an instance by name.
    #[must_use]
    pub fn get_instance(&self, name: &str) -> Option<InstanceRef> {
        self.with_state(|s| s.instances.get(name).cloned())
    }

    /// Whether a factory with this name is registered.
    #[must_use]
    pub fn has_factory(&self, name: &str) -> bool {
        self.with_state(|s| s.factories.contains_key(name))
    }

    /// Registered factory names, sorted.
    #[must_use]
    pub fn factory_names(&self) -> Vec<String> {
        let mut names = self.with_state(|s| s.factories.keys().cloned().collect::<Vec<_>>());
        names.sort();
        names
    }

    /// Registered instance names, sorted.
    #[must_use]
    pub fn instance_names(&self) -> Vec<String> {
        let mut names = self.with_state(|s| s.instances.keys().cloned().collect::<Vec<_>>());
        names.sort();
        names
    }

    /// Waiting instances, in queue order.
    #[must_use]
    pub fn waiting_instances(&self) -> Vec<InstanceRef> {
        self.with_state(|s| s.waiting.clone())
    }

    /// Running instances, in validation order.
    #[must_use]
    pub fn running_instances(&self) -> Vec<InstanceRef> {
        self.with_state(|s| s.running.clone())
    }

    /// Running instances providing `capability` whose properties match
    /// `filter`, in validation order.
    #[must_use]
    pub fn find_providers(&self, capability: &str, filter: Option<&Filter>) -> Vec<InstanceRef> {
        self.with_state(|s| {
            s.running
                .iter()
                .filter(|i| {
                    i.provides(capability) && i.with_properties(|p| filter_matches(filter, p))
                })
                .cloned()
                .collect()
        })
    }

    /// The first provider [`find_providers`](Self::find_providers) would return.
    #[must_use]
    pub fn find_provider(&self, capability: &str, filter: Option<&Filter>) -> Option<InstanceRef> {
        self.find_providers(capability, filter).into_iter().next()
    }

    /// Capture factories and instances, sorted by name.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let (factories, instances) = self.with_state(|s| {
            let factories: Vec<(String, Arc<Factory>)> = s
                .factories
                .iter()
                .map(|(name, factory)| (name.clone(), Arc::clone(factory)))
                .collect();
            let instances: Vec<InstanceRef> = s.instances.values().cloned().collect();
            (factories, instances)
        });

        let mut snapshot = RegistrySnapshot {
            factories: factories
                .iter()
                .map(|(name, factory)| FactorySnapshot::capture(name, factory))
                .collect(),
            instances: instances
                .iter()
                .map(|instance| InstanceSnapshot::capture(instance))
                .collect(),
        };
        snapshot.factories.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot.instances.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut RegistryState) -> R) -> R {
        let guard = self.inner.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    fn publish(&self, kind: RegistryEventKind) {
        self.inner.events.publish(kind);
    }

    /// Run user code, turning panics into errors unless disabled.
    fn guarded<T>(&self, f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
        if !self.inner.settings.catch_callback_panics {
            return f();
        }
        panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(anyhow!("panicked: {}", panic_message(&*payload))))
    }

    fn run_callback(
        &self,
        instance: &Instance,
        kind: CallbackKind,
        f: impl FnOnce(&dyn Component) -> anyhow::Result<()>,
    ) -> Result<(), CallbackFailure> {
        let component = instance.component_ref();
        self.guarded(|| f(component)).map_err(|error| {
            let failure = CallbackFailure {
                instance: instance.name().to_owned(),
                kind,
                message: format!("{error:#}"),
            };
            warn!(
                instance = %failure.instance,
                callback = %kind,
                error = %failure.message,
                "Lifecycle callback failed"
            );
            if kind != CallbackKind::Validate {
                self.publish(RegistryEventKind::CallbackFailed {
                    instance: failure.instance.clone(),
                    callback: kind,
                    message: failure.message.clone(),
                });
            }
            failure
        })
    }

    /// Bind and validate until nothing changes.
    ///
    /// Each iteration lets running consumers pick up new providers, binds
    /// waiting instances, then validates those whose mandatory slots are all
    /// bound. An instance whose validation failed is not retried within the
    /// same pass.
    ///
    /// Every productive iteration validates at least one instance seen
    /// waiting during the pass, so a pass may run one iteration per such
    /// instance. `max_binding_iterations` only bounds iterations beyond
    /// that, which happen when callbacks keep sending instances back to
    /// waiting.
    fn binding_pass(&self) -> RegistryResult<()> {
        let churn_allowance = self.inner.settings.max_binding_iterations.max(1);
        let mut failed: Vec<InstanceRef> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut iteration: usize = 0;

        loop {
            iteration = iteration.saturating_add(1);
            let running = self.with_state(|s| s.running.clone());
            for consumer in &running {
                self.bind_available(consumer);
            }

            let waiting = self.with_state(|s| s.waiting.clone());
            seen.extend(waiting.iter().map(|i| i.name().to_owned()));
            let mut eligible = Vec::new();
            for consumer in &waiting {
                if !matches!(
                    consumer.state(),
                    InstanceState::Waiting | InstanceState::Validating
                ) {
                    continue;
                }
                self.bind_available(consumer);
                if consumer.state() == InstanceState::Waiting
                    && consumer.is_satisfied()
                    && !failed.iter().any(|f| Arc::ptr_eq(f, consumer))
                {
                    eligible.push(Arc::clone(consumer));
                }
            }

            let mut progressed = false;
            for consumer in eligible {
                if self.validate(&consumer) {
                    progressed = true;
                } else {
                    failed.push(consumer);
                }
            }

            if !progressed {
                trace!(iterations = iteration, "Binding pass settled");
                return Ok(());
            }
            if iteration >= seen.len().saturating_add(churn_allowance) {
                break;
            }
        }

        let pending = self.with_state(|s| s.waiting_names());
        error!(
            iterations = iteration,
            pending = ?pending,
            "Binding pass did not settle"
        );
        Err(RegistryError::CyclicDependency {
            iterations: iteration,
            pending,
        })
    }

    /// Bind every available provider into the slots of `consumer`.
    fn bind_available(&self, consumer: &InstanceRef) {
        for (slot, requirement) in consumer.requirements() {
            let candidates = self.with_state(|s| {
                if s.contains(consumer) {
                    binding::candidates(consumer, slot, requirement, &s.running)
                } else {
                    Vec::new()
                }
            });

            for provider in candidates {
                // An earlier callback may have removed either side.
                let live = self.with_state(|s| s.contains(consumer) && s.is_running(&provider));
                if !live {
                    continue;
                }
                let bound = consumer
                    .with_slots(|slots| slots.bind(slot, &provider, requirement.cardinality()));
                if !bound {
                    continue;
                }

                debug!(
                    instance = %consumer.name(),
                    slot = %slot,
                    provider = %provider.name(),
                    "Bound dependency"
                );
                self.publish(RegistryEventKind::InstanceBound {
                    instance: consumer.name().to_owned(),
                    slot: slot.clone(),
                    provider: provider.name().to_owned(),
                });
                let _ = self.run_callback(consumer, CallbackKind::Bind, |c| {
                    c.on_bind(consumer, slot, &provider)
                });
            }
        }
    }

    /// Validate a waiting instance. Returns `true` if it is now running.
    fn validate(&self, consumer: &InstanceRef) -> bool {
        if consumer.state() != InstanceState::Waiting || !self.with_state(|s| s.is_waiting(consumer)) {
            return false;
        }

        consumer.set_state(InstanceState::Validating);
        let outcome = self.run_callback(consumer, CallbackKind::Validate, |c| c.on_validate(consumer));

        // The callback may have removed the instance.
        if !self.with_state(|s| s.is_waiting(consumer)) {
            return false;
        }

        match outcome {
            Ok(()) if consumer.is_satisfied() => {
                self.with_state(|s| s.promote(consumer));
                consumer.set_state(InstanceState::Running);
                info!(instance = %consumer.name(), "Instance validated");
                self.publish(RegistryEventKind::InstanceValidated {
                    instance: consumer.name().to_owned(),
                });
                true
            },
            Ok(()) => {
                debug!(instance = %consumer.name(), "Dependency lost during validation");
                consumer.set_state(InstanceState::Waiting);
                self.invalidate(consumer);
                false
            },
            Err(failure) => {
                consumer.set_state(InstanceState::Waiting);
                self.publish(RegistryEventKind::ValidationFailed {
                    instance: failure.instance,
                    message: failure.message,
                });
                false
            },
        }
    }

    fn invalidate(&self, instance: &InstanceRef) {
        let _ = self.run_callback(instance, CallbackKind::Invalidate, |c| c.on_invalidate(instance));
        debug!(instance = %instance.name(), "Instance invalidated");
        self.publish(RegistryEventKind::InstanceInvalidated {
            instance: instance.name().to_owned(),
        });
    }

    /// The removal cascade.
    ///
    /// Victims leave every index first. Their consumers are unbound (running
    /// ones left unsatisfied are demoted), a binding pass looks for
    /// replacements, demoted consumers still waiting are invalidated and
    /// cleared, and finally the victims are invalidated and destroyed.
    fn remove_instances(&self, victims: Vec<InstanceRef>) -> RegistryResult<()> {
        let victims: Vec<InstanceRef> =
            self.with_state(|s| victims.into_iter().filter(|v| s.detach(v)).collect());
        if victims.is_empty() {
            return Ok(());
        }
        for victim in &victims {
            victim.set_state(InstanceState::Invalidating);
        }

        let release = self.with_state(|s| binding::release(s, victims.clone()));
        self.notify_unbound(&release);
        let outcome = self.binding_pass();
        self.invalidate_unreplaced(&release.demoted);

        for victim in &victims {
            self.invalidate(victim);
            victim.with_slots(DependencySlots::clear);
            victim.set_state(InstanceState::Destroyed);
            info!(instance = %victim.name(), factory = %victim.factory_name(), "Destroyed instance");
            self.publish(RegistryEventKind::InstanceDestroyed {
                instance: victim.name().to_owned(),
            });
        }

        outcome
    }

    /// Publish and deliver the unbindings of a release.
    fn notify_unbound(&self, release: &Release) {
        for dependent in &release.demoted {
            info!(instance = %dependent.name(), "Instance lost a mandatory dependency, back to waiting");
        }
        for unbinding in &release.unbindings {
            if !self.with_state(|s| s.contains(&unbinding.consumer)) {
                continue;
            }
            debug!(
                instance = %unbinding.consumer.name(),
                slot = %unbinding.slot,
                provider = %unbinding.provider.name(),
                "Unbound dependency"
            );
            self.publish(RegistryEventKind::InstanceUnbound {
                instance: unbinding.consumer.name().to_owned(),
                slot: unbinding.slot.clone(),
                provider: unbinding.provider.name().to_owned(),
            });
            let _ = self.run_callback(&unbinding.consumer, CallbackKind::Unbind, |c| {
                c.on_unbind(&unbinding.consumer, &unbinding.slot, &unbinding.provider)
            });
        }
    }

    /// Invalidate demoted dependents the binding pass could not rebind.
    fn invalidate_unreplaced(&self, demoted: &[InstanceRef]) {
        for dependent in demoted {
            let still_waiting = dependent.state() == InstanceState::Waiting
                && self.with_state(|s| s.is_waiting(dependent));
            if !still_waiting {
                continue;
            }
            warn!(instance = %dependent.name(), "No replacement provider, invalidating dependent");
            self.invalidate(dependent);
            dependent.with_slots(DependencySlots::clear);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (factories, waiting, running) =
            self.with_state(|s| (s.factories.len(), s.waiting.len(), s.running.len()));
        f.debug_struct("Registry")
            .field("factories", &factories)
            .field("waiting", &waiting)
            .field("running", &running)
            .field("settings", &self.inner.settings)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Passive;
    use crate::requirement::Requirement;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Appends every callback to a shared journal.
    struct Journal {
        log: Arc<Mutex<Vec<String>>>,
        fail_validation: bool,
    }

    impl Component for Journal {
        fn on_validate(&self, instance: &Instance) -> anyhow::Result<()> {
            self.log.lock().push(format!("validate {}", instance.name()));
            if self.fail_validation {
                anyhow::bail!("refusing to start");
            }
            Ok(())
        }

        fn on_invalidate(&self, instance: &Instance) -> anyhow::Result<()> {
            self.log.lock().push(format!("invalidate {}", instance.name()));
            Ok(())
        }

        fn on_bind(&self, instance: &Instance, slot: &str, dependency: &InstanceRef) -> anyhow::Result<()> {
            self.log
                .lock()
                .push(format!("bind {} {slot} {}", instance.name(), dependency.name()));
            Ok(())
        }

        fn on_unbind(&self, instance: &Instance, slot: &str, dependency: &InstanceRef) -> anyhow::Result<()> {
            self.log
                .lock()
                .push(format!("unbind {} {slot} {}", instance.name(), dependency.name()));
            Ok(())
        }
    }

    fn journal_factory(log: &Arc<Mutex<Vec<String>>>) -> Factory {
        let log = Arc::clone(log);
        Factory::new(move |_| {
            Ok(Journal {
                log: Arc::clone(&log),
                fail_validation: false,
            })
        })
    }

    fn props(value: serde_json::Value) -> Properties {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    fn names(instances: &[InstanceRef]) -> Vec<&str> {
        instances.iter().map(|i| i.name()).collect()
    }

    #[test]
    fn test_instantiate_without_requirements_runs() {
        let registry = Registry::new();
        registry
            .register_factory("F", Factory::new(|_| Ok(Passive)).provides("svc"))
            .unwrap();

        let instance = registry.instantiate("F", "i1", Properties::new()).unwrap();
        assert_eq!(instance.state(), InstanceState::Running);
        assert_eq!(names(&registry.running_instances()), ["i1"]);
        assert!(registry.waiting_instances().is_empty());
    }

    #[test]
    fn test_reserved_properties_override_user_values() {
        let registry = Registry::new();
        registry
            .register_factory("F", Factory::new(|_| Ok(Passive)).provides("svc"))
            .unwrap();

        let instance = registry
            .instantiate("F", "i1", props(json!({"instance.name": "spoofed", "color": "red"})))
            .unwrap();
        assert_eq!(instance.property("instance.name"), Some(json!("i1")));
        assert_eq!(instance.property("instance.factory"), Some(json!("F")));
        assert_eq!(instance.property("instance.capabilities"), Some(json!(["svc"])));
        assert_eq!(instance.property("color"), Some(json!("red")));
    }

    #[test]
    fn test_instantiate_argument_errors() {
        let registry = Registry::new();
        registry
            .register_factory("F", Factory::new(|_| Ok(Passive)))
            .unwrap();

        assert!(registry
            .instantiate("", "x", Properties::new())
            .unwrap_err()
            .is_invalid_argument());
        assert!(registry
            .instantiate("F", "", Properties::new())
            .unwrap_err()
            .is_invalid_argument());
        assert!(registry
            .instantiate("missing", "x", Properties::new())
            .unwrap_err()
            .is_not_found());

        registry.instantiate("F", "x", Properties::new()).unwrap();
        assert!(matches!(
            registry.instantiate("F", "x", Properties::new()),
            Err(RegistryError::AlreadyExists(name)) if name == "x"
        ));
    }

    #[test]
    fn test_register_factory_rejects_empty_name() {
        let registry = Registry::new();
        let err = registry
            .register_factory("", Factory::new(|_| Ok(Passive)))
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(registry.factory_names().is_empty());
    }

    #[test]
    fn test_producer_failure_and_panic() {
        let registry = Registry::new();
        registry
            .register_factory(
                "broken",
                Factory::new(|_| -> anyhow::Result<Passive> { anyhow::bail!("no config") }),
            )
            .unwrap();
        registry
            .register_factory(
                "panicky",
                Factory::new(|_| -> anyhow::Result<Passive> { panic!("boom") }),
            )
            .unwrap();

        let err = registry.instantiate("broken", "a", Properties::new()).unwrap_err();
        assert!(matches!(err, RegistryError::InstantiationFailed { ref reason, .. } if reason == "no config"));

        let err = registry.instantiate("panicky", "b", Properties::new()).unwrap_err();
        assert!(matches!(err, RegistryError::InstantiationFailed { ref reason, .. } if reason.contains("boom")));
        assert!(registry.instance_names().is_empty());
    }

    #[test]
    fn test_single_requirement_takes_first_running_provider() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::new();
        registry
            .register_factory("provider", Factory::new(|_| Ok(Passive)).provides("svc"))
            .unwrap();
        registry
            .register_factory(
                "consumer",
                journal_factory(&log).requires("svc", Requirement::new("svc")),
            )
            .unwrap();

        registry.instantiate("provider", "p1", Properties::new()).unwrap();
        registry.instantiate("provider", "p2", Properties::new()).unwrap();
        let consumer = registry.instantiate("consumer", "c", Properties::new()).unwrap();

        assert_eq!(consumer.state(), InstanceState::Running);
        assert_eq!(consumer.dependency("svc").unwrap().name(), "p1");
        assert_eq!(consumer.depends_on(), ["p1"]);
        assert_eq!(*log.lock(), ["bind c svc p1", "validate c"]);
    }

    #[test]
    fn test_filter_restricts_candidates() {
        let registry = Registry::new();
        registry
            .register_factory("db", Factory::new(|_| Ok(Passive)).provides("db"))
            .unwrap();
        let filter = Filter::parse("(engine=postgres)").unwrap().unwrap();
        registry
            .register_factory(
                "app",
                Factory::new(|_| Ok(Passive))
                    .requires("db", Requirement::new("db").aggregate().with_filter(filter)),
            )
            .unwrap();

        registry.instantiate("db", "mysql", props(json!({"engine": "mysql"}))).unwrap();
        registry.instantiate("db", "pg", props(json!({"engine": "postgres"}))).unwrap();
        let app = registry.instantiate("app", "app", Properties::new()).unwrap();

        assert_eq!(names(&app.dependencies("db")), ["pg"]);
    }

    #[test]
    fn test_optional_requirement_does_not_block() {
        let registry = Registry::new();
        registry
            .register_factory(
                "app",
                Factory::new(|_| Ok(Passive)).requires("cache", Requirement::new("cache").optional()),
            )
            .unwrap();
        registry
            .register_factory("cache", Factory::new(|_| Ok(Passive)).provides("cache"))
            .unwrap();

        let app = registry.instantiate("app", "app", Properties::new()).unwrap();
        assert!(app.is_running());
        assert!(app.dependency("cache").is_none());

        // Running consumers pick up late providers.
        registry.instantiate("cache", "redis", Properties::new()).unwrap();
        assert_eq!(app.dependency("cache").unwrap().name(), "redis");
    }

    #[test]
    fn test_validation_failure_keeps_waiting_until_next_mutation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let attempts = Arc::new(Mutex::new(0_u32));
        let registry = Registry::new();
        let factory_log = Arc::clone(&log);
        let factory_attempts = Arc::clone(&attempts);
        registry
            .register_factory(
                "flaky",
                Factory::new(move |_| {
                    let mut attempts = factory_attempts.lock();
                    *attempts = attempts.saturating_add(1);
                    Ok(Journal {
                        log: Arc::clone(&factory_log),
                        fail_validation: true,
                    })
                }),
            )
            .unwrap();
        registry
            .register_factory("other", Factory::new(|_| Ok(Passive)))
            .unwrap();

        let mut events = registry.subscribe();
        let flaky = registry.instantiate("flaky", "f", Properties::new()).unwrap();
        assert_eq!(flaky.state(), InstanceState::Waiting);
        assert_eq!(*log.lock(), ["validate f"]);

        // Another mutation retries validation exactly once more.
        registry.instantiate("other", "o", Properties::new()).unwrap();
        assert_eq!(*log.lock(), ["validate f", "validate f"]);
        assert_eq!(*attempts.lock(), 1);

        let kinds: Vec<&'static str> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.event_type())
            .collect();
        assert_eq!(kinds.iter().filter(|k| **k == "validation_failed").count(), 2);
    }

    #[test]
    fn test_remove_instance_not_found() {
        let registry = Registry::new();
        assert!(registry.remove_instance("ghost").unwrap_err().is_not_found());
    }

    #[test]
    fn test_unregister_unknown_factory_is_noop() {
        let registry = Registry::new();
        assert!(registry.unregister_factory("ghost").is_ok());
    }

    #[test]
    fn test_chain_longer_than_iteration_cap_settles() {
        let registry = Registry::with_settings(RegistrySettings {
            max_binding_iterations: 2,
            ..RegistrySettings::default()
        });
        registry
            .register_factory("root", Factory::new(|_| Ok(Passive)).provides("c0"))
            .unwrap();
        for link in 1..=20_usize {
            registry
                .register_factory(
                    format!("f{link}"),
                    Factory::new(|_| Ok(Passive))
                        .provides(format!("c{link}"))
                        .requires("up", Requirement::new(format!("c{}", link.saturating_sub(1)))),
                )
                .unwrap();
        }

        // Instantiate from the far end so each link waits on the previous one.
        for link in (1..=20_usize).rev() {
            registry
                .instantiate(&format!("f{link}"), &format!("i{link}"), Properties::new())
                .unwrap();
        }
        assert_eq!(registry.waiting_instances().len(), 20);

        registry.instantiate("root", "root", Properties::new()).unwrap();
        assert!(registry.waiting_instances().is_empty());
        assert_eq!(registry.running_instances().len(), 21);
        assert_eq!(registry.get_instance("i20").unwrap().depends_on(), ["i19"]);
    }

    #[test]
    fn test_mutual_requirements_stay_waiting() {
        let registry = Registry::with_settings(RegistrySettings {
            max_binding_iterations: 1,
            ..RegistrySettings::default()
        });
        registry
            .register_factory(
                "ping",
                Factory::new(|_| Ok(Passive))
                    .provides("ping")
                    .requires("peer", Requirement::new("pong")),
            )
            .unwrap();
        registry
            .register_factory(
                "pong",
                Factory::new(|_| Ok(Passive))
                    .provides("pong")
                    .requires("peer", Requirement::new("ping")),
            )
            .unwrap();

        registry.instantiate("ping", "a", Properties::new()).unwrap();
        registry.instantiate("pong", "b", Properties::new()).unwrap();

        assert_eq!(names(&registry.waiting_instances()), ["a", "b"]);
        assert!(registry.running_instances().is_empty());
    }

    #[test]
    fn test_update_properties_reasserts_reserved_keys() {
        let registry = Registry::new();
        registry
            .register_factory("F", Factory::new(|_| Ok(Passive)).provides("svc"))
            .unwrap();
        let instance = registry
            .instantiate("F", "i1", props(json!({"color": "red"})))
            .unwrap();

        let mut events = registry.subscribe();
        registry
            .update_properties("i1", props(json!({"instance.name": "spoofed", "size": 3})))
            .unwrap();

        assert_eq!(instance.property("instance.name"), Some(json!("i1")));
        assert_eq!(instance.property("instance.factory"), Some(json!("F")));
        assert_eq!(instance.property("size"), Some(json!(3)));
        assert_eq!(instance.property("color"), None);
        assert!(instance.is_running());
        assert_eq!(events.try_recv().unwrap().event_type(), "properties_updated");

        assert!(registry
            .update_properties("ghost", Properties::new())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_update_properties_rebinds_filtered_consumers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::new();
        registry
            .register_factory("db", Factory::new(|_| Ok(Passive)).provides("db"))
            .unwrap();
        let filter = Filter::parse("(engine=postgres)").unwrap().unwrap();
        registry
            .register_factory(
                "app",
                journal_factory(&log).requires("db", Requirement::new("db").with_filter(filter)),
            )
            .unwrap();

        registry.instantiate("db", "store", props(json!({"engine": "mysql"}))).unwrap();
        let app = registry.instantiate("app", "app", Properties::new()).unwrap();
        assert_eq!(app.state(), InstanceState::Waiting);

        // The provider starts matching: the consumer binds and runs.
        registry
            .update_properties("store", props(json!({"engine": "postgres"})))
            .unwrap();
        assert!(app.is_running());
        assert_eq!(app.dependency("db").unwrap().name(), "store");

        // It stops matching: the consumer is unbound and sent back to waiting.
        registry
            .update_properties("store", props(json!({"engine": "sqlite"})))
            .unwrap();
        assert_eq!(app.state(), InstanceState::Waiting);
        assert!(app.dependency("db").is_none());
        assert_eq!(
            *log.lock(),
            [
                "bind app db store",
                "validate app",
                "unbind app db store",
                "invalidate app",
            ]
        );
    }

    #[test]
    fn test_update_properties_keeps_unfiltered_bindings() {
        let registry = Registry::new();
        registry
            .register_factory("db", Factory::new(|_| Ok(Passive)).provides("db"))
            .unwrap();
        registry
            .register_factory(
                "app",
                Factory::new(|_| Ok(Passive)).requires("db", Requirement::new("db")),
            )
            .unwrap();
        registry.instantiate("db", "store", Properties::new()).unwrap();
        let app = registry.instantiate("app", "app", Properties::new()).unwrap();

        registry
            .update_properties("store", props(json!({"engine": "sqlite"})))
            .unwrap();
        assert!(app.is_running());
        assert_eq!(app.dependency("db").unwrap().name(), "store");
    }

    #[test]
    fn test_snapshot_sorted_and_serializable() {
        let registry = Registry::new();
        registry
            .register_factory("zeta", Factory::new(|_| Ok(Passive)).provides("svc"))
            .unwrap();
        registry
            .register_factory(
                "alpha",
                Factory::new(|_| Ok(Passive)).requires("svc", Requirement::new("svc")),
            )
            .unwrap();
        registry.instantiate("alpha", "waiter", Properties::new()).unwrap();
        registry.instantiate("zeta", "provider", Properties::new()).unwrap();

        let snapshot = registry.snapshot();
        let factory_names: Vec<&str> = snapshot.factories.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(factory_names, ["alpha", "zeta"]);
        let waiter = snapshot.instance("waiter").unwrap();
        assert_eq!(waiter.state, InstanceState::Running);
        assert_eq!(waiter.bindings["svc"], ["provider"]);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_component_downcast() {
        struct Port(u16);
        impl Component for Port {}

        let registry = Registry::new();
        registry
            .register_factory("port", Factory::new(|_| Ok(Port(8080))))
            .unwrap();
        let instance = registry.instantiate("port", "http", Properties::new()).unwrap();

        assert_eq!(instance.component::<Port>().map(|p| p.0), Some(8080));
        assert!(instance.component::<Passive>().is_none());
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
        assert_send_sync::<InstanceRef>();
    }
}
