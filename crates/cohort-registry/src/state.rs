//! Registry indices guarded by the registry lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::factory::Factory;
use crate::instance::InstanceRef;

/// Factories, instances and the two lifecycle queues.
///
/// Every registered instance is in exactly one of `waiting` or `running`.
/// Both queues keep insertion order, which decides provider ties.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    pub(crate) factories: HashMap<String, Arc<Factory>>,
    pub(crate) instances: HashMap<String, InstanceRef>,
    pub(crate) waiting: Vec<InstanceRef>,
    pub(crate) running: Vec<InstanceRef>,
}

impl RegistryState {
    /// Whether this exact instance is registered.
    pub(crate) fn contains(&self, instance: &InstanceRef) -> bool {
        self.instances
            .get(instance.name())
            .is_some_and(|registered| Arc::ptr_eq(registered, instance))
    }

    pub(crate) fn is_waiting(&self, instance: &InstanceRef) -> bool {
        self.waiting.iter().any(|i| Arc::ptr_eq(i, instance))
    }

    pub(crate) fn is_running(&self, instance: &InstanceRef) -> bool {
        self.running.iter().any(|i| Arc::ptr_eq(i, instance))
    }

    /// Register a new instance as waiting.
    pub(crate) fn insert(&mut self, instance: &InstanceRef) {
        self.instances
            .insert(instance.name().to_owned(), Arc::clone(instance));
        self.waiting.push(Arc::clone(instance));
    }

    /// Remove an instance from every index. Returns `false` if it was not
    /// registered.
    pub(crate) fn detach(&mut self, instance: &InstanceRef) -> bool {
        if !self.contains(instance) {
            return false;
        }
        self.instances.remove(instance.name());
        self.waiting.retain(|i| !Arc::ptr_eq(i, instance));
        self.running.retain(|i| !Arc::ptr_eq(i, instance));
        true
    }

    /// Move a waiting instance to the end of the running queue.
    pub(crate) fn promote(&mut self, instance: &InstanceRef) -> bool {
        let Some(position) = self.waiting.iter().position(|i| Arc::ptr_eq(i, instance)) else {
            return false;
        };
        let promoted = self.waiting.remove(position);
        self.running.push(promoted);
        true
    }

    /// Move a running instance back to the end of the waiting queue.
    pub(crate) fn demote(&mut self, instance: &InstanceRef) -> bool {
        let Some(position) = self.running.iter().position(|i| Arc::ptr_eq(i, instance)) else {
            return false;
        };
        let demoted = self.running.remove(position);
        self.waiting.push(demoted);
        true
    }

    /// Names of waiting instances, in queue order.
    pub(crate) fn waiting_names(&self) -> Vec<String> {
        self.waiting.iter().map(|i| i.name().to_owned()).collect()
    }
}
