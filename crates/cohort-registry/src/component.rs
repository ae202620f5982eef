//! The lifecycle contract implemented by managed components.

use std::any::Any;

use crate::instance::{Instance, InstanceRef};

/// A component managed by the registry.
///
/// Every callback receives the [`Instance`] wrapping the component, so it can
/// read its properties and dependency slots. All callbacks default to no-ops.
///
/// Callbacks are best effort: an `Err` (or a panic, unless disabled in
/// [`RegistrySettings`](crate::RegistrySettings)) is logged and published as
/// an event but never aborts the registry operation that triggered it. A
/// failing [`on_validate`](Self::on_validate) leaves the instance waiting so
/// the next registry mutation retries it.
///
/// Callbacks may call back into the registry from the same thread. A
/// component holding a [`Registry`](crate::Registry) clone keeps the registry
/// alive for as long as the component exists.
pub trait Component: Any + Send + Sync {
    /// Called once every mandatory requirement is bound, before the
    /// instance starts running.
    ///
    /// # Errors
    ///
    /// An error keeps the instance waiting.
    fn on_validate(&self, instance: &Instance) -> anyhow::Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Called when the instance stops running, or is removed.
    ///
    /// # Errors
    ///
    /// Errors are logged and otherwise ignored.
    fn on_invalidate(&self, instance: &Instance) -> anyhow::Result<()> {
        let _ = instance;
        Ok(())
    }

    /// Called after `dependency` was bound into `slot`.
    ///
    /// # Errors
    ///
    /// Errors are logged and otherwise ignored.
    fn on_bind(&self, instance: &Instance, slot: &str, dependency: &InstanceRef) -> anyhow::Result<()> {
        let _ = (instance, slot, dependency);
        Ok(())
    }

    /// Called after `dependency` was removed from `slot`.
    ///
    /// # Errors
    ///
    /// Errors are logged and otherwise ignored.
    fn on_unbind(
        &self,
        instance: &Instance,
        slot: &str,
        dependency: &InstanceRef,
    ) -> anyhow::Result<()> {
        let _ = (instance, slot, dependency);
        Ok(())
    }
}

/// A component without behavior, for capability-only providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passive;

impl Component for Passive {}
