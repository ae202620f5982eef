//! Typed dependency slots filled by the binding pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::instance::InstanceRef;
use crate::requirement::Cardinality;

/// The providers bound into one slot.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A single-cardinality slot.
    Single(InstanceRef),
    /// An aggregate slot, in binding order.
    Aggregate(Vec<InstanceRef>),
}

impl Binding {
    /// Every bound provider.
    #[must_use]
    pub fn providers(&self) -> &[InstanceRef] {
        match self {
            Self::Single(provider) => std::slice::from_ref(provider),
            Self::Aggregate(providers) => providers,
        }
    }

    /// Whether `provider` is bound here.
    #[must_use]
    pub fn contains(&self, provider: &InstanceRef) -> bool {
        self.providers().iter().any(|p| Arc::ptr_eq(p, provider))
    }
}

/// Slot name to bound providers, for one instance.
///
/// Slots without any provider are absent.
#[derive(Debug, Clone, Default)]
pub struct DependencySlots {
    bindings: BTreeMap<String, Binding>,
}

impl DependencySlots {
    /// The binding of `slot`.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&Binding> {
        self.bindings.get(slot)
    }

    /// The first provider bound into `slot`.
    #[must_use]
    pub fn first(&self, slot: &str) -> Option<&InstanceRef> {
        self.get(slot).and_then(|binding| binding.providers().first())
    }

    /// Every provider bound into `slot`.
    #[must_use]
    pub fn providers(&self, slot: &str) -> &[InstanceRef] {
        self.get(slot).map_or(&[], Binding::providers)
    }

    /// Whether `slot` holds at least one provider.
    #[must_use]
    pub fn is_bound(&self, slot: &str) -> bool {
        self.bindings.contains_key(slot)
    }

    /// Iterate over bound slots in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(slot, binding)| (slot.as_str(), binding))
    }

    /// Number of bound slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bind `provider` into `slot`. Returns `false` if it was already there.
    pub(crate) fn bind(
        &mut self,
        slot: &str,
        provider: &InstanceRef,
        cardinality: Cardinality,
    ) -> bool {
        if let Some(binding) = self.bindings.get_mut(slot) {
            if binding.contains(provider) {
                return false;
            }
            if let (Binding::Aggregate(providers), Cardinality::Aggregate) = (binding, cardinality) {
                providers.push(Arc::clone(provider));
                return true;
            }
        }

        let binding = match cardinality {
            Cardinality::Single => Binding::Single(Arc::clone(provider)),
            Cardinality::Aggregate => Binding::Aggregate(vec![Arc::clone(provider)]),
        };
        self.bindings.insert(slot.to_owned(), binding);
        true
    }

    /// Remove `provider` from every slot, returning the slots it left.
    pub(crate) fn remove_provider(&mut self, provider: &InstanceRef) -> Vec<String> {
        self.remove_provider_where(provider, |_| true)
    }

    /// Remove `provider` from the slots selected by `select`, returning the
    /// slots it left.
    pub(crate) fn remove_provider_where(
        &mut self,
        provider: &InstanceRef,
        mut select: impl FnMut(&str) -> bool,
    ) -> Vec<String> {
        let mut released = Vec::new();
        self.bindings.retain(|slot, binding| {
            if !binding.contains(provider) || !select(slot) {
                return true;
            }
            released.push(slot.clone());
            match binding {
                Binding::Single(_) => false,
                Binding::Aggregate(providers) => {
                    providers.retain(|p| !Arc::ptr_eq(p, provider));
                    !providers.is_empty()
                },
            }
        });
        released
    }

    /// Drop every binding.
    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }
}
