//! Provider selection and release, the pure halves of the binding pass.
//!
//! Nothing here runs component callbacks: the registry applies the returned
//! plans and fires callbacks once the state borrow is released.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::instance::{InstanceRef, InstanceState};
use crate::requirement::{Cardinality, Requirement};
use crate::state::RegistryState;

/// Running providers that should be bound into `slot` of `consumer`.
///
/// A bound single slot needs nothing. An unbound single slot takes the first
/// accepted provider in running order. An aggregate slot takes every accepted
/// provider not bound yet.
pub(crate) fn candidates(
    consumer: &InstanceRef,
    slot: &str,
    requirement: &Requirement,
    running: &[InstanceRef],
) -> Vec<InstanceRef> {
    let slots = consumer.slots();
    let binding = slots.get(slot);
    let mut accepted = running
        .iter()
        .filter(|provider| !Arc::ptr_eq(*provider, consumer) && requirement.accepts(provider));

    match requirement.cardinality() {
        Cardinality::Single if binding.is_some() => Vec::new(),
        Cardinality::Single => accepted.next().cloned().into_iter().collect(),
        Cardinality::Aggregate => accepted
            .filter(|provider| !binding.is_some_and(|b| b.contains(provider)))
            .cloned()
            .collect(),
    }
}

/// A provider dropped from a consumer slot.
#[derive(Debug)]
pub(crate) struct Unbinding {
    pub(crate) consumer: InstanceRef,
    pub(crate) slot: String,
    pub(crate) provider: InstanceRef,
}

/// Outcome of releasing providers from their consumers.
#[derive(Debug, Default)]
pub(crate) struct Release {
    /// Slot removals, in discovery order.
    pub(crate) unbindings: Vec<Unbinding>,
    /// Running consumers moved back to waiting.
    pub(crate) demoted: Vec<InstanceRef>,
}

/// Drop `lost` providers from every registered consumer.
///
/// A running consumer left with an unbound mandatory slot is demoted to
/// waiting, and is itself released from its own consumers.
pub(crate) fn release(state: &mut RegistryState, lost: Vec<InstanceRef>) -> Release {
    let mut release = Release::default();
    cascade(state, lost.into(), &mut release);
    release
}

/// Drop `provider` from the slots whose requirement no longer accepts it.
///
/// Used after a property change: only filtered slots can turn stale.
/// Consumers demoted as a result are released like in [`release`].
pub(crate) fn revoke(state: &mut RegistryState, provider: &InstanceRef) -> Release {
    let mut release = Release::default();
    let mut queue = VecDeque::new();

    for consumer in registered(state) {
        let requirements = consumer.requirements();
        let slots = consumer.with_slots(|slots| {
            slots.remove_provider_where(provider, |slot| {
                requirements
                    .iter()
                    .find(|(name, _)| name == slot)
                    .is_some_and(|(_, requirement)| !requirement.accepts(provider))
            })
        });
        record(state, &consumer, provider, slots, &mut release, &mut queue);
    }

    cascade(state, queue, &mut release);
    release
}

fn cascade(state: &mut RegistryState, mut queue: VecDeque<InstanceRef>, release: &mut Release) {
    while let Some(provider) = queue.pop_front() {
        for consumer in registered(state) {
            let slots = consumer.with_slots(|slots| slots.remove_provider(&provider));
            record(state, &consumer, &provider, slots, release, &mut queue);
        }
    }
}

fn registered(state: &RegistryState) -> Vec<InstanceRef> {
    state
        .running
        .iter()
        .chain(state.waiting.iter())
        .cloned()
        .collect()
}

/// Note the slots `consumer` lost and demote it if it is now unsatisfied.
fn record(
    state: &mut RegistryState,
    consumer: &InstanceRef,
    provider: &InstanceRef,
    slots: Vec<String>,
    release: &mut Release,
    queue: &mut VecDeque<InstanceRef>,
) {
    if slots.is_empty() {
        return;
    }
    release
        .unbindings
        .extend(slots.into_iter().map(|slot| Unbinding {
            consumer: Arc::clone(consumer),
            slot,
            provider: Arc::clone(provider),
        }));

    if consumer.state() == InstanceState::Running
        && !consumer.is_satisfied()
        && state.demote(consumer)
    {
        consumer.set_state(InstanceState::Waiting);
        release.demoted.push(Arc::clone(consumer));
        queue.push_back(Arc::clone(consumer));
    }
}
