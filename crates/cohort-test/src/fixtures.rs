//! Factory and property fixtures.

use cohort_registry::{Factory, Properties, Requirement};
use serde_json::Value;

use crate::mocks::{CallbackLog, RecordingComponent};

/// Build a property set from a JSON object literal.
///
/// Anything but an object yields an empty set.
#[must_use]
pub fn props(value: Value) -> Properties {
    match value {
        Value::Object(map) => map,
        _ => Properties::new(),
    }
}

/// A factory producing [`RecordingComponent`]s writing to `log`.
#[must_use]
pub fn recording_factory(log: &CallbackLog) -> Factory {
    let log = log.clone();
    Factory::new(move |_| Ok(RecordingComponent::new(log.clone())))
}

/// A recording factory providing `capability`, with no requirements.
#[must_use]
pub fn provider_factory(log: &CallbackLog, capability: &str) -> Factory {
    recording_factory(log).provides(capability)
}

/// A recording factory with one mandatory single slot named after
/// `capability`.
#[must_use]
pub fn consumer_factory(log: &CallbackLog, capability: &str) -> Factory {
    recording_factory(log).requires(capability, Requirement::new(capability))
}

/// A recording factory whose instances refuse validation until
/// [`RecordingComponent::set_fail_validation`] re-enables it.
#[must_use]
pub fn failing_factory(log: &CallbackLog) -> Factory {
    let log = log.clone();
    Factory::new(move |_| Ok(RecordingComponent::failing(log.clone())))
}
