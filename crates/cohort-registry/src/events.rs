//! Lifecycle events published by the registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::error::CallbackKind;
use crate::settings::MAX_EVENT_CAPACITY;

/// Metadata attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
}

impl EventMetadata {
    /// Fresh metadata stamped now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEventKind {
    /// A factory was registered or replaced.
    FactoryRegistered {
        /// Factory name.
        factory: String,
    },
    /// A factory was removed with its instances.
    FactoryUnregistered {
        /// Factory name.
        factory: String,
    },
    /// An instance was created and queued as waiting.
    InstanceCreated {
        /// Instance name.
        instance: String,
        /// Factory name.
        factory: String,
    },
    /// A provider was bound into a slot.
    InstanceBound {
        /// Consumer instance.
        instance: String,
        /// Slot name.
        slot: String,
        /// Provider instance.
        provider: String,
    },
    /// A provider left a slot.
    InstanceUnbound {
        /// Consumer instance.
        instance: String,
        /// Slot name.
        slot: String,
        /// Provider instance.
        provider: String,
    },
    /// The properties of an instance were replaced.
    PropertiesUpdated {
        /// Instance name.
        instance: String,
    },
    /// An instance passed validation and is running.
    InstanceValidated {
        /// Instance name.
        instance: String,
    },
    /// The validate callback failed; the instance stays waiting.
    ValidationFailed {
        /// Instance name.
        instance: String,
        /// Failure message.
        message: String,
    },
    /// An instance stopped running.
    InstanceInvalidated {
        /// Instance name.
        instance: String,
    },
    /// An instance was removed from the registry.
    InstanceDestroyed {
        /// Instance name.
        instance: String,
    },
    /// A bind, unbind or invalidate callback failed.
    CallbackFailed {
        /// Instance name.
        instance: String,
        /// Which callback failed.
        callback: CallbackKind,
        /// Failure message.
        message: String,
    },
}

/// A registry event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEvent {
    /// Identifier and timestamp.
    pub metadata: EventMetadata,
    /// The event payload.
    #[serde(flatten)]
    pub kind: RegistryEventKind,
}

impl RegistryEvent {
    /// Stamp `kind` with fresh metadata.
    #[must_use]
    pub fn new(kind: RegistryEventKind) -> Self {
        Self {
            metadata: EventMetadata::new(),
            kind,
        }
    }

    /// Short name of the event type.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match &self.kind {
            RegistryEventKind::FactoryRegistered { .. } => "factory_registered",
            RegistryEventKind::FactoryUnregistered { .. } => "factory_unregistered",
            RegistryEventKind::InstanceCreated { .. } => "instance_created",
            RegistryEventKind::InstanceBound { .. } => "instance_bound",
            RegistryEventKind::InstanceUnbound { .. } => "instance_unbound",
            RegistryEventKind::PropertiesUpdated { .. } => "properties_updated",
            RegistryEventKind::InstanceValidated { .. } => "instance_validated",
            RegistryEventKind::ValidationFailed { .. } => "validation_failed",
            RegistryEventKind::InstanceInvalidated { .. } => "instance_invalidated",
            RegistryEventKind::InstanceDestroyed { .. } => "instance_destroyed",
            RegistryEventKind::CallbackFailed { .. } => "callback_failed",
        }
    }
}

/// Receiver half handed out by [`Registry::subscribe`](crate::Registry::subscribe).
pub type EventReceiver = broadcast::Receiver<Arc<RegistryEvent>>;

/// Broadcast channel fanning events out to subscribers.
#[derive(Debug)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<Arc<RegistryEvent>>,
}

impl EventBus {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.clamp(1, MAX_EVENT_CAPACITY));
        Self { sender }
    }

    /// Publish to every subscriber. Returns the number of receivers.
    pub(crate) fn publish(&self, kind: RegistryEventKind) -> usize {
        let event = Arc::new(RegistryEvent::new(kind));
        // No receivers is fine
        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            trace!(event_type = event.event_type(), receivers = count, "Event published");
            count
        } else {
            0
        }
    }

    pub(crate) fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }
}
