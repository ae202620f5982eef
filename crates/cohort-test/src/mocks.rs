//! Mock components for testing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cohort_registry::{Component, Instance, InstanceRef};

/// One lifecycle callback, as observed by a [`RecordingComponent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackRecord {
    /// `on_validate` was called.
    Validate {
        /// Instance name.
        instance: String,
    },
    /// `on_invalidate` was called.
    Invalidate {
        /// Instance name.
        instance: String,
    },
    /// `on_bind` was called.
    Bind {
        /// Consumer instance name.
        instance: String,
        /// Slot name.
        slot: String,
        /// Provider instance name.
        provider: String,
    },
    /// `on_unbind` was called.
    Unbind {
        /// Consumer instance name.
        instance: String,
        /// Slot name.
        slot: String,
        /// Provider instance name.
        provider: String,
    },
}

impl CallbackRecord {
    /// A validate record.
    #[must_use]
    pub fn validate(instance: &str) -> Self {
        Self::Validate {
            instance: instance.to_string(),
        }
    }

    /// An invalidate record.
    #[must_use]
    pub fn invalidate(instance: &str) -> Self {
        Self::Invalidate {
            instance: instance.to_string(),
        }
    }

    /// A bind record.
    #[must_use]
    pub fn bind(instance: &str, slot: &str, provider: &str) -> Self {
        Self::Bind {
            instance: instance.to_string(),
            slot: slot.to_string(),
            provider: provider.to_string(),
        }
    }

    /// An unbind record.
    #[must_use]
    pub fn unbind(instance: &str, slot: &str, provider: &str) -> Self {
        Self::Unbind {
            instance: instance.to_string(),
            slot: slot.to_string(),
            provider: provider.to_string(),
        }
    }

    /// The instance whose callback ran.
    #[must_use]
    pub fn instance(&self) -> &str {
        match self {
            Self::Validate { instance }
            | Self::Invalidate { instance }
            | Self::Bind { instance, .. }
            | Self::Unbind { instance, .. } => instance,
        }
    }
}

/// Shared, ordered journal of callbacks across components.
#[derive(Debug, Clone, Default)]
pub struct CallbackLog {
    records: Arc<Mutex<Vec<CallbackRecord>>>,
}

impl CallbackLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&self, record: CallbackRecord) {
        if let Ok(mut guard) = self.records.lock() {
            guard.push(record);
        }
    }

    /// All records so far, in call order.
    #[must_use]
    pub fn records(&self) -> Vec<CallbackRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Records of one instance, in call order.
    #[must_use]
    pub fn records_of(&self, instance: &str) -> Vec<CallbackRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.instance() == instance)
            .collect()
    }

    /// How many times `record` was logged.
    #[must_use]
    pub fn count(&self, record: &CallbackRecord) -> usize {
        self.records().iter().filter(|r| *r == record).count()
    }

    /// Whether `record` was logged at least once.
    #[must_use]
    pub fn contains(&self, record: &CallbackRecord) -> bool {
        self.count(record) > 0
    }

    /// Position of the first occurrence of `record`.
    #[must_use]
    pub fn position(&self, record: &CallbackRecord) -> Option<usize> {
        self.records().iter().position(|r| r == record)
    }

    /// Forget every record.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.records.lock() {
            guard.clear();
        }
    }
}

/// A component that journals every callback.
///
/// Validation can be made to fail with [`set_fail_validation`], which lets
/// tests exercise the retry path.
///
/// [`set_fail_validation`]: RecordingComponent::set_fail_validation
#[derive(Debug)]
pub struct RecordingComponent {
    log: CallbackLog,
    fail_validation: AtomicBool,
}

impl RecordingComponent {
    /// Create a component writing to `log`.
    #[must_use]
    pub fn new(log: CallbackLog) -> Self {
        Self {
            log,
            fail_validation: AtomicBool::new(false),
        }
    }

    /// Create a component whose validation fails until re-enabled.
    #[must_use]
    pub fn failing(log: CallbackLog) -> Self {
        let component = Self::new(log);
        component.set_fail_validation(true);
        component
    }

    /// Make subsequent validations fail or succeed.
    pub fn set_fail_validation(&self, fail: bool) {
        self.fail_validation.store(fail, Ordering::SeqCst);
    }

    /// The journal this component writes to.
    #[must_use]
    pub fn log(&self) -> &CallbackLog {
        &self.log
    }
}

impl Component for RecordingComponent {
    fn on_validate(&self, instance: &Instance) -> anyhow::Result<()> {
        self.log.push(CallbackRecord::validate(instance.name()));
        if self.fail_validation.load(Ordering::SeqCst) {
            anyhow::bail!("validation of '{}' refused", instance.name());
        }
        Ok(())
    }

    fn on_invalidate(&self, instance: &Instance) -> anyhow::Result<()> {
        self.log.push(CallbackRecord::invalidate(instance.name()));
        Ok(())
    }

    fn on_bind(&self, instance: &Instance, slot: &str, dependency: &InstanceRef) -> anyhow::Result<()> {
        self.log
            .push(CallbackRecord::bind(instance.name(), slot, dependency.name()));
        Ok(())
    }

    fn on_unbind(&self, instance: &Instance, slot: &str, dependency: &InstanceRef) -> anyhow::Result<()> {
        self.log
            .push(CallbackRecord::unbind(instance.name(), slot, dependency.name()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_shared_between_clones() {
        let log = CallbackLog::new();
        let clone = log.clone();
        clone.push(CallbackRecord::validate("a"));
        log.push(CallbackRecord::bind("a", "db", "pg"));

        assert_eq!(log.records().len(), 2);
        assert_eq!(log.position(&CallbackRecord::bind("a", "db", "pg")), Some(1));
        assert_eq!(log.records_of("a").len(), 2);

        log.clear();
        assert!(clone.records().is_empty());
    }

    #[test]
    fn test_failing_toggle() {
        let component = RecordingComponent::failing(CallbackLog::new());
        assert!(component.fail_validation.load(Ordering::SeqCst));
        component.set_fail_validation(false);
        assert!(!component.fail_validation.load(Ordering::SeqCst));
    }
}
