//! Prelude module - commonly used test helpers.

pub use crate::fixtures::{
    consumer_factory, failing_factory, props, provider_factory, recording_factory,
};
pub use crate::harness::{setup_test_logging, setup_test_logging_default, test_dir};
pub use crate::mocks::{CallbackLog, CallbackRecord, RecordingComponent};
