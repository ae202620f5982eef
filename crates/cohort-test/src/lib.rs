//! Cohort Test - Shared test utilities for the Cohort runtime.
//!
//! This crate provides a recording component, factory fixtures and test
//! harness helpers used across Cohort crates as a dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cohort_registry::Registry;
//! use cohort_test::{CallbackLog, CallbackRecord, consumer_factory, provider_factory};
//!
//! #[test]
//! fn test_binds_provider() {
//!     let log = CallbackLog::new();
//!     let registry = Registry::new();
//!     registry.register_factory("svc", provider_factory(&log, "svc")).unwrap();
//!     registry.register_factory("app", consumer_factory(&log, "svc")).unwrap();
//!
//!     registry.instantiate("svc", "s1", Default::default()).unwrap();
//!     registry.instantiate("app", "a1", Default::default()).unwrap();
//!
//!     assert!(log.contains(&CallbackRecord::bind("a1", "svc", "s1")));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
