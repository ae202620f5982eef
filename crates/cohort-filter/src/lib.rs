//! Cohort Filter - LDAP-style capability filters.
//!
//! This crate provides:
//! - A parser for RFC-4515-style filter strings (`(&(lang=rust)(version>=2))`)
//! - Evaluation of parsed filters against JSON property sets
//! - Normalization, composition and escaping helpers
//!
//! The engine holds no shared state: parsed filters are plain values that
//! can be evaluated from any thread.
//!
//! # Example
//!
//! ```
//! use cohort_filter::{Filter, Properties};
//! use serde_json::json;
//!
//! let filter = Filter::parse("(&(lang=python)(version>=3))").unwrap().unwrap();
//!
//! let mut properties = Properties::new();
//! properties.insert("lang".into(), json!("python"));
//! properties.insert("version".into(), json!(3));
//! assert!(filter.matches(&properties));
//!
//! properties.insert("version".into(), json!(2));
//! assert!(!filter.matches(&properties));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod compare;
mod error;
mod escape;
mod filter;
mod parser;

pub use compare::Comparator;
pub use error::{FilterError, FilterResult};
pub use escape::{ESCAPE_CHARACTER, ESCAPED_CHARACTERS, escape, unescape};
pub use filter::{
    CompoundFilter, Criteria, Filter, FilterSource, Operator, Properties, combine,
    filter_matches,
};
