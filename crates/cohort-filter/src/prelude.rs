//! Prelude module - commonly used types for convenient import.
//!
//! Use `use cohort_filter::prelude::*;` to import all essential types.

// Errors
pub use crate::{FilterError, FilterResult};

// Filter tree
pub use crate::{Comparator, CompoundFilter, Criteria, Filter, Operator, Properties};

// Helpers
pub use crate::{FilterSource, combine, escape, filter_matches, unescape};
