//! Requirement declarations: which capability a slot needs, and how many.

use cohort_filter::{Filter, FilterSource};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};
use crate::instance::Instance;

/// How many providers a requirement binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one provider; the first running candidate wins.
    #[default]
    Single,
    /// Every matching running provider.
    Aggregate,
}

/// Whether a requirement blocks validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optionality {
    /// At least one provider must be bound before validation.
    #[default]
    Mandatory,
    /// Bound when available, never blocks validation.
    Optional,
}

/// A declared need for one capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    capability: String,
    cardinality: Cardinality,
    optionality: Optionality,
    filter: Option<Filter>,
}

impl Requirement {
    /// A mandatory, single-provider requirement without filter.
    #[must_use]
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            cardinality: Cardinality::Single,
            optionality: Optionality::Mandatory,
            filter: None,
        }
    }

    /// Build a requirement from its declaration tuple.
    ///
    /// The filter may be given as text or as a parsed tree; a blank string
    /// means no filter.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidFilter`] if the filter text is malformed.
    pub fn from_spec(
        capability: impl Into<String>,
        aggregate: bool,
        optional: bool,
        filter: Option<FilterSource>,
    ) -> RegistryResult<Self> {
        let capability = capability.into();
        let filter = match filter {
            Some(source) => source
                .resolve()
                .map_err(|source| RegistryError::InvalidFilter {
                    capability: capability.clone(),
                    source,
                })?,
            None => None,
        };

        Ok(Self {
            capability,
            cardinality: if aggregate {
                Cardinality::Aggregate
            } else {
                Cardinality::Single
            },
            optionality: if optional {
                Optionality::Optional
            } else {
                Optionality::Mandatory
            },
            filter,
        })
    }

    /// Bind every matching provider instead of one.
    #[must_use]
    pub fn aggregate(mut self) -> Self {
        self.cardinality = Cardinality::Aggregate;
        self
    }

    /// Do not block validation on this requirement.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optionality = Optionality::Optional;
        self
    }

    /// Restrict candidate providers to those whose properties match `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The required capability name.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Provider cardinality.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Whether validation waits for this requirement.
    #[must_use]
    pub fn optionality(&self) -> Optionality {
        self.optionality
    }

    /// Whether all matching providers are bound.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.cardinality == Cardinality::Aggregate
    }

    /// Whether the requirement never blocks validation.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optionality == Optionality::Optional
    }

    /// The provider filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Whether `provider` advertises the capability and passes the filter.
    #[must_use]
    pub fn accepts(&self, provider: &Instance) -> bool {
        provider.provides(&self.capability)
            && provider.with_properties(|properties| {
                cohort_filter::filter_matches(self.filter.as_ref(), properties)
            })
    }
}
