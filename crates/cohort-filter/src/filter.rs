//! Filter tree: compound nodes, criteria leaves, evaluation and composition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::compare::Comparator;
use crate::error::{FilterError, FilterResult};
use crate::escape::{escape, escape_value};
use crate::parser;

/// Property set a filter is evaluated against.
pub type Properties = Map<String, Value>;

/// Boolean operator of a compound filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `&`: every child must match.
    And,
    /// `|`: at least one child must match.
    Or,
    /// `!`: the single child must not match.
    Not,
}

impl Operator {
    /// The operator character used in filter strings.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::And => '&',
            Self::Or => '|',
            Self::Not => '!',
        }
    }
}

impl TryFrom<char> for Operator {
    type Error = FilterError;

    fn try_from(c: char) -> FilterResult<Self> {
        match c {
            '&' => Ok(Self::And),
            '|' => Ok(Self::Or),
            '!' => Ok(Self::Not),
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> FilterResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "&" | "and" => Ok(Self::And),
            "|" | "or" => Ok(Self::Or),
            "!" | "not" => Ok(Self::Not),
            other => Err(FilterError::UnknownOperator(other.to_owned())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A leaf test on one property: `(name comparator value)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    name: String,
    value: String,
    comparator: Comparator,
}

impl Criteria {
    /// Create a criteria from unescaped parts.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyAttribute`] or [`FilterError::EmptyValue`]
    /// if either part is empty.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        comparator: Comparator,
    ) -> FilterResult<Self> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() {
            return Err(FilterError::EmptyAttribute);
        }
        if value.is_empty() {
            return Err(FilterError::EmptyValue {
                criteria: format!("{name}{comparator}"),
            });
        }
        Ok(Self {
            name,
            value,
            comparator,
        })
    }

    /// The tested property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filter value, unescaped.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The comparison operator.
    #[must_use]
    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Test the criteria against a property set.
    ///
    /// A missing property never matches.
    #[must_use]
    pub fn matches(&self, properties: &Properties) -> bool {
        properties
            .get(&self.name)
            .is_some_and(|tested| self.comparator.compare(&self.value, tested))
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}{}{})",
            escape(&self.name),
            self.comparator,
            escape_value(&self.value)
        )
    }
}

/// An operator applied to a list of sub-filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundFilter {
    operator: Operator,
    children: Vec<Filter>,
}

impl CompoundFilter {
    /// Create a compound filter without children.
    #[must_use]
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            children: Vec::new(),
        }
    }

    /// Add a child filter.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::NotArity`] when adding a second child to a NOT.
    pub fn push(&mut self, child: Filter) -> FilterResult<()> {
        if self.operator == Operator::Not && !self.children.is_empty() {
            return Err(FilterError::NotArity);
        }
        self.children.push(child);
        Ok(())
    }

    /// The boolean operator.
    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The sub-filters, in declaration order.
    #[must_use]
    pub fn children(&self) -> &[Filter] {
        &self.children
    }

    /// Evaluate the compound filter, short-circuiting where possible.
    #[must_use]
    pub fn matches(&self, properties: &Properties) -> bool {
        match self.operator {
            Operator::And => {
                !self.children.is_empty()
                    && self.children.iter().all(|child| child.matches(properties))
            },
            Operator::Or => self.children.iter().any(|child| child.matches(properties)),
            Operator::Not => !self
                .children
                .first()
                .is_some_and(|child| child.matches(properties)),
        }
    }

    fn normalize(self) -> Option<Filter> {
        let operator = self.operator;
        let mut children: Vec<Filter> = self
            .children
            .into_iter()
            .filter_map(Filter::normalize)
            .collect();

        match (children.len(), operator) {
            (0, _) => None,
            (1, Operator::And | Operator::Or) => children.pop(),
            _ => Some(Filter::Compound(Self { operator, children })),
        }
    }
}

impl fmt::Display for CompoundFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.operator)?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `&`, `|` or `!` over sub-filters.
    Compound(CompoundFilter),
    /// A single property test.
    Criteria(Criteria),
}

impl Filter {
    /// Parse a filter string.
    ///
    /// Returns `Ok(None)` for an empty or blank string, which matches
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] describing the first syntax error found.
    pub fn parse(text: &str) -> FilterResult<Option<Self>> {
        parser::parse(text)
    }

    /// Test the filter against a property set.
    #[must_use]
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Self::Compound(compound) => compound.matches(properties),
            Self::Criteria(criteria) => criteria.matches(properties),
        }
    }

    /// Collapse the filter to its first meaningful node.
    ///
    /// Compound filters without children disappear, those with a single
    /// child are replaced by it, except NOT.
    #[must_use]
    pub fn normalize(self) -> Option<Self> {
        match self {
            Self::Compound(compound) => compound.normalize(),
            criteria @ Self::Criteria(_) => Some(criteria),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compound(compound) => compound.fmt(f),
            Self::Criteria(criteria) => criteria.fmt(f),
        }
    }
}

impl From<Criteria> for Filter {
    fn from(criteria: Criteria) -> Self {
        Self::Criteria(criteria)
    }
}

impl From<CompoundFilter> for Filter {
    fn from(compound: CompoundFilter) -> Self {
        Self::Compound(compound)
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> FilterResult<Self> {
        Self::parse(s)?.ok_or_else(|| FilterError::Invalid(format!("empty filter: {s:?}")))
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Test an optional filter; no filter matches every property set.
#[must_use]
pub fn filter_matches(filter: Option<&Filter>, properties: &Properties) -> bool {
    filter.is_none_or(|filter| filter.matches(properties))
}

/// A filter given either as text or already parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSource {
    /// A filter string, parsed on use.
    Text(String),
    /// An existing filter tree.
    Parsed(Filter),
}

impl FilterSource {
    /// Turn the source into a filter tree.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a malformed filter string.
    pub fn resolve(self) -> FilterResult<Option<Filter>> {
        match self {
            Self::Text(text) => Filter::parse(&text),
            Self::Parsed(filter) => Ok(Some(filter)),
        }
    }
}

impl From<&str> for FilterSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for FilterSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Filter> for FilterSource {
    fn from(filter: Filter) -> Self {
        Self::Parsed(filter)
    }
}

/// Combine filters under one operator.
///
/// `None` inputs and blank filter strings are dropped. Nothing left gives
/// `None`; a single survivor is returned as is (wrapped when the operator is
/// NOT); otherwise a new normalized compound filter is built.
///
/// # Errors
///
/// Returns a parse error for malformed text inputs, or
/// [`FilterError::NotArity`] when more than one filter is combined with NOT.
pub fn combine<I>(filters: I, operator: Operator) -> FilterResult<Option<Filter>>
where
    I: IntoIterator<Item = Option<FilterSource>>,
{
    let mut resolved = Vec::new();
    for source in filters.into_iter().flatten() {
        if let Some(filter) = source.resolve()? {
            resolved.push(filter);
        }
    }

    if resolved.len() == 1 && operator != Operator::Not {
        return Ok(resolved.pop());
    }

    let mut combined = CompoundFilter::new(operator);
    for filter in resolved {
        combined.push(filter)?;
    }
    Ok(combined.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => Properties::new(),
        }
    }

    fn criteria(name: &str, value: &str) -> Filter {
        Criteria::new(name, value, Comparator::Equal).unwrap().into()
    }

    #[test]
    fn test_criteria_rejects_empty_parts() {
        assert_eq!(
            Criteria::new("", "x", Comparator::Equal),
            Err(FilterError::EmptyAttribute)
        );
        assert!(matches!(
            Criteria::new("a", "", Comparator::Equal),
            Err(FilterError::EmptyValue { .. })
        ));
    }

    #[test]
    fn test_missing_property_never_matches() {
        let filter = criteria("lang", "*");
        assert!(!filter.matches(&props(json!({"other": "x"}))));
        assert!(filter.matches(&props(json!({"lang": "rust"}))));
    }

    #[test]
    fn test_not_accepts_a_single_child() {
        let mut not = CompoundFilter::new(Operator::Not);
        not.push(criteria("a", "1")).unwrap();
        assert_eq!(not.push(criteria("b", "2")), Err(FilterError::NotArity));
    }

    #[test]
    fn test_compound_evaluation() {
        let mut and = CompoundFilter::new(Operator::And);
        and.push(criteria("a", "1")).unwrap();
        and.push(criteria("b", "2")).unwrap();
        let mut or = CompoundFilter::new(Operator::Or);
        or.push(criteria("a", "1")).unwrap();
        or.push(criteria("b", "2")).unwrap();
        let mut not = CompoundFilter::new(Operator::Not);
        not.push(criteria("a", "1")).unwrap();

        let only_a = props(json!({"a": 1, "b": 3}));
        assert!(!and.matches(&only_a));
        assert!(or.matches(&only_a));
        assert!(!not.matches(&only_a));
        assert!(not.matches(&props(json!({"b": 2}))));
    }

    #[test]
    fn test_normalize_collapses_single_children() {
        let mut inner = CompoundFilter::new(Operator::Or);
        inner.push(criteria("a", "1")).unwrap();
        let mut outer = CompoundFilter::new(Operator::And);
        outer.push(inner.into()).unwrap();
        assert_eq!(
            Filter::from(outer).normalize(),
            Some(criteria("a", "1"))
        );

        let mut not = CompoundFilter::new(Operator::Not);
        not.push(criteria("a", "1")).unwrap();
        let normalized = Filter::from(not.clone()).normalize();
        assert_eq!(normalized, Some(Filter::Compound(not)));

        assert_eq!(
            Filter::from(CompoundFilter::new(Operator::And)).normalize(),
            None
        );
    }

    #[test]
    fn test_display_escapes_parts() {
        let filter = Filter::from(Criteria::new("na=me", "(v*)", Comparator::GreaterOrEqual).unwrap());
        assert_eq!(filter.to_string(), "(na\\=me>=\\(v*\\))");
    }

    #[test]
    fn test_filter_matches_none() {
        assert!(filter_matches(None, &Properties::new()));
        assert!(!filter_matches(Some(&criteria("a", "1")), &Properties::new()));
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine(Vec::new(), Operator::And).unwrap(), None);
        assert_eq!(
            combine(vec![None, Some("".into())], Operator::Or).unwrap(),
            None
        );
        assert_eq!(
            combine(vec![None, Some("(a=1)".into())], Operator::And).unwrap(),
            Some(criteria("a", "1"))
        );

        let both = combine(
            vec![Some("(a=1)".into()), Some(criteria("b", "2").into())],
            Operator::Or,
        )
        .unwrap()
        .unwrap();
        assert_eq!(both.to_string(), "(|(a=1)(b=2))");
    }

    #[test]
    fn test_combine_not() {
        let negated = combine(vec![Some("(a=1)".into())], Operator::Not)
            .unwrap()
            .unwrap();
        assert_eq!(negated.to_string(), "(!(a=1))");
        assert_eq!(
            combine(
                vec![Some("(a=1)".into()), Some("(b=1)".into())],
                Operator::Not
            ),
            Err(FilterError::NotArity)
        );
    }

    #[test]
    fn test_combine_propagates_parse_errors() {
        assert!(combine(vec![Some("(a".into())], Operator::And).is_err());
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("and".parse::<Operator>().unwrap(), Operator::And);
        assert_eq!("|".parse::<Operator>().unwrap(), Operator::Or);
        assert_eq!(Operator::try_from('!').unwrap(), Operator::Not);
        assert_eq!(
            Operator::try_from('^'),
            Err(FilterError::UnknownOperator("^".to_owned()))
        );
    }

    #[test]
    fn test_serde_as_string() {
        let filter: Filter = "(&(a=1)(b>=2))".parse().unwrap();
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, "\"(&(a=1)(b>=2))\"");
        let back: Filter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
        assert!(serde_json::from_str::<Filter>("\"(a\"").is_err());
    }
}
