//! Comparison operators applied by criteria.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

/// A criteria comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `=`: equality, presence (`attr=*`) or wildcard match.
    Equal,
    /// `~=`: case-insensitive equality.
    Approximate,
    /// `<=`: tested value lower than or equal to the filter value.
    LessOrEqual,
    /// `<`: tested value strictly lower than the filter value.
    Less,
    /// `>=`: tested value greater than or equal to the filter value.
    GreaterOrEqual,
    /// `>`: tested value strictly greater than the filter value.
    Greater,
}

impl Comparator {
    /// The textual form of the comparator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Approximate => "~=",
            Self::LessOrEqual => "<=",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
        }
    }

    /// Compare a property value against the textual filter value.
    #[must_use]
    pub fn compare(self, filter_value: &str, tested: &Value) -> bool {
        match self {
            Self::Equal => equal(filter_value, tested),
            Self::Approximate => approximate(filter_value, tested),
            Self::Less => ordering(filter_value, tested) == Some(Ordering::Less),
            Self::Greater => ordering(filter_value, tested) == Some(Ordering::Greater),
            Self::LessOrEqual => {
                matches!(
                    ordering(filter_value, tested),
                    Some(Ordering::Less | Ordering::Equal)
                ) || equal(filter_value, tested)
            },
            Self::GreaterOrEqual => {
                matches!(
                    ordering(filter_value, tested),
                    Some(Ordering::Greater | Ordering::Equal)
                ) || equal(filter_value, tested)
            },
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn equal(filter_value: &str, tested: &Value) -> bool {
    let has_wildcard = filter_value.contains('*');
    match tested {
        Value::Array(items) => {
            if has_wildcard && items.iter().any(|item| wildcard(filter_value, item)) {
                return true;
            }
            items
                .iter()
                .any(|item| stringify(item).is_some_and(|text| text == filter_value))
        },
        _ if has_wildcard => wildcard(filter_value, tested),
        _ => scalar_equal(filter_value, tested),
    }
}

fn scalar_equal(filter_value: &str, tested: &Value) -> bool {
    match tested {
        Value::String(text) => text == filter_value,
        Value::Bool(flag) => parse_bool(filter_value) == Some(*flag),
        Value::Number(_) => {
            ordering(filter_value, tested) == Some(Ordering::Equal)
                || stringify(tested).is_some_and(|text| text == filter_value)
        },
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => {
            stringify(tested).is_some_and(|text| text == filter_value)
        },
    }
}

fn approximate(filter_value: &str, tested: &Value) -> bool {
    match tested {
        Value::String(text) => equal(
            &filter_value.to_lowercase(),
            &Value::String(text.to_lowercase()),
        ),
        Value::Array(items) if items.iter().all(Value::is_string) => {
            let lowered = items
                .iter()
                .filter_map(Value::as_str)
                .map(|text| Value::String(text.to_lowercase()))
                .collect();
            equal(&filter_value.to_lowercase(), &Value::Array(lowered))
        },
        _ => equal(filter_value, tested),
    }
}

/// Order the tested value against the filter value converted to its type.
///
/// Returns `None` when the filter value cannot be converted.
fn ordering(filter_value: &str, tested: &Value) -> Option<Ordering> {
    let filter_value = filter_value.trim();
    match tested {
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                filter_value.parse::<i64>().ok().map(|f| integer.cmp(&f))
            } else if let Some(unsigned) = number.as_u64() {
                filter_value.parse::<u64>().ok().map(|f| unsigned.cmp(&f))
            } else {
                let float = number.as_f64()?;
                let f = filter_value.parse::<f64>().ok()?;
                float.partial_cmp(&f)
            }
        },
        Value::String(text) => Some(text.as_str().cmp(filter_value)),
        Value::Bool(flag) => parse_bool(filter_value).map(|f| flag.cmp(&f)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Wildcard or presence test for a filter value containing `*`.
fn wildcard(pattern: &str, tested: &Value) -> bool {
    if pattern == "*" {
        return match tested {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
        };
    }

    match tested {
        Value::String(text) => wildcard_match(pattern, text),
        _ => false,
    }
}

/// Match `text` against a pattern where `*` stands for any run of characters.
///
/// Segments must appear in order without overlapping. A pattern that does
/// not start (end) with `*` is anchored at the start (end) of the text.
#[allow(clippy::arithmetic_side_effects)] // cursor never exceeds text.len()
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return pattern == text;
    };
    if segments.len() == 1 {
        return pattern == text;
    }

    let mut cursor = 0;
    if !first.is_empty() {
        if !text.starts_with(first) {
            return false;
        }
        cursor = first.len();
    }

    for segment in &segments[1..segments.len().saturating_sub(1)] {
        if segment.is_empty() {
            continue;
        }
        match text[cursor..].find(segment) {
            Some(offset) => cursor = cursor.saturating_add(offset).saturating_add(segment.len()),
            None => return false,
        }
    }

    last.is_empty() || (text.len() >= cursor.saturating_add(last.len()) && text.ends_with(last))
}

/// Textual form of a property value for equality tests.
fn stringify(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(text) => Some(Cow::Borrowed(text)),
        Value::Null => None,
        Value::Bool(flag) => Some(Cow::Borrowed(if *flag { "true" } else { "false" })),
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        Value::Array(_) | Value::Object(_) => Some(Cow::Owned(value.to_string())),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wildcard_anchoring() {
        assert!(wildcard_match("a*c", "abc"));
        assert!(wildcard_match("a*c", "ac"));
        assert!(wildcard_match("a*c", "abxc"));
        assert!(!wildcard_match("a*c", "xabc"));
        assert!(!wildcard_match("a*c", "abcx"));
    }

    #[test]
    fn test_wildcard_segments() {
        assert!(wildcard_match("*b*", "abc"));
        assert!(wildcard_match("a*b*c", "a-b-c"));
        assert!(!wildcard_match("a*b*c", "a-c-b"));
        assert!(wildcard_match("a*c", "acbc"));
        assert!(!wildcard_match("a*a", "a"));
        assert!(wildcard_match("a**", "abc"));
    }

    #[test]
    fn test_presence() {
        let eq = Comparator::Equal;
        assert!(eq.compare("*", &json!("x")));
        assert!(!eq.compare("*", &json!("")));
        assert!(!eq.compare("*", &json!([])));
        assert!(eq.compare("*", &json!(0)));
        assert!(eq.compare("*", &json!(false)));
        assert!(!eq.compare("*", &Value::Null));
    }

    #[test]
    fn test_equal_scalars() {
        let eq = Comparator::Equal;
        assert!(eq.compare("python", &json!("python")));
        assert!(!eq.compare("Python", &json!("python")));
        assert!(eq.compare("3", &json!(3)));
        assert!(eq.compare("2.5", &json!(2.5)));
        assert!(eq.compare("true", &json!(true)));
        assert!(eq.compare("TRUE", &json!(true)));
        assert!(!eq.compare("null", &Value::Null));
    }

    #[test]
    fn test_equal_lists() {
        let eq = Comparator::Equal;
        let tested = json!(["alpha", 12, "beta"]);
        assert!(eq.compare("beta", &tested));
        assert!(eq.compare("12", &tested));
        assert!(eq.compare("al*", &tested));
        assert!(!eq.compare("gamma", &tested));
    }

    #[test]
    fn test_wildcard_on_non_string() {
        assert!(!Comparator::Equal.compare("1*", &json!(12)));
    }

    #[test]
    fn test_approximate() {
        let approx = Comparator::Approximate;
        assert!(approx.compare("PyThOn", &json!("python")));
        assert!(approx.compare("BETA", &json!(["Alpha", "Beta"])));
        assert!(!approx.compare("BETA", &json!(["Alpha", 3, "Beta"])));
        assert!(approx.compare("3", &json!(["Alpha", 3])));
        assert!(approx.compare("4", &json!(4)));
    }

    #[test]
    fn test_ordering_numbers() {
        assert!(Comparator::GreaterOrEqual.compare("3", &json!(3)));
        assert!(Comparator::GreaterOrEqual.compare("3", &json!(4)));
        assert!(!Comparator::GreaterOrEqual.compare("3", &json!(2)));
        assert!(Comparator::Less.compare("3", &json!(2)));
        assert!(!Comparator::Less.compare("3", &json!(3)));
        assert!(Comparator::LessOrEqual.compare("1.5", &json!(1.5)));
        assert!(Comparator::Greater.compare("1.5", &json!(1.75)));
    }

    #[test]
    fn test_ordering_conversion_failure_is_false() {
        assert!(!Comparator::Greater.compare("abc", &json!(3)));
        assert!(!Comparator::Less.compare("3.5", &json!(3)));
        assert!(!Comparator::Less.compare("1", &json!([0])));
        assert!(!Comparator::Greater.compare("1", &Value::Null));
    }

    #[test]
    fn test_ordering_strings_and_bools() {
        assert!(Comparator::Less.compare("b", &json!("a")));
        assert!(Comparator::Greater.compare("false", &json!(true)));
        assert!(!Comparator::Greater.compare("maybe", &json!(true)));
    }
}
