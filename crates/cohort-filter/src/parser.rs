//! Single-pass filter string parser.
//!
//! The scanner keeps a stack of open compound filters and the start offset
//! of the criteria being read. Every special character is ASCII, so byte
//! offsets always fall on character boundaries.

use crate::compare::Comparator;
use crate::error::{FilterError, FilterResult};
use crate::escape::{trim_unescaped, unescape};
use crate::filter::{CompoundFilter, Criteria, Filter, Operator};

const ESCAPE: u8 = b'\\';
const COMPARATOR_CHARACTERS: &[u8] = b"=<>~";

/// Parse a filter string into a normalized tree.
pub(crate) fn parse(text: &str) -> FilterResult<Option<Filter>> {
    let bytes = text.as_bytes();
    let Some(mut idx) = skip_spaces(bytes, 0) else {
        return Ok(None);
    };

    let mut stack: Vec<CompoundFilter> = Vec::new();
    let mut criteria_start: Option<usize> = None;
    let mut escaped = false;
    let mut root: Option<Filter> = None;

    while idx < bytes.len() {
        let current = bytes[idx];

        if let Some(start) = criteria_start {
            if escaped {
                escaped = false;
            } else if current == ESCAPE {
                escaped = true;
            } else if current == b')' {
                let criteria = parse_criteria(&text[start..idx])?;
                criteria_start = None;
                attach(Filter::Criteria(criteria), &mut stack, &mut root)?;
            } else if current == b'(' {
                return Err(unexpected(text, idx));
            }
        } else {
            match current {
                b'(' => {
                    if root.is_some() {
                        return Err(FilterError::TrailingContent {
                            offset: idx,
                            filter: text.to_owned(),
                        });
                    }
                    let next = next_index(idx)
                        .and_then(|i| skip_spaces(bytes, i))
                        .ok_or_else(|| missing_operator(text, idx))?;
                    match bytes[next] {
                        b')' => return Err(missing_operator(text, idx)),
                        b'(' => return Err(unexpected(text, next)),
                        c => {
                            if let Ok(operator) = Operator::try_from(char::from(c)) {
                                stack.push(CompoundFilter::new(operator));
                            } else {
                                criteria_start = Some(next);
                                escaped = c == ESCAPE;
                            }
                        },
                    }
                    idx = next;
                },
                b')' => {
                    let ended = stack.pop().ok_or_else(|| {
                        FilterError::UnexpectedClosingParenthesis {
                            offset: idx,
                            filter: text.to_owned(),
                        }
                    })?;
                    attach(Filter::Compound(ended), &mut stack, &mut root)?;
                },
                c if c.is_ascii_whitespace() => {},
                _ if root.is_some() => {
                    return Err(FilterError::TrailingContent {
                        offset: idx,
                        filter: text.to_owned(),
                    });
                },
                _ => return Err(unexpected(text, idx)),
            }
        }

        idx = next_index(idx).unwrap_or(usize::MAX);
    }

    if criteria_start.is_some() || !stack.is_empty() {
        return Err(FilterError::UnclosedParenthesis {
            filter: text.to_owned(),
        });
    }

    let root = root.ok_or_else(|| FilterError::Invalid(text.to_owned()))?;
    Ok(root.normalize())
}

/// Store a closed node in its parent, or make it the root.
///
/// A bare criteria root is wrapped in an AND node, which normalization
/// collapses again.
fn attach(
    node: Filter,
    stack: &mut [CompoundFilter],
    root: &mut Option<Filter>,
) -> FilterResult<()> {
    if let Some(parent) = stack.last_mut() {
        return parent.push(node);
    }

    let node = match node {
        Filter::Criteria(criteria) => {
            let mut wrapper = CompoundFilter::new(Operator::And);
            wrapper.push(Filter::Criteria(criteria))?;
            Filter::Compound(wrapper)
        },
        compound @ Filter::Compound(_) => compound,
    };
    *root = Some(node);
    Ok(())
}

/// Parse the content of a criteria, without its parentheses.
#[allow(clippy::arithmetic_side_effects)] // offsets stay within content.len()
fn parse_criteria(content: &str) -> FilterResult<Criteria> {
    let bytes = content.as_bytes();

    let mut position = None;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
        } else if b == ESCAPE {
            escaped = true;
        } else if COMPARATOR_CHARACTERS.contains(&b) {
            position = Some(i);
            break;
        }
    }

    let Some(position) = position else {
        return Err(FilterError::MissingComparator {
            criteria: content.to_owned(),
        });
    };
    if position == 0 {
        return Err(FilterError::MissingAttribute {
            criteria: content.to_owned(),
        });
    }

    let comparator = comparator_at(bytes, position).ok_or_else(|| {
        FilterError::UnknownComparator {
            comparator: char::from(bytes[position]),
            criteria: content.to_owned(),
        }
    })?;

    // Every comparator character following the operator is swallowed.
    let mut value_start = position.saturating_add(1);
    while value_start < bytes.len() && COMPARATOR_CHARACTERS.contains(&bytes[value_start]) {
        value_start = value_start.saturating_add(1);
    }

    let name = unescape(trim_unescaped(&content[..position]));
    let value = unescape(trim_unescaped(&content[value_start..]));
    if name.is_empty() {
        return Err(FilterError::MissingAttribute {
            criteria: content.to_owned(),
        });
    }
    if value.is_empty() {
        return Err(FilterError::EmptyValue {
            criteria: content.to_owned(),
        });
    }
    Criteria::new(name, value, comparator)
}

fn comparator_at(bytes: &[u8], position: usize) -> Option<Comparator> {
    let first = bytes[position];
    if first == b'=' {
        return Some(Comparator::Equal);
    }

    let followed_by_equal = next_index(position)
        .and_then(|i| bytes.get(i))
        .is_some_and(|&b| b == b'=');
    match (first, followed_by_equal) {
        (b'<', false) => Some(Comparator::Less),
        (b'>', false) => Some(Comparator::Greater),
        (b'<', true) => Some(Comparator::LessOrEqual),
        (b'>', true) => Some(Comparator::GreaterOrEqual),
        (b'~', true) => Some(Comparator::Approximate),
        _ => None,
    }
}

fn skip_spaces(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .and_then(|offset| from.checked_add(offset))
}

fn next_index(idx: usize) -> Option<usize> {
    idx.checked_add(1)
}

fn missing_operator(text: &str, offset: usize) -> FilterError {
    FilterError::MissingOperator {
        offset,
        filter: text.to_owned(),
    }
}

fn unexpected(text: &str, offset: usize) -> FilterError {
    FilterError::UnexpectedCharacter {
        character: text[offset..].chars().next().unwrap_or_default(),
        offset,
        filter: text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Filter {
        parse(text).unwrap().unwrap()
    }

    fn as_criteria(filter: &Filter) -> &Criteria {
        match filter {
            Filter::Criteria(criteria) => criteria,
            Filter::Compound(compound) => panic!("expected a criteria, got {compound}"),
        }
    }

    #[test]
    fn test_empty_input_is_no_filter() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t ").unwrap(), None);
    }

    #[test]
    fn test_bare_criteria_is_collapsed() {
        let filter = parse_ok("(name=value)");
        let criteria = as_criteria(&filter);
        assert_eq!(criteria.name(), "name");
        assert_eq!(criteria.value(), "value");
        assert_eq!(criteria.comparator(), Comparator::Equal);
    }

    #[test]
    fn test_comparators() {
        let cases = [
            ("(a=1)", Comparator::Equal),
            ("(a~=1)", Comparator::Approximate),
            ("(a<=1)", Comparator::LessOrEqual),
            ("(a<1)", Comparator::Less),
            ("(a>=1)", Comparator::GreaterOrEqual),
            ("(a>1)", Comparator::Greater),
        ];
        for (text, expected) in cases {
            let filter = parse_ok(text);
            let criteria = as_criteria(&filter);
            assert_eq!(criteria.comparator(), expected, "{text}");
            assert_eq!(criteria.value(), "1", "{text}");
        }
    }

    #[test]
    fn test_extra_comparator_characters_are_skipped() {
        let filter = parse_ok("(a>==3)");
        let criteria = as_criteria(&filter);
        assert_eq!(criteria.comparator(), Comparator::GreaterOrEqual);
        assert_eq!(criteria.value(), "3");
    }

    #[test]
    fn test_whitespace_handling() {
        let filter = parse_ok("  ( &  ( name = some value )( other>=2 ) )  ");
        assert_eq!(filter.to_string(), "(&(name=some value)(other>=2))");
    }

    #[test]
    fn test_escaped_characters() {
        let filter = parse_ok("(na\\=me=\\(x\\)\\ )");
        let criteria = as_criteria(&filter);
        assert_eq!(criteria.name(), "na=me");
        assert_eq!(criteria.value(), "(x) ");
    }

    #[test]
    fn test_escaped_first_character() {
        let filter = parse_ok("(\\(a=b)");
        assert_eq!(as_criteria(&filter).name(), "(a");
    }

    #[test]
    fn test_nested_structure() {
        let filter = parse_ok("(|(&(a=1)(b=2))(!(c=3)))");
        let Filter::Compound(or) = &filter else {
            panic!("expected a compound filter");
        };
        assert_eq!(or.operator(), Operator::Or);
        assert_eq!(or.children().len(), 2);
        assert_eq!(filter.to_string(), "(|(&(a=1)(b=2))(!(c=3)))");
    }

    #[test]
    fn test_single_child_operators_collapse() {
        assert_eq!(parse_ok("(&(|(a=1)))").to_string(), "(a=1)");
        assert_eq!(parse_ok("(!(a=1))").to_string(), "(!(a=1))");
        assert_eq!(parse("(&)").unwrap(), None);
    }

    #[test]
    fn test_not_with_two_children_fails() {
        assert_eq!(parse("(!(a=1)(b=2))"), Err(FilterError::NotArity));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(matches!(
            parse("(&(a=1)"),
            Err(FilterError::UnclosedParenthesis { .. })
        ));
        assert!(matches!(
            parse("(a=1"),
            Err(FilterError::UnclosedParenthesis { .. })
        ));
        assert!(matches!(
            parse("(a=1))"),
            Err(FilterError::UnexpectedClosingParenthesis { .. })
        ));
    }

    #[test]
    fn test_criteria_errors() {
        assert!(matches!(
            parse("(abc)"),
            Err(FilterError::MissingComparator { .. })
        ));
        assert!(matches!(
            parse("(=abc)"),
            Err(FilterError::MissingAttribute { .. })
        ));
        assert!(matches!(
            parse("(a~b)"),
            Err(FilterError::UnknownComparator { comparator: '~', .. })
        ));
        assert!(matches!(parse("(a=)"), Err(FilterError::EmptyValue { .. })));
        assert!(matches!(
            parse("(a=(b))"),
            Err(FilterError::UnexpectedCharacter { .. })
        ));
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            parse("a=b"),
            Err(FilterError::UnexpectedCharacter { .. })
        ));
        assert!(matches!(
            parse("()"),
            Err(FilterError::MissingOperator { .. })
        ));
        assert!(matches!(
            parse("(   "),
            Err(FilterError::MissingOperator { .. })
        ));
        assert!(matches!(
            parse("(a=1)(b=2)"),
            Err(FilterError::TrailingContent { .. })
        ));
        assert!(matches!(
            parse("(a=1) x"),
            Err(FilterError::TrailingContent { .. })
        ));
        assert!(matches!(
            parse("(&(a=1) x (b=2))"),
            Err(FilterError::UnexpectedCharacter { character: 'x', .. })
        ));
    }

    #[test]
    fn test_non_ascii_content() {
        let filter = parse_ok("(ville=Saint-Étienne)");
        assert_eq!(as_criteria(&filter).value(), "Saint-Étienne");
    }
}
