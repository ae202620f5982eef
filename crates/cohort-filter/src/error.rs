//! Filter error types.

use thiserror::Error;

/// Errors raised while parsing or composing a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// An opening parenthesis was never closed.
    #[error("unmatched '(' in filter: {filter}")]
    UnclosedParenthesis {
        /// The offending filter string.
        filter: String,
    },

    /// A closing parenthesis has no matching opening one.
    #[error("too many ')' at offset {offset} in filter: {filter}")]
    UnexpectedClosingParenthesis {
        /// Byte offset of the parenthesis.
        offset: usize,
        /// The offending filter string.
        filter: String,
    },

    /// Nothing usable follows an opening parenthesis.
    #[error("missing filter operator or criteria after offset {offset} in filter: {filter}")]
    MissingOperator {
        /// Byte offset of the opening parenthesis.
        offset: usize,
        /// The offending filter string.
        filter: String,
    },

    /// A criteria has no comparison operator.
    #[error("comparator not found in '{criteria}'")]
    MissingComparator {
        /// The criteria text.
        criteria: String,
    },

    /// A criteria starts with its comparator.
    #[error("attribute name is missing in '{criteria}'")]
    MissingAttribute {
        /// The criteria text.
        criteria: String,
    },

    /// A criteria uses a comparator outside of `=`, `~=`, `<=`, `<`, `>=`, `>`.
    #[error("unknown comparator '{comparator}' in '{criteria}'")]
    UnknownComparator {
        /// The character found where a comparator was expected.
        comparator: char,
        /// The criteria text.
        criteria: String,
    },

    /// A criteria has no value to compare against.
    #[error("empty value in criteria '{criteria}'")]
    EmptyValue {
        /// The criteria text.
        criteria: String,
    },

    /// A criteria was built with an empty attribute name.
    #[error("empty attribute name")]
    EmptyAttribute,

    /// Not one of `&`, `|` or `!`.
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    /// A NOT filter received a second child.
    #[error("the NOT operator only handles one child")]
    NotArity,

    /// A character that cannot appear at this position.
    #[error("unexpected character '{character}' at offset {offset} in filter: {filter}")]
    UnexpectedCharacter {
        /// The character found.
        character: char,
        /// Byte offset of the character.
        offset: usize,
        /// The offending filter string.
        filter: String,
    },

    /// Content remains after the root filter has been closed.
    #[error("unexpected content after the end of the filter at offset {offset}: {filter}")]
    TrailingContent {
        /// Byte offset where the extra content starts.
        offset: usize,
        /// The offending filter string.
        filter: String,
    },

    /// The string holds no filter at all.
    #[error("invalid filter string: {0}")]
    Invalid(String),
}

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;
