//! Escaping of attribute names and values embedded in filter strings.

/// The escape character.
pub const ESCAPE_CHARACTER: char = '\\';

/// Characters that must be escaped inside a filter string.
///
/// The escape character itself is always escaped and is not listed here.
pub const ESCAPED_CHARACTERS: &str = "()&|=<>~*+#,;'\"";

/// Escape a string so it can be embedded in a filter.
///
/// Every character of [`ESCAPED_CHARACTERS`], the escape character and any
/// space at either end of the string get a leading backslash.
#[must_use]
pub fn escape(text: &str) -> String {
    escape_with(text, ESCAPED_CHARACTERS)
}

/// Escape a criteria value, keeping `*` as a wildcard.
pub(crate) fn escape_value(text: &str) -> String {
    escape_with(text, "()&|=<>~+#,;'\"")
}

fn escape_with(text: &str, protected: &str) -> String {
    let last = text.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(text.len());
    for (position, c) in text.chars().enumerate() {
        let boundary_space = c == ' ' && (position == 0 || position == last);
        if c == ESCAPE_CHARACTER || protected.contains(c) || boundary_space {
            escaped.push(ESCAPE_CHARACTER);
        }
        escaped.push(c);
    }
    escaped
}

/// Remove the escape characters from a filter fragment.
///
/// A doubled escape character yields one literal backslash; a dangling one
/// at the end of the string is dropped.
#[must_use]
pub fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        if !escaped && c == ESCAPE_CHARACTER {
            escaped = true;
        } else {
            escaped = false;
            result.push(c);
        }
    }
    result
}

/// Trim surrounding ASCII whitespace, keeping a trailing space that is
/// protected by an escape character.
pub(crate) fn trim_unescaped(text: &str) -> &str {
    let text = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let mut end = text.len();
    while let Some(c) = text[..end].chars().next_back() {
        if !c.is_ascii_whitespace() {
            break;
        }
        #[allow(clippy::arithmetic_side_effects)] // c is a one-byte ASCII char inside text[..end]
        let before = end - 1;
        if is_escaped_at(text, before) {
            break;
        }
        end = before;
    }
    &text[..end]
}

/// Whether the byte at `index` is preceded by an odd run of escape characters.
fn is_escaped_at(text: &str, index: usize) -> bool {
    let run = text.as_bytes()[..index]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    run % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape("a(b)c"), "a\\(b\\)c");
        assert_eq!(escape("x=1*2"), "x\\=1\\*2");
        assert_eq!(escape("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_escape_boundary_spaces() {
        assert_eq!(escape(" padded "), "\\ padded\\ ");
        assert_eq!(escape("in side"), "in side");
        assert_eq!(escape(" "), "\\ ");
    }

    #[test]
    fn test_unescape_drops_escape_characters() {
        assert_eq!(unescape("a\\(b\\)"), "a(b)");
        assert_eq!(unescape("a\\\\b"), "a\\b");
        assert_eq!(unescape("dangling\\"), "dangling");
    }

    #[test]
    fn test_escape_round_trip() {
        let samples = [
            "",
            " ",
            "  ",
            "plain",
            " lead",
            "trail ",
            "()&|=<>~*+#,;'\"",
            "\\",
            "\\ \\",
            " a\\(b) ",
            "unicode é ü ",
        ];
        for sample in samples {
            assert_eq!(unescape(&escape(sample)), sample, "sample {sample:?}");
        }
    }

    #[test]
    fn test_escape_value_keeps_wildcard() {
        assert_eq!(escape_value("a*(b)"), "a*\\(b\\)");
    }

    #[test]
    fn test_trim_unescaped() {
        assert_eq!(trim_unescaped("  value  "), "value");
        assert_eq!(trim_unescaped("value\\ "), "value\\ ");
        assert_eq!(trim_unescaped("value\\\\ "), "value\\\\");
        assert_eq!(trim_unescaped("   "), "");
    }
}
