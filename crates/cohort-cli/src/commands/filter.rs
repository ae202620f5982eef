//! CLI handlers for the `cohort filter` subcommand.

use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use cohort_filter::{Filter, FilterSource, Operator, combine, escape, filter_matches, unescape};
use colored::Colorize;

/// Parse a filter and print its canonical form and tree.
///
/// Parsing already collapses redundant compound nodes.
pub(crate) fn parse_filter(text: &str) -> Result<()> {
    print!("{}", render_parse(text)?);
    Ok(())
}

/// Test a filter against a JSON object of properties.
///
/// Returns whether the filter matched.
pub(crate) fn match_filter(text: &str, properties: &str) -> Result<bool> {
    let matched = evaluate(text, properties)?;
    if matched {
        println!("{}", "match".green());
    } else {
        println!("{}", "no match".red());
    }
    Ok(matched)
}

/// Print `text` with filter special characters escaped.
pub(crate) fn escape_text(text: &str) {
    println!("{}", escape(text));
}

/// Print `text` with escape characters removed.
pub(crate) fn unescape_text(text: &str) {
    println!("{}", unescape(text));
}

/// Combine filter strings under one operator and print the result.
pub(crate) fn combine_filters(operator: &str, filters: &[String]) -> Result<()> {
    println!("{}", render_combine(operator, filters)?);
    Ok(())
}

fn render_parse(text: &str) -> Result<String> {
    let parsed = Filter::parse(text).with_context(|| format!("invalid filter: {text}"))?;
    let Some(filter) = parsed else {
        return Ok("(empty filter: matches everything)\n".to_owned());
    };

    let mut out = String::new();
    writeln!(out, "{filter}")?;
    write_tree(&filter, 0, &mut out)?;
    Ok(out)
}

fn write_tree(filter: &Filter, depth: usize, out: &mut String) -> std::fmt::Result {
    let indent = "  ".repeat(depth);
    match filter {
        Filter::Compound(compound) => {
            writeln!(out, "{indent}{}", compound.operator().symbol())?;
            for child in compound.children() {
                write_tree(child, depth.saturating_add(1), out)?;
            }
        },
        Filter::Criteria(criteria) => {
            writeln!(out, "{indent}{criteria}")?;
        },
    }
    Ok(())
}

fn evaluate(text: &str, properties: &str) -> Result<bool> {
    let filter = Filter::parse(text).with_context(|| format!("invalid filter: {text}"))?;
    let value: serde_json::Value =
        serde_json::from_str(properties).context("properties must be valid JSON")?;
    let serde_json::Value::Object(properties) = value else {
        bail!("properties must be a JSON object");
    };

    Ok(filter_matches(filter.as_ref(), &properties))
}

fn render_combine(operator: &str, filters: &[String]) -> Result<String> {
    let operator: Operator = operator.parse()?;
    let combined = combine(
        filters.iter().map(|f| Some(FilterSource::from(f.as_str()))),
        operator,
    )?;
    Ok(combined.map_or_else(
        || "(empty filter: matches everything)".to_owned(),
        |filter| filter.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_parse_tree() {
        let out = render_parse("(&(lang=python)(!(version<=2)))").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "(&(lang=python)(!(version<=2)))",
                "&",
                "  (lang=python)",
                "  !",
                "    (version<=2)",
            ]
        );
    }

    #[test]
    fn test_render_parse_collapses_single_child() {
        let out = render_parse("(&(|(a=1)))").unwrap();
        assert_eq!(out, "(a=1)\n(a=1)\n");
        assert!(render_parse("(&)").unwrap().contains("matches everything"));
        assert!(render_parse("  ").unwrap().contains("matches everything"));
        assert!(render_parse("(a=1").is_err());
    }

    #[test]
    fn test_evaluate() {
        assert!(evaluate("(lang=py*)", r#"{"lang": "python"}"#).unwrap());
        assert!(!evaluate("(lang=rust)", r#"{"lang": "python"}"#).unwrap());
        assert!(evaluate("", "{}").unwrap());
        assert!(evaluate("(a=1)", "[1]").is_err());
        assert!(evaluate("(a=1)", "not json").is_err());
    }

    #[test]
    fn test_render_combine() {
        let filters = vec!["(a=1)".to_owned(), String::new(), "(b=2)".to_owned()];
        assert_eq!(render_combine("and", &filters).unwrap(), "(&(a=1)(b=2))");
        assert_eq!(
            render_combine("!", &["(a=1)".to_owned()]).unwrap(),
            "(!(a=1))"
        );
        assert!(render_combine("not", &filters).is_err());
        assert!(render_combine("xor", &filters).is_err());
    }
}
