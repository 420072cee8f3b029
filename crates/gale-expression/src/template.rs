//! Rewriting `${{ … }}` templates into single expressions.
//!
//! A literal string with embedded expression segments becomes one
//! `format('…', …)` call: literal text turns into the format string (with
//! braces doubled and quotes escaped) and each expression body becomes an
//! argument. A string that is exactly one `${{ … }}` with no surrounding
//! literal text stays a bare expression unless `force_format` is set.

use crate::core::error::{ExpressionError, ExpressionResult};

/// Rewrite a literal string containing `${{ … }}` segments.
///
/// Returns the rewritten expression source and whether the input
/// contained any expression at all. Inputs without `${{` pass through
/// unchanged with `false`.
pub fn rewrite_sub_expression(
    input: &str,
    force_format: bool,
) -> ExpressionResult<(String, bool)> {
    if !input.contains("${{") {
        return Ok((input.to_string(), false));
    }

    let mut pos = 0;
    let mut expr_start: Option<usize> = None;
    let mut in_string = false;
    let mut results: Vec<String> = Vec::new();
    let mut format_out = String::new();

    while pos < input.len() {
        if in_string {
            // Inside a single-quoted string; '' escapes a quote.
            match find_string_end(&input[pos..]) {
                Some(offset) => {
                    in_string = false;
                    pos += offset;
                }
                None => return Err(ExpressionError::UnclosedString),
            }
        } else if let Some(start) = expr_start {
            let mut expr_end = input[pos..].find("}}");
            let mut string_start = input[pos..].find('\'');
            if let (Some(e), Some(s)) = (expr_end, string_start) {
                // Whichever comes first decides what we are looking at.
                if e < s {
                    string_start = None;
                } else {
                    expr_end = None;
                }
            }
            if let Some(e) = expr_end {
                format_out.push_str(&format!("{{{}}}", results.len()));
                results.push(input[start..pos + e].trim().to_string());
                pos += e + 2;
                expr_start = None;
            } else if let Some(s) = string_start {
                pos += s + 1;
                in_string = true;
            } else {
                return Err(ExpressionError::UnclosedExpression);
            }
        } else {
            match input[pos..].find("${{") {
                Some(offset) => {
                    format_out.push_str(&escape_format_string(&input[pos..pos + offset]));
                    expr_start = Some(pos + offset + 3);
                    pos += offset + 3;
                }
                None => {
                    format_out.push_str(&escape_format_string(&input[pos..]));
                    pos = input.len();
                }
            }
        }
    }
    if expr_start.is_some() || in_string {
        return Err(if in_string {
            ExpressionError::UnclosedString
        } else {
            ExpressionError::UnclosedExpression
        });
    }

    if results.len() == 1 && format_out == "{0}" && !force_format {
        return Ok((results.remove(0), true));
    }

    let out = format!(
        "format('{}', {})",
        format_out.replace('\'', "''"),
        results.join(", ")
    );
    Ok((out, true))
}

/// Double braces so literal text survives `format` expansion.
fn escape_format_string(input: &str) -> String {
    input.replace('{', "{{").replace('}', "}}")
}

/// Offset just past the closing quote of a single-quoted string whose
/// opening quote was already consumed.
fn find_string_end(input: &str) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_expression() {
        let (out, is_expr) = rewrite_sub_expression("Hello world", false).unwrap();
        assert!(!is_expr);
        assert_eq!(out, "Hello world");
    }

    #[test]
    fn test_single_expression_with_literal() {
        let (out, is_expr) = rewrite_sub_expression("Hello ${{ 'world' }}", false).unwrap();
        assert!(is_expr);
        assert_eq!(out, "format('Hello {0}', 'world')");
    }

    #[test]
    fn test_multiple_expressions() {
        let (out, is_expr) =
            rewrite_sub_expression("Hello ${{ 'world' }}, you are ${{ 'awesome' }}", false)
                .unwrap();
        assert!(is_expr);
        assert_eq!(
            out,
            "format('Hello {0}, you are {1}', 'world', 'awesome')"
        );
    }

    #[test]
    fn test_bare_expression_passes_through() {
        let (out, is_expr) = rewrite_sub_expression("${{ github.ref_name }}", false).unwrap();
        assert!(is_expr);
        assert_eq!(out, "github.ref_name");
    }

    #[test]
    fn test_force_format() {
        let (out, is_expr) = rewrite_sub_expression("${{ github.ref_name }}", true).unwrap();
        assert!(is_expr);
        assert_eq!(out, "format('{0}', github.ref_name)");
    }

    #[test]
    fn test_force_format_matches_unforced_with_literal() {
        let input = "Hello ${{ 'world' }}!";
        let unforced = rewrite_sub_expression(input, false).unwrap();
        let forced = rewrite_sub_expression(input, true).unwrap();
        assert_eq!(unforced, forced);
    }

    #[test]
    fn test_escaped_string_literal() {
        let (out, is_expr) =
            rewrite_sub_expression("Hello ${{ 'It''s a test' }}", false).unwrap();
        assert!(is_expr);
        assert_eq!(out, "format('Hello {0}', 'It''s a test')");
    }

    #[test]
    fn test_literal_quotes_escape_in_format_string() {
        let (out, _) = rewrite_sub_expression("it's ${{ 1 }}", false).unwrap();
        assert_eq!(out, "format('it''s {0}', 1)");
    }

    #[test]
    fn test_literal_braces_escape() {
        let (out, _) = rewrite_sub_expression("a{b} ${{ 1 }}", false).unwrap();
        assert_eq!(out, "format('a{{b}} {0}', 1)");
    }

    #[test]
    fn test_unclosed_expression() {
        let err = rewrite_sub_expression("Hello ${{ 'world' ", false).unwrap_err();
        assert_eq!(err, ExpressionError::UnclosedExpression);
    }

    #[test]
    fn test_unclosed_string() {
        let err =
            rewrite_sub_expression("Hello ${{ 'world }}, you are ${{ 'awesome' }}", false)
                .unwrap_err();
        assert_eq!(err, ExpressionError::UnclosedString);
    }

    #[test]
    fn test_close_braces_inside_string_ignored() {
        let (out, _) = rewrite_sub_expression("v: ${{ 'a}}b' }}", false).unwrap();
        assert_eq!(out, "format('v: {0}', 'a}}b')");
    }

    #[test]
    fn test_expression_not_at_end() {
        let (out, _) =
            rewrite_sub_expression("Hello ${{ 'world' }}, how are you?", false).unwrap();
        assert_eq!(out, "format('Hello {0}, how are you?', 'world')");
    }
}
