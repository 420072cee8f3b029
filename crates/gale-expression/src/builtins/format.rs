//! The `format` builtin and its format-string engine.

use crate::builtins::check_min_arg_count;
use crate::core::ast::Expr;
use crate::core::error::{ExpressionError, ExpressionResult};
use crate::eval::Evaluator;
use gale_value::Value;

/// `format(fmt, ...)`: replace `{i}` with the string form of argument i.
///
/// `{{` and `}}` escape to literal braces. A `{i:spec}` format specifier
/// is parsed and ignored (reserved). Out-of-range indices and malformed
/// placeholders are errors.
pub fn format(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_min_arg_count("format", args, 1)?;
    let fmt = eval.evaluate(&args[0])?.to_display_string();
    let mut values = Vec::with_capacity(args.len().saturating_sub(1));
    for arg in &args[1..] {
        values.push(eval.evaluate(arg)?.to_display_string());
    }
    Ok(Value::String(format_string(&fmt, &values)?))
}

/// Expand a format string against pre-rendered arguments.
pub(crate) fn format_string(fmt: &str, args: &[String]) -> ExpressionResult<String> {
    let bytes = fmt.as_bytes();
    let mut out = String::with_capacity(fmt.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if bytes.get(i + 1) == Some(&b'{') {
                    out.push('{');
                    i += 2;
                    continue;
                }
                let (index, next) = read_arg_index(fmt, i + 1)
                    .ok_or_else(|| invalid(fmt))?;
                let next = read_format_specifier(fmt, next).ok_or_else(|| invalid(fmt))?;
                let arg = args.get(index).ok_or_else(|| {
                    ExpressionError::invalid_argument(
                        "format",
                        std::format!("argument index {} out of range", index),
                    )
                })?;
                out.push_str(arg);
                i = next;
            }
            b'}' => {
                if bytes.get(i + 1) == Some(&b'}') {
                    out.push('}');
                    i += 2;
                    continue;
                }
                return Err(invalid(fmt));
            }
            _ => {
                // Copy everything up to the next brace in one slice.
                let rest = &fmt[i..];
                let stop = rest
                    .find(['{', '}'])
                    .unwrap_or(rest.len());
                out.push_str(&rest[..stop]);
                i += stop;
            }
        }
    }
    Ok(out)
}

fn invalid(fmt: &str) -> ExpressionError {
    ExpressionError::invalid_argument("format", std::format!("invalid format string: {}", fmt))
}

/// Parse the decimal argument index starting at `pos`; returns the index
/// and the position after the last digit.
fn read_arg_index(fmt: &str, pos: usize) -> Option<(usize, usize)> {
    let bytes = fmt.as_bytes();
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == pos {
        return None;
    }
    let index = fmt[pos..end].parse().ok()?;
    Some((index, end))
}

/// Parse an optional `:spec` block ending at `}`; returns the position
/// after the closing brace.
fn read_format_specifier(fmt: &str, pos: usize) -> Option<usize> {
    let bytes = fmt.as_bytes();
    match bytes.get(pos)? {
        b'}' => Some(pos + 1),
        b':' => {
            let mut end = pos + 1;
            while end < bytes.len() {
                if bytes[end] == b'}' {
                    return Some(end + 1);
                }
                end += 1;
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(template: &str, args: &[&str]) -> ExpressionResult<String> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        format_string(template, &owned)
    }

    #[test]
    fn test_substitution() {
        assert_eq!(fmt("Hello {0}", &["world"]).unwrap(), "Hello world");
        assert_eq!(fmt("{1}{0}", &["a", "b"]).unwrap(), "ba");
        assert_eq!(fmt("{0}{0}", &["x"]).unwrap(), "xx");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(fmt("{{0}}", &[]).unwrap(), "{0}");
        assert_eq!(fmt("a{{b}}c", &[]).unwrap(), "a{b}c");
    }

    #[test]
    fn test_specifier_ignored() {
        assert_eq!(fmt("{0:D}", &["5"]).unwrap(), "5");
    }

    #[test]
    fn test_out_of_range_index() {
        let err = fmt("{1}", &["only"]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_malformed_placeholders() {
        assert!(fmt("{", &[]).is_err());
        assert!(fmt("}", &[]).is_err());
        assert!(fmt("{x}", &[]).is_err());
        assert!(fmt("{0", &["a"]).is_err());
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(fmt("no placeholders", &[]).unwrap(), "no placeholders");
    }
}
