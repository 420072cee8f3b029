//! String and collection builtins: `contains`, `startsWith`, `endsWith`,
//! and `join`.

use crate::builtins::{check_arg_count, check_min_arg_count};
use crate::core::ast::Expr;
use crate::core::error::ExpressionResult;
use crate::eval::Evaluator;
use gale_value::{abstract_eq, Value};

/// `contains(haystack, needle)`.
///
/// Arrays report whether any element is abstract-equal to the needle;
/// other collections report false; everything else falls back to an
/// ASCII-case-insensitive substring test on the string forms.
pub fn contains(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_arg_count("contains", args, 2)?;
    let haystack = eval.evaluate(&args[0])?;
    let needle = eval.evaluate(&args[1])?;

    if haystack.is_collection() {
        if let Some(items) = haystack.as_array() {
            for item in items {
                if abstract_eq(item, &needle) {
                    return Ok(Value::boolean(true));
                }
            }
        }
        return Ok(Value::boolean(false));
    }

    let haystack = haystack.to_display_string().to_ascii_lowercase();
    let needle = needle.to_display_string().to_ascii_lowercase();
    Ok(Value::boolean(haystack.contains(&needle)))
}

/// `startsWith(string, prefix)`: case-insensitive prefix test
pub fn starts_with(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_arg_count("startsWith", args, 2)?;
    let subject = eval.evaluate(&args[0])?.to_display_string().to_ascii_lowercase();
    let prefix = eval.evaluate(&args[1])?.to_display_string().to_ascii_lowercase();
    Ok(Value::boolean(subject.starts_with(&prefix)))
}

/// `endsWith(string, suffix)`: case-insensitive suffix test
pub fn ends_with(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_arg_count("endsWith", args, 2)?;
    let subject = eval.evaluate(&args[0])?.to_display_string().to_ascii_lowercase();
    let suffix = eval.evaluate(&args[1])?.to_display_string().to_ascii_lowercase();
    Ok(Value::boolean(subject.ends_with(&suffix)))
}

/// `join(collection, separator = ",")`.
///
/// Arrays join their elements' string forms. Primitives pass through as
/// their own string form. Other collections join to the empty string.
pub fn join(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_min_arg_count("join", args, 1)?;
    let collection = eval.evaluate(&args[0])?;
    let separator = match args.get(1) {
        Some(arg) => eval.evaluate(arg)?.to_display_string(),
        None => ",".to_string(),
    };

    if collection.is_collection() {
        let joined = match collection.as_array() {
            Some(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<Vec<_>>()
                .join(&separator),
            None => String::new(),
        };
        return Ok(Value::String(joined));
    }
    Ok(Value::String(collection.to_display_string()))
}
