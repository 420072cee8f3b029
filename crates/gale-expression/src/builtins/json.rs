//! `fromJson` and `toJson`.

use crate::builtins::check_arg_count;
use crate::core::ast::Expr;
use crate::core::error::{ExpressionError, ExpressionResult};
use crate::eval::Evaluator;
use gale_value::Value;

/// `fromJson(s)`: parse the string form of the argument as JSON and
/// canonicalize the result.
pub fn from_json(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_arg_count("fromJson", args, 1)?;
    let input = eval.evaluate(&args[0])?.to_display_string();
    let json: serde_json::Value =
        serde_json::from_str(&input).map_err(|e| ExpressionError::Json(e.to_string()))?;
    Ok(gale_value::from_json(&json))
}

/// `toJson(v)`: serialize the materialized value with stable, 2-space
/// indented output; mapping keys keep their insertion order.
pub fn to_json(eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
    check_arg_count("toJson", args, 1)?;
    let value = eval.evaluate(&args[0])?;
    let raw = eval.to_raw(value);
    let text = gale_value::to_json_string(&raw, 2)?;
    Ok(Value::String(text))
}
