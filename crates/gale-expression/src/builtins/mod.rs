//! Built-in functions of the expression language.
//!
//! All builtins are registered under folded names and resolved
//! case-insensitively. The status predicates (`success`, `failure`,
//! `always`, `cancelled`) are not part of the standard set; they are
//! bound by the caller against a concrete status view, see [`status`].

pub mod flow;
pub mod format;
pub mod json;
pub mod status;
pub mod string;

use crate::context::FunctionRegistry;
use crate::core::ast::Expr;
use crate::core::error::{ExpressionError, ExpressionResult};

/// Register the standard builtin functions on `registry`
pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry.register("fromjson", json::from_json);
    registry.register("tojson", json::to_json);
    registry.register("contains", string::contains);
    registry.register("startswith", string::starts_with);
    registry.register("endswith", string::ends_with);
    registry.register("format", format::format);
    registry.register("join", string::join);
    registry.register("case", flow::case);
}

/// Check that a call received exactly `expected` arguments
pub(crate) fn check_arg_count(
    func_name: &str,
    args: &[Expr],
    expected: usize,
) -> ExpressionResult<()> {
    if args.len() != expected {
        return Err(ExpressionError::invalid_argument(
            func_name,
            format!("expected {} arguments, got {}", expected, args.len()),
        ));
    }
    Ok(())
}

/// Check that a call received at least `min` arguments
pub(crate) fn check_min_arg_count(
    func_name: &str,
    args: &[Expr],
    min: usize,
) -> ExpressionResult<()> {
    if args.len() < min {
        return Err(ExpressionError::invalid_argument(
            func_name,
            format!("expected at least {} arguments, got {}", min, args.len()),
        ));
    }
    Ok(())
}
