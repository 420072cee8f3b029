//! AST evaluation.
//!
//! Evaluation is single-threaded and runs to completion in the caller's
//! thread; one [`Evaluator`] borrows one read-only context. Logical
//! operators short-circuit and return the actual operand, dereference and
//! index operations distribute over filtered (wildcard) enumerations, and
//! comparisons follow the abstract coercion table in `gale-value`.

use crate::context::EvaluationContext;
use crate::core::ast::{BinaryOp, Expr, UnaryOp};
use crate::core::error::{ExpressionError, ExpressionResult};
use crate::parser;
use gale_value::{abstract_eq, abstract_gt, abstract_lt, Array, Object, Value};
use tracing::trace;

/// Evaluator for expression ASTs
pub struct Evaluator<'a> {
    ctx: &'a EvaluationContext,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over the given context
    pub fn new(ctx: &'a EvaluationContext) -> Self {
        Self { ctx }
    }

    /// The context this evaluator resolves against
    pub fn context(&self) -> &EvaluationContext {
        self.ctx
    }

    /// Evaluate a parsed expression tree
    pub fn evaluate(&self, expr: &Expr) -> ExpressionResult<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),

            Expr::NamedValue(name) => self
                .ctx
                .variables
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UndefinedVariable(name.clone())),

            // Property names and wildcards evaluate to their raw text when
            // they appear in plain value position.
            Expr::PropertyName(name) => Ok(Value::string(name.clone())),
            Expr::Wildcard => Ok(Value::string("*")),

            Expr::Function { name, args } => {
                let func = self
                    .ctx
                    .functions
                    .get(name)
                    .ok_or_else(|| ExpressionError::UnknownFunction(name.clone()))?;
                func.evaluate(self, args)
            }

            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let value = self.evaluate(operand)?;
                Ok(Value::boolean(!value.is_truthy()))
            }

            Expr::Binary { op, left, right } => self.evaluate_binary(*op, left, right),
        }
    }

    /// Parse and evaluate `source`, returning its truthiness
    pub fn evaluate_boolean(&self, source: &str) -> ExpressionResult<bool> {
        let root = parser::parse(source)?;
        let result = self.evaluate(&root)?;
        Ok(result.is_truthy())
    }

    /// Parse and evaluate `source`, returning the materialized raw value
    pub fn evaluate_raw(&self, source: &str) -> ExpressionResult<Value> {
        trace!(expression = source, "evaluating expression");
        let root = parser::parse(source)?;
        let result = self.evaluate(&root)?;
        Ok(self.to_raw(result))
    }

    /// Materialize a result into plain values: filtered enumerations
    /// become ordinary arrays, recursively.
    pub fn to_raw(&self, value: Value) -> Value {
        match value {
            Value::Filtered(items) | Value::Array(items) => Value::Array(
                items.iter().map(|v| self.to_raw(v.clone())).collect(),
            ),
            Value::Object(obj) => {
                let mut out = Object::with_case(obj.case());
                for (key, item) in &obj {
                    out.insert(key.clone(), self.to_raw(item.clone()));
                }
                Value::Object(out)
            }
            primitive => primitive,
        }
    }

    fn evaluate_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> ExpressionResult<Value> {
        let left_val = self.evaluate(left)?;

        // Short-circuits return the actual operand, not a coerced boolean.
        match op {
            BinaryOp::And if !left_val.is_truthy() => return Ok(left_val),
            BinaryOp::Or if left_val.is_truthy() => return Ok(left_val),
            BinaryOp::Deref if matches!(right, Expr::Wildcard) => {
                return Ok(self.enumerate_wildcard(&left_val));
            }
            _ => {}
        }

        let right_val = self.evaluate(right)?;
        match op {
            BinaryOp::And | BinaryOp::Or => Ok(right_val),
            BinaryOp::Eq => Ok(Value::boolean(abstract_eq(&left_val, &right_val))),
            BinaryOp::Ne => Ok(Value::boolean(!abstract_eq(&left_val, &right_val))),
            BinaryOp::Gt => Ok(Value::boolean(abstract_gt(&left_val, &right_val))),
            BinaryOp::Lt => Ok(Value::boolean(abstract_lt(&left_val, &right_val))),
            BinaryOp::Ge => Ok(Value::boolean(
                abstract_eq(&left_val, &right_val) || abstract_gt(&left_val, &right_val),
            )),
            BinaryOp::Le => Ok(Value::boolean(
                abstract_eq(&left_val, &right_val) || abstract_lt(&left_val, &right_val),
            )),
            BinaryOp::Deref | BinaryOp::Index => Ok(self.access(&left_val, &right_val)),
        }
    }

    /// `.*`: enumerate the children of `value` into a filtered array.
    ///
    /// An existing filtered array flattens each of its elements instead,
    /// which is what makes wildcard chains like `a.*.b.*` work.
    fn enumerate_wildcard(&self, value: &Value) -> Value {
        let mut out = Array::new();
        match value {
            Value::Filtered(items) => {
                for item in items {
                    collect_children(item, &mut out);
                }
            }
            other => collect_children(other, &mut out),
        }
        Value::Filtered(out)
    }

    /// `.prop` / `[key]`: apply a key to a collection, distributing over
    /// filtered arrays and dropping null results.
    fn access(&self, left: &Value, key: &Value) -> Value {
        if let Value::Filtered(items) = left {
            let mut out = Array::new();
            for item in items {
                let result = process_index(item, key);
                if !result.is_null() {
                    out.push(result);
                }
            }
            if out.is_empty() {
                return Value::Null;
            }
            return Value::Filtered(out);
        }
        process_index(left, key)
    }
}

fn collect_children(value: &Value, out: &mut Array) {
    match value {
        Value::Array(items) | Value::Filtered(items) => out.extend_from(items),
        Value::Object(obj) => {
            for item in obj.values() {
                out.push(item.clone());
            }
        }
        _ => {}
    }
}

/// Apply `key` to a single collection value.
///
/// Mappings require a string key (resolved per the mapping's case mode);
/// arrays require a number in `[0, len)`. Everything else yields null.
fn process_index(collection: &Value, key: &Value) -> Value {
    match collection {
        Value::Object(obj) => match key {
            Value::String(name) => obj.get(name).cloned().unwrap_or(Value::Null),
            _ => Value::Null,
        },
        Value::Array(items) | Value::Filtered(items) => match key {
            Value::Number(n) if *n >= 0.0 => {
                let index = *n as usize;
                items.get(index).cloned().unwrap_or(Value::Null)
            }
            _ => Value::Null,
        },
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_circuit_returns_operand() {
        let ctx = EvaluationContext::standard();
        let eval = Evaluator::new(&ctx);
        assert_eq!(
            eval.evaluate_raw("'left' && 'right'").unwrap(),
            Value::string("right")
        );
        assert_eq!(
            eval.evaluate_raw("'left' || 'right'").unwrap(),
            Value::string("left")
        );
        assert_eq!(eval.evaluate_raw("0 && 'right'").unwrap(), Value::number(0.0));
    }

    #[test]
    fn test_undefined_variable() {
        let ctx = EvaluationContext::standard();
        let eval = Evaluator::new(&ctx);
        let err = eval.evaluate_raw("missing").unwrap_err();
        assert_eq!(
            err,
            ExpressionError::UndefinedVariable("missing".to_string())
        );
    }

    #[test]
    fn test_unknown_function() {
        let ctx = EvaluationContext::standard();
        let eval = Evaluator::new(&ctx);
        let err = eval.evaluate_raw("nope()").unwrap_err();
        assert_eq!(err, ExpressionError::UnknownFunction("nope".to_string()));
    }

    #[test]
    fn test_null_variable_is_defined() {
        let mut ctx = EvaluationContext::standard();
        ctx.set_variable("maybe", Value::Null);
        let eval = Evaluator::new(&ctx);
        assert_eq!(eval.evaluate_raw("maybe").unwrap(), Value::Null);
    }

    #[test]
    fn test_index_truncates_fractions() {
        let ctx = EvaluationContext::standard();
        let eval = Evaluator::new(&ctx);
        assert_eq!(
            eval.evaluate_raw("fromjson('[\"a\",\"b\"]')[1.5]").unwrap(),
            Value::string("b")
        );
    }
}
