#![warn(clippy::all)]
#![warn(missing_docs)]

//! # gale-expression
//!
//! Expression language engine for `${{ … }}` workflow expressions.
//!
//! The engine reproduces the small expression language used inside CI
//! workflow files: single-quoted strings, JavaScript-like abstract
//! equality and coercion, case-insensitive property lookup, the `.*`
//! filtered-array wildcard, and a fixed set of builtin functions.
//!
//! ## Quick start
//!
//! ```
//! use gale_expression::{EvaluationContext, Evaluator};
//! use gale_value::Value;
//!
//! let mut ctx = EvaluationContext::standard();
//! ctx.set_variable("a", Value::number(5.0));
//! ctx.set_variable("b", Value::number(3.0));
//!
//! let eval = Evaluator::new(&ctx);
//! assert_eq!(eval.evaluate_raw("1 == 1").unwrap(), Value::boolean(true));
//! assert!(!eval.evaluate_boolean("!(a > b) || !(1)").unwrap());
//! ```
//!
//! ## Templates
//!
//! Literal strings with embedded `${{ … }}` segments rewrite into a
//! single `format(...)` expression:
//!
//! ```
//! use gale_expression::rewrite_sub_expression;
//!
//! let (expr, is_expr) =
//!     rewrite_sub_expression("Hello ${{ 'world' }}", false).unwrap();
//! assert!(is_expr);
//! assert_eq!(expr, "format('Hello {0}', 'world')");
//! ```
//!
//! ## External functions
//!
//! Consumers add functions (for example `hashFiles`, or the status
//! predicates bound to a running job) by registering callables on the
//! context's [`FunctionRegistry`]:
//!
//! ```
//! use gale_expression::{EvaluationContext, Evaluator, Expr, ExpressionResult};
//! use gale_value::Value;
//!
//! let mut ctx = EvaluationContext::standard();
//! ctx.functions.register(
//!     "hashfiles",
//!     |eval: &Evaluator<'_>, args: &[Expr]| -> ExpressionResult<Value> {
//!         let _pattern = eval.evaluate(&args[0])?.to_display_string();
//!         Ok(Value::string("d41d8cd9"))
//!     },
//! );
//! ```

pub mod builtins;
pub mod context;
pub mod core;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod template;

pub use crate::builtins::status::{register_status_functions, StatusScope, StatusSource};
pub use crate::context::{EvaluationContext, ExpressionFunction, FunctionRegistry};
pub use crate::core::ast::{BinaryOp, Expr, UnaryOp};
pub use crate::core::error::{ExpressionError, ExpressionResult};
pub use crate::core::token::{Token, TokenKind};
pub use crate::eval::Evaluator;
pub use crate::parser::parse;
pub use crate::template::rewrite_sub_expression;

// Re-export the value types for convenience
pub use gale_value::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        EvaluationContext, Evaluator, Expr, ExpressionError, ExpressionFunction,
        ExpressionResult, FunctionRegistry, Value, parse, rewrite_sub_expression,
    };
}
