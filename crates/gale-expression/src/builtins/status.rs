//! Status predicates: `success`, `failure`, `always`, `cancelled`.
//!
//! These are not standard builtins; they are bound by the caller against
//! a concrete view of the running job or step. In step scope the
//! predicates read the current job status; in job scope `success` and
//! `failure` consult the results of the job's transitive needs, which the
//! caller resolves ahead of time.

use std::sync::Arc;

use crate::context::FunctionRegistry;
use crate::core::ast::Expr;
use crate::core::error::ExpressionResult;
use crate::eval::Evaluator;
use gale_value::Value;

/// Which kind of condition the predicates are evaluated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusScope {
    /// A job-level `if:` condition
    Job,
    /// A step-level `if:` condition
    Step,
}

/// The status view the predicates are resolved against
#[derive(Debug, Clone)]
pub struct StatusSource {
    /// The scope the condition belongs to
    pub scope: StatusScope,
    /// Current status of the enclosing job (`success`, `failure`,
    /// `cancelled`, …)
    pub status: String,
    /// Results of the job's transitive needs; only consulted in job scope
    pub needs_results: Vec<String>,
}

impl StatusSource {
    /// A step-scope source with the given job status
    pub fn step(status: impl Into<String>) -> Self {
        Self {
            scope: StatusScope::Step,
            status: status.into(),
            needs_results: Vec::new(),
        }
    }

    /// A job-scope source with the given status and transitive-needs
    /// results
    pub fn job(status: impl Into<String>, needs_results: Vec<String>) -> Self {
        Self {
            scope: StatusScope::Job,
            status: status.into(),
            needs_results,
        }
    }

    fn success(&self) -> bool {
        match self.scope {
            StatusScope::Step => self.status == "success",
            StatusScope::Job => self.needs_results.iter().all(|r| r == "success"),
        }
    }

    fn failure(&self) -> bool {
        match self.scope {
            StatusScope::Step => self.status == "failure",
            StatusScope::Job => self.needs_results.iter().any(|r| r == "failure"),
        }
    }

    fn cancelled(&self) -> bool {
        self.status == "cancelled"
    }
}

/// Bind the four status predicates on `registry` against `source`
pub fn register_status_functions(registry: &mut FunctionRegistry, source: StatusSource) {
    let source = Arc::new(source);

    registry.register(
        "always",
        |_: &Evaluator<'_>, _: &[Expr]| -> ExpressionResult<Value> {
            Ok(Value::boolean(true))
        },
    );

    let src = Arc::clone(&source);
    registry.register(
        "success",
        move |_: &Evaluator<'_>, _: &[Expr]| -> ExpressionResult<Value> {
            Ok(Value::boolean(src.success()))
        },
    );

    let src = Arc::clone(&source);
    registry.register(
        "failure",
        move |_: &Evaluator<'_>, _: &[Expr]| -> ExpressionResult<Value> {
            Ok(Value::boolean(src.failure()))
        },
    );

    let src = Arc::clone(&source);
    registry.register(
        "cancelled",
        move |_: &Evaluator<'_>, _: &[Expr]| -> ExpressionResult<Value> {
            Ok(Value::boolean(src.cancelled()))
        },
    );
}
