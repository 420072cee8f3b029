//! Evaluation context: variables and functions an expression can see.

use std::collections::HashMap;
use std::sync::Arc;

use crate::builtins;
use crate::core::ast::Expr;
use crate::core::error::ExpressionResult;
use crate::eval::Evaluator;
use gale_value::{Object, Value};

/// A callable bound into the expression language.
///
/// Implementations receive the *unevaluated* argument nodes and decide
/// which to evaluate; this is what lets `case` skip unselected branches.
/// Plain functions and closures implement the trait automatically.
pub trait ExpressionFunction: Send + Sync {
    /// Evaluate a call with the given argument nodes
    fn evaluate(&self, eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value>;
}

impl<F> ExpressionFunction for F
where
    F: for<'e> Fn(&Evaluator<'e>, &[Expr]) -> ExpressionResult<Value> + Send + Sync,
{
    fn evaluate(&self, eval: &Evaluator<'_>, args: &[Expr]) -> ExpressionResult<Value> {
        self(eval, args)
    }
}

/// Registry of callable functions, resolved case-insensitively
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ExpressionFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all standard builtin functions
    pub fn standard() -> Self {
        let mut registry = Self::new();
        builtins::register_builtins(&mut registry);
        registry
    }

    /// Register a function under `name` (stored folded; lookup is
    /// case-insensitive)
    pub fn register<F: ExpressionFunction + 'static>(&mut self, name: &str, func: F) {
        self.functions
            .insert(name.to_ascii_lowercase(), Arc::new(func));
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ExpressionFunction>> {
        self.functions.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Whether `name` resolves to a function
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_lowercase())
    }

    /// All registered names, folded
    pub fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

/// Evaluation context containing the variables and functions visible to
/// an expression.
///
/// The context is caller-owned and read-only for the duration of a call;
/// distinct contexts may evaluate concurrently.
#[derive(Clone, Debug, Default)]
pub struct EvaluationContext {
    /// Named values, resolved case-insensitively
    pub variables: Object,
    /// Callable functions, resolved case-insensitively
    pub functions: FunctionRegistry,
}

impl EvaluationContext {
    /// Create an empty context with no variables and no functions
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with the standard builtin functions registered
    pub fn standard() -> Self {
        Self {
            variables: Object::new(),
            functions: FunctionRegistry::standard(),
        }
    }

    /// Set a variable
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_case_insensitive() {
        let registry = FunctionRegistry::standard();
        assert!(registry.contains("fromJson"));
        assert!(registry.contains("FROMJSON"));
        assert!(registry.contains("tojson"));
        assert!(!registry.contains("hashFiles"));
    }

    #[test]
    fn test_register_closure() {
        let mut registry = FunctionRegistry::new();
        registry.register(
            "three",
            |_: &Evaluator<'_>, _: &[Expr]| -> ExpressionResult<Value> {
                Ok(Value::number(3.0))
            },
        );
        assert!(registry.contains("THREE"));
    }

    #[test]
    fn test_context_variables_fold_case() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("GitHub", Value::object_empty());
        assert!(ctx.variables.contains_key("github"));
    }
}
