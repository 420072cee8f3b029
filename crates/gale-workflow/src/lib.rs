#![warn(clippy::all)]
#![warn(missing_docs)]

//! # gale-workflow
//!
//! Schema-driven evaluation of CI workflow documents.
//!
//! This crate ties the expression engine to workflow files: it loads YAML
//! into a position-aware document tree, validates the tree against a
//! declarative schema (shapes, required properties, allowed values, and
//! statically-checked `${{ … }}` expressions), selectively evaluates
//! expression placeholders as context becomes available, and expands
//! `strategy.matrix` blocks into concrete job rows.
//!
//! ## Validating a workflow
//!
//! ```
//! use gale_workflow::document::parse_document;
//! use gale_workflow::schema::{workflow_schema, SchemaNode};
//!
//! let doc = parse_document(
//!     "on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n    - run: echo hi\n",
//! )
//! .unwrap();
//! let root = SchemaNode::new(workflow_schema(), "workflow-root-strict");
//! assert!(root.validate(&doc).is_ok());
//! ```
//!
//! ## Evaluating templates
//!
//! Scalars whose expressions reference unavailable context are tagged and
//! left verbatim; a later pass with `restrict_eval` set resolves exactly
//! those pre-approved sites and nothing else.

pub mod document;
pub mod evaluate;
pub mod schema;
pub mod strategy;

pub use crate::document::{parse_document, DocumentError, DocumentNode, NodeContent, Tag};
pub use crate::evaluate::{EvaluateError, TemplateEvaluator};
pub use crate::schema::{
    action_schema, workflow_schema, Schema, SchemaNode, ValidationError, ValidationErrors,
    ValidationKind,
};
pub use crate::strategy::{
    default_display_suffix, expand_strategy, LogTracer, NullTracer, Strategy, StrategyError,
    StrategyResult, Tracer,
};

// Re-export the engine types callers need to build evaluation contexts
pub use gale_expression::{
    register_status_functions, EvaluationContext, Evaluator, StatusScope, StatusSource,
};
pub use gale_value::Value;
