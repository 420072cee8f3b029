//! Schema-guided template evaluation of workflow documents.
//!
//! The evaluator walks a parsed document alongside its schema, rewrites
//! scalars containing `${{ … }}` into expressions, and evaluates the ones
//! whose names the evaluation context can resolve. Everything else is
//! left verbatim: a scalar whose expression cannot be resolved yet is
//! tagged as a deferred expression site so a later pass, run when more
//! variables are known, can pick it up. In restricted mode only those
//! pre-tagged sites are eligible for mutation.
//!
//! Two compatibility rules from the workflow ecosystem are honored here:
//! a mapping key matching `${{ insert }}` splices its mapping value into
//! the parent, and a sequence element that evaluates *into* a sequence
//! (without having been one) flattens into the parent.

use thiserror::Error;
use tracing::trace;

use crate::document::{DocumentNode, NodeContent, Tag};
use crate::schema::validate::INSERT_DIRECTIVE;
use crate::schema::{SchemaNode, ValidationErrors};
use gale_expression::{
    parse, rewrite_sub_expression, EvaluationContext, Evaluator, Expr, ExpressionError,
};

/// Errors raised while evaluating a document
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EvaluateError {
    /// An expression failed to parse or evaluate
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// An evaluated value no longer matches its definition
    #[error("schema validation failed:\n{0}")]
    Validation(#[from] ValidationErrors),

    /// An insert directive produced something other than a mapping
    #[error("cannot insert {found} into mapping at line {line} column {column}: expected a mapping")]
    InsertNotAMapping {
        /// What the directive value evaluated to
        found: &'static str,
        /// 1-based line of the directive value
        line: usize,
        /// 1-based column of the directive value
        column: usize,
    },
}

/// Schema-guided template evaluator
#[derive(Debug, Default)]
pub struct TemplateEvaluator {
    /// Only mutate scalars tagged as pre-approved expression sites
    pub restrict_eval: bool,
    /// Variables and functions expressions resolve against
    pub context: EvaluationContext,
}

impl TemplateEvaluator {
    /// Create an evaluator over the given context
    pub fn new(context: EvaluationContext) -> Self {
        Self {
            restrict_eval: false,
            context,
        }
    }

    /// Evaluate `node` in place under `schema_node`
    pub fn evaluate_node(
        &self,
        node: &mut DocumentNode,
        schema_node: &SchemaNode<'_>,
    ) -> Result<(), EvaluateError> {
        if let Some(rewritten) = self.evaluate_internal(node, Some(schema_node))? {
            *node = rewritten;
        }
        Ok(())
    }

    fn evaluate_internal(
        &self,
        node: &DocumentNode,
        schema_node: Option<&SchemaNode<'_>>,
    ) -> Result<Option<DocumentNode>, EvaluateError> {
        match &node.content {
            NodeContent::Scalar { .. } => self.evaluate_scalar(node, schema_node, true),
            NodeContent::Mapping(_) => self.evaluate_mapping(node, schema_node),
            NodeContent::Sequence(_) => self.evaluate_sequence(node, schema_node),
        }
    }

    /// Evaluate one scalar. Returns the replacement node, or `None` when
    /// the scalar stays untouched.
    fn evaluate_scalar(
        &self,
        node: &DocumentNode,
        schema_node: Option<&SchemaNode<'_>>,
        revalidate: bool,
    ) -> Result<Option<DocumentNode>, EvaluateError> {
        let Some(schema_node) = schema_node else {
            return Ok(None);
        };
        let Some(text) = node.scalar_value() else {
            return Ok(None);
        };

        let (expression, is_expr) = rewrite_sub_expression(text, false)?;

        // Whole-value expression strings (`if:` conditions) belong to the
        // runner, which binds the status predicates; leave them alone.
        let definition = schema_node.schema.definition(&schema_node.definition);
        let is_condition = definition
            .string
            .as_ref()
            .is_some_and(|s| s.is_expression);
        if !is_expr || is_condition {
            return Ok(None);
        }
        if self.restrict_eval && node.tag != Tag::Expr {
            return Ok(None);
        }

        let root = parse(&expression)?;
        if !self.can_evaluate(&root, schema_node) {
            // Something referenced is not known yet; mark the site so a
            // later, restricted pass can resolve it.
            trace!(expression = %expression, "deferring expression");
            let mut deferred = node.clone();
            deferred.tag = Tag::Expr;
            return Ok(Some(deferred));
        }

        let evaluator = Evaluator::new(&self.context);
        let value = evaluator.evaluate(&root)?;
        let raw = evaluator.to_raw(value);
        let replacement = DocumentNode::from_value(&raw, node.line, node.column);
        if revalidate {
            schema_node.validate(&replacement)?;
        }
        Ok(Some(replacement))
    }

    /// Whether the evaluation context can support this expression site.
    ///
    /// Every variable and function the definition's context declares must
    /// be resolvable, not only the referenced ones. A site whose context
    /// promises `matrix` stays deferred until the caller actually binds a
    /// matrix, even if this particular expression never mentions it.
    fn can_evaluate(&self, root: &Expr, schema_node: &SchemaNode<'_>) -> bool {
        for variable in schema_node.variables() {
            if !self.context.variables.contains_key(&variable) {
                return false;
            }
        }
        for function in schema_node.functions() {
            if !self.context.functions.contains(&function.name) {
                return false;
            }
        }
        let mut ok = true;
        root.visit(&mut |node| match node {
            Expr::Function { name, .. } => {
                ok = ok && self.context.functions.contains(name);
            }
            Expr::NamedValue(name) => {
                ok = ok && self.context.variables.contains_key(name);
            }
            _ => {}
        });
        ok
    }

    fn evaluate_mapping(
        &self,
        node: &DocumentNode,
        schema_node: Option<&SchemaNode<'_>>,
    ) -> Result<Option<DocumentNode>, EvaluateError> {
        let Some(entries) = node.as_mapping() else {
            return Ok(None);
        };

        let mut out: Vec<(DocumentNode, DocumentNode)> = Vec::with_capacity(entries.len());
        let mut changed = false;

        for (key, value) in entries {
            let key_text = key.scalar_value().unwrap_or_default();
            let should_insert = INSERT_DIRECTIVE.is_match(key_text);

            let evaluated_key = if should_insert {
                None
            } else {
                // Keys evaluate like scalars but are never re-validated
                // against the mapping's own definition.
                self.evaluate_scalar(key, schema_node, false)?
            };
            if evaluated_key.is_some() {
                changed = true;
            }
            let final_key = evaluated_key.unwrap_or_else(|| key.clone());

            let evaluated_value = if should_insert {
                match &value.content {
                    NodeContent::Scalar { .. } => self.evaluate_scalar(value, schema_node, false)?,
                    _ => self.evaluate_internal(value, schema_node)?,
                }
            } else {
                let nested = schema_node
                    .and_then(|s| s.nested(final_key.scalar_value().unwrap_or_default()));
                self.evaluate_internal(value, nested.as_ref())?
            };
            if evaluated_value.is_some() {
                changed = true;
            }
            let final_value = evaluated_value.unwrap_or_else(|| value.clone());

            if should_insert {
                // Splice the mapping value's entries into this mapping.
                let Some(inserted) = final_value.as_mapping() else {
                    return Err(EvaluateError::InsertNotAMapping {
                        found: final_value.kind_name(),
                        line: final_value.line,
                        column: final_value.column,
                    });
                };
                out.extend(inserted.iter().cloned());
                changed = true;
            } else {
                out.push((final_key, final_value));
            }
        }

        if !changed {
            return Ok(None);
        }
        let mut rewritten = node.clone();
        rewritten.content = NodeContent::Mapping(out);
        Ok(Some(rewritten))
    }

    fn evaluate_sequence(
        &self,
        node: &DocumentNode,
        schema_node: Option<&SchemaNode<'_>>,
    ) -> Result<Option<DocumentNode>, EvaluateError> {
        let Some(items) = node.as_sequence() else {
            return Ok(None);
        };
        let nested = schema_node.and_then(|s| s.nested("*"));

        let mut out: Vec<DocumentNode> = Vec::with_capacity(items.len());
        let mut changed = false;

        for item in items {
            let was_sequence = item.as_sequence().is_some();
            // Scalars skip the one-shot re-validation: an element that
            // evaluates into a sequence is checked per merged item below.
            let evaluated = match &item.content {
                NodeContent::Scalar { .. } => {
                    self.evaluate_scalar(item, nested.as_ref(), false)?
                }
                _ => self.evaluate_internal(item, nested.as_ref())?,
            };
            match evaluated {
                None => out.push(item.clone()),
                Some(evaluated) => {
                    changed = true;
                    let deferred = evaluated.content == item.content;
                    match &evaluated.content {
                        // An element that evaluated into a sequence merges
                        // into the parent; one that already was a sequence
                        // stays nested.
                        NodeContent::Sequence(inner) if !was_sequence => {
                            if let Some(schema_node) = nested.as_ref() {
                                for merged in inner {
                                    schema_node.validate(merged)?;
                                }
                            }
                            out.extend(inner.iter().cloned());
                        }
                        _ => {
                            if item.is_scalar() && !deferred {
                                if let Some(schema_node) = nested.as_ref() {
                                    schema_node.validate(&evaluated)?;
                                }
                            }
                            out.push(evaluated);
                        }
                    }
                }
            }
        }

        if !changed {
            return Ok(None);
        }
        let mut rewritten = node.clone();
        rewritten.content = NodeContent::Sequence(out);
        Ok(Some(rewritten))
    }
}
