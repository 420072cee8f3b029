//! Schema-driven document validation.
//!
//! A [`SchemaNode`] pairs a position in the schema (a definition name and
//! the accumulated expression context) with the restrictions in force.
//! Driving a document node through it checks structure (shapes, required
//! and unknown properties, duplicates, allowed values) and statically
//! checks every `${{ … }}` segment against the declared context: each
//! function call must match a known signature with its argument count in
//! range, and each named value must be a declared context variable.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{DocumentNode, NodeContent};
use crate::schema::errors::{ValidationError, ValidationErrors, ValidationKind};
use crate::schema::{MappingDefinition, Schema, SequenceDefinition, StringDefinition};
use gale_expression::{parse, Expr};
use gale_value::Value;

/// The `${{ insert }}` mapping-merge directive.
pub(crate) static INSERT_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{\{\s*insert\s*\}\}").expect("insert directive pattern"));

/// Context entries of the form `name(min,max)` declare callable functions.
static FUNCTION_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-zA-Z0-9_]+)\(([0-9]+),([0-9]+|MAX)\)$").expect("signature pattern"));

/// A function signature usable inside expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Minimum argument count
    pub min: usize,
    /// Maximum argument count
    pub max: usize,
}

impl FunctionSignature {
    fn new(name: &str, min: usize, max: usize) -> Self {
        Self {
            name: name.to_string(),
            min,
            max,
        }
    }
}

/// Functions every expression context may call.
fn base_functions() -> Vec<FunctionSignature> {
    vec![
        FunctionSignature::new("contains", 2, 2),
        FunctionSignature::new("endsWith", 2, 2),
        FunctionSignature::new("format", 1, 255),
        FunctionSignature::new("join", 1, 2),
        FunctionSignature::new("startsWith", 2, 2),
        FunctionSignature::new("toJson", 1, 1),
        FunctionSignature::new("fromJson", 1, 1),
        FunctionSignature::new("case", 3, usize::MAX),
    ]
}

/// A position in the schema driving validation of one document subtree
#[derive(Debug, Clone)]
pub struct SchemaNode<'a> {
    /// The schema the definition lives in
    pub schema: &'a Schema,
    /// Name of the current definition
    pub definition: String,
    /// Accumulated context entries from this definition and its ancestors
    pub context: Vec<String>,
    /// Restricted mode: skip static expression checks (sites were
    /// pre-approved by an earlier pass)
    pub restrict_eval: bool,
}

impl<'a> SchemaNode<'a> {
    /// Create a root schema node for `definition`
    pub fn new(schema: &'a Schema, definition: impl Into<String>) -> Self {
        let definition = definition.into();
        let context = schema.definition(&definition).context;
        Self {
            schema,
            definition,
            context,
            restrict_eval: false,
        }
    }

    /// Toggle restricted mode
    pub fn with_restrict_eval(mut self, restrict: bool) -> Self {
        self.restrict_eval = restrict;
        self
    }

    /// Descend into the named child definition, extending the context
    pub fn child(&self, definition: &str) -> SchemaNode<'a> {
        let mut context = self.context.clone();
        context.extend(self.schema.definition(definition).context);
        SchemaNode {
            schema: self.schema,
            definition: definition.to_string(),
            context,
            restrict_eval: self.restrict_eval,
        }
    }

    /// The schema node governing the value under mapping key (or sequence
    /// marker `"*"`), if the schema knows one
    pub fn nested(&self, key: &str) -> Option<SchemaNode<'a>> {
        let def = self.schema.definition(&self.definition);
        if let Some(mapping) = &def.mapping {
            if let Some(prop) = mapping.properties.get(key) {
                return Some(self.child(&prop.r#type));
            }
            if mapping.loose_value_type.is_empty() {
                return None;
            }
            return Some(self.child(&mapping.loose_value_type));
        }
        if let Some(sequence) = &def.sequence {
            if key != "*" {
                return None;
            }
            return Some(self.child(&sequence.item_type));
        }
        if let Some(one_of) = &def.one_of {
            for candidate in one_of {
                if let Some(nested) = self.child(candidate).nested(key) {
                    return Some(nested);
                }
            }
        }
        None
    }

    /// Context entries that are plain variable names
    pub fn variables(&self) -> Vec<String> {
        self.context
            .iter()
            .filter(|entry| !entry.contains('('))
            .cloned()
            .collect()
    }

    /// Callable signatures: the base set plus context declarations
    pub fn functions(&self) -> Vec<FunctionSignature> {
        let mut funcs = base_functions();
        for entry in &self.context {
            if let Some(captures) = FUNCTION_SIGNATURE.captures(entry) {
                let name = &captures[1];
                let min = captures[2].parse().unwrap_or(0);
                let max = if captures[3].eq_ignore_ascii_case("MAX") {
                    usize::MAX
                } else {
                    captures[3].parse().unwrap_or(0)
                };
                funcs.push(FunctionSignature::new(name, min, max));
            }
        }
        funcs
    }

    /// Validate a document node against this schema position
    pub fn validate(&self, node: &DocumentNode) -> Result<(), ValidationErrors> {
        let def = self.schema.definition(&self.definition);

        if node.is_scalar() {
            let (is_expr, errors) = self.check_expression(node);
            errors.into_result()?;
            if is_expr {
                // Expression placeholders defer structural checks to the
                // evaluation pass.
                return Ok(());
            }
        }

        if let Some(mapping) = &def.mapping {
            return self.check_mapping(node, mapping);
        }
        if let Some(sequence) = &def.sequence {
            return self.check_sequence(node, sequence);
        }
        if let Some(one_of) = &def.one_of {
            return self.check_one_of(node, one_of);
        }

        self.assert_scalar(node)?;
        if let Some(string) = &def.string {
            return self.check_string(node, string);
        }
        if def.number.is_some() {
            return self.check_resolved(node, |v| matches!(v, Value::Number(_)), "number");
        }
        if def.boolean.is_some() {
            return self.check_resolved(node, |v| matches!(v, Value::Boolean(_)), "boolean");
        }
        if let Some(allowed) = &def.allowed_values {
            let text = node.scalar_value().unwrap_or_default();
            if allowed.iter().any(|v| v == text) {
                return Ok(());
            }
            return Err(single(ValidationError {
                kind: ValidationKind::Fatal,
                line: node.line,
                column: node.column,
                message: format!("expected one of {} got {}", allowed.join(","), text),
            }));
        }
        if def.null.is_some() {
            if node.resolve_scalar() == Some(Value::Null) {
                return Ok(());
            }
            return Err(single(ValidationError {
                kind: ValidationKind::Fatal,
                line: node.line,
                column: node.column,
                message: "invalid Null".to_string(),
            }));
        }
        Err(single(ValidationError {
            kind: ValidationKind::Fatal,
            line: node.line,
            column: node.column,
            message: format!("unsupported definition {}", self.definition),
        }))
    }

    /// Scan a scalar for `${{ … }}` segments and statically check each.
    ///
    /// Returns whether the scalar contained any expression, plus the
    /// errors found. Restricted mode skips the scan entirely.
    pub fn check_expression(&self, node: &DocumentNode) -> (bool, ValidationErrors) {
        let mut errors = ValidationErrors::default();
        if self.restrict_eval {
            return (false, errors);
        }
        let Some(text) = node.scalar_value() else {
            return (false, errors);
        };

        let mut had_expr = false;
        let mut rest = text;
        while let Some(i) = rest.find("${{") {
            rest = &rest[i + 3..];
            had_expr = true;
            let Some(j) = expression_end(rest) else {
                errors.push(ValidationError {
                    kind: ValidationKind::Fatal,
                    line: node.line,
                    column: node.column,
                    message: "unclosed expression".to_string(),
                });
                break;
            };
            match parse(rest[..j].trim()) {
                Err(parse_err) => errors.push(ValidationError {
                    kind: ValidationKind::Fatal,
                    line: node.line,
                    column: node.column,
                    message: format!("failed to parse: {}", parse_err),
                }),
                Ok(root) => {
                    for message in self.check_single_expression(&root) {
                        errors.push(ValidationError {
                            kind: ValidationKind::Fatal,
                            line: node.line,
                            column: node.column,
                            message,
                        });
                    }
                }
            }
            rest = &rest[j + 2..];
        }
        (had_expr, errors)
    }

    /// Statically check one parsed expression against the context.
    pub fn check_single_expression(&self, root: &Expr) -> Vec<String> {
        if self.context.is_empty() {
            // Without a context only bare literals are tolerated.
            return match root {
                Expr::Literal(_)
                | Expr::NamedValue(_)
                | Expr::PropertyName(_)
                | Expr::Wildcard => Vec::new(),
                _ => vec!["expressions are not allowed here".to_string()],
            };
        }

        let funcs = self.functions();
        let mut messages = Vec::new();
        root.visit(&mut |node| match node {
            Expr::Function { name, args } => {
                match funcs.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
                    Some(signature) => {
                        if name.eq_ignore_ascii_case("case") && args.len() % 2 == 0 {
                            messages.push(format!(
                                "expected odd number of parameters for case got {}",
                                args.len()
                            ));
                        }
                        if signature.min > args.len() {
                            messages.push(format!(
                                "missing parameters for {} expected >= {} got {}",
                                name,
                                signature.min,
                                args.len()
                            ));
                        }
                        if signature.max < args.len() {
                            messages.push(format!(
                                "too many parameters for {} expected <= {} got {}",
                                name,
                                signature.max,
                                args.len()
                            ));
                        }
                    }
                    None => messages.push(format!("unknown function call {}", name)),
                }
            }
            Expr::NamedValue(name) => {
                if !self
                    .context
                    .iter()
                    .any(|entry| entry.eq_ignore_ascii_case(name))
                {
                    messages.push(format!("unknown variable access {}", name));
                }
            }
            _ => {}
        });
        messages
    }

    fn check_mapping(
        &self,
        node: &DocumentNode,
        mapping: &MappingDefinition,
    ) -> Result<(), ValidationErrors> {
        let Some(entries) = node.as_mapping() else {
            return Err(self.mismatched(node, "mapping"));
        };

        let mut errors = ValidationErrors::default();
        let mut has_key_expr = false;
        let mut used: HashMap<String, String> = HashMap::new();

        for (key, value) in entries {
            let key_text = key.scalar_value().unwrap_or_default().to_string();

            if INSERT_DIRECTIVE.is_match(&key_text) {
                if self.context.is_empty() {
                    errors.push(ValidationError {
                        kind: ValidationKind::Fatal,
                        line: key.line,
                        column: key.column,
                        message: "insert is not allowed here".to_string(),
                    });
                }
                has_key_expr = true;
                continue;
            }

            let (is_expr, key_errors) = self.check_expression(key);
            if !key_errors.is_empty() {
                errors.merge(key_errors);
                has_key_expr = true;
                continue;
            }
            if is_expr {
                has_key_expr = true;
                continue;
            }

            // Duplicate detection folds case; the schema lookup does not.
            match used.get(&key_text.to_ascii_lowercase()) {
                Some(original) => errors.push(ValidationError {
                    kind: ValidationKind::Fatal,
                    line: key.line,
                    column: key.column,
                    message: format!("duplicate property {} of {}", key_text, original),
                }),
                None => {
                    used.insert(key_text.to_ascii_lowercase(), key_text.clone());
                    used.insert(key_text.clone(), key_text.clone());
                }
            }

            let value_type = match mapping.properties.get(&key_text) {
                Some(prop) => prop.r#type.clone(),
                None => {
                    if mapping.loose_value_type.is_empty() {
                        errors.push(ValidationError {
                            kind: ValidationKind::InvalidProperty,
                            line: key.line,
                            column: key.column,
                            message: format!("unknown property {}", key_text),
                        });
                        continue;
                    }
                    mapping.loose_value_type.clone()
                }
            };

            if let Err(nested) = self.child(&value_type).validate(value) {
                errors.push(ValidationError {
                    kind: ValidationKind::Fatal,
                    line: value.line,
                    column: value.column,
                    message: format!("error found in value of key {}", key_text),
                });
                errors.add_collection(nested);
            }
        }

        // Keys hidden behind unevaluated expressions may still satisfy
        // required properties, so skip the presence check.
        if !has_key_expr {
            for (name, prop) in &mapping.properties {
                if prop.required && !used.contains_key(name) {
                    errors.push(ValidationError {
                        kind: ValidationKind::MissingProperty,
                        line: node.line,
                        column: node.column,
                        message: format!("missing property {}", name),
                    });
                }
            }
        }
        errors.into_result()
    }

    fn check_sequence(
        &self,
        node: &DocumentNode,
        sequence: &SequenceDefinition,
    ) -> Result<(), ValidationErrors> {
        let Some(items) = node.as_sequence() else {
            return Err(self.mismatched(node, "sequence"));
        };
        let mut errors = ValidationErrors::default();
        for item in items {
            if let Err(nested) = self.child(&sequence.item_type).validate(item) {
                errors.merge(nested);
            }
        }
        errors.into_result()
    }

    /// Try each alternative in order; keep the error sets with the fewest
    /// invalid-property errors when none succeeds.
    fn check_one_of(&self, node: &DocumentNode, one_of: &[String]) -> Result<(), ValidationErrors> {
        let mut best = ValidationErrors::default();
        let mut best_score = usize::MAX;

        for candidate in one_of {
            match self.child(candidate).validate(node) {
                Ok(()) => return Ok(()),
                Err(candidate_errors) => {
                    let invalid = candidate_errors.count_kind(ValidationKind::InvalidProperty);
                    let score = if invalid == 0 { usize::MAX } else { invalid };
                    if score < best_score {
                        best = ValidationErrors::default();
                        best_score = score;
                    }
                    if score <= best_score {
                        best.add_collection(candidate_errors);
                    }
                }
            }
        }
        best.into_result()
    }

    fn check_string(
        &self,
        node: &DocumentNode,
        string: &StringDefinition,
    ) -> Result<(), ValidationErrors> {
        let text = node.scalar_value().unwrap_or_default();
        if !string.constant.is_empty() && string.constant != text {
            return Err(single(ValidationError {
                kind: ValidationKind::Fatal,
                line: node.line,
                column: node.column,
                message: format!("expected {} got {}", string.constant, text),
            }));
        }
        if string.is_expression && !self.restrict_eval {
            match parse(text) {
                Err(parse_err) => {
                    return Err(single(ValidationError {
                        kind: ValidationKind::Fatal,
                        line: node.line,
                        column: node.column,
                        message: format!("failed to parse: {}", parse_err),
                    }));
                }
                Ok(root) => {
                    let messages = self.check_single_expression(&root);
                    if !messages.is_empty() {
                        let mut errors = ValidationErrors::default();
                        for message in messages {
                            errors.push(ValidationError {
                                kind: ValidationKind::Fatal,
                                line: node.line,
                                column: node.column,
                                message,
                            });
                        }
                        return Err(errors);
                    }
                }
            }
        }
        Ok(())
    }

    fn check_resolved(
        &self,
        node: &DocumentNode,
        matches: impl Fn(&Value) -> bool,
        expected: &str,
    ) -> Result<(), ValidationErrors> {
        let resolved = node.resolve_scalar().unwrap_or(Value::Null);
        if matches(&resolved) {
            return Ok(());
        }
        Err(single(ValidationError {
            kind: ValidationKind::Mismatched,
            line: node.line,
            column: node.column,
            message: format!(
                "expected a {} got {}",
                expected,
                node.scalar_value().unwrap_or_default()
            ),
        }))
    }

    fn assert_scalar(&self, node: &DocumentNode) -> Result<(), ValidationErrors> {
        match node.content {
            NodeContent::Scalar { .. } => Ok(()),
            _ => Err(self.mismatched(node, "scalar")),
        }
    }

    fn mismatched(&self, node: &DocumentNode, expected: &str) -> ValidationErrors {
        single(ValidationError {
            kind: ValidationKind::Mismatched,
            line: node.line,
            column: node.column,
            message: format!("expected a {} got {}", expected, node.kind_name()),
        })
    }
}

fn single(error: ValidationError) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    errors.push(error);
    errors
}

/// Offset of the `}}` closing an expression body, skipping quoted strings.
fn expression_end(expr: &str) -> Option<usize> {
    let bytes = expr.as_bytes();
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            in_quotes = !in_quotes;
        } else if !in_quotes && bytes[i] == b'}' && bytes.get(i + 1) == Some(&b'}') {
            return Some(i);
        }
        i += 1;
    }
    None
}
