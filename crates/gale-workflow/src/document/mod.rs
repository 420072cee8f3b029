//! The workflow document tree.
//!
//! A parsed workflow is a tree of scalars, sequences, and mappings. Every
//! node remembers the line and column it came from so schema errors can
//! point back into the source, and scalars carry a tag slot the evaluator
//! uses to mark deferred expression sites.
//!
//! The loader resolves YAML anchors and aliases eagerly (aliases clone the
//! anchored subtree); an alias that refers to an unknown or still-open
//! anchor is rejected, which is what bounds cycles.

pub mod loader;

use gale_value::{format_number, Array, Object, Value};
use thiserror::Error;

pub use loader::parse_document;

/// Errors raised while loading a document
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// The YAML text could not be scanned
    #[error("YAML error: {0}")]
    Scan(String),

    /// The input contained no document
    #[error("empty document")]
    Empty,

    /// An alias referenced an anchor that is unknown or still being built
    #[error("unknown or cyclic alias at line {line} column {column}")]
    UnknownAlias {
        /// 1-based line of the alias
        line: usize,
        /// 1-based column of the alias
        column: usize,
    },
}

/// Evaluation tag attached to a scalar node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tag {
    /// No special meaning
    #[default]
    None,
    /// A deferred expression site, pre-approved for restricted evaluation
    Expr,
}

/// How a scalar was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalarStyle {
    /// Bare scalar, subject to core-schema type resolution
    #[default]
    Plain,
    /// Quoted (or block) scalar, always a string
    Quoted,
}

/// The payload of a document node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    /// A scalar leaf
    Scalar {
        /// The scalar text
        value: String,
        /// Whether the scalar was quoted
        style: ScalarStyle,
    },
    /// An ordered sequence of nodes
    Sequence(Vec<DocumentNode>),
    /// An ordered list of key/value pairs
    Mapping(Vec<(DocumentNode, DocumentNode)>),
}

/// One node of a workflow document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    /// The node payload
    pub content: NodeContent,
    /// 1-based source line
    pub line: usize,
    /// 1-based source column
    pub column: usize,
    /// Evaluation tag
    pub tag: Tag,
}

impl DocumentNode {
    /// Create a scalar node without a source position
    pub fn scalar(value: impl Into<String>, style: ScalarStyle) -> Self {
        Self {
            content: NodeContent::Scalar {
                value: value.into(),
                style,
            },
            line: 0,
            column: 0,
            tag: Tag::None,
        }
    }

    /// Short name of the node kind, for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.content {
            NodeContent::Scalar { .. } => "scalar",
            NodeContent::Sequence(_) => "sequence",
            NodeContent::Mapping(_) => "mapping",
        }
    }

    /// Whether this node is a scalar
    pub fn is_scalar(&self) -> bool {
        matches!(self.content, NodeContent::Scalar { .. })
    }

    /// The scalar text, if this node is a scalar
    pub fn scalar_value(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The sequence items, if this node is a sequence
    pub fn as_sequence(&self) -> Option<&[DocumentNode]> {
        match &self.content {
            NodeContent::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// The mapping entries, if this node is a mapping
    pub fn as_mapping(&self) -> Option<&[(DocumentNode, DocumentNode)]> {
        match &self.content {
            NodeContent::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Resolve this scalar into a canonical value using YAML core-schema
    /// rules. Quoted scalars always resolve to strings.
    pub fn resolve_scalar(&self) -> Option<Value> {
        let NodeContent::Scalar { value, style } = &self.content else {
            return None;
        };
        if *style == ScalarStyle::Quoted {
            return Some(Value::string(value.clone()));
        }
        Some(resolve_plain_scalar(value))
    }

    /// Canonicalize this subtree into a [`Value`]
    pub fn to_value(&self) -> Value {
        match &self.content {
            NodeContent::Scalar { .. } => self.resolve_scalar().unwrap_or(Value::Null),
            NodeContent::Sequence(items) => {
                Value::Array(items.iter().map(DocumentNode::to_value).collect::<Array>())
            }
            NodeContent::Mapping(entries) => {
                let mut obj = Object::new();
                for (key, value) in entries {
                    let name = key.scalar_value().unwrap_or_default().to_string();
                    obj.insert(name, value.to_value());
                }
                Value::Object(obj)
            }
        }
    }

    /// Encode a canonical value as a document node at the given position.
    ///
    /// Strings encode quoted so they survive re-resolution verbatim.
    pub fn from_value(value: &Value, line: usize, column: usize) -> Self {
        let content = match value {
            Value::Null => NodeContent::Scalar {
                value: "null".to_string(),
                style: ScalarStyle::Plain,
            },
            Value::Boolean(b) => NodeContent::Scalar {
                value: b.to_string(),
                style: ScalarStyle::Plain,
            },
            Value::Number(n) => NodeContent::Scalar {
                value: format_number(*n),
                style: ScalarStyle::Plain,
            },
            Value::String(s) => NodeContent::Scalar {
                value: s.clone(),
                style: ScalarStyle::Quoted,
            },
            Value::Array(items) | Value::Filtered(items) => NodeContent::Sequence(
                items
                    .iter()
                    .map(|item| Self::from_value(item, line, column))
                    .collect(),
            ),
            Value::Object(obj) => NodeContent::Mapping(
                obj.iter()
                    .map(|(key, item)| {
                        (
                            Self {
                                content: NodeContent::Scalar {
                                    value: key.clone(),
                                    style: ScalarStyle::Quoted,
                                },
                                line,
                                column,
                                tag: Tag::None,
                            },
                            Self::from_value(item, line, column),
                        )
                    })
                    .collect(),
            ),
        };
        Self {
            content,
            line,
            column,
            tag: Tag::None,
        }
    }
}

/// YAML 1.2 core-schema resolution for a plain scalar.
fn resolve_plain_scalar(text: &str) -> Value {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return Value::Null,
        "true" | "True" | "TRUE" => return Value::boolean(true),
        "false" | "False" | "FALSE" => return Value::boolean(false),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::number(i as f64);
    }
    if let Some(rest) = text.strip_prefix("0x") {
        if let Ok(i) = i64::from_str_radix(rest, 16) {
            return Value::number(i as f64);
        }
    }
    if let Some(rest) = text.strip_prefix("0o") {
        if let Ok(i) = i64::from_str_radix(rest, 8) {
            return Value::number(i as f64);
        }
    }
    // Reject forms like "nan" or "inf90" that f64::from_str accepts but
    // YAML does not spell that way.
    match text {
        ".nan" | ".NaN" | ".NAN" => return Value::number(f64::NAN),
        ".inf" | ".Inf" | "+.inf" => return Value::number(f64::INFINITY),
        "-.inf" | "-.Inf" => return Value::number(f64::NEG_INFINITY),
        _ => {}
    }
    if looks_like_float(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::number(f);
        }
    }
    Value::string(text)
}

fn looks_like_float(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || b == b'-' || b == b'+')
        && body.bytes().any(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_scalar_resolution() {
        assert_eq!(resolve_plain_scalar("null"), Value::Null);
        assert_eq!(resolve_plain_scalar(""), Value::Null);
        assert_eq!(resolve_plain_scalar("true"), Value::boolean(true));
        assert_eq!(resolve_plain_scalar("42"), Value::number(42.0));
        assert_eq!(resolve_plain_scalar("2.5"), Value::number(2.5));
        assert_eq!(resolve_plain_scalar("0x10"), Value::number(16.0));
        assert_eq!(resolve_plain_scalar("push"), Value::string("push"));
        assert_eq!(resolve_plain_scalar("1.2.3"), Value::string("1.2.3"));
    }

    #[test]
    fn test_quoted_scalars_stay_strings() {
        let node = DocumentNode::scalar("42", ScalarStyle::Quoted);
        assert_eq!(node.resolve_scalar(), Some(Value::string("42")));
    }

    #[test]
    fn test_round_trip_through_value() {
        let value = Value::Object(gale_value::Object::from_pairs([
            ("a", Value::number(6.0)),
            ("b", Value::string("x")),
        ]));
        let node = DocumentNode::from_value(&value, 3, 7);
        assert_eq!(node.line, 3);
        assert_eq!(node.to_value(), value);
    }
}
