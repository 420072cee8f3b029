//! The schema model.
//!
//! A schema is a registry of named definitions describing the legal shape
//! of a workflow document: typed mappings with required properties,
//! sequences, one-of alternatives, constant and expression strings, and
//! allowed-value enumerations. Each definition additionally declares the
//! expression *context* available underneath it: the named values and
//! function signatures (`success(0,MAX)`) expressions may reference.
//!
//! The two shipped schemas, one for workflow files and one for action
//! manifests, are embedded JSON documents deserialized once into
//! process-global registries.

pub mod errors;
pub mod validate;

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

pub use errors::{ValidationError, ValidationErrors, ValidationKind};
pub use validate::{FunctionSignature, SchemaNode};

static WORKFLOW_SCHEMA_JSON: &str = include_str!("workflow_schema.json");
static ACTION_SCHEMA_JSON: &str = include_str!("action_schema.json");

static WORKFLOW_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    serde_json::from_str(WORKFLOW_SCHEMA_JSON).expect("embedded workflow schema is valid")
});
static ACTION_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    serde_json::from_str(ACTION_SCHEMA_JSON).expect("embedded action schema is valid")
});

/// The schema for workflow files
pub fn workflow_schema() -> &'static Schema {
    &WORKFLOW_SCHEMA
}

/// The schema for action manifests
pub fn action_schema() -> &'static Schema {
    &ACTION_SCHEMA
}

/// A registry of named definitions
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Schema {
    /// Definitions by name
    #[serde(default)]
    pub definitions: HashMap<String, Definition>,
}

impl Schema {
    /// Resolve a definition by name.
    ///
    /// Unknown names fall back to the built-in definitions for `any`,
    /// `sequence`, `mapping`, `number`, `string`, `boolean`, and `null`;
    /// anything else resolves to an empty definition.
    pub fn definition(&self, name: &str) -> Definition {
        if let Some(def) = self.definitions.get(name) {
            return def.clone();
        }
        match name {
            "any" => Definition {
                one_of: Some(vec![
                    "sequence".to_string(),
                    "mapping".to_string(),
                    "number".to_string(),
                    "boolean".to_string(),
                    "string".to_string(),
                    "null".to_string(),
                ]),
                ..Definition::default()
            },
            "sequence" => Definition {
                sequence: Some(SequenceDefinition {
                    item_type: "any".to_string(),
                }),
                ..Definition::default()
            },
            "mapping" => Definition {
                mapping: Some(MappingDefinition {
                    properties: IndexMap::new(),
                    loose_key_type: "any".to_string(),
                    loose_value_type: "any".to_string(),
                }),
                ..Definition::default()
            },
            "number" => Definition {
                number: Some(NumberDefinition {}),
                ..Definition::default()
            },
            "string" => Definition {
                string: Some(StringDefinition::default()),
                ..Definition::default()
            },
            "boolean" => Definition {
                boolean: Some(BooleanDefinition {}),
                ..Definition::default()
            },
            "null" => Definition {
                null: Some(NullDefinition {}),
                ..Definition::default()
            },
            _ => Definition::default(),
        }
    }
}

/// One named definition: a context plus at most one shape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definition {
    /// Named values and function signatures available to expressions
    /// under this definition
    #[serde(default)]
    pub context: Vec<String>,
    /// Mapping shape
    #[serde(default)]
    pub mapping: Option<MappingDefinition>,
    /// Sequence shape
    #[serde(default)]
    pub sequence: Option<SequenceDefinition>,
    /// Alternative definitions, tried in order
    #[serde(default, rename = "one-of")]
    pub one_of: Option<Vec<String>>,
    /// Closed set of allowed scalar spellings
    #[serde(default, rename = "allowed-values")]
    pub allowed_values: Option<Vec<String>>,
    /// String shape
    #[serde(default)]
    pub string: Option<StringDefinition>,
    /// Number shape
    #[serde(default)]
    pub number: Option<NumberDefinition>,
    /// Boolean shape
    #[serde(default)]
    pub boolean: Option<BooleanDefinition>,
    /// Null shape
    #[serde(default)]
    pub null: Option<NullDefinition>,
}

/// Shape of a mapping definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MappingDefinition {
    /// Declared properties by name
    #[serde(default)]
    pub properties: IndexMap<String, MappingProperty>,
    /// Definition for keys that are not declared properties
    #[serde(default, rename = "loose-key-type")]
    pub loose_key_type: String,
    /// Definition for values of undeclared keys; empty forbids them
    #[serde(default, rename = "loose-value-type")]
    pub loose_value_type: String,
}

/// One declared mapping property
#[derive(Debug, Clone, Default)]
pub struct MappingProperty {
    /// Definition name for the property value
    pub r#type: String,
    /// Whether the property must be present
    pub required: bool,
}

impl<'de> Deserialize<'de> for MappingProperty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // A property is either a bare type name or a {type, required} pair.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Full {
                #[serde(default)]
                r#type: String,
                #[serde(default)]
                required: bool,
            },
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Name(name) => MappingProperty {
                r#type: name,
                required: false,
            },
            Repr::Full { r#type, required } => MappingProperty { r#type, required },
        })
    }
}

/// Shape of a sequence definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SequenceDefinition {
    /// Definition name for every element
    #[serde(default, rename = "item-type")]
    pub item_type: String,
}

/// Shape of a string definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringDefinition {
    /// When non-empty, the only legal spelling
    #[serde(default)]
    pub constant: String,
    /// Whether the whole value is an expression (e.g. `if:` conditions)
    #[serde(default, rename = "is-expression")]
    pub is_expression: bool,
}

/// Shape of a number definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumberDefinition {}

/// Shape of a boolean definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BooleanDefinition {}

/// Shape of a null definition
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NullDefinition {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_schemas_deserialize() {
        assert!(workflow_schema().definitions.contains_key("workflow-root"));
        assert!(workflow_schema()
            .definitions
            .contains_key("workflow-root-strict"));
        assert!(action_schema().definitions.contains_key("action-root"));
    }

    #[test]
    fn test_fallback_definitions() {
        let schema = Schema::default();
        assert!(schema.definition("any").one_of.is_some());
        assert!(schema.definition("mapping").mapping.is_some());
        assert!(schema.definition("string").string.is_some());
        assert!(schema.definition("made-up").mapping.is_none());
    }

    #[test]
    fn test_property_deserializes_from_bare_name() {
        let def: Definition = serde_json::from_str(
            r#"{"mapping": {"properties": {"a": "string", "b": {"type": "number", "required": true}}}}"#,
        )
        .unwrap();
        let mapping = def.mapping.unwrap();
        assert_eq!(mapping.properties["a"].r#type, "string");
        assert!(!mapping.properties["a"].required);
        assert_eq!(mapping.properties["b"].r#type, "number");
        assert!(mapping.properties["b"].required);
    }
}
