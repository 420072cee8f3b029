//! Matrix strategy expansion.
//!
//! A strategy's matrix expands into the Cartesian product of its axes,
//! filtered by `exclude` entries and augmented by `include` entries.
//! Matching uses the value model's abstract equality, so `node: 14` and
//! `node: "14"` land in the same bucket.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use gale_value::{abstract_eq, Object, Value};

/// Hard upper bound on expanded rows, matching the hosted ecosystem.
const MAX_MATRIX_ROWS: usize = 256;

/// Errors raised while parsing or expanding a strategy
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    /// The matrix expanded past [`MAX_MATRIX_ROWS`]
    #[error("matrix contains more than 256 entries")]
    TooManyRows,

    /// The strategy was not a mapping
    #[error("strategy is not a mapping")]
    NotAMapping,

    /// An `include` or `exclude` entry was not a mapping
    #[error("{0} entry is not a mapping")]
    EntryNotAMapping(&'static str),

    /// A matrix axis value was not a sequence
    #[error("matrix axis {0} is not a sequence")]
    AxisNotASequence(String),
}

/// Sink for expansion trace messages
pub trait Tracer {
    /// Record one informational message
    fn info(&self, message: &str);
}

/// A tracer that discards everything
pub struct NullTracer;

impl Tracer for NullTracer {
    fn info(&self, _message: &str) {}
}

/// A tracer that forwards to `tracing::info!`
pub struct LogTracer;

impl Tracer for LogTracer {
    fn info(&self, message: &str) {
        info!("{}", message);
    }
}

/// A parsed `strategy:` block
#[derive(Debug, Clone, Default)]
pub struct Strategy {
    /// Whether the job set aborts on the first failure
    pub fail_fast: bool,
    /// Maximum rows running concurrently; `None` means unlimited
    pub max_parallel: Option<f64>,
    /// Matrix axes in declaration order
    pub matrix: IndexMap<String, Vec<Value>>,
    /// Rows to merge or append after expansion
    pub include: Vec<Object>,
    /// Row patterns to drop after expansion
    pub exclude: Vec<Object>,
}

impl Strategy {
    /// Parse a strategy from its canonical mapping value.
    ///
    /// `include` and `exclude` are plucked out of the matrix; every other
    /// matrix key is an axis whose value must be a sequence.
    pub fn from_value(value: &Value) -> Result<Self, StrategyError> {
        let Some(mapping) = value.as_object() else {
            return Err(StrategyError::NotAMapping);
        };

        let mut strategy = Strategy {
            fail_fast: mapping
                .get("fail-fast")
                .map(Value::is_truthy)
                .unwrap_or(true),
            max_parallel: mapping.get("max-parallel").and_then(Value::as_number),
            ..Strategy::default()
        };

        let Some(matrix) = mapping.get("matrix").and_then(Value::as_object) else {
            return Ok(strategy);
        };
        for (key, axis) in matrix {
            match key.as_str() {
                "include" => strategy.include = entry_list(axis, "include")?,
                "exclude" => strategy.exclude = entry_list(axis, "exclude")?,
                _ => {
                    let Some(values) = axis.as_array() else {
                        return Err(StrategyError::AxisNotASequence(key.clone()));
                    };
                    strategy
                        .matrix
                        .insert(key.clone(), values.iter().cloned().collect());
                }
            }
        }
        Ok(strategy)
    }

    /// Expand into concrete rows
    pub fn expand(&self, tracer: &dyn Tracer) -> Result<StrategyResult, StrategyError> {
        expand_strategy(Some(self), tracer)
    }
}

/// The outcome of expanding a strategy
#[derive(Debug, Clone, Default)]
pub struct StrategyResult {
    /// Expanded rows in axis order
    pub flat: Vec<Object>,
    /// Include entries that matched no existing row
    pub include_only: Vec<Object>,
    /// The strategy's fail-fast flag
    pub fail_fast: bool,
    /// The strategy's max-parallel setting
    pub max_parallel: Option<f64>,
    /// Axis keys of the expanded rows
    pub keys: Vec<String>,
}

/// Expand a strategy into its flat and include-only rows.
///
/// A missing strategy yields one empty row with fail-fast on.
pub fn expand_strategy(
    strategy: Option<&Strategy>,
    tracer: &dyn Tracer,
) -> Result<StrategyResult, StrategyError> {
    let Some(strategy) = strategy else {
        return Ok(StrategyResult {
            flat: vec![Object::new()],
            fail_fast: true,
            ..StrategyResult::default()
        });
    };

    // Cartesian product over the axes, in declaration order.
    let mut flat: Vec<Object> = vec![Object::new()];
    for (axis, values) in &strategy.matrix {
        let mut next = Vec::with_capacity(flat.len() * values.len().max(1));
        for row in &flat {
            for value in values {
                let mut extended = row.clone();
                extended.insert(axis.clone(), value.clone());
                next.push(extended);
            }
        }
        flat = next;
    }

    // Drop rows matching every key of an exclude entry.
    for entry in &strategy.exclude {
        flat.retain(|row| {
            let matches = entry
                .iter()
                .all(|(key, value)| row.get(key).is_some_and(|rv| abstract_eq(rv, value)));
            if matches {
                tracer.info(&format!(
                    "removing {} from matrix due to exclude entry {}",
                    describe_row(row),
                    describe_row(entry)
                ));
            }
            !matches
        });
    }

    if flat.is_empty() {
        tracer.info("matrix is empty, adding an empty entry");
        flat.push(Object::new());
    }
    if flat.len() > MAX_MATRIX_ROWS {
        tracer.info("matrix contains more than 256 entries after exclude");
        return Err(StrategyError::TooManyRows);
    }

    let keys: Vec<String> = flat
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();

    // Merge include entries into every matching row; append the rest.
    let mut include_only = Vec::new();
    for entry in &strategy.include {
        let mut matched = false;
        for row in &mut flat {
            let shared_match = entry
                .iter()
                .all(|(key, value)| match row.get(key) {
                    Some(rv) => abstract_eq(rv, value),
                    None => true,
                });
            if shared_match {
                matched = true;
                tracer.info(&format!("merging include entry {}", describe_row(entry)));
                for (key, value) in entry {
                    if !row.contains_key(key) {
                        row.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        if !matched {
            tracer.info(&format!("appending include entry {}", describe_row(entry)));
            include_only.push(entry.clone());
        }
    }

    Ok(StrategyResult {
        flat,
        include_only,
        fail_fast: strategy.fail_fast,
        max_parallel: strategy.max_parallel,
        keys,
    })
}

/// Render `(a, b, c)` from the non-empty items, or `""` when all are
/// empty. Used for job display names.
pub fn default_display_suffix(items: &[String]) -> String {
    let mut out = String::new();
    let mut first = true;
    for item in items {
        if item.is_empty() {
            continue;
        }
        if first {
            out.push('(');
            first = false;
        } else {
            out.push_str(", ");
        }
        out.push_str(item);
    }
    if !first {
        out.push(')');
    }
    out
}

fn entry_list(value: &Value, label: &'static str) -> Result<Vec<Object>, StrategyError> {
    let Some(items) = value.as_array() else {
        return Err(StrategyError::EntryNotAMapping(label));
    };
    items
        .iter()
        .map(|item| {
            item.as_object()
                .cloned()
                .ok_or(StrategyError::EntryNotAMapping(label))
        })
        .collect()
}

fn describe_row(row: &Object) -> String {
    let parts: Vec<String> = row
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value.to_display_string()))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::string(*v)).collect()
    }

    fn strategy_with_matrix(axes: &[(&str, &[&str])]) -> Strategy {
        let mut matrix = IndexMap::new();
        for (name, values) in axes {
            matrix.insert(name.to_string(), axis(values));
        }
        Strategy {
            fail_fast: true,
            max_parallel: None,
            matrix,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    #[test]
    fn test_cartesian_product() {
        let strategy =
            strategy_with_matrix(&[("os", &["linux", "macos"]), ("node", &["18", "20", "22"])]);
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 6);
        assert_eq!(result.keys, vec!["os".to_string(), "node".to_string()]);
        assert_eq!(
            result.flat[0].get("os").and_then(Value::as_str),
            Some("linux")
        );
        assert_eq!(
            result.flat[0].get("node").and_then(Value::as_str),
            Some("18")
        );
        // Last axis varies fastest.
        assert_eq!(
            result.flat[1].get("node").and_then(Value::as_str),
            Some("20")
        );
    }

    #[test]
    fn test_exclude_drops_matching_rows() {
        let mut strategy = strategy_with_matrix(&[("label", &["a", "b"])]);
        strategy.exclude = vec![Object::from_pairs([("label", Value::string("a"))])];
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 1);
        assert_eq!(
            result.flat[0].get("label").and_then(Value::as_str),
            Some("b")
        );
    }

    #[test]
    fn test_exclude_uses_abstract_equality() {
        let mut strategy = Strategy::default();
        strategy
            .matrix
            .insert("node".to_string(), vec![Value::number(14.0), Value::number(16.0)]);
        strategy.exclude = vec![Object::from_pairs([("node", Value::string("14"))])];
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 1);
        assert_eq!(result.flat[0].get("node"), Some(&Value::number(16.0)));
    }

    #[test]
    fn test_exclude_all_reseeds_empty_row() {
        let mut strategy = strategy_with_matrix(&[("label", &["a"])]);
        strategy.exclude = vec![Object::from_pairs([("label", Value::string("a"))])];
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 1);
        assert!(result.flat[0].is_empty());
    }

    #[test]
    fn test_include_merges_missing_keys_into_matching_rows() {
        let mut strategy = strategy_with_matrix(&[("os", &["linux", "macos"])]);
        strategy.include = vec![Object::from_pairs([
            ("os", Value::string("linux")),
            ("experimental", Value::boolean(true)),
        ])];
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 2);
        assert_eq!(
            result.flat[0].get("experimental"),
            Some(&Value::boolean(true))
        );
        assert_eq!(result.flat[1].get("experimental"), None);
        assert!(result.include_only.is_empty());
        // Keys reflect the pre-include axis set.
        assert_eq!(result.keys, vec!["os".to_string()]);
    }

    #[test]
    fn test_include_without_match_is_appended() {
        let mut strategy = strategy_with_matrix(&[("os", &["linux"])]);
        strategy.include = vec![Object::from_pairs([("os", Value::string("windows"))])];
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 1);
        assert_eq!(result.include_only.len(), 1);
        assert_eq!(
            result.include_only[0].get("os").and_then(Value::as_str),
            Some("windows")
        );
    }

    #[test]
    fn test_include_never_overwrites_existing_values() {
        let mut strategy = strategy_with_matrix(&[("os", &["linux"])]);
        strategy.include = vec![Object::from_pairs([
            ("node", Value::string("18")),
            ("os", Value::string("linux")),
        ])];
        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(
            result.flat[0].get("os").and_then(Value::as_str),
            Some("linux")
        );
        assert_eq!(
            result.flat[0].get("node").and_then(Value::as_str),
            Some("18")
        );
    }

    #[test]
    fn test_row_limit() {
        // 2^9 = 512 rows, over the 256 limit.
        let axes: Vec<(String, Vec<Value>)> = (0..9)
            .map(|i| {
                (
                    format!("axis{}", i),
                    vec![Value::number(0.0), Value::number(1.0)],
                )
            })
            .collect();
        let mut strategy = Strategy::default();
        for (name, values) in axes {
            strategy.matrix.insert(name, values);
        }
        assert_eq!(
            strategy.expand(&NullTracer).unwrap_err(),
            StrategyError::TooManyRows
        );
    }

    #[test]
    fn test_no_strategy_yields_one_empty_row() {
        let result = expand_strategy(None, &NullTracer).unwrap();
        assert_eq!(result.flat.len(), 1);
        assert!(result.flat[0].is_empty());
        assert!(result.fail_fast);
    }

    #[test]
    fn test_from_value() {
        let json: serde_json::Value = serde_json::from_str(
            r#"{
                "fail-fast": false,
                "max-parallel": 2,
                "matrix": {
                    "label": ["a", "b"],
                    "exclude": [{"label": "a"}]
                }
            }"#,
        )
        .unwrap();
        let strategy = Strategy::from_value(&gale_value::from_json(&json)).unwrap();
        assert!(!strategy.fail_fast);
        assert_eq!(strategy.max_parallel, Some(2.0));
        assert_eq!(strategy.matrix["label"].len(), 2);
        assert_eq!(strategy.exclude.len(), 1);

        let result = strategy.expand(&NullTracer).unwrap();
        assert_eq!(result.flat.len(), 1);
        assert_eq!(
            result.flat[0].get("label").and_then(Value::as_str),
            Some("b")
        );
    }

    #[test]
    fn test_display_suffix() {
        assert_eq!(
            default_display_suffix(&["a".to_string(), "".to_string(), "b".to_string()]),
            "(a, b)"
        );
        assert_eq!(default_display_suffix(&["".to_string()]), "");
        assert_eq!(default_display_suffix(&[]), "");
    }
}
