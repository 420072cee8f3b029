//! Strategy expansion driven from a parsed workflow document.

use gale_value::Value;
use gale_workflow::document::parse_document;
use gale_workflow::{expand_strategy, NullTracer, Strategy};

fn strategy_from_yaml(yaml: &str) -> Strategy {
    let doc = parse_document(yaml).unwrap();
    Strategy::from_value(&doc.to_value()).unwrap()
}

#[test]
fn matrix_from_document() {
    let strategy = strategy_from_yaml(
        r#"
fail-fast: false
max-parallel: 3
matrix:
  os: [ubuntu-latest, macos-latest]
  node: [18, 20]
  exclude:
  - os: macos-latest
    node: 18
  include:
  - os: ubuntu-latest
    experimental: true
"#,
    );

    let result = strategy.expand(&NullTracer).unwrap();
    assert!(!result.fail_fast);
    assert_eq!(result.max_parallel, Some(3.0));
    assert_eq!(result.flat.len(), 3);
    assert_eq!(result.keys, vec!["os".to_string(), "node".to_string()]);

    // Both ubuntu rows received the merged include key.
    let ubuntu_rows: Vec<_> = result
        .flat
        .iter()
        .filter(|row| row.get("os").and_then(Value::as_str) == Some("ubuntu-latest"))
        .collect();
    assert_eq!(ubuntu_rows.len(), 2);
    for row in ubuntu_rows {
        assert_eq!(row.get("experimental"), Some(&Value::boolean(true)));
    }
    assert!(result.include_only.is_empty());
}

#[test]
fn exclude_matches_across_yaml_scalar_styles() {
    // The quoted "18" and the plain 18 are abstract-equal.
    let strategy = strategy_from_yaml(
        r#"
matrix:
  node: [18, 20]
  exclude:
  - node: "18"
"#,
    );
    let result = strategy.expand(&NullTracer).unwrap();
    assert_eq!(result.flat.len(), 1);
    assert_eq!(result.flat[0].get("node"), Some(&Value::number(20.0)));
}

#[test]
fn missing_strategy_expands_to_single_empty_row() {
    let result = expand_strategy(None, &NullTracer).unwrap();
    assert_eq!(result.flat.len(), 1);
    assert!(result.flat[0].is_empty());
    assert!(result.include_only.is_empty());
    assert!(result.keys.is_empty());
}
