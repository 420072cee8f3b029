//! JSON interop: canonicalization from and export to `serde_json` values.
//!
//! Canonicalization lowers any JSON document into the six value kinds:
//! every number becomes a double and every object becomes a
//! case-insensitive mapping that keeps its insertion order. Export is the
//! inverse, with two wrinkles: filtered enumerations materialize as plain
//! arrays, and non-finite numbers are rejected because JSON cannot carry
//! them.

use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;

use serde::Serialize;

use crate::collections::{Array, Object};
use crate::core::value::Value;
use crate::error::{ValueError, ValueResult};

/// Canonicalize a JSON value into a [`Value`]
pub fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(from_json).collect::<Array>())
        }
        serde_json::Value::Object(map) => {
            let mut obj = Object::new();
            for (key, value) in map {
                obj.insert(key.clone(), from_json(value));
            }
            Value::Object(obj)
        }
    }
}

/// Export a [`Value`] as a JSON value.
///
/// Integral doubles export as JSON integers so `6.0` serializes as `6`.
pub fn to_json(value: &Value) -> ValueResult<serde_json::Value> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Array(items) | Value::Filtered(items) => Ok(serde_json::Value::Array(
            items.iter().map(to_json).collect::<ValueResult<Vec<_>>>()?,
        )),
        Value::Object(obj) => {
            let mut map = serde_json::Map::new();
            for (key, value) in obj {
                map.insert(key.clone(), to_json(value)?);
            }
            Ok(serde_json::Value::Object(map))
        }
    }
}

fn number_to_json(n: f64) -> ValueResult<serde_json::Value> {
    if !n.is_finite() {
        return Err(ValueError::NonFiniteNumber(n));
    }
    // Doubles hold integers exactly up to 2^53.
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Ok(serde_json::Value::Number(serde_json::Number::from(
            n as i64,
        )));
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .ok_or(ValueError::NonFiniteNumber(n))
}

/// Serialize a [`Value`] as indented JSON text.
///
/// `indent` selects 2- or 4-space indentation; keys appear in insertion
/// order.
pub fn to_json_string(value: &Value, indent: usize) -> ValueResult<String> {
    let json = to_json(value)?;
    let pad = if indent >= 4 { "    " } else { "  " };
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(pad.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut serializer)
        .map_err(|_| ValueError::NonFiniteNumber(f64::NAN))?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
