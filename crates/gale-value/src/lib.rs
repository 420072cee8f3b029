#![warn(clippy::all)]

//! # gale-value
//!
//! Dynamic value model for the gale workflow evaluator.
//!
//! Workflow expressions are dynamically typed over six kinds: null,
//! boolean, number, string, array, and object. This crate provides the
//! canonical representation of those values together with the comparison
//! semantics the expression language is built on:
//!
//! - Truthiness: `0`, `NaN`, `""`, and `null` are falsy; collections are
//!   always truthy.
//! - Abstract equality: JavaScript-style loose equality restricted to the
//!   six kinds, with ASCII-case-insensitive string comparison.
//! - Coercion: strings coerce to numbers when compared against numbers;
//!   booleans and null coerce to numbers against everything else.
//!
//! Objects preserve insertion order and, by default, resolve keys
//! case-insensitively (the behavior workflow contexts rely on):
//!
//! ```
//! use gale_value::{Object, Value};
//!
//! let mut ctx = Object::new();
//! ctx.insert("RefName", Value::string("main"));
//! assert_eq!(ctx.get("ref_name"), None);
//! assert_eq!(ctx.get("refname").and_then(Value::as_str), Some("main"));
//! ```
//!
//! Numbers are IEEE-754 doubles throughout. Their string form follows the
//! 15-significant-digit shortest rendering used on the wire:
//!
//! ```
//! use gale_value::Value;
//!
//! assert_eq!(Value::number(23.5).to_display_string(), "23.5");
//! assert_eq!(Value::number(6.0).to_display_string(), "6");
//! ```

pub mod collections;
pub mod core;
pub mod error;
pub mod json;

pub use crate::collections::{Array, KeyCase, Object};
pub use crate::core::kind::ValueKind;
pub use crate::core::number::{format_number, parse_number};
pub use crate::core::ops::{abstract_eq, abstract_gt, abstract_lt};
pub use crate::core::value::Value;
pub use crate::error::{ValueError, ValueResult};
pub use crate::json::{from_json, to_json, to_json_string};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Array, KeyCase, Object, Value, ValueError, ValueKind, ValueResult, abstract_eq,
        abstract_gt, abstract_lt,
    };
}
