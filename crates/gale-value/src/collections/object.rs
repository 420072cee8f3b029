//! Keyed mapping of values.
//!
//! Objects preserve insertion order. Lookup is case-insensitive by
//! default: keys are fold-compared with ASCII case folding on access
//! rather than stored folded, so enumeration always yields the original
//! spelling.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::core::value::Value;

/// How an [`Object`] resolves keys on lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyCase {
    /// Keys match with ASCII case folding (workflow context behavior)
    #[default]
    Insensitive,
    /// Keys match exactly
    Sensitive,
}

/// An insertion-ordered, cheaply clonable mapping from strings to values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    entries: Arc<IndexMap<String, Value>>,
    case: KeyCase,
}

impl Object {
    /// Create a new empty case-insensitive object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty object with the given key case mode
    pub fn with_case(case: KeyCase) -> Self {
        Self {
            entries: Arc::new(IndexMap::new()),
            case,
        }
    }

    /// Create an object from key/value pairs, preserving their order
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut obj = Self::new();
        for (key, value) in pairs {
            obj.insert(key, value);
        }
        obj
    }

    /// The key case mode of this object
    pub fn case(&self) -> KeyCase {
        self.case
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the object has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a value under `key`, replacing an exact-match entry
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        Arc::make_mut(&mut self.entries).insert(key.into(), value);
    }

    /// Look up `key` according to the object's case mode.
    ///
    /// An exact match wins; otherwise the first fold-equal key in
    /// insertion order is returned.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.entries.get(key) {
            return Some(value);
        }
        match self.case {
            KeyCase::Sensitive => None,
            KeyCase::Insensitive => self
                .entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v),
        }
    }

    /// Whether `key` resolves to an entry
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Iterate over values in insertion order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }
}

impl<'a> IntoIterator for &'a Object {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut obj = Object::new();
        obj.insert("TwsT", Value::string("x"));
        assert_eq!(obj.get("twst").and_then(Value::as_str), Some("x"));
        assert_eq!(obj.get("TWST").and_then(Value::as_str), Some("x"));
        assert_eq!(obj.get("other"), None);
    }

    #[test]
    fn test_case_sensitive_lookup() {
        let mut obj = Object::with_case(KeyCase::Sensitive);
        obj.insert("PATH", Value::string("/usr/bin"));
        assert_eq!(obj.get("PATH").and_then(Value::as_str), Some("/usr/bin"));
        assert_eq!(obj.get("path"), None);
    }

    #[test]
    fn test_exact_match_wins_over_fold() {
        let mut obj = Object::new();
        obj.insert("Key", Value::string("folded"));
        obj.insert("key", Value::string("exact"));
        assert_eq!(obj.get("key").and_then(Value::as_str), Some("exact"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let obj = Object::from_pairs([
            ("b", Value::number(1.0)),
            ("a", Value::number(2.0)),
            ("c", Value::number(3.0)),
        ]);
        let keys: Vec<_> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
