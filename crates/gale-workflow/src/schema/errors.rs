//! Schema validation errors.
//!
//! Validation accumulates every issue it finds instead of stopping at the
//! first, so a single pass over a workflow reports all problems at once.
//! Errors nest: a bad value under a mapping key contributes a labelled
//! sub-collection, and the rendered output indents nested collections by
//! two spaces.

use std::fmt;

/// What kind of schema violation an error describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationKind {
    /// A failure that rules the candidate out entirely
    #[default]
    Fatal,
    /// A non-fatal advisory
    Warning,
    /// A property that the definition does not allow
    InvalidProperty,
    /// A node of the wrong shape (scalar vs mapping vs sequence)
    Mismatched,
    /// A required property that is absent
    MissingProperty,
}

/// One schema violation with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The violation kind
    pub kind: ValidationKind,
    /// 1-based source line
    pub line: usize,
    /// 1-based source column
    pub column: usize,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line: {} Column {}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// An accumulated set of validation errors with nested sub-collections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    /// Errors at this level
    pub errors: Vec<ValidationError>,
    /// Nested error sets (for example, per mapping value)
    pub collections: Vec<ValidationErrors>,
}

impl ValidationErrors {
    /// Add one error
    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a nested collection
    pub fn add_collection(&mut self, collection: ValidationErrors) {
        self.collections.push(collection);
    }

    /// Absorb another collection's errors and sub-collections
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
        self.collections.extend(other.collections);
    }

    /// Whether no errors were recorded at any level
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.collections.is_empty()
    }

    /// Count errors of `kind` at this level
    pub fn count_kind(&self, kind: ValidationKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Convert into a `Result`, erring when any issue was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
            first = false;
        }
        for collection in &self.collections {
            if !first {
                writeln!(f)?;
            }
            let rendered = collection.to_string();
            let mut lines = rendered.lines().peekable();
            while let Some(line) = lines.next() {
                if line.is_empty() {
                    write!(f, "")?;
                } else {
                    write!(f, "  {}", line)?;
                }
                if lines.peek().is_some() {
                    writeln!(f)?;
                }
            }
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(message: &str) -> ValidationError {
        ValidationError {
            kind: ValidationKind::Fatal,
            line: 2,
            column: 3,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_display_single() {
        let e = err("unknown property x");
        assert_eq!(e.to_string(), "Line: 2 Column 3: unknown property x");
    }

    #[test]
    fn test_display_indents_nested() {
        let mut inner = ValidationErrors::default();
        inner.push(err("inner problem"));
        let mut outer = ValidationErrors::default();
        outer.push(err("outer problem"));
        outer.add_collection(inner);
        assert_eq!(
            outer.to_string(),
            "Line: 2 Column 3: outer problem\n  Line: 2 Column 3: inner problem"
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::default().into_result().is_ok());
        let mut errors = ValidationErrors::default();
        errors.push(err("x"));
        assert!(errors.into_result().is_err());
    }
}
