//! Error types for value operations.

use thiserror::Error;

/// Result type alias for value operations
pub type ValueResult<T> = Result<T, ValueError>;

/// Errors raised by value conversions
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// A non-finite number cannot be represented in JSON
    #[error("cannot represent non-finite number {0} in JSON")]
    NonFiniteNumber(f64),

    /// Type mismatch between expected and actual kinds
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The kind that was required
        expected: String,
        /// The kind that was found
        actual: String,
    },
}
