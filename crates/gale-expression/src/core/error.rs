//! Error types for expression processing.

use thiserror::Error;

/// Result type alias for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Errors raised while lexing, parsing, or evaluating an expression
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// The lexer produced an illegal token
    #[error("unexpected token {raw} at position {index}")]
    UnexpectedToken {
        /// Raw text of the offending token
        raw: String,
        /// Byte offset of the token in the source
        index: usize,
    },

    /// The token stream did not form a valid expression
    #[error("parse error: {0}")]
    Parse(String),

    /// A named value was not present in the evaluation context
    #[error("undefined variable {0}")]
    UndefinedVariable(String),

    /// A function was not present in the evaluation context
    #[error("unknown function {0}")]
    UnknownFunction(String),

    /// A general evaluation failure
    #[error("evaluation error: {0}")]
    Eval(String),

    /// A builtin received an argument it cannot work with
    #[error("invalid argument for {function}: {message}")]
    InvalidArgument {
        /// The function that rejected its arguments
        function: String,
        /// What went wrong
        message: String,
    },

    /// `fromJson` received malformed input
    #[error("invalid JSON: {0}")]
    Json(String),

    /// A `${{ … }}` segment was never closed
    #[error("unclosed expression")]
    UnclosedExpression,

    /// A single-quoted string inside `${{ … }}` was never closed
    #[error("unclosed string")]
    UnclosedString,
}

impl ExpressionError {
    /// Create an evaluation error from any displayable message
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval(message.into())
    }

    /// Create an invalid-argument error for `function`
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }
}

impl From<gale_value::ValueError> for ExpressionError {
    fn from(err: gale_value::ValueError) -> Self {
        Self::Eval(err.to_string())
    }
}
