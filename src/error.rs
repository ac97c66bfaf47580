//! Error types for pipeline execution.
//!
//! Syntax errors from the expression language and structural errors in
//! block or division definitions are represented by the `ScoreError` enum.
//! Data problems (unresolvable names, unmatched table rows) never surface
//! here; they degrade to `NaN`, `0` or a filtered subject instead.

use thiserror::Error;

/// Errors that can abort a scoring run.
///
/// # Examples
///
/// ```rust
/// use scorepipe::ScoreError;
///
/// let err = ScoreError::UnexpectedCharacter { ch: '$', position: 3 };
/// assert_eq!(err.to_string(), "Unexpected character '$' at position 3");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoreError {
    /// The tokenizer met a character that starts no token.
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    /// A single-quoted string literal was never closed.
    #[error("Unterminated string starting at position {0}")]
    UnterminatedString(usize),

    /// Parentheses do not pair up.
    #[error("Mismatched parentheses in expression: {0}")]
    MismatchedParentheses(String),

    /// An operator symbol the language does not define (e.g. a lone `&`).
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Operands and operators do not form a complete expression.
    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    /// Block parameters could not be shaped into the executor's params.
    #[error("Invalid parameters for block {block_id} (type {block_type}): {reason}")]
    InvalidBlockParams {
        block_id: u32,
        block_type: u32,
        reason: String,
    },

    /// A division header or grid is structurally unusable.
    #[error("Invalid division definition: {0}")]
    InvalidDivision(String),

    /// A block failed while executing; the run is aborted.
    #[error("Block {block_id} in component {component_id} failed: {source}")]
    BlockFailed {
        component_id: u32,
        block_id: u32,
        #[source]
        source: Box<ScoreError>,
    },
}

impl ScoreError {
    /// Whether this error was raised by the expression language front end.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            ScoreError::UnexpectedCharacter { .. }
                | ScoreError::UnterminatedString(_)
                | ScoreError::MismatchedParentheses(_)
                | ScoreError::UnknownOperator(_)
                | ScoreError::MalformedExpression(_)
        )
    }
}
