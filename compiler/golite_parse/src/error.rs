//! Parse error type.

use golite_ir::{Span, TokenKind};
use golite_lexer::LexError;

/// Malformed syntax, carrying the offending location.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        ParseError {
            span,
            message: message.into(),
        }
    }

    /// `expected X, found Y`.
    pub fn expected(what: &str, found: TokenKind, span: Span) -> Self {
        ParseError::new(span, format!("expected {what}, found {}", found.describe()))
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.span, err.kind.to_string())
    }
}
