use thiserror::Error;

use crate::scope::ScopeError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {expected}, got '{found}' at line {line}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        line: usize,
    },
    #[error("Expected expression, got '{found}' at line {line}")]
    ExpectedExpression { found: String, line: usize },
    #[error("Expected ')' to close '(' opened at line {line}")]
    UnclosedGrouping { line: usize },
    #[error("Expected 'end' to close {construct} opened at line {line}")]
    UnterminatedBlock {
        construct: &'static str,
        line: usize,
    },
    #[error("Parameter patterns must be identifiers or constants at line {line}")]
    InvalidPattern { line: usize },
    #[error("{source} at line {line}")]
    Scope {
        #[source]
        source: ScopeError,
        line: usize,
    },
}

impl ParseError {
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedToken { line, .. }
            | ParseError::ExpectedExpression { line, .. }
            | ParseError::UnclosedGrouping { line }
            | ParseError::UnterminatedBlock { line, .. }
            | ParseError::InvalidPattern { line }
            | ParseError::Scope { line, .. } => Some(*line),
        }
    }

    pub fn is_scope_error(&self) -> bool {
        matches!(self, ParseError::Scope { .. })
    }
}

pub(super) fn scope_error(source: ScopeError, line: usize) -> ParseError {
    ParseError::Scope { source, line }
}
