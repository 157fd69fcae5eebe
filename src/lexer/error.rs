use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}' at line {line}, column {column}")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Expected '::' at line {line}, column {column}")]
    ExpectedTypeSeparator { line: usize, column: usize },
    #[error("Invalid number literal '{literal}' at line {line}")]
    InvalidNumberLiteral { literal: String, line: usize },
    #[error("Unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { line, .. }
            | LexError::ExpectedTypeSeparator { line, .. }
            | LexError::InvalidNumberLiteral { line, .. }
            | LexError::UnterminatedString { line, .. } => *line,
        }
    }
}
