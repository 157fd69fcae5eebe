//! Single reporting channel shared by every phase.
//!
//! Each phase converts its typed errors into [`Diagnostic`]s. The lexer and
//! parser keep going after an error and hand back everything they collected
//! at the end of the phase; the interpreter stops at its first error.

use std::fmt;

use thiserror::Error;

use crate::interpreter::InterpreterError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::transpiler::TranspileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Scope,
    Eval,
    Transpile,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Lex => "lex error",
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::Scope => "scope error",
            DiagnosticKind::Eval => "evaluation error",
            DiagnosticKind::Transpile => "transpile error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<LexError> for Diagnostic {
    fn from(error: LexError) -> Self {
        Diagnostic::new(DiagnosticKind::Lex, error.to_string(), Some(error.line()))
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        let kind = if error.is_scope_error() {
            DiagnosticKind::Scope
        } else {
            DiagnosticKind::Parse
        };
        Diagnostic::new(kind, error.to_string(), error.line())
    }
}

impl From<&InterpreterError> for Diagnostic {
    fn from(error: &InterpreterError) -> Self {
        let kind = if error.is_scope_error() {
            DiagnosticKind::Scope
        } else {
            DiagnosticKind::Eval
        };
        Diagnostic::new(kind, error.to_string(), error.line())
    }
}

impl From<&TranspileError> for Diagnostic {
    fn from(error: &TranspileError) -> Self {
        Diagnostic::new(DiagnosticKind::Transpile, error.to_string(), Some(error.line()))
    }
}

/// Ordered diagnostics collected by one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", render(.0))]
pub struct Diagnostics(Vec<Diagnostic>);

fn render(entries: &[Diagnostic]) -> String {
    entries
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }


    /// Succeeds with `value` only when nothing was reported.
    pub fn into_result<T>(self, value: T) -> Result<T, Diagnostics> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}
