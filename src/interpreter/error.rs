use thiserror::Error;

use crate::scope::ScopeError;

/// Typed errors produced by the tree-walking interpreter backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpreterError {
    #[error("{source} at line {line}")]
    Scope {
        #[source]
        source: ScopeError,
        line: usize,
    },
    #[error("Variable '{name}' is read before it is assigned at line {line}")]
    UnassignedVariable { name: String, line: usize },
    #[error("Operator '{operator}' cannot be applied to {left} and {right} at line {line}")]
    InvalidOperands {
        operator: String,
        left: &'static str,
        right: &'static str,
        line: usize,
    },
    #[error("Operator '{operator}' cannot be applied to {operand} at line {line}")]
    InvalidOperand {
        operator: String,
        operand: &'static str,
        line: usize,
    },
    #[error("Unknown {node} operator '{operator}' at line {line}")]
    UnknownOperator {
        node: &'static str,
        operator: String,
        line: usize,
    },
    #[error("Condition must be a boolean, got {found} at line {line}")]
    NonBooleanCondition { found: &'static str, line: usize },
    #[error("Division by zero at line {line}")]
    DivisionByZero { line: usize },
    #[error("Integer overflow in '{operator}' at line {line}")]
    IntegerOverflow { operator: String, line: usize },
    #[error("No implementation of '{method}' matches arguments ({arguments}) at line {line}")]
    NoMatchingImplementation {
        method: String,
        arguments: String,
        line: usize,
    },
    #[error("Loop exceeded {limit} iterations at line {line}")]
    LoopLimitExceeded { limit: u64, line: usize },
    #[error("Built-in '{name}' expected {expected} arguments, got {found} at line {line}")]
    BuiltinArity {
        name: &'static str,
        expected: usize,
        found: usize,
        line: usize,
    },
}

impl InterpreterError {
    pub fn line(&self) -> Option<usize> {
        match self {
            InterpreterError::Scope { line, .. }
            | InterpreterError::UnassignedVariable { line, .. }
            | InterpreterError::InvalidOperands { line, .. }
            | InterpreterError::InvalidOperand { line, .. }
            | InterpreterError::UnknownOperator { line, .. }
            | InterpreterError::NonBooleanCondition { line, .. }
            | InterpreterError::DivisionByZero { line }
            | InterpreterError::IntegerOverflow { line, .. }
            | InterpreterError::NoMatchingImplementation { line, .. }
            | InterpreterError::LoopLimitExceeded { line, .. }
            | InterpreterError::BuiltinArity { line, .. } => Some(*line),
        }
    }

    pub fn is_scope_error(&self) -> bool {
        matches!(self, InterpreterError::Scope { .. })
    }
}

/// A run that stopped on `error`, with everything `print` wrote before it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{error}")]
pub struct RunFailure {
    pub output: String,
    pub error: InterpreterError,
}
