use thiserror::Error;

use super::EntityKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("Undeclared name '{name}'")]
    UndeclaredName { name: String },
    #[error("Undeclared class '{name}'")]
    UndeclaredClass { name: String },
    #[error("Undeclared method '{name}'")]
    UndeclaredMethod { name: String },
    #[error("Undeclared variable '{name}'")]
    UndeclaredVariable { name: String },
    #[error("Duplicate {kind} declaration '{name}' in this scope")]
    DuplicateDeclaration { kind: EntityKind, name: String },
    #[error("Cannot assign to {found} '{name}'")]
    NotAssignable { name: String, found: EntityKind },
}
