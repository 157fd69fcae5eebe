//! Syntax tree shared by every backend.
//!
//! The parser builds these nodes once alongside the scope table. The tree is
//! never mutated afterwards; the interpreter and the transpiler each walk it
//! with an exhaustive `match`, so a node kind without a handler fails to compile.

use crate::builtins::BuiltinFunction;
use crate::scope::{BodyId, MethodId};
use crate::token::{Literal, TokenKind};

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Identifier {
    pub name: String,
    pub line: usize,
}

impl Identifier {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Declaration {
    Class(ClassDecl),
    Method(MethodDecl),
    Var(VarDecl),
    Statement(Statement),
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassDecl {
    pub name: Identifier,
    pub body: Vec<Declaration>,
}

/// Signature-only method declaration: `name :: Return <- Param, Param`.
#[derive(Debug, PartialEq, Clone)]
pub struct MethodDecl {
    pub name: Identifier,
    pub return_type: String,
    pub parameter_types: Vec<String>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct VarDecl {
    pub name: Identifier,
    pub var_type: String,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Assign(Assignment),
    If {
        condition: Expression,
        body: Vec<Declaration>,
        line: usize,
    },
    While {
        condition: Expression,
        body: Vec<Declaration>,
        line: usize,
    },
    MethodBody(MethodBody),
    Call(MethodCall),
    Expr(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Assignment {
    pub target: Identifier,
    pub value: Expression,
}

/// One implementation of a declared method, selected at call time by
/// matching the call's arguments against `params`.
#[derive(Debug, PartialEq, Clone)]
pub struct MethodBody {
    pub id: BodyId,
    pub name: Identifier,
    pub params: Vec<Pattern>,
    pub body: Vec<Declaration>,
    pub method: MethodId,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Pattern {
    /// Matches any argument and binds it to the method-scoped variable.
    Binding(Identifier),
    /// Matches when the argument equals the evaluated constant.
    Value(Expression),
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CallTarget {
    Builtin(BuiltinFunction),
    Method(MethodId),
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodCall {
    pub name: Identifier,
    pub arguments: Vec<Expression>,
    pub target: CallTarget,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Operator {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Operator {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
        }
    }
}

/// Shape shared by every binary expression form.
#[derive(Debug, PartialEq, Clone)]
pub struct Binary {
    pub left: Box<Expression>,
    pub operator: Operator,
    pub right: Box<Expression>,
}

impl Binary {
    pub fn new(left: Expression, operator: Operator, right: Expression) -> Self {
        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Assign(Box<Assignment>),
    Logic(Binary),
    Equality(Binary),
    Comparison(Binary),
    Addition(Binary),
    Multiplication(Binary),
    Unary {
        operator: Operator,
        right: Box<Expression>,
    },
    Grouping(Box<Expression>),
    Literal(Literal),
    Identifier(Identifier),
    Call(MethodCall),
}

impl Expression {
    /// True for expressions whose value cannot depend on program state.
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::Unary { right, .. } | Expression::Grouping(right) => right.is_constant(),
            _ => false,
        }
    }
}
