pub mod ast;
pub mod backend;
pub mod builtins;
pub mod config;
pub mod diagnostics;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod token;
pub mod transpiler;
pub mod value;
