use anyhow::Result;
use thiserror::Error;

use crate::ast::{
    Assignment, Binary, CallTarget, Declaration, Expression, MethodBody, MethodCall, MethodDecl,
    Pattern, Program, Statement,
};
use crate::backend::{Backend, PreparedBackend};
use crate::parser::ParsedProgram;

/// Renders a parsed program as C-like text: braces, semicolons and
/// lower-cased type names. The scope table is not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transpiler;

pub struct PreparedTranspiler {
    source: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TranspileError {
    #[error("Method body '{name}' at line {line} has no visible declaration")]
    MissingSignature { name: String, line: usize },
    #[error("Method body '{name}' at line {line} matches on a literal value")]
    LiteralPattern { name: String, line: usize },
    #[error("Method body '{name}' at line {line} has {found} parameters, expected {expected}")]
    ParameterCountMismatch {
        name: String,
        expected: usize,
        found: usize,
        line: usize,
    },
}

impl TranspileError {
    pub fn line(&self) -> usize {
        match self {
            TranspileError::MissingSignature { line, .. }
            | TranspileError::LiteralPattern { line, .. }
            | TranspileError::ParameterCountMismatch { line, .. } => *line,
        }
    }
}

type TranspileResult<T> = std::result::Result<T, TranspileError>;

/// Walk state: one frame of visible method signatures per class or method
/// body being rendered. `if`/`while` blocks share their enclosing frame.
struct Emitter<'p> {
    signatures: Vec<Vec<&'p MethodDecl>>,
    output: String,
}

impl Transpiler {
    pub fn new() -> Self {
        Self
    }

    pub fn transpile(&self, program: &Program) -> TranspileResult<String> {
        let mut emitter = Emitter {
            signatures: vec![Vec::new()],
            output: String::new(),
        };
        for declaration in &program.declarations {
            emitter.emit_declaration(declaration, 0)?;
        }
        Ok(emitter.output)
    }
}

impl<'p> Emitter<'p> {
    fn emit_block(&mut self, body: &'p [Declaration], indent: usize) -> TranspileResult<()> {
        for declaration in body {
            self.emit_declaration(declaration, indent)?;
        }
        Ok(())
    }

    /// Renders a class or method body with its own signature frame.
    fn emit_scope(&mut self, body: &'p [Declaration], indent: usize) -> TranspileResult<()> {
        self.signatures.push(Vec::new());
        let result = self.emit_block(body, indent);
        self.signatures.pop();
        result
    }

    fn emit_declaration(
        &mut self,
        declaration: &'p Declaration,
        indent: usize,
    ) -> TranspileResult<()> {
        match declaration {
            Declaration::Class(class) => {
                self.push_line(indent, &format!("class {} {{", class.name.name));
                self.emit_scope(&class.body, indent + 1)?;
                self.push_line(indent, "}");
            }
            Declaration::Method(method) => {
                let parameters = method
                    .parameter_types
                    .iter()
                    .map(|ty| lower_type(ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.push_line(
                    indent,
                    &format!(
                        "{} {}({parameters});",
                        lower_type(&method.return_type),
                        method.name.name
                    ),
                );
                if let Some(frame) = self.signatures.last_mut() {
                    frame.push(method);
                }
            }
            Declaration::Var(var) => {
                self.push_line(
                    indent,
                    &format!("{} {};", lower_type(&var.var_type), var.name.name),
                );
            }
            Declaration::Statement(statement) => self.emit_statement(statement, indent)?,
        }
        Ok(())
    }

    fn emit_statement(&mut self, statement: &'p Statement, indent: usize) -> TranspileResult<()> {
        match statement {
            Statement::Assign(assignment) => {
                let assignment = emit_assignment(assignment);
                self.push_line(indent, &format!("{assignment};"));
            }
            Statement::If {
                condition, body, ..
            } => {
                let condition = emit_expression(condition);
                self.push_line(indent, &format!("if ({condition}) {{"));
                self.emit_block(body, indent + 1)?;
                self.push_line(indent, "}");
            }
            Statement::While {
                condition, body, ..
            } => {
                let condition = emit_expression(condition);
                self.push_line(indent, &format!("while ({condition}) {{"));
                self.emit_block(body, indent + 1)?;
                self.push_line(indent, "}");
            }
            Statement::MethodBody(body) => {
                let header = self.method_header(body)?;
                self.push_line(indent, &format!("{header} {{"));
                self.emit_scope(&body.body, indent + 1)?;
                self.push_line(indent, "}");
            }
            Statement::Call(call) => {
                let call = emit_call(call);
                self.push_line(indent, &format!("{call};"));
            }
            Statement::Expr(expr) => {
                let expr = emit_expression(expr);
                self.push_line(indent, &format!("{expr};"));
            }
        }
        Ok(())
    }

    fn method_header(&self, body: &MethodBody) -> TranspileResult<String> {
        let name = &body.name.name;
        let signature = self
            .signatures
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|decl| decl.name.name == *name)
            .ok_or_else(|| TranspileError::MissingSignature {
                name: name.clone(),
                line: body.name.line,
            })?;

        if signature.parameter_types.len() != body.params.len() {
            return Err(TranspileError::ParameterCountMismatch {
                name: name.clone(),
                expected: signature.parameter_types.len(),
                found: body.params.len(),
                line: body.name.line,
            });
        }

        let mut parameters = Vec::with_capacity(body.params.len());
        for (pattern, ty) in body.params.iter().zip(&signature.parameter_types) {
            match pattern {
                Pattern::Binding(parameter) => {
                    parameters.push(format!("{} {}", lower_type(ty), parameter.name))
                }
                Pattern::Value(_) => {
                    return Err(TranspileError::LiteralPattern {
                        name: name.clone(),
                        line: body.name.line,
                    });
                }
            }
        }
        Ok(format!(
            "{} {name}({})",
            lower_type(&signature.return_type),
            parameters.join(", ")
        ))
    }

    fn push_line(&mut self, indent: usize, line: &str) {
        for _ in 0..indent {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

fn emit_expression(expr: &Expression) -> String {
    match expr {
        Expression::Assign(assignment) => emit_assignment(assignment),
        Expression::Logic(binary)
        | Expression::Equality(binary)
        | Expression::Comparison(binary)
        | Expression::Addition(binary)
        | Expression::Multiplication(binary) => emit_binary(binary),
        Expression::Unary { operator, right } => {
            let operand = emit_expression(right);
            // `- -1` must not collapse into `--1`.
            if operand.starts_with(['-', '!']) {
                format!("{} {operand}", operator.lexeme)
            } else {
                format!("{}{operand}", operator.lexeme)
            }
        }
        Expression::Grouping(inner) => format!("({})", emit_expression(inner)),
        Expression::Literal(literal) => literal.to_string(),
        Expression::Identifier(identifier) => identifier.name.clone(),
        Expression::Call(call) => emit_call(call),
    }
}

fn emit_binary(binary: &Binary) -> String {
    format!(
        "{} {} {}",
        emit_expression(&binary.left),
        binary.operator.lexeme,
        emit_expression(&binary.right)
    )
}

fn emit_assignment(assignment: &Assignment) -> String {
    format!(
        "{} = {}",
        assignment.target.name,
        emit_expression(&assignment.value)
    )
}

fn emit_call(call: &MethodCall) -> String {
    let name = match call.target {
        CallTarget::Builtin(builtin) => builtin.name(),
        CallTarget::Method(_) => call.name.name.as_str(),
    };
    let arguments = call
        .arguments
        .iter()
        .map(emit_expression)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{name}({arguments})")
}

fn lower_type(name: &str) -> String {
    name.to_lowercase()
}

impl Backend for Transpiler {
    fn name(&self) -> &'static str {
        "transpiler"
    }

    fn prepare<'a>(&self, parsed: &'a ParsedProgram) -> Result<Box<dyn PreparedBackend + 'a>> {
        let source = self.transpile(&parsed.program)?;
        Ok(Box::new(PreparedTranspiler { source }))
    }
}

impl PreparedBackend for PreparedTranspiler {
    fn run(&self) -> Result<String> {
        Ok(self.source.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::parser;
    use crate::token::{Literal, TokenKind};
    use indoc::indoc;

    fn transpile_source(source: &str) -> TranspileResult<String> {
        let parsed = parser::parse(source).unwrap_or_else(|err| panic!("parse failed:\n{err}"));
        Transpiler::new().transpile(&parsed.program)
    }

    #[test]
    fn renders_declarations_and_statements() {
        let output = transpile_source(indoc! {r#"
            class Counter
                count :: Int
                count = 0
                step :: Void <- Int, Bool
                step(n, loud) do
                    count = count + n
                    if loud do
                        print(count)
                    end
                end
                while count < 10 do
                    step(3, false)
                end
            end
            print("done")
        "#})
        .expect("transpile failed");

        assert_eq!(
            output,
            indoc! {r#"
                class Counter {
                    int count;
                    count = 0;
                    void step(int, bool);
                    void step(int n, bool loud) {
                        count = count + n;
                        if (loud) {
                            print(count);
                        }
                    }
                    while (count < 10) {
                        step(3, false);
                    }
                }
                print("done");
            "#}
        );
    }

    #[test]
    fn keeps_groupings_unary_operators_and_literal_forms() {
        let output = transpile_source(indoc! {"
            x :: Float
            ok :: Bool
            x = -(1 + 2) * 2.0
            ok = !(x >= 3) and x != null
        "})
        .expect("transpile failed");

        assert_eq!(
            output,
            indoc! {"
                float x;
                bool ok;
                x = -(1 + 2) * 2.0;
                ok = !(x >= 3) and x != null;
            "}
        );
    }

    #[test]
    fn separates_stacked_unary_operators() {
        let output = transpile_source(indoc! {"
            x :: Int
            ok :: Bool
            x = - -1
            ok = !!true
            x = -x
        "})
        .expect("transpile failed");

        assert_eq!(
            output,
            indoc! {"
                int x;
                bool ok;
                x = - -1;
                ok = ! !true;
                x = -x;
            "}
        );
    }

    #[test]
    fn takes_body_types_from_the_nearest_declaration() {
        let output = transpile_source(indoc! {"
            outer :: Void <- Int
            outer(a) do
                inner :: Int <- String
                inner(s) do
                    print(s)
                end
            end
        "})
        .expect("transpile failed");

        assert_eq!(
            output,
            indoc! {"
                void outer(int);
                void outer(int a) {
                    int inner(string);
                    int inner(string s) {
                        print(s);
                    }
                }
            "}
        );
    }

    #[test]
    fn rejects_literal_patterns() {
        let error = transpile_source(indoc! {"
            f :: Void <- Int
            f(0) do
            end
        "})
        .expect_err("literal pattern should not transpile");
        assert_eq!(
            error,
            TranspileError::LiteralPattern {
                name: "f".to_string(),
                line: 2,
            }
        );
    }

    #[test]
    fn rejects_bodies_without_a_visible_declaration() {
        let parsed = parser::parse("f :: Void <- Int\nf(x) do\nend").expect("parse");
        let mut program = parsed.program;
        program.declarations.remove(0);
        let error = Transpiler::new()
            .transpile(&program)
            .expect_err("missing signature");
        assert_eq!(
            error,
            TranspileError::MissingSignature {
                name: "f".to_string(),
                line: 2,
            }
        );
    }

    /// Variable names and literal values from `name :: Type` and
    /// `name = literal` in the original program.
    fn declared_names_and_literals(program: &Program) -> (Vec<String>, Vec<(String, Literal)>) {
        let mut names = Vec::new();
        let mut assignments = Vec::new();
        for declaration in &program.declarations {
            match declaration {
                Declaration::Var(var) => names.push(var.name.name.clone()),
                Declaration::Statement(Statement::Assign(Assignment {
                    target,
                    value: Expression::Literal(literal),
                })) => assignments.push((target.name.clone(), literal.clone())),
                other => panic!("unexpected declaration {other:?}"),
            }
        }
        (names, assignments)
    }

    /// Same extraction over the C-like output: `type name;` and `name = literal;`.
    fn relexed_names_and_literals(source: &str) -> (Vec<String>, Vec<(String, Literal)>) {
        let tokens = lexer::tokenize(source).unwrap_or_else(|err| panic!("relex failed:\n{err}"));
        let mut names = Vec::new();
        let mut assignments = Vec::new();
        for statement in tokens.split(|token| token.kind == TokenKind::Semicolon) {
            match statement {
                [ty, name] if ty.kind == TokenKind::Identifier => {
                    names.push(name.lexeme.to_string())
                }
                [name, equal, value] if equal.kind == TokenKind::Equal => assignments.push((
                    name.lexeme.to_string(),
                    value.literal.clone().expect("literal token"),
                )),
                [eof] if eof.kind == TokenKind::EOF => {}
                other => panic!("unexpected statement {other:?}"),
            }
        }
        (names, assignments)
    }

    #[test]
    fn declarations_and_literal_assignments_survive_relexing() {
        let source = indoc! {r#"
            count :: Int
            ratio :: Float
            huge :: Float
            tiny :: Float
            label :: String
            ready :: Bool
            nothing :: Int
            count = 42
            ratio = 2.0
            huge = 100000000000000000000.0
            tiny = 0.0000001
            label = "two
            lines"
            ready = false
            nothing = null
        "#};
        let parsed = parser::parse(source).expect("parse");
        let output = Transpiler::new()
            .transpile(&parsed.program)
            .expect("transpile failed");

        assert_eq!(
            relexed_names_and_literals(&output),
            declared_names_and_literals(&parsed.program)
        );
    }
}
