use crate::ast::{
    Assignment, Binary, CallTarget, ClassDecl, Declaration, Expression, Identifier, MethodBody,
    MethodCall, MethodDecl, Operator, Pattern, Program, Statement, VarDecl,
};
use crate::builtins::BuiltinFunction;
use crate::diagnostics::Diagnostics;
use crate::lexer;
use crate::scope::{Cursor, Entity, MethodId, ScopeError, ScopeTable};
use crate::token::{Span, Token, TokenKind};

mod error;

use error::scope_error;
pub use error::ParseError;

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parser output: the syntax tree and the scope table built alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProgram {
    pub program: Program,
    pub scopes: ScopeTable,
}

pub struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    index: usize,
    scopes: ScopeTable,
    cursor: Cursor,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token<'a>>) -> Self {
        if tokens.last().is_none_or(|token| token.kind != TokenKind::EOF) {
            let span = tokens
                .last()
                .map(|token| Span {
                    start: token.span.end,
                    end: token.span.end,
                    ..token.span
                })
                .unwrap_or_default();
            tokens.push(Token::new(TokenKind::EOF, "", span));
        }
        Self {
            tokens,
            index: 0,
            scopes: ScopeTable::new(),
            cursor: Cursor::GLOBAL,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Parses every declaration, reporting as many errors as recovery allows.
    pub fn parse_program(mut self) -> Result<ParsedProgram, Diagnostics> {
        let declarations = self.declarations(false);
        let parsed = ParsedProgram {
            program: Program { declarations },
            scopes: self.scopes,
        };
        self.diagnostics.into_result(parsed)
    }

    fn declarations(&mut self, in_block: bool) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while !self.is_at_end() && !(in_block && self.check(TokenKind::End)) {
            let start = self.index;
            match self.declaration() {
                Ok(declaration) => declarations.push(declaration),
                Err(error) => {
                    self.diagnostics.push(error.into());
                    self.synchronize(start);
                }
            }
        }
        declarations
    }

    fn declaration(&mut self) -> ParseResult<Declaration> {
        if self.check(TokenKind::Class) {
            return self.class_declaration();
        }
        if self.check(TokenKind::Identifier) {
            if self.peek_at(3).kind == TokenKind::Arrow {
                return self.method_declaration();
            }
            if self.peek_at(1).kind == TokenKind::TypeSeparator {
                return self.var_declaration();
            }
        }
        Ok(Declaration::Statement(self.statement()?))
    }

    fn class_declaration(&mut self) -> ParseResult<Declaration> {
        let keyword = self.advance();
        let name = self.expect_identifier("class name")?;
        let class = match self.scopes.declare_class(&name.name, self.cursor) {
            Ok(class) => class,
            Err(error) => {
                self.skip_block();
                return Err(scope_error(error, name.line));
            }
        };

        let saved = self.cursor;
        self.cursor = Cursor::in_class(class);
        let body = self.block("class", keyword.line());
        self.cursor = saved;

        Ok(Declaration::Class(ClassDecl { name, body: body? }))
    }

    fn method_declaration(&mut self) -> ParseResult<Declaration> {
        let name = self.expect_identifier("method name")?;
        self.expect(TokenKind::TypeSeparator, "'::'")?;
        let return_type = self.expect_type()?;
        self.expect(TokenKind::Arrow, "'<-'")?;
        let mut parameter_types = vec![self.expect_type()?];
        while self.matches(TokenKind::Comma) {
            parameter_types.push(self.expect_type()?);
        }
        self.scopes
            .declare_method(&name.name, &return_type, &parameter_types, self.cursor)
            .map_err(|error| scope_error(error, name.line))?;
        self.matches(TokenKind::Semicolon);

        Ok(Declaration::Method(MethodDecl {
            name,
            return_type,
            parameter_types,
        }))
    }

    fn var_declaration(&mut self) -> ParseResult<Declaration> {
        let name = self.expect_identifier("variable name")?;
        self.expect(TokenKind::TypeSeparator, "'::'")?;
        let var_type = self.expect_type()?;
        self.scopes
            .declare_variable(&name.name, self.cursor)
            .map_err(|error| scope_error(error, name.line))?;
        self.matches(TokenKind::Semicolon);

        Ok(Declaration::Var(VarDecl { name, var_type }))
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        let kind = self.peek().kind;
        let next = self.peek_at(1).kind;
        let statement = match kind {
            TokenKind::While => self.while_statement()?,
            TokenKind::If => self.if_statement()?,
            TokenKind::Identifier if next == TokenKind::LeftParen => {
                if self.is_method_body_definition() {
                    self.method_body()?
                } else {
                    Statement::Call(self.call()?)
                }
            }
            TokenKind::Print if next == TokenKind::LeftParen => Statement::Call(self.call()?),
            TokenKind::Identifier if next == TokenKind::Equal => {
                Statement::Assign(self.assignment()?)
            }
            _ => Statement::Expr(self.expression()?),
        };
        self.matches(TokenKind::Semicolon);
        Ok(statement)
    }

    fn while_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        let condition = self.expression()?;
        self.expect_do()?;
        let body = self.block("while loop", keyword.line())?;
        Ok(Statement::While {
            condition,
            body,
            line: keyword.line(),
        })
    }

    fn if_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.advance();
        let condition = self.expression()?;
        self.expect_do()?;
        let body = self.block("if statement", keyword.line())?;
        Ok(Statement::If {
            condition,
            body,
            line: keyword.line(),
        })
    }

    /// `name(...)` followed by `do` after the matching close paren.
    fn is_method_body_definition(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 1;
        loop {
            match self.peek_at(offset).kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_at(offset + 1).is_do();
                    }
                }
                TokenKind::EOF => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn method_body(&mut self) -> ParseResult<Statement> {
        let name = self.expect_identifier("method name")?;
        let Some(method) = self.scopes.resolve_method(&name.name, self.cursor) else {
            self.skip_method_body();
            let error = ScopeError::UndeclaredMethod {
                name: name.name.clone(),
            };
            return Err(scope_error(error, name.line));
        };

        let saved = self.cursor;
        self.cursor = self.scopes.body_cursor(method);
        let body = self.method_body_rest(name, method);
        self.cursor = saved;
        body
    }

    fn method_body_rest(&mut self, name: Identifier, method: MethodId) -> ParseResult<Statement> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.pattern(method)?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        self.expect_do()?;
        let body = self.block("method body", name.line)?;
        let id = self.scopes.add_implementation(method);

        Ok(Statement::MethodBody(MethodBody {
            id,
            name,
            params,
            body,
            method,
        }))
    }

    fn pattern(&mut self, method: MethodId) -> ParseResult<Pattern> {
        let next = self.peek_at(1).kind;
        if self.check(TokenKind::Identifier)
            && matches!(next, TokenKind::Comma | TokenKind::RightParen)
        {
            let name = self.expect_identifier("parameter")?;
            self.scopes.bind_parameter(method, &name.name);
            return Ok(Pattern::Binding(name));
        }

        let line = self.peek().line();
        let value = self.unary()?;
        if !value.is_constant() {
            return Err(ParseError::InvalidPattern { line });
        }
        Ok(Pattern::Value(value))
    }

    fn call(&mut self) -> ParseResult<MethodCall> {
        let token = self.advance();
        let name = Identifier::new(token.lexeme, token.line());
        let target = match BuiltinFunction::from_token(token.kind) {
            Some(builtin) => CallTarget::Builtin(builtin),
            None => {
                let method = self
                    .scopes
                    .resolve_method(&name.name, self.cursor)
                    .ok_or_else(|| {
                        let error = ScopeError::UndeclaredMethod {
                            name: name.name.clone(),
                        };
                        scope_error(error, name.line)
                    })?;
                CallTarget::Method(method)
            }
        };

        self.expect(TokenKind::LeftParen, "'('")?;
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                arguments.push(self.expression()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;

        Ok(MethodCall {
            name,
            arguments,
            target,
        })
    }

    fn assignment(&mut self) -> ParseResult<Assignment> {
        let target = self.expect_identifier("assignment target")?;
        match self.scopes.resolve(&target.name, self.cursor) {
            Some(Entity::Variable(_)) => {}
            Some(entity) => {
                let error = ScopeError::NotAssignable {
                    name: target.name.clone(),
                    found: entity.kind(),
                };
                return Err(scope_error(error, target.line));
            }
            None => {
                let error = ScopeError::UndeclaredVariable {
                    name: target.name.clone(),
                };
                return Err(scope_error(error, target.line));
            }
        }
        self.expect(TokenKind::Equal, "'='")?;
        let value = self.expression()?;
        Ok(Assignment { target, value })
    }

    fn expression(&mut self) -> ParseResult<Expression> {
        if self.check(TokenKind::Identifier) && self.peek_at(1).kind == TokenKind::Equal {
            return Ok(Expression::Assign(Box::new(self.assignment()?)));
        }
        self.logic()
    }

    fn logic(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[TokenKind::And, TokenKind::Or],
            Self::equality,
            Expression::Logic,
        )
    }

    fn equality(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[TokenKind::EqualEqual, TokenKind::BangEqual],
            Self::comparison,
            Expression::Equality,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::addition,
            Expression::Comparison,
        )
    }

    fn addition(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[TokenKind::Plus, TokenKind::Minus],
            Self::multiplication,
            Expression::Addition,
        )
    }

    fn multiplication(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[TokenKind::Star, TokenKind::Slash],
            Self::unary,
            Expression::Multiplication,
        )
    }

    /// Left-associative loop shared by every binary precedence level.
    fn binary(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expression>,
        build: fn(Binary) -> Expression,
    ) -> ParseResult<Expression> {
        let mut expr = operand(self)?;
        while operators.contains(&self.peek().kind) {
            let token = self.advance();
            let operator = Operator::new(token.kind, token.lexeme, token.line());
            let right = operand(self)?;
            expr = build(Binary::new(expr, operator, right));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expression> {
        if matches!(self.peek().kind, TokenKind::Bang | TokenKind::Minus) {
            let token = self.advance();
            let right = self.unary()?;
            return Ok(Expression::Unary {
                operator: Operator::new(token.kind, token.lexeme, token.line()),
                right: Box::new(right),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        let kind = self.peek().kind;
        let next = self.peek_at(1).kind;
        match kind {
            TokenKind::Null
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Number
            | TokenKind::String => {
                let token = self.advance();
                let line = token.line();
                let found = token.describe();
                token
                    .literal
                    .map(Expression::Literal)
                    .ok_or(ParseError::ExpectedExpression { found, line })
            }
            TokenKind::Identifier | TokenKind::Print if next == TokenKind::LeftParen => {
                Ok(Expression::Call(self.call()?))
            }
            TokenKind::Identifier => {
                let name = self.expect_identifier("identifier")?;
                if self.scopes.resolve(&name.name, self.cursor).is_none() {
                    let error = ScopeError::UndeclaredName {
                        name: name.name.clone(),
                    };
                    return Err(scope_error(error, name.line));
                }
                Ok(Expression::Identifier(name))
            }
            TokenKind::LeftParen => {
                let open = self.advance();
                let inner = self.expression()?;
                if !self.matches(TokenKind::RightParen) {
                    return Err(ParseError::UnclosedGrouping { line: open.line() });
                }
                Ok(Expression::Grouping(Box::new(inner)))
            }
            _ => {
                let token = self.peek();
                Err(ParseError::ExpectedExpression {
                    found: token.describe(),
                    line: token.line(),
                })
            }
        }
    }

    fn block(&mut self, construct: &'static str, line: usize) -> ParseResult<Vec<Declaration>> {
        let body = self.declarations(true);
        if !self.matches(TokenKind::End) {
            return Err(ParseError::UnterminatedBlock { construct, line });
        }
        Ok(body)
    }

    /// Skips past the `end` closing the block the parser is inside of.
    fn skip_block(&mut self) {
        let mut depth = 1usize;
        while !self.is_at_end() {
            let token = self.advance();
            if token.kind == TokenKind::Class || token.is_do() {
                depth += 1;
            } else if token.kind == TokenKind::End {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    fn skip_method_body(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.advance().kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        if self.peek().is_do() {
            self.advance();
        }
        self.skip_block();
    }

    /// Recovers after an error: always makes progress, then drops the rest of
    /// the line the failure happened on, stopping early at `end`.
    fn synchronize(&mut self, start: usize) {
        if self.index == start {
            self.advance();
        }
        let line = self.tokens[self.index.saturating_sub(1)].line();
        while !self.is_at_end() && !self.check(TokenKind::End) && self.peek().line() == line {
            self.advance();
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> ParseResult<Token<'a>> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &'static str) -> ParseResult<Identifier> {
        let token = self.expect(TokenKind::Identifier, expected)?;
        Ok(Identifier::new(token.lexeme, token.line()))
    }

    fn expect_type(&mut self) -> ParseResult<String> {
        let token = self.expect(TokenKind::Identifier, "type name")?;
        Ok(token.lexeme.to_string())
    }

    fn expect_do(&mut self) -> ParseResult<()> {
        if self.peek().is_do() {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("'do'"))
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        let token = self.peek();
        ParseError::UnexpectedToken {
            expected,
            found: token.describe(),
            line: token.line(),
        }
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::EOF)
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.tokens[self.index].clone();
        if !self.is_at_end() {
            self.index += 1;
        }
        token
    }

    fn peek(&self) -> &Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token<'a> {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.index + offset).min(last)]
    }
}

pub fn parse_tokens(tokens: Vec<Token<'_>>) -> Result<ParsedProgram, Diagnostics> {
    Parser::new(tokens).parse_program()
}

/// Lexes and parses `input`; lexing errors stop before parsing starts.
pub fn parse(input: &str) -> Result<ParsedProgram, Diagnostics> {
    let tokens = lexer::tokenize(input)?;
    parse_tokens(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::scope::EntityKind;
    use crate::token::Literal;
    use indoc::indoc;

    fn int(value: i64) -> Expression {
        Expression::Literal(Literal::Integer(value))
    }

    fn op(kind: TokenKind, lexeme: &str, line: usize) -> Operator {
        Operator::new(kind, lexeme, line)
    }

    fn parse_ok(input: &str) -> ParsedProgram {
        parse(input).unwrap_or_else(|err| panic!("parse failed:\n{err}"))
    }

    #[test]
    fn parses_variable_declaration_and_registers_it() {
        let parsed = parse_ok("x :: Int");

        assert_eq!(
            parsed.program.declarations,
            vec![Declaration::Var(VarDecl {
                name: Identifier::new("x", 1),
                var_type: "Int".to_string(),
            })]
        );
        let Some(Entity::Variable(x)) = parsed.scopes.resolve("x", Cursor::GLOBAL) else {
            panic!("x should be registered as a variable");
        };
        assert_eq!(parsed.scopes.variable(x).name, "x");
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let parsed = parse_ok(indoc! {"
            x :: Int
            x = 1 + 2 * 3
        "});

        let expected = Declaration::Statement(Statement::Assign(Assignment {
            target: Identifier::new("x", 2),
            value: Expression::Addition(Binary::new(
                int(1),
                op(TokenKind::Plus, "+", 2),
                Expression::Multiplication(Binary::new(
                    int(2),
                    op(TokenKind::Star, "*", 2),
                    int(3),
                )),
            )),
        }));
        assert_eq!(parsed.program.declarations[1], expected);
    }

    #[test]
    fn binary_operators_are_left_associative() {
        let parsed = parse_ok("1 - 2 - 3");
        let expected = Expression::Addition(Binary::new(
            Expression::Addition(Binary::new(int(1), op(TokenKind::Minus, "-", 1), int(2))),
            op(TokenKind::Minus, "-", 1),
            int(3),
        ));
        assert_eq!(
            parsed.program.declarations,
            vec![Declaration::Statement(Statement::Expr(expected))]
        );
    }

    #[test]
    fn precedence_climbs_from_logic_to_unary() {
        let parsed = parse_ok("!true or 1 + 2 < 4 == false");
        let Declaration::Statement(Statement::Expr(Expression::Logic(logic))) =
            &parsed.program.declarations[0]
        else {
            panic!("expected logic expression at the root");
        };
        assert!(matches!(*logic.left, Expression::Unary { .. }));
        let Expression::Equality(equality) = &*logic.right else {
            panic!("expected equality on the right of 'or'");
        };
        assert!(matches!(*equality.left, Expression::Comparison(_)));
    }

    #[test]
    fn nested_classes_register_under_their_parent() {
        let parsed = parse_ok(indoc! {"
            class Outer
                size :: Int
                class Inner
                    depth :: Int
                end
            end
        "});

        let scopes = &parsed.scopes;
        let outer = scopes
            .find_class("Outer", Cursor::GLOBAL)
            .expect("Outer registered globally");
        let inner = scopes
            .find_class("Inner", Cursor::in_class(outer))
            .expect("Inner registered under Outer");
        assert_eq!(scopes.class(inner).parent, Some(outer));
        assert_eq!(scopes.class(outer).members.variables.len(), 1);
        assert_eq!(scopes.class(inner).members.variables.len(), 1);
        assert!(scopes.find_class("Inner", Cursor::GLOBAL).is_none());
    }

    #[test]
    fn method_bodies_attach_to_their_declaration() {
        let parsed = parse_ok(indoc! {"
            f :: Int <- Int
            f(0) do
                print(0)
            end
            f(n) do
                print(n)
            end
        "});

        let scopes = &parsed.scopes;
        let f = scopes
            .resolve_method("f", Cursor::GLOBAL)
            .expect("f declared");
        assert_eq!(scopes.method(f).parameter_types, vec!["Int".to_string()]);
        assert_eq!(scopes.method(f).implementations.len(), 2);
        assert_eq!(scopes.method(f).members.variables.len(), 1);

        let Declaration::Statement(Statement::MethodBody(first)) = &parsed.program.declarations[1]
        else {
            panic!("expected method body");
        };
        assert_eq!(first.method, f);
        assert_eq!(first.params, vec![Pattern::Value(int(0))]);
        assert_eq!(first.id, scopes.method(f).implementations[0]);
    }

    #[test]
    fn method_declaration_is_detected_three_tokens_ahead() {
        let parsed = parse_ok("area :: Float <- Int, Int");
        assert_eq!(
            parsed.program.declarations,
            vec![Declaration::Method(MethodDecl {
                name: Identifier::new("area", 1),
                return_type: "Float".to_string(),
                parameter_types: vec!["Int".to_string(), "Int".to_string()],
            })]
        );
    }

    #[test]
    fn nested_method_bodies_see_outer_parameters() {
        let parsed = parse_ok(indoc! {"
            outer :: Void <- Int
            outer(a) do
                inner :: Void <- Int
                inner(b) do
                    print(a + b)
                end
                inner(a)
            end
        "});

        let scopes = &parsed.scopes;
        let outer = scopes
            .resolve_method("outer", Cursor::GLOBAL)
            .expect("outer declared");
        let inner = scopes
            .resolve_method("inner", scopes.body_cursor(outer))
            .expect("inner declared inside outer");
        assert_eq!(scopes.method(inner).parent_method, Some(outer));
        assert_eq!(scopes.method(inner).implementations.len(), 1);
    }

    #[test]
    fn print_targets_the_builtin() {
        let parsed = parse_ok("print(\"hi\")");
        let Declaration::Statement(Statement::Call(call)) = &parsed.program.declarations[0] else {
            panic!("expected call statement");
        };
        assert_eq!(call.target, CallTarget::Builtin(BuiltinFunction::Print));
        assert_eq!(
            call.arguments,
            vec![Expression::Literal(Literal::String("hi".to_string()))]
        );
    }

    #[test]
    fn parses_while_and_if_blocks() {
        let parsed = parse_ok(indoc! {"
            n :: Int
            n = 0
            while n < 3 do
                if n == 1 do
                    print(n)
                end
                n = n + 1
            end
        "});

        let Declaration::Statement(Statement::While { body, line, .. }) =
            &parsed.program.declarations[2]
        else {
            panic!("expected while loop");
        };
        assert_eq!(*line, 3);
        assert!(matches!(
            body[0],
            Declaration::Statement(Statement::If { line: 4, .. })
        ));
    }

    #[test]
    fn rejects_forward_references() {
        let err = parse("x = 1\nx :: Int").expect_err("expected scope error");
        assert!(err.to_string().contains("Undeclared variable 'x' at line 1"));
        let diagnostic = err.iter().next().expect("one diagnostic");
        assert_eq!(diagnostic.kind, DiagnosticKind::Scope);
        assert_eq!(diagnostic.line, Some(1));
    }

    #[test]
    fn rejects_bodies_and_calls_for_undeclared_methods() {
        let err = parse(indoc! {"
            f(x) do
                print(x)
            end
            g(1)
        "})
        .expect_err("expected scope errors");

        let messages = err.iter().map(|d| d.message.clone()).collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec![
                "Undeclared method 'f' at line 1".to_string(),
                "Undeclared method 'g' at line 4".to_string(),
            ]
        );
    }

    #[test]
    fn reports_several_errors_in_one_run() {
        let err = parse(indoc! {"
            a = 1
            b :: Int
            b = (2 + 3
            c = 4
        "})
        .expect_err("expected errors");

        assert_eq!(err.len(), 3);
        assert!(err.to_string().contains("Expected ')' to close '(' opened at line 3"));
    }

    #[test]
    fn rejects_duplicate_declarations_and_assignment_to_methods() {
        let err = parse(indoc! {"
            x :: Int
            x :: Int
            f :: Int <- Int
            f = 1
        "})
        .expect_err("expected scope errors");

        let messages = err.to_string();
        assert!(messages.contains("Duplicate variable declaration 'x' in this scope at line 2"));
        assert!(messages.contains("Cannot assign to method 'f' at line 4"));
        assert!(err.iter().all(|d| d.kind == DiagnosticKind::Scope));
    }

    #[test]
    fn reports_unterminated_blocks() {
        let err = parse("while true do\nprint(1)").expect_err("expected missing end");
        assert!(
            err.to_string()
                .contains("Expected 'end' to close while loop opened at line 1")
        );
    }

    #[test]
    fn rejects_non_constant_patterns() {
        let err = parse(indoc! {"
            y :: Int
            f :: Int <- Int
            f(y + 1) do
            end
        "})
        .expect_err("expected invalid pattern");
        assert!(
            err.to_string()
                .contains("Parameter patterns must be identifiers or constants at line 3")
        );
    }

    #[test]
    fn reports_unparseable_primary() {
        let err = parse("return").expect_err("expected parse error");
        assert!(err.to_string().contains("Expected expression, got 'return' at line 1"));
    }

    #[test]
    fn duplicate_class_skips_its_body() {
        let err = parse(indoc! {"
            class A
            end
            class A
                x :: Int
            end
        "})
        .expect_err("expected duplicate class");
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("Duplicate class declaration 'A'"));
    }

    #[test]
    fn scope_errors_name_the_entity_kind() {
        let error = ScopeError::DuplicateDeclaration {
            kind: EntityKind::Method,
            name: "f".to_string(),
        };
        assert_eq!(
            scope_error(error, 3).to_string(),
            "Duplicate method declaration 'f' in this scope at line 3"
        );
    }
}
