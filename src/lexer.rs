use std::{iter::Peekable, str::CharIndices};

use crate::diagnostics::Diagnostics;
use crate::token::{Literal, Span, Token, TokenKind};

mod error;

pub use error::LexError;

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    eof_reached: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            eof_reached: false,
            line: 1,
            column: 1,
        }
    }

    /// Line the lexer is currently positioned on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Scans the next token. Errors consume the offending input, so calling
    /// again resumes after it; at the end of input an EOF token is produced.
    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        loop {
            self.skip_whitespace();

            let Some(&(start, ch)) = self.chars.peek() else {
                self.eof_reached = true;
                let index = self.input.len();
                return Ok(Token::new(
                    TokenKind::EOF,
                    "",
                    Span {
                        start: index,
                        end: index,
                        line: self.line,
                        column: self.column,
                    },
                ));
            };

            let line = self.line;
            let column = self.column;
            let token = match ch {
                '(' => self.single(TokenKind::LeftParen, start, line, column),
                ')' => self.single(TokenKind::RightParen, start, line, column),
                ',' => self.single(TokenKind::Comma, start, line, column),
                '.' => self.single(TokenKind::Dot, start, line, column),
                ';' => self.single(TokenKind::Semicolon, start, line, column),
                '-' => self.single(TokenKind::Minus, start, line, column),
                '+' => self.single(TokenKind::Plus, start, line, column),
                '*' => self.single(TokenKind::Star, start, line, column),
                '=' => self.pair('=', TokenKind::EqualEqual, TokenKind::Equal, start, line, column),
                '!' => self.pair('=', TokenKind::BangEqual, TokenKind::Bang, start, line, column),
                '>' => self.pair(
                    '=',
                    TokenKind::GreaterEqual,
                    TokenKind::Greater,
                    start,
                    line,
                    column,
                ),
                '<' => {
                    self.advance_char();
                    let kind = match self.peek_char() {
                        Some('=') => {
                            self.advance_char();
                            TokenKind::LessEqual
                        }
                        Some('-') => {
                            self.advance_char();
                            TokenKind::Arrow
                        }
                        _ => TokenKind::Less,
                    };
                    self.finish(kind, start, line, column)
                }
                ':' => {
                    self.advance_char();
                    if self.peek_char() != Some(':') {
                        return Err(LexError::ExpectedTypeSeparator { line, column });
                    }
                    self.advance_char();
                    self.finish(TokenKind::TypeSeparator, start, line, column)
                }
                '/' => {
                    self.advance_char();
                    if self.peek_char() == Some('/') {
                        self.skip_line();
                        continue;
                    }
                    self.finish(TokenKind::Slash, start, line, column)
                }
                '#' => {
                    self.skip_line();
                    continue;
                }
                '"' => return self.read_string(start, line, column),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    self.read_identifier(start, line, column)
                }
                c if c.is_ascii_digit() => return self.read_number(start, line, column),
                _ => {
                    self.advance_char();
                    return Err(LexError::UnexpectedCharacter {
                        character: ch,
                        line,
                        column,
                    });
                }
            };
            return Ok(token);
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char();
        self.finish(kind, start, line, column)
    }

    fn pair(
        &mut self,
        second: char,
        matched: TokenKind,
        otherwise: TokenKind,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        self.advance_char();
        let kind = if self.peek_char() == Some(second) {
            self.advance_char();
            matched
        } else {
            otherwise
        };
        self.finish(kind, start, line, column)
    }

    fn finish(&mut self, kind: TokenKind, start: usize, line: usize, column: usize) -> Token<'a> {
        let end = self.current_index();
        Token::new(
            kind,
            &self.input[start..end],
            Span {
                start,
                end,
                line,
                column,
            },
        )
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if matches!(c, ' ' | '\t' | '\r' | '\n') {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let token = self.finish(TokenKind::Identifier, start, line, column);
        match TokenKind::keyword(token.lexeme) {
            Some(TokenKind::True) => Token {
                kind: TokenKind::True,
                ..token
            }
            .with_literal(Literal::Boolean(true)),
            Some(TokenKind::False) => Token {
                kind: TokenKind::False,
                ..token
            }
            .with_literal(Literal::Boolean(false)),
            Some(TokenKind::Null) => Token {
                kind: TokenKind::Null,
                ..token
            }
            .with_literal(Literal::Null),
            Some(kind) => Token { kind, ..token },
            None => token,
        }
    }

    fn read_number(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
    ) -> Result<Token<'a>, LexError> {
        self.take_digits();

        // A trailing dot only belongs to the number when a digit follows it.
        let mut is_float = false;
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance_char();
            self.take_digits();
            is_float = true;
        }

        let token = self.finish(TokenKind::Number, start, line, column);
        let literal = if is_float {
            token
                .lexeme
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Literal::Float)
        } else {
            token.lexeme.parse::<i64>().ok().map(Literal::Integer)
        };
        match literal {
            Some(literal) => Ok(token.with_literal(literal)),
            None => Err(LexError::InvalidNumberLiteral {
                literal: token.lexeme.to_string(),
                line,
            }),
        }
    }

    fn take_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }
    }

    fn read_string(
        &mut self,
        start: usize,
        line: usize,
        column: usize,
    ) -> Result<Token<'a>, LexError> {
        self.advance_char(); // Consume opening quote
        let content_start = start + 1;
        while let Some(&(idx, c)) = self.chars.peek() {
            self.advance_char();
            if c == '"' {
                let token = Token::new(
                    TokenKind::String,
                    &self.input[start..idx + 1],
                    Span {
                        start,
                        end: idx + 1,
                        line,
                        column,
                    },
                );
                let content = self.input[content_start..idx].to_string();
                return Ok(token.with_literal(Literal::String(content)));
            }
        }
        Err(LexError::UnterminatedString { line, column })
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.peek().map(|&(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    /// Yields tokens and errors in source order, ending with the EOF token.
    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        Some(self.next_token())
    }
}

/// Scans the whole input, keeping every token that could be produced along
/// with the diagnostics for the parts that could not. The token list always
/// ends with EOF.
pub fn scan(input: &str) -> (Vec<Token<'_>>, Diagnostics) {
    let mut tokens = Vec::new();
    let mut diagnostics = Diagnostics::default();
    for item in Lexer::new(input) {
        match item {
            Ok(token) => tokens.push(token),
            Err(error) => diagnostics.push(error.into()),
        }
    }
    (tokens, diagnostics)
}

pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, Diagnostics> {
    let (tokens, diagnostics) = scan(input);
    diagnostics.into_result(tokens)
}
