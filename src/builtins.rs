use crate::token::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Print,
}

impl BuiltinFunction {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Print => Some(Self::Print),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Print => 1,
        }
    }
}
