use std::fmt;
use std::rc::Rc;

use crate::lexer::{Token, TokenKind};

use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("unbalanced string literal at offset {start}")]
    UnterminatedString { start: usize },
    #[error("unbalanced: expected {expected}, got end of input")]
    PrematureEndOfInput { expected: Expected },
    #[error("unbalanced: expected {expected}, got '{}' at offset {}", .got.kind, .got.start)]
    UnexpectedToken { expected: Expected, got: Token },
    #[error("invalid number '{literal}' at offset {start}")]
    InvalidNumber { literal: Rc<str>, start: usize },
    #[error("invalid map key '{}' at offset {}", .0.kind, .0.start)]
    InvalidMapKey(Token),
}

#[derive(Debug, PartialEq)]
pub enum Expected {
    Token(TokenKind),
    Form,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Token(kind) => write!(f, "'{kind}'"),
            Expected::Form => f.write_str("a form"),
        }
    }
}

impl ParseError {
    pub fn premature_end_expected_form() -> Self {
        ParseError::PrematureEndOfInput {
            expected: Expected::Form,
        }
    }

    pub fn unexpected_token(expected: TokenKind, got: Option<Token>) -> ParseError {
        match got {
            Some(got) => ParseError::UnexpectedToken {
                expected: Expected::Token(expected),
                got,
            },
            None => ParseError::PrematureEndOfInput {
                expected: Expected::Token(expected),
            },
        }
    }

    pub fn unexpected_other(expected: Expected, got: Option<Token>) -> ParseError {
        match got {
            Some(got) => ParseError::UnexpectedToken { expected, got },
            None => ParseError::PrematureEndOfInput { expected },
        }
    }

    /// Errors raised while splitting a token rather than while arranging tokens.
    pub fn is_lexical(&self) -> bool {
        matches!(self, ParseError::UnterminatedString { .. })
    }
}
