pub mod error;

use std::collections::HashMap;
use std::rc::Rc;

use crate::lexer::{Token, TokenKind, Tokenizer};
use crate::value::Value;
pub use error::{Expected, ParseError};

/// Reads the first form of `input`. `Ok(None)` means there was nothing to read
/// (blank or comment-only input); anything after the first form is ignored.
pub fn read_str(input: &str) -> Result<Option<Rc<Value>>, ParseError> {
    Parser::new(Tokenizer::new(input)).read_form()
}

/// Reads every top-level form of `input`, in order.
pub fn read_all(input: &str) -> Result<Vec<Rc<Value>>, ParseError> {
    Parser::new(Tokenizer::new(input)).read_all()
}

pub struct Parser<'a> {
    pub iter: std::iter::Peekable<Tokenizer<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(tokenizer: Tokenizer<'a>) -> Self {
        let iter = tokenizer.peekable();
        Self { iter }
    }

    pub(crate) fn expect_token(&mut self, token_kind: TokenKind) -> Result<(), ParseError> {
        let token = self.iter.next();
        match token {
            Some(Token { kind, .. }) if kind == token_kind => Ok(()),
            _ => Err(ParseError::unexpected_token(token_kind, token)),
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<Rc<Value>>, ParseError> {
        let mut forms = Vec::new();
        while let Some(form) = self.read_form()? {
            forms.push(form);
        }
        Ok(forms)
    }

    pub fn read_form(&mut self) -> Result<Option<Rc<Value>>, ParseError> {
        if self.iter.peek().is_none() {
            return Ok(None);
        }
        self.read_required_form().map(Some)
    }

    fn read_required_form(&mut self) -> Result<Rc<Value>, ParseError> {
        let Some(token) = self.iter.peek() else {
            return Err(ParseError::premature_end_expected_form());
        };
        match token.kind.clone() {
            TokenKind::LParen => self.read_sequence(TokenKind::RParen).map(Value::list),
            TokenKind::LBracket => self.read_sequence(TokenKind::RBracket).map(Value::vector),
            TokenKind::LBrace => self.read_map(),
            TokenKind::Quote => self.read_prefixed(Value::quote),
            TokenKind::Quasiquote => self.read_prefixed(Value::quasiquote),
            TokenKind::Unquote => self.read_prefixed(Value::unquote),
            TokenKind::SpliceUnquote => self.read_prefixed(Value::splice_unquote),
            TokenKind::At => {
                self.read_prefixed(|form| Value::list(vec![Value::symbol("deref"), form]))
            }
            TokenKind::Caret => self.read_with_meta(),
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => Err(
                ParseError::unexpected_other(Expected::Form, self.iter.next()),
            ),
            TokenKind::String(_) | TokenKind::Atom(_) => self.read_atom(),
        }
    }

    /// Reads children up to `terminator`; the opening bracket is the next token.
    fn read_sequence(&mut self, terminator: TokenKind) -> Result<Vec<Rc<Value>>, ParseError> {
        self.iter.next();

        let mut children = Vec::new();
        while let Some(token) = self.iter.peek() {
            if token.kind.is_closing() {
                break;
            }
            children.push(self.read_required_form()?);
        }
        self.expect_token(terminator)?;
        Ok(children)
    }

    fn read_map(&mut self) -> Result<Rc<Value>, ParseError> {
        self.iter.next();

        let mut entries = HashMap::new();
        while let Some(token) = self.iter.next_if(|token| !token.kind.is_closing()) {
            let key = match &token.kind {
                TokenKind::String(text) => {
                    read_string(&token)?;
                    Some(text.clone())
                }
                TokenKind::Atom(text) => Some(text.clone()),
                _ => None,
            };
            let Some(key) = key else {
                return Err(ParseError::InvalidMapKey(token));
            };
            let value = self.read_required_form()?;
            entries.insert(key, value);
        }
        self.expect_token(TokenKind::RBrace)?;
        Ok(Value::map(entries))
    }

    fn read_prefixed(
        &mut self,
        wrap: impl FnOnce(Rc<Value>) -> Rc<Value>,
    ) -> Result<Rc<Value>, ParseError> {
        self.iter.next();
        Ok(wrap(self.read_required_form()?))
    }

    /// `^meta form` reads as `(with-meta form meta)`.
    fn read_with_meta(&mut self) -> Result<Rc<Value>, ParseError> {
        self.iter.next();
        let meta = self.read_required_form()?;
        let form = self.read_required_form()?;
        Ok(Value::list(vec![Value::symbol("with-meta"), form, meta]))
    }

    fn read_atom(&mut self) -> Result<Rc<Value>, ParseError> {
        let Some(token) = self.iter.next() else {
            return Err(ParseError::premature_end_expected_form());
        };
        if let TokenKind::String(_) = token.kind {
            return read_string(&token).map(Value::string);
        }
        if let TokenKind::Atom(text) = &token.kind {
            return read_plain_atom(text, &token);
        }
        Err(ParseError::UnexpectedToken {
            expected: Expected::Form,
            got: token,
        })
    }
}

fn read_plain_atom(text: &Rc<str>, token: &Token) -> Result<Rc<Value>, ParseError> {
    if is_number(text) {
        return read_number(text, token);
    }
    if let Some(name) = text.strip_prefix(':') {
        return Ok(Value::keyword(name));
    }
    Ok(match text.as_ref() {
        "nil" => Value::nil(),
        "true" => Value::boolean(true),
        "false" => Value::boolean(false),
        _ => Value::symbol(text.clone()),
    })
}

/// Digit-leading, or a sign followed by a digit.
fn is_number(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_digit() => true,
        Some('-' | '+') => chars.next().is_some_and(|ch| ch.is_ascii_digit()),
        _ => false,
    }
}

fn read_number(text: &Rc<str>, token: &Token) -> Result<Rc<Value>, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        literal: text.clone(),
        start: token.start,
    };
    if text.contains('.') {
        text.parse::<f64>().map(Value::float).map_err(|_| invalid())
    } else {
        text.parse::<i64>().map(Value::integer).map_err(|_| invalid())
    }
}

/// Decodes a raw string token, failing if its closing quote is missing.
fn read_string(token: &Token) -> Result<String, ParseError> {
    let mut chars = token.kind.text().chars().skip(1);
    let mut value = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            // The tokenizer ends string tokens at the first unescaped quote.
            '"' => return Ok(value),
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('"') => value.push('"'),
                Some('\\') => value.push('\\'),
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            _ => value.push(ch),
        }
    }
    Err(ParseError::UnterminatedString { start: token.start })
}
