use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

use regex::{CaptureMatches, Regex};

/// Leading whitespace and commas are consumed outside the capture group; the
/// group itself is the token. Comments and empty captures are dropped by the
/// tokenizer.
const TOKEN_PATTERN: &str =
    r#"[\s,]*(~@|[\[\]{}()'`~^@]|"(?:\\.|[^\\"])*"?|;.*|[^\s\[\]{}('"`,;)]*)"#;

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"))
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    SpliceUnquote,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Quote,
    Quasiquote,
    Unquote,
    Caret,
    At,

    /// Raw string literal, quotes and escapes included. May be missing its
    /// closing quote; the parser reports that.
    String(Rc<str>),
    Atom(Rc<str>),
}

impl TokenKind {
    fn classify(text: &str) -> TokenKind {
        match text {
            "~@" => TokenKind::SpliceUnquote,
            "(" => TokenKind::LParen,
            ")" => TokenKind::RParen,
            "[" => TokenKind::LBracket,
            "]" => TokenKind::RBracket,
            "{" => TokenKind::LBrace,
            "}" => TokenKind::RBrace,
            "'" => TokenKind::Quote,
            "`" => TokenKind::Quasiquote,
            "~" => TokenKind::Unquote,
            "^" => TokenKind::Caret,
            "@" => TokenKind::At,
            _ if text.starts_with('"') => TokenKind::String(text.into()),
            _ => TokenKind::Atom(text.into()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TokenKind::SpliceUnquote => "~@",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Quote => "'",
            TokenKind::Quasiquote => "`",
            TokenKind::Unquote => "~",
            TokenKind::Caret => "^",
            TokenKind::At => "@",
            TokenKind::String(text) | TokenKind::Atom(text) => text,
        }
    }

    pub fn is_closing(&self) -> bool {
        matches!(
            self,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

pub struct Tokenizer<'a> {
    iter: CaptureMatches<'static, 'a>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            iter: token_regex().captures_iter(input),
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        for captures in self.iter.by_ref() {
            let Some(matched) = captures.get(1) else {
                continue;
            };
            let text = matched.as_str();
            if text.is_empty() || text.starts_with(';') {
                continue;
            }
            return Some(Token {
                kind: TokenKind::classify(text),
                start: matched.start(),
                end: matched.end(),
            });
        }
        None
    }
}
