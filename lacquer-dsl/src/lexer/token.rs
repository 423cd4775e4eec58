//! Lexer token types

use lacquer_core::TemplateError;
use std::fmt;

// ============================================================================
// TOKENS
// ============================================================================

/// Token kinds for key templates.
///
/// `Text` only appears outside placeholders; every other kind only inside.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Literal text between placeholders.
    Text(String),

    // Delimiters
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Dot,

    Identifier(String),

    // Special
    Eof,
    Error(TemplateError),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Text(_) => write!(f, "literal text"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::Eof => write!(f, "end of template"),
            TokenKind::Error(err) => write!(f, "{}", err),
        }
    }
}

/// Byte range of a token in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
