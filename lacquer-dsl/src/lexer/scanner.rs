//! Lexer implementation

use super::token::*;
use lacquer_core::TemplateError;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Two-mode lexer for key templates.
///
/// Outside a placeholder everything up to the next brace is literal text.
/// Inside, whitespace is skipped and identifiers and punctuation are
/// tokenized. Structural brace errors are reported as a single
/// [`TokenKind::Error`] token, after which lexing stops.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
    /// Offset of the `{` that opened the current placeholder.
    open: Option<usize>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given template.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
            open: None,
        }
    }

    /// Tokenize the entire template. The last token is always `Eof` or
    /// `Error`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let done = matches!(token.kind, TokenKind::Eof | TokenKind::Error(_));
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }

    fn next_token(&mut self) -> Token {
        if self.open.is_some() {
            self.next_placeholder_token()
        } else {
            self.next_text_token()
        }
    }

    fn next_text_token(&mut self) -> Token {
        let start = self.pos;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some('{') => {
                self.advance();
                self.open = Some(start);
                TokenKind::LBrace
            }
            Some('}') => {
                self.advance();
                TokenKind::Error(TemplateError::UnmatchedClose { position: start })
            }
            Some(_) => self.scan_text(),
        };

        self.token(kind, start)
    }

    fn next_placeholder_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;

        let kind = match self.peek_char() {
            None => TokenKind::Error(TemplateError::UnterminatedPlaceholder {
                position: self.open.unwrap_or(start),
            }),
            Some(c) => match c {
                '{' => {
                    self.advance();
                    TokenKind::Error(TemplateError::NestedPlaceholder { position: start })
                }
                '}' => {
                    self.advance();
                    self.open = None;
                    TokenKind::RBrace
                }
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
                c => {
                    self.advance();
                    TokenKind::Error(TemplateError::UnexpectedToken {
                        found: format!("character '{}'", c),
                        expected: "identifier, '(', ')', ',', '.' or '}'".to_string(),
                        position: start,
                    })
                }
            },
        };

        self.token(kind, start)
    }

    /// Scan literal text up to the next brace.
    fn scan_text(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c == '{' || c == '}' {
                break;
            }
            self.advance();
        }

        TokenKind::Text(self.source[start..self.pos].to_string())
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::Identifier(self.source[start..self.pos].to_string())
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.pos = idx + c.len_utf8();
        Some(c)
    }
}

/// Tokenize a template.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
