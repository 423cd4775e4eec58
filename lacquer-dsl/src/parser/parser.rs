//! Parser implementation

use super::ast::*;
use crate::lexer::*;
use lacquer_core::TemplateError;

/// Recursive-descent parser over a template's tokens.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
}

impl Parser {
    /// Create a new parser from a vector of tokens.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the tokens into a [`TemplateAst`].
    pub fn parse(&mut self) -> Result<TemplateAst, TemplateError> {
        if let Some(err) = self.tokens.iter().find_map(|t| match &t.kind {
            TokenKind::Error(err) => Some(err.clone()),
            _ => None,
        }) {
            return Err(err);
        }

        let mut parts = Vec::new();

        while !self.is_at_end() {
            match &self.current().kind {
                TokenKind::Text(text) => {
                    parts.push(Part::Text(text.clone()));
                    self.advance();
                }
                TokenKind::LBrace => parts.push(Part::Placeholder(self.parse_placeholder()?)),
                _ => return Err(self.error("literal text or '{'")),
            }
        }

        Ok(TemplateAst { parts })
    }

    fn parse_placeholder(&mut self) -> Result<Placeholder, TemplateError> {
        let start = self.current().span.start;
        self.expect(TokenKind::LBrace, "'{'")?;

        if self.check(&TokenKind::RBrace) {
            return Err(TemplateError::EmptyPlaceholder { position: start });
        }

        let name = self.current().clone();
        let root = self.expect_identifier()?;

        let expr = if self.check(&TokenKind::LParen) && self.current().span.start == name.span.end
        {
            Expr::Call(self.parse_call(root, name.span)?)
        } else {
            Expr::Path(self.parse_path_rest(root, name.span)?)
        };

        let end = self.current().span.end;
        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Placeholder {
            expr,
            span: Span::new(start, end),
        })
    }

    fn parse_call(&mut self, name: String, name_span: Span) -> Result<CallExpr, TemplateError> {
        self.expect(TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_path()?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let end = self.current().span.end;
        self.expect(TokenKind::RParen, "',' or ')'")?;

        Ok(CallExpr {
            name,
            args,
            span: Span::new(name_span.start, end),
        })
    }

    fn parse_path(&mut self) -> Result<PathExpr, TemplateError> {
        let span = self.current().span;
        let root = self.expect_identifier()?;
        self.parse_path_rest(root, span)
    }

    fn parse_path_rest(&mut self, root: String, root_span: Span) -> Result<PathExpr, TemplateError> {
        let mut fields = Vec::new();
        let mut end = root_span.end;

        while self.check(&TokenKind::Dot) {
            self.advance();
            end = self.current().span.end;
            fields.push(self.expect_identifier()?);
        }

        Ok(PathExpr {
            root,
            fields,
            span: Span::new(root_span.start, end),
        })
    }

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), TemplateError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, TemplateError> {
        match &self.current().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("identifier")),
        }
    }

    pub(crate) fn error(&self, expected: &str) -> TemplateError {
        let token = self.current();
        TemplateError::UnexpectedToken {
            found: token.kind.to_string(),
            expected: expected.to_string(),
            position: token.span.start,
        }
    }
}

/// Tokenize and parse a template.
pub fn parse(source: &str) -> Result<TemplateAst, TemplateError> {
    let tokens = tokenize(source);
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(root: &str, fields: &[&str], start: usize, end: usize) -> PathExpr {
        PathExpr {
            root: root.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            span: Span::new(start, end),
        }
    }

    #[test]
    fn test_parse_literal() {
        let ast = parse("static:key").unwrap();
        assert!(ast.is_literal());
        assert_eq!(ast.parts, vec![Part::Text("static:key".to_string())]);
    }

    #[test]
    fn test_parse_field_path() {
        let ast = parse("u:{req.user.id}").unwrap();
        assert_eq!(ast.parts.len(), 2);
        match &ast.parts[1] {
            Part::Placeholder(p) => {
                assert_eq!(p.expr, Expr::Path(path("req", &["user", "id"], 3, 14)));
                assert_eq!(p.span, Span::new(2, 15));
            }
            other => panic!("expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_with_args() {
        let ast = parse("{sha256(a, b.c)}").unwrap();
        let placeholder = ast.placeholders().next().unwrap();
        match &placeholder.expr {
            Expr::Call(call) => {
                assert_eq!(call.name, "sha256");
                assert_eq!(call.args, vec![path("a", &[], 8, 9), path("b", &["c"], 11, 14)]);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_call() {
        let ast = parse("{base64_json()}").unwrap();
        match &ast.placeholders().next().unwrap().expr {
            Expr::Call(call) => assert!(call.args.is_empty()),
            other => panic!("expected call, got {:?}", other),
        };
    }

    #[test]
    fn test_space_before_paren_is_not_a_call() {
        let err = parse("{lower (x)}").unwrap_err();
        assert!(matches!(err, TemplateError::UnexpectedToken { position: 7, .. }));
    }

    #[test]
    fn test_empty_placeholder() {
        assert_eq!(
            parse("a:{ }").unwrap_err(),
            TemplateError::EmptyPlaceholder { position: 2 }
        );
    }

    #[test]
    fn test_trailing_comma_rejected() {
        let err = parse("{json(a,)}").unwrap_err();
        assert!(matches!(err, TemplateError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_lexer_errors_surface() {
        assert_eq!(
            parse("x}").unwrap_err(),
            TemplateError::UnmatchedClose { position: 1 }
        );
    }

    #[test]
    fn test_display_is_canonical() {
        let ast = parse("k:{ json( a ,b ) }:{ id }").unwrap();
        assert_eq!(ast.to_string(), "k:{json(a, b)}:{id}");
    }
}
