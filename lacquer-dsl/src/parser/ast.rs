//! Template AST

use crate::lexer::Span;
use std::fmt;

// ============================================================================
// AST TYPES
// ============================================================================

/// A parsed key template, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateAst {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Placeholder(Placeholder),
}

/// A `{...}` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub expr: Expr,
    /// From the opening `{` to the closing `}` inclusive.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `ident(.ident)*`
    Path(PathExpr),
    /// `name(path, ...)`, with `(` immediately after the name.
    Call(CallExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    pub root: String,
    pub fields: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<PathExpr>,
    pub span: Span,
}

impl TemplateAst {
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.parts.iter().filter_map(|part| match part {
            Part::Placeholder(p) => Some(p),
            Part::Text(_) => None,
        })
    }

    pub fn is_literal(&self) -> bool {
        self.placeholders().next().is_none()
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(path) => write!(f, "{}", path),
            Expr::Call(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Canonical template text: whitespace inside placeholders is normalized.
impl fmt::Display for TemplateAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Text(text) => write!(f, "{}", text)?,
                Part::Placeholder(p) => write!(f, "{{{}}}", p.expr)?,
            }
        }
        Ok(())
    }
}
