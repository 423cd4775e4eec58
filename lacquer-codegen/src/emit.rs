//! Source emission helpers shared by the synthesizers.

use lacquer_core::{MethodSpec, ParamSpec};
use std::fmt;

const INDENT: &str = "    ";

/// Line-oriented writer that tracks the current block depth.
#[derive(Debug, Default)]
pub struct SourceWriter {
    out: String,
    depth: usize,
}

impl SourceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth. Embedded newlines are indented
    /// line by line.
    pub fn line(&mut self, text: impl fmt::Display) {
        let text = text.to_string();
        for line in text.split('\n') {
            if !line.is_empty() {
                for _ in 0..self.depth {
                    self.out.push_str(INDENT);
                }
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write `text` and indent what follows.
    pub fn open(&mut self, text: impl fmt::Display) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent and write `text`.
    pub fn close(&mut self, text: impl fmt::Display) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

// ============================================================================
// NAMING
// ============================================================================

/// `UserService` -> `user_service`, `HTTPClient` -> `http_client`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_upper_snake_case(name: &str) -> String {
    to_snake_case(name).to_ascii_uppercase()
}

// ============================================================================
// SIGNATURES
// ============================================================================

/// How a parameter is handed to the method. Cached methods never take
/// `&mut` parameters; validation rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passing {
    Owned,
    Shared,
}

impl Passing {
    pub fn of(param: &ParamSpec) -> Self {
        if param.is_ref() {
            Passing::Shared
        } else {
            Passing::Owned
        }
    }
}

/// `async fn name(&self, a: A, b: &B) -> Result<V, E>`
pub fn method_signature(method: &MethodSpec) -> String {
    let mut params = vec!["&self".to_string()];
    params.extend(method.params.iter().map(|p| format!("{}: {}", p.name, p.ty)));
    format!(
        "async fn {}({}) -> Result<{}, {}>",
        method.name,
        params.join(", "),
        method.returns.value,
        method.returns.error
    )
}

/// Arguments forwarding every parameter unchanged.
pub fn forward_args(method: &MethodSpec) -> String {
    method
        .params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `self.inner.name(a, b).await`
pub fn forward_call(method: &MethodSpec) -> String {
    format!("self.inner.{}({}).await", method.name, forward_args(method))
}

/// Rust string literal for `text`.
pub fn string_literal(text: &str) -> String {
    format!("{:?}", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacquer_core::{ParamKind, ReturnShape};

    fn param(name: &str, ty: &str) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            ty: ty.to_string(),
            kind: ParamKind::Value,
            fields: None,
        }
    }

    #[test]
    fn test_writer_indents_blocks() {
        let mut w = SourceWriter::new();
        w.open("fn f() {");
        w.line("let a = 1;\nlet b = 2;");
        w.blank();
        w.close("}");
        assert_eq!(
            w.finish(),
            "fn f() {\n    let a = 1;\n    let b = 2;\n\n}\n"
        );
    }

    #[test]
    fn test_close_never_underflows() {
        let mut w = SourceWriter::new();
        w.close("}");
        w.dedent();
        w.line("x");
        assert_eq!(w.as_str(), "}\nx\n");
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("UserService"), "user_service");
        assert_eq!(to_snake_case("HTTPClient"), "http_client");
        assert_eq!(to_snake_case("OrderV2Service"), "order_v2_service");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_upper_snake_case("getUser"), "GET_USER");
    }

    #[test]
    fn test_passing() {
        assert_eq!(Passing::of(&param("a", "String")), Passing::Owned);
        assert_eq!(Passing::of(&param("a", "&str")), Passing::Shared);
        assert_eq!(Passing::of(&param("a", "&'a Buf")), Passing::Shared);
    }

    #[test]
    fn test_signature_and_forwarding() {
        let method = MethodSpec {
            name: "get_user".to_string(),
            params: vec![param("ctx", "&Context"), param("id", "&str")],
            returns: ReturnShape {
                value: "User".to_string(),
                error: "AppError".to_string(),
            },
            cache: None,
            evict: None,
            trace: None,
        };
        assert_eq!(
            method_signature(&method),
            "async fn get_user(&self, ctx: &Context, id: &str) -> Result<User, AppError>"
        );
        assert_eq!(forward_call(&method), "self.inner.get_user(ctx, id).await");
    }
}
