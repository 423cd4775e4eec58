//! LACQUER DSL - Key Template Language & Policy Loader
//!
//! This crate parses and compiles the key templates attached to cache and
//! evict policies, and loads policy models from YAML.
//!
//! Architecture:
//! ```text
//! Template text ("users:{id}:{sha256(filter)}")
//!     ↓
//! Lexer (text / placeholder modes)
//!     ↓
//! Parser (TemplateAst)
//!     ↓
//! Compiler (resolve params, reserved identifiers, builtins)
//!     ↓
//! CompiledTemplate → evaluate() | to_rust_expr()
//! ```

pub mod compiler;
pub mod config;
pub mod lexer;
pub mod parser;

pub use compiler::{
    compile_template, Arity, Builtin, BuiltinTable, CompiledTemplate, EmitStrategy, FieldPath,
    Segment, TemplateArgs, TemplateCompiler,
};
pub use config::{load_model, model_to_yaml};
pub use lexer::{tokenize, Lexer, Span, Token, TokenKind};
pub use parser::{parse, CallExpr, Expr, Part, PathExpr, Placeholder, TemplateAst};
