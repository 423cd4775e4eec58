//! Parser module for key templates

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
