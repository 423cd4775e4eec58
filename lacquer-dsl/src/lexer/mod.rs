//! Lexer module for key templates

pub mod token;
pub mod scanner;

pub use token::*;
pub use scanner::*;
