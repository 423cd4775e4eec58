//! Fuzz test for the key template lexer
//!
//! Looks for panics, infinite loops and bad spans on arbitrary input.
//!
//! Run with: cargo +nightly fuzz run lexer_fuzz -- -max_total_time=60

#![no_main]

use lacquer_dsl::{Lexer, TokenKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let tokens = Lexer::new(input).tokenize();

        // Exactly one terminal token, and it comes last.
        let terminal = |k: &TokenKind| matches!(k, TokenKind::Eof | TokenKind::Error(_));
        assert!(tokens.last().map(|t| terminal(&t.kind)).unwrap_or(false));
        assert_eq!(tokens.iter().filter(|t| terminal(&t.kind)).count(), 1);

        for token in &tokens {
            assert!(token.span.start <= token.span.end);
            assert!(token.span.end <= input.len());
            assert!(input.is_char_boundary(token.span.start));
        }
    }
});
