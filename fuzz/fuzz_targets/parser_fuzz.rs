//! Fuzz test for the key template parser and compiler
//!
//! Parse errors must point inside the input, and anything that parses must
//! survive a canonical print and re-parse. Compilation against a small
//! method signature must never panic.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use lacquer_core::{ContractSpec, MethodSpec, ParamKind, ParamSpec, ReturnShape};
use lacquer_dsl::{compile_template, parse, TemplateArgs};
use libfuzzer_sys::fuzz_target;

fn fixture() -> (ContractSpec, MethodSpec) {
    let param = |name: &str, kind| ParamSpec {
        name: name.to_string(),
        ty: "String".to_string(),
        kind,
        fields: None,
    };
    let method = MethodSpec {
        name: "m".to_string(),
        params: vec![param("ctx", ParamKind::Context), param("id", ParamKind::Value)],
        returns: ReturnShape {
            value: "String".to_string(),
            error: "E".to_string(),
        },
        cache: None,
        evict: None,
        trace: None,
    };
    let contract = ContractSpec {
        package: "p".to_string(),
        name: "C".to_string(),
        methods: vec![method.clone()],
    };
    (contract, method)
}

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse(input) {
            Ok(ast) => {
                let canonical = ast.to_string();
                let reparsed = parse(&canonical).expect("canonical text must parse");
                assert_eq!(reparsed.to_string(), canonical);
            }
            Err(e) => assert!(e.position() <= input.len()),
        }

        let (contract, method) = fixture();
        if let Ok(compiled) = compile_template(input, &contract, &method) {
            let _ = compiled.evaluate(&TemplateArgs::new().with("id", "7"));
            let _ = compiled.to_rust_expr("::lacquer_runtime");
        }
    }
});
