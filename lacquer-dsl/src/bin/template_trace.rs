/// Key Template Tracer - Shows the flow through Lexer → Parser → Compiler
///
/// Usage: cargo run --bin template_trace <template> [param ...]
///
/// Every listed param is declared as a plain value parameter of a synthetic
/// `Example.method`.

use lacquer_core::{ContractSpec, MethodSpec, ParamKind, ParamSpec, ReturnShape};
use lacquer_dsl::{compile_template, parse, tokenize};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin template_trace <template> [param ...]");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --bin template_trace 'users:{{id}}:{{sha256(filter)}}' id filter");
        std::process::exit(1);
    }

    let template = &args[1];
    let method = MethodSpec {
        name: "method".to_string(),
        params: args[2..]
            .iter()
            .map(|name| ParamSpec {
                name: name.clone(),
                ty: "serde_json::Value".to_string(),
                kind: ParamKind::Value,
                fields: None,
            })
            .collect(),
        returns: ReturnShape {
            value: "()".to_string(),
            error: "()".to_string(),
        },
        cache: None,
        evict: None,
        trace: None,
    };
    let contract = ContractSpec {
        package: "example".to_string(),
        name: "Example".to_string(),
        methods: vec![method.clone()],
    };

    println!("TEMPLATE: {}", template);
    println!();

    println!("TOKENS:");
    for token in tokenize(template) {
        println!("  {:>3}..{:<3} {}", token.span.start, token.span.end, token.kind);
    }
    println!();

    match parse(template) {
        Ok(ast) => {
            println!("AST:");
            println!("  canonical: {}", ast);
            println!("  {:#?}", ast.parts);
        }
        Err(e) => {
            eprintln!("parse failed: {}", e);
            std::process::exit(1);
        }
    }
    println!();

    match compile_template(template, &contract, &method) {
        Ok(compiled) => {
            println!("COMPILED:");
            println!("  segments: {:?}", compiled.segments());
            println!("  depends on: {:?}", compiled.dependencies());
            println!("  rust: {}", compiled.to_rust_expr("::lacquer_runtime"));
        }
        Err(e) => {
            eprintln!("compile failed: {}", e);
            std::process::exit(1);
        }
    }
}
