//! Generate decorators for every contract in a policy model.
//!
//! Usage: lacquer-gen <model.yaml> [config.toml]
//!
//! Generated source goes to stdout, logs to stderr. Set `LACQUER_LOG` to
//! change the log filter (default `info`).

use lacquer_codegen::Generator;
use lacquer_core::GeneratorConfig;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: lacquer-gen <model.yaml> [config.toml]");
        eprintln!();
        eprintln!("Example:");
        eprintln!("  lacquer-gen policies/users.yaml lacquer.toml > src/users/decorators.rs");
        process::exit(2);
    }

    let filter = EnvFilter::try_from_env("LACQUER_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match args.get(2) {
        Some(path) => {
            let text = read(path);
            match GeneratorConfig::from_toml(&text) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Invalid config {}: {}", path, e);
                    process::exit(1);
                }
            }
        }
        None => GeneratorConfig::default(),
    }
    .with_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        process::exit(1);
    }

    let model_path = &args[1];
    let model = match lacquer_dsl::load_model(&read(model_path)) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Failed to load {}: {}", model_path, e);
            process::exit(1);
        }
    };

    let report = Generator::new(config).generate(&model);

    for output in &report.outputs {
        println!("{}", output.source);
    }

    if !report.is_success() {
        for err in report.errors() {
            eprintln!("error: {}", err);
        }
        eprintln!(
            "{} contract(s) generated, {} failed",
            report.outputs.len(),
            report.failures.len()
        );
        process::exit(1);
    }
}

fn read(path: &str) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            process::exit(1);
        }
    }
}
