//! LACQUER CODEGEN - Decorator Generator
//!
//! Turns a [`PolicyModel`] into one Rust source file per contract. Each file
//! is meant to be included as a child module of the module that declares the
//! contract trait, and contains:
//!
//! - `<Contract>Cache`: get-or-populate caching and success-only eviction
//! - `<Contract>Trace`: one span per traced call
//! - `<Contract>Delegator` plus factory functions for ordered composition
//!
//! Generated code is thin glue over `lacquer-runtime`; all cache, lock and
//! refresh behavior lives there.
//!
//! A contract with any invalid method or template produces no output. Its
//! errors are reported and the remaining contracts are still generated.

pub mod cache;
pub mod delegator;
pub mod emit;
pub mod evict;
pub mod plan;
pub mod trace;

use lacquer_core::{ContractSpec, GeneratorConfig, MethodError, PolicyModel};
use lacquer_dsl::BuiltinTable;

pub use emit::SourceWriter;
pub use plan::{plan_contract, CachePlan, ContractPlan, EvictPlan, MethodPlan, TracePlan};

/// Source generated for one contract.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContract {
    pub package: String,
    pub name: String,
    pub source: String,
}

/// A contract skipped because of errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractFailure {
    pub contract: String,
    pub errors: Vec<MethodError>,
}

/// Outcome of one generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReport {
    pub outputs: Vec<GeneratedContract>,
    pub failures: Vec<ContractFailure>,
}

impl GenerationReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn output(&self, contract: &str) -> Option<&GeneratedContract> {
        self.outputs.iter().find(|o| o.name == contract)
    }

    pub fn failure(&self, contract: &str) -> Option<&ContractFailure> {
        self.failures.iter().find(|f| f.contract == contract)
    }

    /// Every error across all failed contracts.
    pub fn errors(&self) -> impl Iterator<Item = &MethodError> {
        self.failures.iter().flat_map(|f| f.errors.iter())
    }
}

/// Decorator generator.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    builtins: BuiltinTable,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            builtins: BuiltinTable::standard(),
        }
    }

    /// Replace the builtin function table used for key templates.
    pub fn with_builtins(mut self, builtins: BuiltinTable) -> Self {
        self.builtins = builtins;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate every contract in `model`, isolating failures per contract.
    pub fn generate(&self, model: &PolicyModel) -> GenerationReport {
        let mut report = GenerationReport::default();

        for contract in &model.contracts {
            tracing::info!(
                contract = %contract.name,
                package = %contract.package,
                methods = contract.methods.len(),
                "generating decorators"
            );
            match self.generate_contract(contract) {
                Ok(source) => {
                    tracing::info!(
                        contract = %contract.name,
                        bytes = source.len(),
                        "generated decorators"
                    );
                    report.outputs.push(GeneratedContract {
                        package: contract.package.clone(),
                        name: contract.name.clone(),
                        source,
                    });
                }
                Err(errors) => {
                    for err in &errors {
                        tracing::warn!(
                            contract = %err.contract,
                            method = %err.method,
                            error = %err,
                            "method rejected"
                        );
                    }
                    report.failures.push(ContractFailure {
                        contract: contract.name.clone(),
                        errors,
                    });
                }
            }
        }

        report
    }

    /// Generate one contract, or every error that prevents it.
    pub fn generate_contract(&self, contract: &ContractSpec) -> Result<String, Vec<MethodError>> {
        let plan = plan_contract(contract, &self.builtins)?;
        Ok(self.render(&plan))
    }

    fn render(&self, plan: &ContractPlan<'_>) -> String {
        let mut w = SourceWriter::new();
        let contract = plan.contract;

        for line in self.config.header.lines() {
            w.line(line);
        }
        w.line(format!("// Contract: {}::{}", contract.package, contract.name));
        w.blank();
        w.line("use super::*;");
        w.line("use std::sync::Arc;");

        if plan.needs_cache_layer() {
            w.blank();
            cache::emit_cache_decorator(&mut w, plan, &self.config);
        }
        if plan.needs_trace_layer() {
            w.blank();
            trace::emit_trace_decorator(&mut w, plan, &self.config);
        }
        if self.config.emit_delegator {
            w.blank();
            delegator::emit_delegator(&mut w, plan, &self.config);
        }

        w.finish()
    }
}
