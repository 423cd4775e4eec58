//! Validated, compiled view of one contract.
//!
//! Planning runs model validation and compiles every key template up front,
//! so the synthesizers only ever see inputs that are known to be good. All
//! problems in a contract are collected rather than stopping at the first.

use lacquer_core::{ContractSpec, MethodError, MethodSpec};
use lacquer_dsl::{BuiltinTable, CompiledTemplate, TemplateCompiler};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ContractPlan<'m> {
    pub contract: &'m ContractSpec,
    pub methods: Vec<MethodPlan<'m>>,
}

#[derive(Debug, Clone)]
pub struct MethodPlan<'m> {
    pub spec: &'m MethodSpec,
    pub cache: Option<CachePlan>,
    pub evict: Option<EvictPlan>,
    pub trace: Option<TracePlan>,
}

#[derive(Debug, Clone)]
pub struct CachePlan {
    /// Compiled `prefix + key`.
    pub key: CompiledTemplate,
    pub ttl: Duration,
    pub jitter_percent: f64,
    pub refresh_threshold_percent: f64,
}

#[derive(Debug, Clone)]
pub struct EvictPlan {
    pub keys: Vec<CompiledTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePlan {
    pub span_name: String,
    pub attributes: Vec<String>,
}

impl<'m> ContractPlan<'m> {
    pub fn name(&self) -> &'m str {
        &self.contract.name
    }

    /// Whether the cache decorator has anything to do.
    pub fn needs_cache_layer(&self) -> bool {
        self.methods
            .iter()
            .any(|m| m.cache.is_some() || m.evict.is_some())
    }

    pub fn needs_trace_layer(&self) -> bool {
        self.methods.iter().any(|m| m.trace.is_some())
    }
}

impl MethodPlan<'_> {
    /// `Contract.method`, the label used in settings and log records.
    pub fn label(&self, contract: &str) -> String {
        format!("{}.{}", contract, self.spec.name)
    }
}

/// Validate `contract` and compile all of its templates.
pub fn plan_contract<'m>(
    contract: &'m ContractSpec,
    builtins: &BuiltinTable,
) -> Result<ContractPlan<'m>, Vec<MethodError>> {
    let mut errors = match contract.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    let compiler = TemplateCompiler::new(builtins);
    let mut methods = Vec::with_capacity(contract.methods.len());

    for method in &contract.methods {
        let mut compile = |template: String| -> Option<CompiledTemplate> {
            match compiler.compile(&template, contract, method) {
                Ok(compiled) => Some(compiled),
                Err(err) => {
                    errors.push(MethodError::template(
                        &contract.name,
                        &method.name,
                        template,
                        err,
                    ));
                    None
                }
            }
        };

        let cache = method.cache.as_ref().and_then(|policy| {
            compile(policy.effective_template()).map(|key| CachePlan {
                key,
                ttl: policy.ttl,
                jitter_percent: policy.jitter_percent,
                refresh_threshold_percent: policy.refresh_threshold_percent,
            })
        });

        let evict = match &method.evict {
            Some(policy) => {
                let keys: Vec<_> = policy
                    .keys
                    .iter()
                    .filter_map(|key| compile(key.clone()))
                    .collect();
                Some(EvictPlan { keys })
            }
            None => None,
        };

        let trace = method.trace.as_ref().map(|policy| TracePlan {
            span_name: policy.span_name(&contract.name, &method.name),
            attributes: policy.attributes.clone(),
        });

        methods.push(MethodPlan {
            spec: method,
            cache,
            evict,
            trace,
        });
    }

    if errors.is_empty() {
        Ok(ContractPlan { contract, methods })
    } else {
        Err(errors)
    }
}
