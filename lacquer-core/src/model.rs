//! Policy model: contracts, methods and the per-method policies attached to them.
//!
//! The model is produced once per generation run by a front end and is
//! read-only afterwards. Policy presence is expressed as `Option` fields so
//! synthesizers branch on the data, never on runtime type inspection.

use crate::duration;
use crate::{MethodError, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Key template used when a cache policy leaves `key` empty.
pub const DEFAULT_KEY_TEMPLATE: &str = "{METHOD}:{base64_json()}";

/// Contract-level error attribution for problems not owned by a method.
pub const CONTRACT_SCOPE: &str = "(contract)";

/// All contracts handed to one generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyModel {
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
}

/// A named set of method signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractSpec {
    /// Module path of the contract, exposed to templates as `{PKG}`.
    pub package: String,
    /// Trait name, exposed to templates as `{INTERFACE}`.
    pub name: String,
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    pub returns: ReturnShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CachePolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evict: Option<EvictPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TracePolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSpec {
    pub name: String,
    /// Rust type as written in the contract signature.
    pub ty: String,
    #[serde(default)]
    pub kind: ParamKind,
    /// Known fields of the parameter type. When present, template field paths
    /// on this parameter are checked against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

/// Whether a parameter is an ordinary value or an ambient context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    #[default]
    Value,
    /// Leading context-like parameter; never a template operand.
    Context,
}

/// `Result<value, error>` shape of a contract method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReturnShape {
    pub value: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CachePolicy {
    #[serde(with = "duration::serde_str")]
    pub ttl: Duration,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub jitter_percent: f64,
    #[serde(default)]
    pub refresh_threshold_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvictPolicy {
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracePolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
}

// ============================================================================
// ACCESSORS
// ============================================================================

impl ContractSpec {
    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Check every model invariant, collecting one error per violation.
    pub fn validate(&self) -> Result<(), Vec<MethodError>> {
        let mut errors = Vec::new();

        if !is_item_name(&self.name) {
            errors.push(MethodError::validation(
                &self.name,
                CONTRACT_SCOPE,
                ValidationError::InvalidIdentifier {
                    kind: "contract".to_string(),
                    name: self.name.clone(),
                },
            ));
        }

        let mut seen = HashSet::new();
        for method in &self.methods {
            if !seen.insert(method.name.as_str()) {
                errors.push(MethodError::validation(
                    &self.name,
                    &method.name,
                    ValidationError::Duplicate {
                        kind: "method".to_string(),
                        name: method.name.clone(),
                    },
                ));
            }
            errors.extend(
                method
                    .validate()
                    .into_iter()
                    .map(|err| MethodError::validation(&self.name, &method.name, err)),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl MethodSpec {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Non-context parameters in declaration order.
    pub fn value_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.kind == ParamKind::Value)
    }

    pub fn context_param(&self) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.kind == ParamKind::Context)
    }

    pub fn has_policy(&self) -> bool {
        self.cache.is_some() || self.evict.is_some() || self.trace.is_some()
    }

    /// Method-local invariants. Template references are checked later by the
    /// template compiler.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !is_item_name(&self.name) {
            errors.push(ValidationError::InvalidIdentifier {
                kind: "method".to_string(),
                name: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for (idx, param) in self.params.iter().enumerate() {
            if !is_item_name(&param.name) {
                errors.push(ValidationError::InvalidIdentifier {
                    kind: "parameter".to_string(),
                    name: param.name.clone(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                errors.push(ValidationError::Duplicate {
                    kind: "parameter".to_string(),
                    name: param.name.clone(),
                });
            }
            if param.kind == ParamKind::Context && idx != 0 {
                errors.push(ValidationError::MisplacedContext {
                    name: param.name.clone(),
                });
            }
        }

        if let Some(cache) = &self.cache {
            if cache.ttl.is_zero() {
                errors.push(ValidationError::ZeroTtl);
            }
            // A cached result cannot replay writes made through `&mut`.
            for param in self.params.iter().filter(|p| p.is_mut_ref()) {
                errors.push(ValidationError::MutableCacheParam {
                    name: param.name.clone(),
                });
            }
            check_percent(&mut errors, "jitter_percent", cache.jitter_percent);
            check_percent(
                &mut errors,
                "refresh_threshold_percent",
                cache.refresh_threshold_percent,
            );
        }

        if let Some(evict) = &self.evict {
            if evict.keys.is_empty() {
                errors.push(ValidationError::EmptyEvictPolicy);
            }
        }

        if let Some(trace) = &self.trace {
            for attr in &trace.attributes {
                let is_value_param = self
                    .param(attr)
                    .map(|p| p.kind == ParamKind::Value)
                    .unwrap_or(false);
                if !is_value_param {
                    errors.push(ValidationError::UnknownTraceAttribute { name: attr.clone() });
                }
            }
        }

        errors
    }
}

fn check_percent(errors: &mut Vec<ValidationError>, field: &str, value: f64) {
    if !(0.0..100.0).contains(&value) {
        errors.push(ValidationError::PercentOutOfRange {
            field: field.to_string(),
            value,
        });
    }
}

impl ParamSpec {
    /// Whether the parameter is taken by `&mut`, with or without a lifetime.
    pub fn is_mut_ref(&self) -> bool {
        let Some(rest) = self.ty.trim_start().strip_prefix('&') else {
            return false;
        };
        let rest = match rest.strip_prefix('\'') {
            Some(lifetime) => lifetime.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_'),
            None => rest,
        };
        rest.trim_start().starts_with("mut ")
    }

    /// Whether the parameter is taken by reference.
    pub fn is_ref(&self) -> bool {
        self.ty.trim_start().starts_with('&')
    }
}

impl CachePolicy {
    /// `prefix + key`, or `prefix + DEFAULT_KEY_TEMPLATE` when `key` is empty.
    pub fn effective_template(&self) -> String {
        if self.key.is_empty() {
            format!("{}{}", self.prefix, DEFAULT_KEY_TEMPLATE)
        } else {
            format!("{}{}", self.prefix, self.key)
        }
    }
}

impl TracePolicy {
    /// Explicit span name, or `Contract.method`.
    pub fn span_name(&self, contract: &str, method: &str) -> String {
        self.span_name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", contract, method))
    }
}

/// Rust keywords, strict and reserved, plus the bare `_`.
pub fn is_rust_keyword(s: &str) -> bool {
    matches!(
        s,
        "_" | "as" | "async" | "await" | "box" | "break" | "const" | "continue" | "crate"
            | "do" | "dyn" | "else" | "enum" | "extern" | "false" | "final" | "fn" | "for"
            | "gen" | "if" | "impl" | "in" | "let" | "loop" | "macro" | "match" | "mod"
            | "move" | "mut" | "override" | "priv" | "pub" | "ref" | "return" | "self"
            | "Self" | "static" | "struct" | "super" | "trait" | "true" | "try" | "type"
            | "typeof" | "unsafe" | "unsized" | "use" | "virtual" | "where" | "while"
            | "yield"
    )
}

/// Name usable for a generated trait, method or parameter.
fn is_item_name(s: &str) -> bool {
    is_identifier(s) && !is_rust_keyword(s)
}

/// ASCII identifier check shared by model validation and the template lexer.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
