//! LACQUER Core - Policy Model Types
//!
//! Pure data structures shared by the template compiler and the code
//! synthesizers. This crate contains the policy model, its invariant checks,
//! the error hierarchy and generator configuration.

pub mod config;
pub mod duration;
pub mod error;
pub mod model;

pub use config::GeneratorConfig;
pub use duration::{format_duration, parse_duration};
pub use error::{
    ConfigError, LacquerError, LacquerResult, MethodError, MethodErrorKind, TemplateError,
    ValidationError,
};
pub use model::{
    is_identifier, is_rust_keyword, CachePolicy, ContractSpec, EvictPolicy, MethodSpec, ParamKind,
    ParamSpec, PolicyModel, ReturnShape, TracePolicy, CONTRACT_SCOPE, DEFAULT_KEY_TEMPLATE,
};

/// Identifiers that resolve to per-contract metadata inside key templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticIdent {
    /// `{PKG}`: the contract's package path.
    Package,
    /// `{INTERFACE}`: the contract name.
    Interface,
    /// `{METHOD}`: the method name.
    Method,
}

impl StaticIdent {
    pub fn from_ident(ident: &str) -> Option<Self> {
        match ident {
            "PKG" => Some(Self::Package),
            "INTERFACE" => Some(Self::Interface),
            "METHOD" => Some(Self::Method),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "PKG",
            Self::Interface => "INTERFACE",
            Self::Method => "METHOD",
        }
    }

    /// Resolve against a contract and method.
    pub fn resolve<'a>(&self, contract: &'a ContractSpec, method: &'a MethodSpec) -> &'a str {
        match self {
            Self::Package => &contract.package,
            Self::Interface => &contract.name,
            Self::Method => &method.name,
        }
    }
}

impl std::fmt::Display for StaticIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
