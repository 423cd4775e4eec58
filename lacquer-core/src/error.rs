//! Error types for LACQUER operations

use thiserror::Error;

/// Key template errors raised by the lexer, parser and compiler.
///
/// Positions are byte offsets into the template text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder opened at {position}")]
    UnterminatedPlaceholder { position: usize },

    #[error("nested placeholder at {position}")]
    NestedPlaceholder { position: usize },

    #[error("unmatched '}}' at {position}")]
    UnmatchedClose { position: usize },

    #[error("empty placeholder at {position}")]
    EmptyPlaceholder { position: usize },

    #[error("unexpected {found} at {position}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        position: usize,
    },

    #[error("unknown parameter '{name}' at {position}")]
    UnknownParameter { name: String, position: usize },

    #[error("unknown field '{field}' on parameter '{param}' at {position}")]
    UnknownField {
        param: String,
        field: String,
        position: usize,
    },

    #[error("context parameter '{name}' cannot be a template operand (at {position})")]
    ContextOperand { name: String, position: usize },

    #[error("unknown builtin '{name}' at {position}")]
    UnknownBuiltin { name: String, position: usize },

    #[error("builtin '{name}' expects {expected} argument(s), got {got} (at {position})")]
    WrongArity {
        name: String,
        expected: String,
        got: usize,
        position: usize,
    },
}

impl TemplateError {
    /// Byte offset the error points at.
    pub fn position(&self) -> usize {
        match self {
            Self::UnterminatedPlaceholder { position }
            | Self::NestedPlaceholder { position }
            | Self::UnmatchedClose { position }
            | Self::EmptyPlaceholder { position }
            | Self::UnexpectedToken { position, .. }
            | Self::UnknownParameter { position, .. }
            | Self::UnknownField { position, .. }
            | Self::ContextOperand { position, .. }
            | Self::UnknownBuiltin { position, .. }
            | Self::WrongArity { position, .. } => *position,
        }
    }
}

/// Policy model invariant violations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("invalid identifier '{name}' for {kind}")]
    InvalidIdentifier { kind: String, name: String },

    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: String, name: String },

    #[error("context parameter '{name}' must be the first parameter")]
    MisplacedContext { name: String },

    #[error("{field} must be in [0, 100), got {value}")]
    PercentOutOfRange { field: String, value: f64 },

    #[error("cache ttl must be positive")]
    ZeroTtl,

    #[error("cached method cannot take '{name}' by mutable reference")]
    MutableCacheParam { name: String },

    #[error("evict policy requires at least one key template")]
    EmptyEvictPolicy,

    #[error("trace attribute '{name}' is not a value parameter")]
    UnknownTraceAttribute { name: String },
}

/// Configuration and model loading errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration format: {value}")]
    InvalidDuration { value: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("YAML parse error: {reason}")]
    YamlParse { reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParse { reason: String },
}

/// What went wrong in a single method.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MethodErrorKind {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A generation-time failure located to one method of one contract.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{contract}.{method}: {kind}{}", template_suffix(.template))]
pub struct MethodError {
    pub contract: String,
    pub method: String,
    /// Offending template text, when the failure came from a template.
    pub template: Option<String>,
    pub kind: MethodErrorKind,
}

fn template_suffix(template: &Option<String>) -> String {
    template
        .as_ref()
        .map(|t| format!(" in template \"{t}\""))
        .unwrap_or_default()
}

impl MethodError {
    pub fn template(
        contract: impl Into<String>,
        method: impl Into<String>,
        template: impl Into<String>,
        err: TemplateError,
    ) -> Self {
        Self {
            contract: contract.into(),
            method: method.into(),
            template: Some(template.into()),
            kind: MethodErrorKind::Template(err),
        }
    }

    pub fn validation(
        contract: impl Into<String>,
        method: impl Into<String>,
        err: ValidationError,
    ) -> Self {
        Self {
            contract: contract.into(),
            method: method.into(),
            template: None,
            kind: MethodErrorKind::Validation(err),
        }
    }
}

/// Master error type for all LACQUER errors.
#[derive(Debug, Clone, Error)]
pub enum LacquerError {
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Method error: {0}")]
    Method(#[from] MethodError),
}

/// Result type alias for LACQUER operations.
pub type LacquerResult<T> = Result<T, LacquerError>;

// =============================================================================
// TESTS
// =============================================================================
