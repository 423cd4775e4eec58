//! Builtin functions available inside key templates.

use lacquer_runtime::keys;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// How many operands a builtin takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Any number. An empty argument list means every value parameter.
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => *n == count,
            Arity::Variadic => true,
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, Arity::Variadic)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::Variadic => write!(f, "any number of"),
        }
    }
}

/// What a builtin renders, both when evaluated in-process and when emitted
/// as a call into the runtime's `keys` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitStrategy {
    Base64Json,
    Json,
    Sha256,
    Lower,
    Upper,
}

impl EmitStrategy {
    /// Function name under `<runtime>::keys`.
    pub fn runtime_fn(&self) -> &'static str {
        match self {
            EmitStrategy::Base64Json => "base64_json",
            EmitStrategy::Json => "json",
            EmitStrategy::Sha256 => "sha256",
            EmitStrategy::Lower => "lower",
            EmitStrategy::Upper => "upper",
        }
    }

    /// Render an operand value.
    pub fn apply(&self, operand: &Value) -> String {
        match self {
            EmitStrategy::Base64Json => keys::base64_json(operand),
            EmitStrategy::Json => keys::json(operand),
            EmitStrategy::Sha256 => keys::sha256(operand),
            EmitStrategy::Lower => keys::lower(operand),
            EmitStrategy::Upper => keys::upper(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub strategy: EmitStrategy,
}

/// Immutable name → builtin mapping handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinTable {
    entries: BTreeMap<&'static str, Builtin>,
}

impl BuiltinTable {
    /// The builtins every template may use.
    pub fn standard() -> Self {
        Self::from_builtins([
            Builtin {
                name: "base64_json",
                arity: Arity::Variadic,
                strategy: EmitStrategy::Base64Json,
            },
            Builtin {
                name: "json",
                arity: Arity::Variadic,
                strategy: EmitStrategy::Json,
            },
            Builtin {
                name: "sha256",
                arity: Arity::Variadic,
                strategy: EmitStrategy::Sha256,
            },
            Builtin {
                name: "lower",
                arity: Arity::Exactly(1),
                strategy: EmitStrategy::Lower,
            },
            Builtin {
                name: "upper",
                arity: Arity::Exactly(1),
                strategy: EmitStrategy::Upper,
            },
        ])
    }

    pub fn from_builtins(builtins: impl IntoIterator<Item = Builtin>) -> Self {
        Self {
            entries: builtins.into_iter().map(|b| (b.name, b)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

impl Default for BuiltinTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_table() {
        let table = BuiltinTable::standard();
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["base64_json", "json", "lower", "sha256", "upper"]
        );
        assert_eq!(table.get("lower").map(|b| b.arity), Some(Arity::Exactly(1)));
        assert!(table.get("md5").is_none());
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Variadic.accepts(0));
        assert!(Arity::Variadic.accepts(5));
        assert!(Arity::Exactly(1).accepts(1));
        assert!(!Arity::Exactly(1).accepts(2));
        assert_eq!(Arity::Exactly(1).to_string(), "1");
    }

    #[test]
    fn test_apply_matches_runtime() {
        let value = json!({"a": 1});
        assert_eq!(EmitStrategy::Json.apply(&value), r#"{"a":1}"#);
        assert_eq!(EmitStrategy::Base64Json.apply(&value), keys::base64_json(&value));
        assert_eq!(EmitStrategy::Lower.apply(&json!("AbC")), "abc");
        assert_eq!(EmitStrategy::Upper.apply(&json!("AbC")), "ABC");
    }
}
