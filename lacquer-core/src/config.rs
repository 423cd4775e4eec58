//! Generator configuration

use crate::{ConfigError, LacquerResult};
use serde::{Deserialize, Serialize};

/// Settings that shape emitted source but not policy semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Path under which generated code reaches the runtime support crate.
    pub runtime_path: String,
    /// Path of the `async_trait` attribute macro.
    pub async_trait_path: String,
    /// Banner written at the top of every generated file.
    pub header: String,
    /// Emit the delegator alias and decorator factory functions.
    pub emit_delegator: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            runtime_path: "::lacquer_runtime".to_string(),
            async_trait_path: "::async_trait::async_trait".to_string(),
            header: "// Code generated by lacquer. DO NOT EDIT.".to_string(),
            emit_delegator: true,
        }
    }
}

impl GeneratorConfig {
    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml(source: &str) -> LacquerResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::TomlParse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LACQUER_RUNTIME_PATH` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("LACQUER_RUNTIME_PATH") {
            self.runtime_path = path;
        }
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - runtime_path and async_trait_path are non-empty paths
    /// - header lines are all comments
    pub fn validate(&self) -> LacquerResult<()> {
        for (field, value) in [
            ("runtime_path", &self.runtime_path),
            ("async_trait_path", &self.async_trait_path),
        ] {
            if !is_rust_path(value) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.clone(),
                    reason: "must be a Rust path such as ::crate_name::module".to_string(),
                }
                .into());
            }
        }

        if self
            .header
            .lines()
            .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("//"))
        {
            return Err(ConfigError::InvalidValue {
                field: "header".to_string(),
                value: self.header.clone(),
                reason: "every header line must be a // comment".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn is_rust_path(path: &str) -> bool {
    let trimmed = path.strip_prefix("::").unwrap_or(path);
    !trimmed.is_empty() && trimmed.split("::").all(crate::is_identifier)
}
