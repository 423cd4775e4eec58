//! YAML front end for the policy model.
//! Uses serde_yaml for all parsing; the model types carry the schema.

use lacquer_core::{ConfigError, PolicyModel};

// ============================================================================
// LOADING
// ============================================================================

/// Parse a policy model from YAML.
///
/// Unknown keys are rejected. Durations use the `30s` / `5m` / `250ms`
/// notation. Model invariants are not checked here; the generator validates
/// each contract separately so one bad contract does not hide the others.
pub fn load_model(content: &str) -> Result<PolicyModel, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
        reason: e.to_string(),
    })
}

/// Render a model back to YAML.
pub fn model_to_yaml(model: &PolicyModel) -> Result<String, ConfigError> {
    serde_yaml::to_string(model).map_err(|e| ConfigError::YamlParse {
        reason: e.to_string(),
    })
}
