//! Key rendering builtins.
//!
//! Generated key expressions call these functions, and the template
//! evaluator in `lacquer-dsl` calls the same ones, so both paths produce
//! identical keys for identical values.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render a value as a plain key segment.
///
/// Strings render raw, `null` renders empty, everything else renders as JSON.
/// A value serde_json cannot represent renders empty and logs a warning.
pub fn segment<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(v) => render_value(&v),
        Err(err) => {
            tracing::warn!(builtin = "segment", error = %err, "key value did not serialize, rendering empty");
            String::new()
        }
    }
}

/// Segment rendering for an already-converted JSON value.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Compact JSON text. Unserializable values render empty and log a warning.
pub fn json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(builtin = "json", error = %err, "key value did not serialize, rendering empty");
            String::new()
        }
    }
}

/// Standard (padded) base64 of the JSON text.
pub fn base64_json<T: Serialize + ?Sized>(value: &T) -> String {
    STANDARD.encode(json(value))
}

/// Lowercase hex SHA-256 of the JSON text.
pub fn sha256<T: Serialize + ?Sized>(value: &T) -> String {
    hex::encode(Sha256::digest(json(value).as_bytes()))
}

pub fn lower<T: Serialize + ?Sized>(value: &T) -> String {
    segment(value).to_lowercase()
}

pub fn upper<T: Serialize + ?Sized>(value: &T) -> String {
    segment(value).to_uppercase()
}
