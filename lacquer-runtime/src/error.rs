//! Cache backend errors.
//!
//! These are soft failures: generated code logs them and carries on with the
//! caller's own result.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheBackendError {
    #[error("cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("cache entry '{key}' could not be encoded or decoded: {reason}")]
    Serialization { key: String, reason: String },

    #[error("deleted {deleted} of {requested} keys, failed: {failed:?}")]
    PartialDelete {
        requested: usize,
        deleted: usize,
        failed: Vec<String>,
    },
}

impl CacheBackendError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheBackendError>;
