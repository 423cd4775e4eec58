//! Abstractions the host application supplies to generated decorators.
//!
//! Generated code never stores anything itself. Every read, write and
//! invalidation goes through [`DecoratorCache`]; stampede locking and
//! background refresh go through the optional [`KeyLocker`] and
//! [`RefreshExecutor`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::CacheResult;

/// Serializable snapshot of a failed call, stored in the negative cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedError {
    /// Stable discriminator chosen by the error type (e.g. `"not_found"`).
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl CachedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            detail: serde_json::Value::Null,
        }
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

/// What a cache entry holds.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Value(serde_json::Value),
    Error(CachedError),
}

/// A cache hit together with its expiry bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    pub payload: CachedPayload,
    /// TTL the entry was stored with.
    pub ttl: Duration,
    /// Time left before the entry expires.
    pub remaining: Duration,
}

impl CacheHit {
    pub fn value(value: serde_json::Value, ttl: Duration, remaining: Duration) -> Self {
        Self {
            payload: CachedPayload::Value(value),
            ttl,
            remaining,
        }
    }

    pub fn error(error: CachedError, ttl: Duration, remaining: Duration) -> Self {
        Self {
            payload: CachedPayload::Error(error),
            ttl,
            remaining,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, CachedPayload::Error(_))
    }

    /// Remaining lifetime as a fraction of the stored TTL, in `[0, 1]`.
    pub fn remaining_fraction(&self) -> f64 {
        if self.ttl.is_zero() {
            return 0.0;
        }
        (self.remaining.as_secs_f64() / self.ttl.as_secs_f64()).clamp(0.0, 1.0)
    }
}

/// Cache abstraction called by generated decorators.
///
/// Implementations must tolerate concurrent calls on unrelated keys.
#[async_trait]
pub trait DecoratorCache: Send + Sync {
    /// Look up a key. `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheHit>>;

    /// Store a successful result.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> CacheResult<()>;

    /// Offer a failure to the negative cache.
    ///
    /// Returns whether the backend chose to cache it. `ttl` is the policy TTL
    /// after jitter; implementations may store the failure for less.
    async fn set_error(&self, key: &str, error: &CachedError, ttl: Duration) -> CacheResult<bool>;

    /// Remove a batch of keys in one call.
    ///
    /// Not transactional: a partial failure is reported as
    /// [`CacheBackendError::PartialDelete`](crate::CacheBackendError::PartialDelete)
    /// without restoring keys that were already removed.
    async fn delete(&self, keys: &[String]) -> CacheResult<()>;
}

/// Conversion between a contract's error type and its negative-cache form.
pub trait CacheableError: Send + 'static {
    /// `None` keeps this error out of the negative cache.
    fn to_cached(&self) -> Option<CachedError>;

    /// Rebuild the error replayed to callers on a negative hit.
    fn from_cached(cached: CachedError) -> Self;
}

/// Release handle for an advisory per-key lock.
///
/// The release action runs exactly once: on [`LockGuard::release`] or when the
/// guard is dropped, whichever comes first.
pub struct LockGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("held", &self.release.is_some())
            .finish()
    }
}

/// Optional stampede protection.
#[async_trait]
pub trait KeyLocker: Send + Sync {
    /// Try to take the lock for `key`. `None` means "not acquired"; callers
    /// proceed unlocked.
    async fn lock(&self, key: &str) -> Option<LockGuard>;
}

/// A detached refresh job.
pub type RefreshTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Optional background executor for asynchronous refresh.
pub trait RefreshExecutor: Send + Sync {
    /// Hand off a task. Must return without waiting for it.
    fn submit(&self, task: RefreshTask);
}

impl RefreshExecutor for tokio::runtime::Handle {
    fn submit(&self, task: RefreshTask) {
        self.spawn(task);
    }
}
