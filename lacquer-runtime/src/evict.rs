//! Eviction decorator logic.
//!
//! Keys are rendered from the call's arguments before the base method runs,
//! then deleted in a single batch only if the call succeeded.

use crate::cache::DecoratorCache;
use crate::error::CacheResult;

/// Delete `keys` in one backend call. An empty batch is a no-op.
pub async fn evict_keys(
    cache: &dyn DecoratorCache,
    method: &'static str,
    keys: &[String],
) -> CacheResult<()> {
    if keys.is_empty() {
        return Ok(());
    }
    cache.delete(keys).await?;
    tracing::debug!(method, count = keys.len(), "evicted keys");
    Ok(())
}

/// Evict `keys` if `result` is `Ok`, then hand `result` back unchanged.
///
/// A failed delete is logged and does not alter the caller's outcome. Keys
/// are left in place when the call failed.
pub async fn evict_on_success<T, E>(
    cache: &dyn DecoratorCache,
    method: &'static str,
    keys: Vec<String>,
    result: Result<T, E>,
) -> Result<T, E>
where
    T: Send,
    E: Send,
{
    if result.is_ok() {
        if let Err(err) = evict_keys(cache, method, &keys).await {
            tracing::warn!(
                method,
                keys = ?keys,
                error = %err,
                "eviction failed after successful call"
            );
        }
    }
    result
}
