//! Get-or-populate decorator logic.
//!
//! Generated cache methods compute their key and hand a re-invocable loader
//! to [`CacheLayer::get_or_populate`]. Backend failures are logged and
//! degrade to pass-through: only the base method's own error ever reaches
//! the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::jitter::jittered_ttl;
use super::traits::{
    CacheHit, CacheableError, CachedError, CachedPayload, DecoratorCache, KeyLocker, LockGuard,
    RefreshExecutor,
};
use crate::evict;

/// Per-method cache policy, emitted as a `const` by the generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// `Contract.method`, used in log records.
    pub method: &'static str,
    pub ttl: Duration,
    pub jitter_percent: f64,
    /// Refresh in the background once the remaining TTL fraction drops to
    /// this percentage. Zero disables refresh.
    pub refresh_threshold_percent: f64,
}

impl CacheSettings {
    pub fn new(method: &'static str, ttl: Duration) -> Self {
        Self {
            method,
            ttl,
            jitter_percent: 0.0,
            refresh_threshold_percent: 0.0,
        }
    }

    /// Set the jitter percentage.
    pub fn with_jitter(mut self, percent: f64) -> Self {
        self.jitter_percent = percent;
        self
    }

    /// Set the refresh threshold percentage.
    pub fn with_refresh_threshold(mut self, percent: f64) -> Self {
        self.refresh_threshold_percent = percent;
        self
    }

    pub fn should_refresh(&self, hit: &CacheHit) -> bool {
        self.refresh_threshold_percent > 0.0
            && hit.remaining_fraction() * 100.0 <= self.refresh_threshold_percent
    }
}

/// Injected collaborators shared by every cached method of a decorator.
#[derive(Clone)]
pub struct CacheLayer {
    cache: Arc<dyn DecoratorCache>,
    locker: Option<Arc<dyn KeyLocker>>,
    executor: Option<Arc<dyn RefreshExecutor>>,
}

/// Where a `populate` outcome came from.
enum Source {
    Cached,
    Loaded,
}

enum WriteBack {
    Value(serde_json::Value),
    Error(CachedError),
    Skip,
}

impl CacheLayer {
    pub fn new(cache: Arc<dyn DecoratorCache>) -> Self {
        Self {
            cache,
            locker: None,
            executor: None,
        }
    }

    /// Enable stampede mitigation.
    pub fn with_locker(mut self, locker: Arc<dyn KeyLocker>) -> Self {
        self.locker = Some(locker);
        self
    }

    /// Enable asynchronous refresh.
    pub fn with_executor(mut self, executor: Arc<dyn RefreshExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn cache(&self) -> &Arc<dyn DecoratorCache> {
        &self.cache
    }

    /// Return the cached outcome for `key`, or run `load` and cache what it
    /// returns.
    ///
    /// - a cached error is replayed without calling `load`
    /// - a hit near expiry schedules a refresh on the executor, if any
    /// - on a miss the per-key lock is taken when a locker is configured, and
    ///   released on every exit path
    /// - successes are stored with a jittered TTL; failures are offered to
    ///   the negative cache
    pub async fn get_or_populate<V, E, F, Fut>(
        &self,
        settings: &CacheSettings,
        key: String,
        load: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        E: CacheableError,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.populate(settings, key, load).await.0
    }

    /// [`get_or_populate`](Self::get_or_populate) for a method that also
    /// evicts. `evict` is deleted only when `load` ran in the foreground and
    /// succeeded; a value served from the cache leaves every key in place.
    pub async fn get_or_populate_and_evict<V, E, F, Fut>(
        &self,
        settings: &CacheSettings,
        key: String,
        evict: Vec<String>,
        load: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        E: CacheableError,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        match self.populate(settings, key, load).await {
            (result, Source::Loaded) => {
                evict::evict_on_success(self.cache.as_ref(), settings.method, evict, result).await
            }
            (result, Source::Cached) => result,
        }
    }

    async fn populate<V, E, F, Fut>(
        &self,
        settings: &CacheSettings,
        key: String,
        load: F,
    ) -> (Result<V, E>, Source)
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        E: CacheableError,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let load = Arc::new(load);

        if let Some(hit) = self.lookup(settings, &key).await {
            self.schedule_refresh(settings, &key, &hit, &load);
            if let Some(outcome) = decode::<V, E>(settings, &key, hit) {
                return (outcome, Source::Cached);
            }
        }

        let guard = self.acquire(settings, &key).await;
        let locked = guard.is_some();
        if locked {
            // Another caller may have populated the key while we waited.
            if let Some(hit) = self.lookup(settings, &key).await {
                if let Some(outcome) = decode::<V, E>(settings, &key, hit) {
                    return (outcome, Source::Cached);
                }
            }
        }

        let result = load().await;
        let write_back = match &result {
            Ok(value) => encode(settings, &key, value),
            Err(err) => err.to_cached().map_or(WriteBack::Skip, WriteBack::Error),
        };
        write(self.cache.as_ref(), settings, &key, write_back).await;
        drop(guard);
        (result, Source::Loaded)
    }

    /// Batch-delete `keys` when `result` is `Ok`; see [`evict::evict_on_success`].
    pub async fn evict_on_success<T, E>(
        &self,
        method: &'static str,
        keys: Vec<String>,
        result: Result<T, E>,
    ) -> Result<T, E>
    where
        T: Send,
        E: Send,
    {
        evict::evict_on_success(self.cache.as_ref(), method, keys, result).await
    }

    async fn lookup(&self, settings: &CacheSettings, key: &str) -> Option<CacheHit> {
        match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(
                    method = settings.method,
                    key,
                    error = %err,
                    "cache lookup failed, treating as miss"
                );
                None
            }
        }
    }

    async fn acquire(&self, settings: &CacheSettings, key: &str) -> Option<LockGuard> {
        let locker = self.locker.as_ref()?;
        let guard = locker.lock(key).await;
        if guard.is_none() {
            tracing::debug!(
                method = settings.method,
                key,
                "lock not acquired, populating unlocked"
            );
        }
        guard
    }

    fn schedule_refresh<V, E, F, Fut>(
        &self,
        settings: &CacheSettings,
        key: &str,
        hit: &CacheHit,
        load: &Arc<F>,
    ) where
        V: Serialize + Send + 'static,
        E: CacheableError,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let Some(executor) = &self.executor else {
            return;
        };
        if !settings.should_refresh(hit) {
            return;
        }

        let cache = Arc::clone(&self.cache);
        let locker = self.locker.clone();
        let load = Arc::clone(load);
        let settings = *settings;
        let key = key.to_string();

        tracing::debug!(
            method = settings.method,
            key = %key,
            remaining_ms = hit.remaining.as_millis() as u64,
            "submitting background refresh"
        );

        executor.submit(Box::pin(async move {
            let _guard = match &locker {
                Some(locker) => match locker.lock(&key).await {
                    Some(guard) => Some(guard),
                    None => {
                        tracing::debug!(method = settings.method, key = %key, "refresh skipped, key is locked");
                        return;
                    }
                },
                None => None,
            };
            let write_back = match load().await {
                Ok(value) => encode(&settings, &key, &value),
                Err(_) => {
                    tracing::debug!(method = settings.method, key = %key, "refresh failed, keeping current entry");
                    WriteBack::Skip
                }
            };
            write(cache.as_ref(), &settings, &key, write_back).await;
        }));
    }
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("locker", &self.locker.is_some())
            .field("executor", &self.executor.is_some())
            .finish()
    }
}

/// Turn a hit into the caller's outcome. `None` means the entry was unusable
/// and the call should proceed as a miss.
fn decode<V, E>(settings: &CacheSettings, key: &str, hit: CacheHit) -> Option<Result<V, E>>
where
    V: DeserializeOwned,
    E: CacheableError,
{
    match hit.payload {
        CachedPayload::Error(cached) => Some(Err(E::from_cached(cached))),
        CachedPayload::Value(value) => match serde_json::from_value(value) {
            Ok(value) => Some(Ok(value)),
            Err(err) => {
                tracing::warn!(
                    method = settings.method,
                    key,
                    error = %err,
                    "cached value did not decode, treating as miss"
                );
                None
            }
        },
    }
}

fn encode<V: Serialize>(settings: &CacheSettings, key: &str, value: &V) -> WriteBack {
    match serde_json::to_value(value) {
        Ok(value) => WriteBack::Value(value),
        Err(err) => {
            tracing::warn!(
                method = settings.method,
                key,
                error = %err,
                "result did not encode, not caching"
            );
            WriteBack::Skip
        }
    }
}

async fn write(cache: &dyn DecoratorCache, settings: &CacheSettings, key: &str, write_back: WriteBack) {
    let ttl = jittered_ttl(settings.ttl, settings.jitter_percent);
    match write_back {
        WriteBack::Value(value) => {
            if let Err(err) = cache.set(key, value, ttl).await {
                tracing::warn!(method = settings.method, key, error = %err, "cache store failed");
            }
        }
        WriteBack::Error(cached) => match cache.set_error(key, &cached, ttl).await {
            Ok(true) => {
                tracing::debug!(method = settings.method, key, kind = %cached.kind, "failure negatively cached");
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(method = settings.method, key, error = %err, "negative cache store failed");
            }
        },
        WriteBack::Skip => {}
    }
}
