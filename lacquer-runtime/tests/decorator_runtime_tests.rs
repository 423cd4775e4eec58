//! End-to-end behavior of the decorator runtime.
//!
//! The decorators below are written the way `lacquer-codegen` emits them, so
//! these tests pin down what generated code does at run time.

use async_trait::async_trait;
use lacquer_runtime::{keys, trace, CacheLayer, CacheSettings, DelegatorBuilder, KeyLocker, LockGuard};
use lacquer_test_utils::{
    CachedError, DecoratorCache, ManualExecutor, MockCache, MockLocker, SpanCapture, TestError,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// CONTRACT AND BASE IMPLEMENTATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: String,
    name: String,
}

#[async_trait]
trait UserService: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<User, TestError>;
    async fn update_user(&self, user: User) -> Result<User, TestError>;
}

#[derive(Default)]
struct Backend {
    get_calls: AtomicUsize,
    update_calls: AtomicUsize,
    fail_with: Mutex<Option<TestError>>,
    renamed: AtomicBool,
}

impl Backend {
    fn failing(err: TestError) -> Self {
        let backend = Self::default();
        *backend.fail_with.lock().unwrap() = Some(err);
        backend
    }

    fn gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserService for Backend {
    async fn get_user(&self, id: &str) -> Result<User, TestError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        let name = if self.renamed.load(Ordering::SeqCst) {
            "Grace"
        } else {
            "Ada"
        };
        Ok(User {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    async fn update_user(&self, user: User) -> Result<User, TestError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(user)
    }
}

// ============================================================================
// DECORATORS (shaped like generated output)
// ============================================================================

const GET_USER: CacheSettings = CacheSettings {
    method: "UserService.get_user",
    ttl: Duration::from_millis(300000),
    jitter_percent: 10.0,
    refresh_threshold_percent: 20.0,
};

struct UserServiceCache {
    inner: Arc<dyn UserService>,
    layer: CacheLayer,
}

#[async_trait]
impl UserService for UserServiceCache {
    async fn get_user(&self, id: &str) -> Result<User, TestError> {
        let __key = format!("users:{}", keys::segment(&id));
        let __inner = Arc::clone(&self.inner);
        let id = id.to_owned();
        self.layer
            .get_or_populate(&GET_USER, __key, move || {
                let __inner = Arc::clone(&__inner);
                let id = id.clone();
                async move { __inner.get_user(&id).await }
            })
            .await
    }

    async fn update_user(&self, user: User) -> Result<User, TestError> {
        let __evict = vec![
            format!("users:{}", keys::segment(&user.id)),
            String::from("users:list"),
        ];
        let __result = self.inner.update_user(user).await;
        self.layer
            .evict_on_success("UserService.update_user", __evict, __result)
            .await
    }
}

struct UserServiceTrace {
    inner: Arc<dyn UserService>,
}

#[async_trait]
impl UserService for UserServiceTrace {
    async fn get_user(&self, id: &str) -> Result<User, TestError> {
        let __span = tracing::info_span!(
            "UserService.get_user",
            id = ?id,
            otel.status_code = tracing::field::Empty
        );
        trace::traced(__span, self.inner.get_user(id)).await
    }

    async fn update_user(&self, user: User) -> Result<User, TestError> {
        self.inner.update_user(user).await
    }
}

fn cached(backend: &Arc<Backend>, layer: CacheLayer) -> UserServiceCache {
    UserServiceCache {
        inner: Arc::clone(backend) as Arc<dyn UserService>,
        layer,
    }
}

fn ada(id: &str) -> User {
    User {
        id: id.to_string(),
        name: "Ada".to_string(),
    }
}

// ============================================================================
// CACHE
// ============================================================================

#[tokio::test]
async fn test_populate_then_hit_calls_base_once() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    let first = service.get_user("7").await.unwrap();
    let second = service.get_user("7").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, ada("7"));
    assert_eq!(backend.gets(), 1);
    assert_eq!(cache.set_count(), 1);
    assert_eq!(cache.keys(), vec!["users:7".to_string()]);
}

#[tokio::test]
async fn test_stored_ttl_is_jittered_within_bounds() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    for id in 0..20 {
        service.get_user(&id.to_string()).await.unwrap();
    }

    let ttls = cache.stored_ttls();
    assert_eq!(ttls.len(), 20);
    for ttl in ttls {
        assert!(ttl >= Duration::from_secs(270) && ttl <= Duration::from_secs(330), "{:?}", ttl);
    }
}

#[tokio::test]
async fn test_cached_error_is_replayed_without_base_call() {
    let backend = Arc::new(Backend::failing(TestError::NotFound("7".to_string())));
    let cache = MockCache::shared();
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    let first = service.get_user("7").await;
    assert_eq!(first, Err(TestError::NotFound("7".to_string())));
    assert_eq!(cache.set_error_count(), 1);
    assert!(cache.cached_error("users:7").is_some());

    let second = service.get_user("7").await;
    assert_eq!(second, Err(TestError::NotFound("7".to_string())));
    assert_eq!(backend.gets(), 1);
}

#[tokio::test]
async fn test_preloaded_negative_entry_short_circuits() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    cache.preload_error(
        "users:9",
        CachedError::new("not_found", "9 not found").with_detail(serde_json::json!("9")),
        Duration::from_secs(30),
    );
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert_eq!(
        service.get_user("9").await,
        Err(TestError::NotFound("9".to_string()))
    );
    assert_eq!(backend.gets(), 0);
}

#[tokio::test]
async fn test_uncacheable_error_is_not_stored() {
    let backend = Arc::new(Backend::failing(TestError::Backend("down".to_string())));
    let cache = MockCache::shared();
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert!(service.get_user("7").await.is_err());
    assert!(service.get_user("7").await.is_err());
    assert_eq!(backend.gets(), 2);
    assert_eq!(cache.set_error_count(), 0);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_declined_negative_cache_reruns_base() {
    let backend = Arc::new(Backend::failing(TestError::NotFound("7".to_string())));
    let cache = MockCache::shared();
    cache.refuse_errors(true);
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert!(service.get_user("7").await.is_err());
    assert!(service.get_user("7").await.is_err());
    assert_eq!(cache.set_error_count(), 2);
    assert_eq!(backend.gets(), 2);
}

#[tokio::test]
async fn test_undecodable_entry_is_a_miss() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    cache.preload(
        "users:7",
        serde_json::json!("not a user"),
        Duration::from_secs(300),
        Duration::from_secs(300),
    );
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert_eq!(service.get_user("7").await.unwrap(), ada("7"));
    assert_eq!(backend.gets(), 1);
    assert_eq!(cache.value("users:7"), Some(serde_json::to_value(ada("7")).unwrap()));
}

#[tokio::test]
async fn test_backend_failures_never_fail_the_call() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    cache.fail_gets(true);
    cache.fail_sets(true);
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert_eq!(service.get_user("7").await.unwrap(), ada("7"));
    assert_eq!(service.get_user("7").await.unwrap(), ada("7"));
    assert_eq!(backend.gets(), 2);
}

// ============================================================================
// REFRESH
// ============================================================================

#[tokio::test]
async fn test_refresh_submitted_below_threshold() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let executor = ManualExecutor::shared();
    let layer = CacheLayer::new(cache.clone()).with_executor(executor.clone());
    let service = cached(&backend, layer);

    service.get_user("7").await.unwrap();
    assert_eq!(executor.submitted(), 0);

    // 10s of 300s left is under the 20% threshold.
    cache.age("users:7", Duration::from_secs(10));
    backend.renamed.store(true, Ordering::SeqCst);

    let stale = service.get_user("7").await.unwrap();
    assert_eq!(stale.name, "Ada");
    assert_eq!(executor.pending(), 1);
    assert_eq!(backend.gets(), 1);

    assert_eq!(executor.run_all().await, 1);
    assert_eq!(backend.gets(), 2);
    assert_eq!(service.get_user("7").await.unwrap().name, "Grace");
}

#[tokio::test]
async fn test_no_refresh_above_threshold() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let executor = ManualExecutor::shared();
    let service = cached(
        &backend,
        CacheLayer::new(cache.clone()).with_executor(executor.clone()),
    );

    cache.preload(
        "users:7",
        serde_json::to_value(ada("7")).unwrap(),
        Duration::from_secs(300),
        Duration::from_secs(200),
    );
    service.get_user("7").await.unwrap();
    assert_eq!(executor.submitted(), 0);
}

#[tokio::test]
async fn test_refresh_skipped_while_key_is_locked() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let executor = ManualExecutor::shared();
    let locker = MockLocker::new();
    let service = cached(
        &backend,
        CacheLayer::new(cache.clone())
            .with_executor(executor.clone())
            .with_locker(Arc::new(locker.clone())),
    );

    cache.preload(
        "users:7",
        serde_json::to_value(ada("7")).unwrap(),
        Duration::from_secs(300),
        Duration::from_secs(1),
    );
    service.get_user("7").await.unwrap();
    assert_eq!(executor.pending(), 1);

    let held = locker.lock("users:7").await.unwrap();
    executor.run_all().await;
    assert_eq!(backend.gets(), 0);
    drop(held);
    assert!(!locker.is_held("users:7"));
}

// ============================================================================
// LOCKING
// ============================================================================

#[tokio::test]
async fn test_lock_released_once_on_success_and_error() {
    let locker = MockLocker::new();

    let backend = Arc::new(Backend::default());
    let service = cached(
        &backend,
        CacheLayer::new(MockCache::shared()).with_locker(Arc::new(locker.clone())),
    );
    service.get_user("7").await.unwrap();
    assert_eq!((locker.acquired(), locker.released()), (1, 1));

    let failing = Arc::new(Backend::failing(TestError::Backend("down".to_string())));
    let service = cached(
        &failing,
        CacheLayer::new(MockCache::shared()).with_locker(Arc::new(locker.clone())),
    );
    assert!(service.get_user("7").await.is_err());
    assert_eq!((locker.acquired(), locker.released()), (2, 2));
    assert!(!locker.is_held("users:7"));
}

#[tokio::test]
async fn test_refused_lock_proceeds_unlocked() {
    let locker = MockLocker::new();
    locker.refuse_all(true);
    let backend = Arc::new(Backend::default());
    let service = cached(
        &backend,
        CacheLayer::new(MockCache::shared()).with_locker(Arc::new(locker.clone())),
    );

    assert_eq!(service.get_user("7").await.unwrap(), ada("7"));
    assert_eq!(locker.refused(), 1);
    assert_eq!(locker.acquired(), 0);
    assert_eq!(backend.gets(), 1);
}

/// Simulates another caller finishing its populate while we wait.
struct PopulatingLocker {
    cache: Arc<MockCache>,
    value: serde_json::Value,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl KeyLocker for PopulatingLocker {
    async fn lock(&self, key: &str) -> Option<LockGuard> {
        self.cache
            .set(key, self.value.clone(), Duration::from_secs(300))
            .await
            .ok()?;
        let released = Arc::clone(&self.released);
        Some(LockGuard::new(move || {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

#[tokio::test]
async fn test_cache_reread_after_lock_acquired() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let released = Arc::new(AtomicUsize::new(0));
    let locker = PopulatingLocker {
        cache: cache.clone(),
        value: serde_json::to_value(User {
            id: "7".to_string(),
            name: "Linus".to_string(),
        })
        .unwrap(),
        released: Arc::clone(&released),
    };
    let service = cached(
        &backend,
        CacheLayer::new(cache.clone()).with_locker(Arc::new(locker)),
    );

    let user = service.get_user("7").await.unwrap();
    assert_eq!(user.name, "Linus");
    assert_eq!(backend.gets(), 0);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

// ============================================================================
// EVICTION
// ============================================================================

#[tokio::test]
async fn test_eviction_on_success_is_one_batch() {
    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    cache.preload("users:7", serde_json::Value::Null, Duration::from_secs(60), Duration::from_secs(60));
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    service.update_user(ada("7")).await.unwrap();

    assert_eq!(cache.delete_count(), 1);
    assert_eq!(
        cache.delete_batches(),
        vec![vec!["users:7".to_string(), "users:list".to_string()]]
    );
    assert!(!cache.contains("users:7"));
}

#[tokio::test]
async fn test_failed_call_evicts_nothing() {
    let backend = Arc::new(Backend::failing(TestError::Backend("down".to_string())));
    let cache = MockCache::shared();
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert!(service.update_user(ada("7")).await.is_err());
    assert_eq!(cache.delete_count(), 0);
}

#[tokio::test]
async fn test_delete_failure_is_logged_not_returned() {
    let capture = SpanCapture::new();
    let _guard = capture.set_default();

    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    cache.make_undeletable("users:7");
    let service = cached(&backend, CacheLayer::new(cache.clone()));

    assert_eq!(service.update_user(ada("7")).await.unwrap(), ada("7"));
    assert_eq!(cache.delete_count(), 1);

    let warnings = capture.events_at(tracing::Level::WARN);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message(),
        Some("eviction failed after successful call")
    );
    assert_eq!(
        warnings[0].fields.get("method").map(String::as_str),
        Some("UserService.update_user")
    );
}

fn counting_load(
    calls: &Arc<AtomicUsize>,
    outcome: Result<User, TestError>,
) -> impl Fn() -> std::future::Ready<Result<User, TestError>> + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(outcome.clone())
    }
}

#[tokio::test]
async fn test_cached_hit_on_evicting_method_deletes_nothing() {
    let cache = MockCache::shared();
    let value = serde_json::to_value(ada("7")).unwrap();
    cache.preload("users:7", value, Duration::from_secs(60), Duration::from_secs(60));
    let layer = CacheLayer::new(cache.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let user = layer
        .get_or_populate_and_evict(
            &GET_USER,
            "users:7".to_string(),
            vec!["users:list".to_string()],
            counting_load(&calls, Ok(ada("7"))),
        )
        .await
        .unwrap();

    assert_eq!(user, ada("7"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(cache.delete_count(), 0);
    assert!(cache.delete_batches().is_empty());
}

#[tokio::test]
async fn test_loaded_value_on_evicting_method_deletes_once() {
    let cache = MockCache::shared();
    let layer = CacheLayer::new(cache.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        layer
            .get_or_populate_and_evict(
                &GET_USER,
                "users:8".to_string(),
                vec!["users:list".to_string()],
                counting_load(&calls, Ok(ada("8"))),
            )
            .await
            .unwrap();
    }

    // The second call is served from the cache and leaves the list alone.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.delete_batches(), vec![vec!["users:list".to_string()]]);
}

#[tokio::test]
async fn test_failed_load_on_evicting_method_deletes_nothing() {
    let cache = MockCache::shared();
    let layer = CacheLayer::new(cache.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let result = layer
        .get_or_populate_and_evict(
            &GET_USER,
            "users:9".to_string(),
            vec!["users:list".to_string()],
            counting_load(&calls, Err(TestError::Backend("down".to_string()))),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.delete_count(), 0);
}

#[test]
fn test_unserializable_key_value_is_logged() {
    let capture = SpanCapture::new();
    let _guard = capture.set_default();

    let mut filter = std::collections::BTreeMap::new();
    filter.insert((1u8, 2u8), "x");
    assert_eq!(keys::segment(&filter), "");
    assert_eq!(keys::json(&filter), "");

    let warnings = capture.events_at(tracing::Level::WARN);
    assert_eq!(warnings.len(), 2);
    assert!(warnings
        .iter()
        .all(|w| w.message() == Some("key value did not serialize, rendering empty")));
    assert_eq!(
        warnings[0].fields.get("builtin").map(String::as_str),
        Some("segment")
    );
}

// ============================================================================
// TRACING
// ============================================================================

#[tokio::test]
async fn test_trace_records_attributes_and_marks_errors() {
    let capture = SpanCapture::new();
    let _guard = capture.set_default();

    let failing = Arc::new(Backend::failing(TestError::NotFound("7".to_string())));
    let service = UserServiceTrace { inner: failing };

    let result = service.get_user("7").await;
    assert_eq!(result, Err(TestError::NotFound("7".to_string())));

    let span = capture.span("UserService.get_user").unwrap();
    assert_eq!(span.fields.get("id").map(String::as_str), Some("\"7\""));
    assert_eq!(
        span.fields.get("otel.status_code").map(String::as_str),
        Some("ERROR")
    );

    let errors = capture.events_at(tracing::Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].span.as_deref(), Some("UserService.get_user"));
    assert_eq!(errors[0].fields.get("error").map(String::as_str), Some("7 not found"));
}

#[tokio::test]
async fn test_trace_success_leaves_status_unset() {
    let capture = SpanCapture::new();
    let _guard = capture.set_default();

    let service = UserServiceTrace {
        inner: Arc::new(Backend::default()),
    };
    assert_eq!(service.get_user("7").await.unwrap(), ada("7"));

    let span = capture.span("UserService.get_user").unwrap();
    assert!(!span.fields.contains_key("otel.status_code"));
    assert!(capture.events_at(tracing::Level::ERROR).is_empty());
}

// ============================================================================
// COMPOSITION
// ============================================================================

#[tokio::test]
async fn test_delegator_composes_cache_and_trace() {
    let capture = SpanCapture::new();
    let _guard = capture.set_default();

    let backend = Arc::new(Backend::default());
    let cache = MockCache::shared();
    let layer = CacheLayer::new(cache.clone());

    let mut builder: DelegatorBuilder<dyn UserService> =
        DelegatorBuilder::new(Arc::clone(&backend) as Arc<dyn UserService>);
    builder
        .register(|inner| Arc::new(UserServiceTrace { inner }) as Arc<dyn UserService>)
        .register(move |inner| {
            Arc::new(UserServiceCache {
                inner,
                layer: layer.clone(),
            }) as Arc<dyn UserService>
        });
    let service = builder.build();

    service.get_user("7").await.unwrap();
    service.get_user("7").await.unwrap();

    // Trace is outermost, so both calls are traced while only one reaches
    // the base.
    let spans = capture
        .spans()
        .into_iter()
        .filter(|s| s.name == "UserService.get_user")
        .count();
    assert_eq!(spans, 2);
    assert_eq!(backend.gets(), 1);
}

#[async_trait]
trait Visit: Send + Sync {
    async fn visit(&self, log: Arc<Mutex<Vec<String>>>);
}

struct Leaf;

#[async_trait]
impl Visit for Leaf {
    async fn visit(&self, log: Arc<Mutex<Vec<String>>>) {
        log.lock().unwrap().push("Z".to_string());
    }
}

struct Tagged {
    tag: &'static str,
    inner: Arc<dyn Visit>,
}

#[async_trait]
impl Visit for Tagged {
    async fn visit(&self, log: Arc<Mutex<Vec<String>>>) {
        log.lock().unwrap().push(format!("enter {}", self.tag));
        self.inner.visit(Arc::clone(&log)).await;
        log.lock().unwrap().push(format!("exit {}", self.tag));
    }
}

#[tokio::test]
async fn test_builder_order_enters_and_unwinds() {
    let mut builder: DelegatorBuilder<dyn Visit> = DelegatorBuilder::new(Arc::new(Leaf));
    for tag in ["A", "B", "C"] {
        builder.register(move |inner| Arc::new(Tagged { tag, inner }) as Arc<dyn Visit>);
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    builder.build().visit(Arc::clone(&log)).await;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["enter A", "enter B", "enter C", "Z", "exit C", "exit B", "exit A"]
    );
}
