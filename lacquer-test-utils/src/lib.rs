//! LACQUER Test Utilities
//!
//! Centralized test infrastructure for the LACQUER workspace:
//! - In-memory mocks for the runtime's cache, locker and executor traits
//! - A tracing layer that captures spans and events
//! - Proptest generators for policy model values
//! - Fixtures for a sample user service contract
//! - Assertions for generator output and method errors

// Re-export core types for convenience
pub use lacquer_core::{
    CachePolicy, ContractSpec, EvictPolicy, GeneratorConfig, MethodError, MethodErrorKind,
    MethodSpec, ParamKind, ParamSpec, PolicyModel, ReturnShape, TemplateError, TracePolicy,
    ValidationError,
};
pub use lacquer_runtime::{
    CacheBackendError, CacheHit, CacheResult, CacheableError, CachedError, CachedPayload,
    DecoratorCache, KeyLocker, LockGuard, RefreshExecutor, RefreshTask,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MOCK CACHE
// ============================================================================

#[derive(Debug, Clone)]
struct MockEntry {
    payload: CachedPayload,
    ttl: Duration,
    remaining: Duration,
}

/// In-memory [`DecoratorCache`] with call counters and failure injection.
///
/// Entries never expire on their own; use [`MockCache::age`] to move an
/// entry towards expiry.
#[derive(Debug, Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, MockEntry>>,
    gets: AtomicUsize,
    sets: AtomicUsize,
    set_errors: AtomicUsize,
    deletes: AtomicUsize,
    delete_batches: Mutex<Vec<Vec<String>>>,
    stored_ttls: Mutex<Vec<Duration>>,
    refuse_errors: AtomicBool,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    fail_deletes: AtomicBool,
    undeletable: Mutex<HashSet<String>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store a value as if it had been cached `ttl - remaining` ago.
    pub fn preload(&self, key: &str, value: serde_json::Value, ttl: Duration, remaining: Duration) {
        lock(&self.entries).insert(
            key.to_string(),
            MockEntry {
                payload: CachedPayload::Value(value),
                ttl,
                remaining,
            },
        );
    }

    /// Store a negative entry.
    pub fn preload_error(&self, key: &str, error: CachedError, ttl: Duration) {
        lock(&self.entries).insert(
            key.to_string(),
            MockEntry {
                payload: CachedPayload::Error(error),
                ttl,
                remaining: ttl,
            },
        );
    }

    /// Set the remaining lifetime of an entry. Returns `false` if absent.
    pub fn age(&self, key: &str, remaining: Duration) -> bool {
        match lock(&self.entries).get_mut(key) {
            Some(entry) => {
                entry.remaining = remaining;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        match lock(&self.entries).get(key).map(|e| e.payload.clone()) {
            Some(CachedPayload::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn cached_error(&self, key: &str) -> Option<CachedError> {
        match lock(&self.entries).get(key).map(|e| e.payload.clone()) {
            Some(CachedPayload::Error(e)) => Some(e),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn set_error_count(&self) -> usize {
        self.set_errors.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls (batches), not keys.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn delete_batches(&self) -> Vec<Vec<String>> {
        lock(&self.delete_batches).clone()
    }

    /// TTLs passed to `set` and `set_error`, in call order.
    pub fn stored_ttls(&self) -> Vec<Duration> {
        lock(&self.stored_ttls).clone()
    }

    /// Make `set_error` decline every failure.
    pub fn refuse_errors(&self, refuse: bool) {
        self.refuse_errors.store(refuse, Ordering::SeqCst);
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete` fail without removing anything.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make `key` survive deletes, producing a partial-delete report.
    pub fn make_undeletable(&self, key: &str) {
        lock(&self.undeletable).insert(key.to_string());
    }
}

#[async_trait]
impl DecoratorCache for MockCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheHit>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(CacheBackendError::unavailable("injected get failure"));
        }
        Ok(lock(&self.entries).get(key).map(|entry| CacheHit {
            payload: entry.payload.clone(),
            ttl: entry.ttl,
            remaining: entry.remaining,
        }))
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(CacheBackendError::unavailable("injected set failure"));
        }
        lock(&self.stored_ttls).push(ttl);
        lock(&self.entries).insert(
            key.to_string(),
            MockEntry {
                payload: CachedPayload::Value(value),
                ttl,
                remaining: ttl,
            },
        );
        Ok(())
    }

    async fn set_error(&self, key: &str, error: &CachedError, ttl: Duration) -> CacheResult<bool> {
        self.set_errors.fetch_add(1, Ordering::SeqCst);
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(CacheBackendError::unavailable("injected set failure"));
        }
        if self.refuse_errors.load(Ordering::SeqCst) {
            return Ok(false);
        }
        lock(&self.stored_ttls).push(ttl);
        lock(&self.entries).insert(
            key.to_string(),
            MockEntry {
                payload: CachedPayload::Error(error.clone()),
                ttl,
                remaining: ttl,
            },
        );
        Ok(true)
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        lock(&self.delete_batches).push(keys.to_vec());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CacheBackendError::unavailable("injected delete failure"));
        }

        let undeletable = lock(&self.undeletable).clone();
        let mut entries = lock(&self.entries);
        let mut failed = Vec::new();
        for key in keys {
            if undeletable.contains(key) {
                failed.push(key.clone());
            } else {
                entries.remove(key);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(CacheBackendError::PartialDelete {
                requested: keys.len(),
                deleted: keys.len() - failed.len(),
                failed,
            })
        }
    }
}

// ============================================================================
// MOCK LOCKER
// ============================================================================

#[derive(Debug, Default)]
struct LockerState {
    held: Mutex<HashSet<String>>,
    acquired: AtomicUsize,
    released: AtomicUsize,
    refused: AtomicUsize,
    refuse_all: AtomicBool,
}

/// In-memory [`KeyLocker`]. A key already held is refused, as is every key
/// while [`MockLocker::refuse_all`] is set.
#[derive(Debug, Clone, Default)]
pub struct MockLocker {
    state: Arc<LockerState>,
}

impl MockLocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_all(&self, refuse: bool) {
        self.state.refuse_all.store(refuse, Ordering::SeqCst);
    }

    pub fn is_held(&self, key: &str) -> bool {
        lock(&self.state.held).contains(key)
    }

    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn refused(&self) -> usize {
        self.state.refused.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyLocker for MockLocker {
    async fn lock(&self, key: &str) -> Option<LockGuard> {
        if self.state.refuse_all.load(Ordering::SeqCst) || !lock(&self.state.held).insert(key.to_string()) {
            self.state.refused.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        self.state.acquired.fetch_add(1, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let key = key.to_string();
        Some(LockGuard::new(move || {
            lock(&state.held).remove(&key);
            state.released.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

// ============================================================================
// MANUAL EXECUTOR
// ============================================================================

/// [`RefreshExecutor`] that queues tasks until the test runs them.
#[derive(Default)]
pub struct ManualExecutor {
    tasks: Mutex<Vec<RefreshTask>>,
    submitted: AtomicUsize,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn pending(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Total tasks ever submitted.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Run queued tasks one after another. Returns how many ran.
    pub async fn run_all(&self) -> usize {
        let tasks: Vec<RefreshTask> = std::mem::take(&mut *lock(&self.tasks));
        let count = tasks.len();
        for task in tasks {
            task.await;
        }
        count
    }
}

impl RefreshExecutor for ManualExecutor {
    fn submit(&self, task: RefreshTask) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        lock(&self.tasks).push(task);
    }
}

impl std::fmt::Debug for ManualExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualExecutor")
            .field("pending", &self.pending())
            .field("submitted", &self.submitted())
            .finish()
    }
}

// ============================================================================
// TEST ERROR
// ============================================================================

/// Contract error used by fixtures. Only `NotFound` is negatively cached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum TestError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl CacheableError for TestError {
    fn to_cached(&self) -> Option<CachedError> {
        match self {
            TestError::NotFound(id) => Some(
                CachedError::new("not_found", self.to_string())
                    .with_detail(serde_json::Value::String(id.clone())),
            ),
            TestError::Backend(_) => None,
        }
    }

    fn from_cached(cached: CachedError) -> Self {
        match (cached.kind.as_str(), cached.detail) {
            ("not_found", serde_json::Value::String(id)) => TestError::NotFound(id),
            _ => TestError::Backend(cached.message),
        }
    }
}

// ============================================================================
// SPAN CAPTURE
// ============================================================================

pub mod capture {
    //! A `tracing-subscriber` layer that records spans and events for
    //! assertions.

    use super::lock;
    use std::collections::BTreeMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CapturedSpan {
        pub name: String,
        pub fields: BTreeMap<String, String>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CapturedEvent {
        pub level: Level,
        /// Name of the span the event was emitted in, if any.
        pub span: Option<String>,
        pub fields: BTreeMap<String, String>,
    }

    impl CapturedEvent {
        pub fn message(&self) -> Option<&str> {
            self.fields.get("message").map(String::as_str)
        }
    }

    #[derive(Debug, Default)]
    struct Captured {
        spans: Vec<CapturedSpan>,
        events: Vec<CapturedEvent>,
    }

    #[derive(Debug, Clone, Copy)]
    struct SpanIndex(usize);

    /// Records every span (with fields, including ones recorded later) and
    /// every event. Clones share storage.
    #[derive(Debug, Clone, Default)]
    pub struct SpanCapture {
        inner: Arc<Mutex<Captured>>,
    }

    impl SpanCapture {
        pub fn new() -> Self {
            Self::default()
        }

        /// Install a registry with this layer as the thread's default
        /// subscriber until the guard drops.
        pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
            let subscriber = tracing_subscriber::registry().with(self.clone());
            tracing::subscriber::set_default(subscriber)
        }

        pub fn spans(&self) -> Vec<CapturedSpan> {
            lock(&self.inner).spans.clone()
        }

        pub fn events(&self) -> Vec<CapturedEvent> {
            lock(&self.inner).events.clone()
        }

        /// First span with this name.
        pub fn span(&self, name: &str) -> Option<CapturedSpan> {
            lock(&self.inner)
                .spans
                .iter()
                .find(|s| s.name == name)
                .cloned()
        }

        pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
            lock(&self.inner)
                .events
                .iter()
                .filter(|e| e.level == level)
                .cloned()
                .collect()
        }
    }

    struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

    impl Visit for FieldVisitor<'_> {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    impl<S> Layer<S> for SpanCapture
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
            let mut fields = BTreeMap::new();
            attrs.record(&mut FieldVisitor(&mut fields));

            let index = {
                let mut captured = lock(&self.inner);
                captured.spans.push(CapturedSpan {
                    name: attrs.metadata().name().to_string(),
                    fields,
                });
                captured.spans.len() - 1
            };

            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(SpanIndex(index));
            }
        }

        fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
            let Some(index) = ctx
                .span(id)
                .and_then(|span| span.extensions().get::<SpanIndex>().copied())
            else {
                return;
            };
            let mut captured = lock(&self.inner);
            if let Some(span) = captured.spans.get_mut(index.0) {
                values.record(&mut FieldVisitor(&mut span.fields));
            }
        }

        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let mut fields = BTreeMap::new();
            event.record(&mut FieldVisitor(&mut fields));
            let span = ctx.event_span(event).map(|s| s.name().to_string());
            lock(&self.inner).events.push(CapturedEvent {
                level: *event.metadata().level(),
                span,
                fields,
            });
        }
    }
}

pub use capture::{CapturedEvent, CapturedSpan, SpanCapture};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for policy model values.

    use super::*;
    use proptest::prelude::*;

    /// Lowercase snake-case identifier that is not a Rust keyword.
    pub fn arb_identifier() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,10}"
            .prop_filter("not a keyword", |s| !lacquer_core::is_rust_keyword(s))
    }

    /// Contract (trait) name.
    pub fn arb_contract_name() -> impl Strategy<Value = String> {
        "[A-Z][A-Za-z0-9]{0,12}"
            .prop_filter("not a keyword", |s| !lacquer_core::is_rust_keyword(s))
    }

    /// Template text without placeholders.
    pub fn arb_literal_template() -> impl Strategy<Value = String> {
        "[^{}]{0,30}"
    }

    pub fn arb_cache_policy(params: Vec<String>) -> impl Strategy<Value = CachePolicy> {
        let key = if params.is_empty() {
            Just(String::new()).boxed()
        } else {
            prop::sample::select(params)
                .prop_map(|p| format!("{{{}}}", p))
                .boxed()
        };
        (1u64..86_400, "[a-z:]{0,8}", key, 0.0f64..50.0, 0.0f64..50.0).prop_map(
            |(secs, prefix, key, jitter, refresh)| CachePolicy {
                ttl: Duration::from_secs(secs),
                prefix,
                key,
                jitter_percent: jitter,
                refresh_threshold_percent: refresh,
            },
        )
    }

    /// A valid method: unique value parameters, optional leading context, and
    /// policies whose templates only reference those parameters.
    pub fn arb_method_spec() -> impl Strategy<Value = MethodSpec> {
        (
            arb_identifier(),
            prop::collection::btree_set(arb_identifier(), 0..4),
            any::<bool>(),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_flat_map(|(name, params, with_ctx, evict, trace)| {
                let params: Vec<String> = params.into_iter().filter(|p| p != "ctx").collect();
                let cache = prop::option::of(arb_cache_policy(params.clone()));
                (
                    Just(name),
                    Just(params),
                    Just(with_ctx),
                    Just(evict),
                    Just(trace),
                    cache,
                )
            })
            .prop_map(|(name, params, with_ctx, evict, trace, cache)| {
                let mut specs = Vec::new();
                if with_ctx {
                    specs.push(ParamSpec {
                        name: "ctx".to_string(),
                        ty: "&Context".to_string(),
                        kind: ParamKind::Context,
                        fields: None,
                    });
                }
                specs.extend(params.iter().map(|p| ParamSpec {
                    name: p.clone(),
                    ty: "String".to_string(),
                    kind: ParamKind::Value,
                    fields: None,
                }));
                MethodSpec {
                    evict: evict.then(|| EvictPolicy {
                        keys: vec![match params.first() {
                            Some(p) => format!("{}:{{{}}}", name, p),
                            None => format!("{}:all", name),
                        }],
                    }),
                    trace: trace.then(|| TracePolicy {
                        span_name: None,
                        attributes: params.clone(),
                    }),
                    name,
                    params: specs,
                    returns: ReturnShape {
                        value: "String".to_string(),
                        error: "TestError".to_string(),
                    },
                    cache,
                }
            })
    }

    /// A valid contract with unique method names.
    pub fn arb_contract() -> impl Strategy<Value = ContractSpec> {
        (
            arb_contract_name(),
            prop::collection::vec(arb_method_spec(), 0..5),
        )
            .prop_map(|(name, methods)| {
                let mut seen = std::collections::HashSet::new();
                let methods = methods
                    .into_iter()
                    .filter(|m| seen.insert(m.name.clone()))
                    .collect();
                ContractSpec {
                    package: "app".to_string(),
                    name,
                    methods,
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built policy models for common scenarios.

    use super::*;

    /// The sample contract in YAML form, equal to [`user_service_contract`].
    pub const USER_SERVICE_YAML: &str = r#"
contracts:
  - package: app::users
    name: UserService
    methods:
      - name: get_user
        params:
          - { name: ctx, ty: "&Context", kind: context }
          - { name: id, ty: "&str" }
        returns: { value: User, error: UserError }
        cache:
          ttl: 5m
          prefix: "users:"
          key: "{id}"
          jitter_percent: 10
          refresh_threshold_percent: 20
        trace:
          attributes: [id]
      - name: list_users
        params:
          - { name: filter, ty: UserFilter, fields: [name, active] }
        returns: { value: Vec<User>, error: UserError }
        cache:
          ttl: 30s
          prefix: "users:list:"
      - name: update_user
        params:
          - { name: ctx, ty: "&Context", kind: context }
          - { name: user, ty: User, fields: [id, name] }
        returns: { value: User, error: UserError }
        evict:
          keys: ["users:{user.id}", "users:list:*"]
        trace:
          span_name: users.update
          attributes: [user]
      - name: ping
        returns: { value: "()", error: UserError }
"#;

    fn param(name: &str, ty: &str, kind: ParamKind, fields: Option<&[&str]>) -> ParamSpec {
        ParamSpec {
            name: name.to_string(),
            ty: ty.to_string(),
            kind,
            fields: fields.map(|f| f.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn returns(value: &str) -> ReturnShape {
        ReturnShape {
            value: value.to_string(),
            error: "UserError".to_string(),
        }
    }

    pub fn get_user_method() -> MethodSpec {
        MethodSpec {
            name: "get_user".to_string(),
            params: vec![
                param("ctx", "&Context", ParamKind::Context, None),
                param("id", "&str", ParamKind::Value, None),
            ],
            returns: returns("User"),
            cache: Some(CachePolicy {
                ttl: Duration::from_secs(300),
                prefix: "users:".to_string(),
                key: "{id}".to_string(),
                jitter_percent: 10.0,
                refresh_threshold_percent: 20.0,
            }),
            evict: None,
            trace: Some(TracePolicy {
                span_name: None,
                attributes: vec!["id".to_string()],
            }),
        }
    }

    pub fn list_users_method() -> MethodSpec {
        MethodSpec {
            name: "list_users".to_string(),
            params: vec![param(
                "filter",
                "UserFilter",
                ParamKind::Value,
                Some(&["name", "active"]),
            )],
            returns: returns("Vec<User>"),
            cache: Some(CachePolicy {
                ttl: Duration::from_secs(30),
                prefix: "users:list:".to_string(),
                key: String::new(),
                jitter_percent: 0.0,
                refresh_threshold_percent: 0.0,
            }),
            evict: None,
            trace: None,
        }
    }

    pub fn update_user_method() -> MethodSpec {
        MethodSpec {
            name: "update_user".to_string(),
            params: vec![
                param("ctx", "&Context", ParamKind::Context, None),
                param("user", "User", ParamKind::Value, Some(&["id", "name"])),
            ],
            returns: returns("User"),
            cache: None,
            evict: Some(EvictPolicy {
                keys: vec!["users:{user.id}".to_string(), "users:list:*".to_string()],
            }),
            trace: Some(TracePolicy {
                span_name: Some("users.update".to_string()),
                attributes: vec!["user".to_string()],
            }),
        }
    }

    pub fn ping_method() -> MethodSpec {
        MethodSpec {
            name: "ping".to_string(),
            params: Vec::new(),
            returns: returns("()"),
            cache: None,
            evict: None,
            trace: None,
        }
    }

    /// A contract exercising every policy kind plus a plain method.
    pub fn user_service_contract() -> ContractSpec {
        ContractSpec {
            package: "app::users".to_string(),
            name: "UserService".to_string(),
            methods: vec![
                get_user_method(),
                list_users_method(),
                update_user_method(),
                ping_method(),
            ],
        }
    }

    /// A contract whose `lookup` cache key references a parameter that
    /// does not exist.
    pub fn broken_contract() -> ContractSpec {
        ContractSpec {
            package: "app::broken".to_string(),
            name: "BrokenService".to_string(),
            methods: vec![
                MethodSpec {
                    name: "lookup".to_string(),
                    params: vec![param("id", "u64", ParamKind::Value, None)],
                    returns: returns("String"),
                    cache: Some(CachePolicy {
                        ttl: Duration::from_secs(60),
                        prefix: String::new(),
                        key: "item:{item_id}".to_string(),
                        jitter_percent: 0.0,
                        refresh_threshold_percent: 0.0,
                    }),
                    evict: None,
                    trace: None,
                },
                ping_method(),
            ],
        }
    }

    pub fn policy_model() -> PolicyModel {
        PolicyModel {
            contracts: vec![user_service_contract()],
        }
    }

    /// Valid contracts around a broken one.
    pub fn mixed_policy_model() -> PolicyModel {
        let mut orders = user_service_contract();
        orders.package = "app::orders".to_string();
        orders.name = "OrderService".to_string();
        PolicyModel {
            contracts: vec![user_service_contract(), broken_contract(), orders],
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions with readable failure output.

    use super::*;

    /// Assert that generated source contains `needle`.
    pub fn assert_contains(source: &str, needle: &str) {
        assert!(
            source.contains(needle),
            "expected generated source to contain:\n  {}\n--- source ---\n{}",
            needle,
            source
        );
    }

    pub fn assert_not_contains(source: &str, needle: &str) {
        assert!(
            !source.contains(needle),
            "expected generated source NOT to contain:\n  {}\n--- source ---\n{}",
            needle,
            source
        );
    }

    /// Assert that `errors` has a template error for `method`, and return it.
    pub fn assert_template_error<'a>(errors: &'a [MethodError], method: &str) -> &'a TemplateError {
        let found = errors.iter().find_map(|e| match &e.kind {
            MethodErrorKind::Template(t) if e.method == method => Some(t),
            _ => None,
        });
        match found {
            Some(t) => t,
            None => panic!("expected a template error for {}, got {:?}", method, errors),
        }
    }

    pub fn assert_validation_error<'a>(
        errors: &'a [MethodError],
        method: &str,
    ) -> &'a ValidationError {
        let found = errors.iter().find_map(|e| match &e.kind {
            MethodErrorKind::Validation(v) if e.method == method => Some(v),
            _ => None,
        });
        match found {
            Some(v) => v,
            None => panic!("expected a validation error for {}, got {:?}", method, errors),
        }
    }
}
