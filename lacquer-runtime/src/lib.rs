//! LACQUER Runtime - Support Library for Generated Decorators
//!
//! Code emitted by `lacquer-codegen` is glue: it renders keys, builds spans
//! and forwards to the algorithms in this crate. Hosts supply the backends
//! through the traits in [`cache`]; nothing here stores data on its own.

pub mod cache;
pub mod delegator;
pub mod error;
pub mod evict;
pub mod keys;
pub mod trace;

pub use cache::{
    CacheHit, CacheLayer, CacheSettings, CacheableError, CachedError, CachedPayload,
    DecoratorCache, KeyLocker, LockGuard, RefreshExecutor, RefreshTask,
};
pub use delegator::{DecoratorFactory, DelegatorAssembly, DelegatorBuilder};
pub use error::{CacheBackendError, CacheResult};
pub use evict::{evict_keys, evict_on_success};
pub use trace::traced;

// Generated code refers to these through the runtime path so hosts need no
// direct dependency on them.
pub use async_trait::async_trait;
pub use tracing;
