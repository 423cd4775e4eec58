//! Cache decorator runtime.
//!
//! Generated cache methods are thin: they build a key, capture their
//! arguments in a loader closure, and call [`CacheLayer::get_or_populate`].
//! Everything else lives here:
//!
//! - [`traits`]: the backend, locker and executor abstractions the host
//!   supplies
//! - [`layer`]: lookup, negative caching, stampede locking, write-back and
//!   asynchronous refresh
//! - [`jitter`]: TTL randomization
//!
//! # Example
//!
//! ```ignore
//! const GET_USER: CacheSettings = CacheSettings {
//!     method: "UserService.get_user",
//!     ttl: Duration::from_secs(300),
//!     jitter_percent: 10.0,
//!     refresh_threshold_percent: 20.0,
//! };
//!
//! let key = format!("user:{}", keys::segment(&id));
//! let inner = Arc::clone(&self.inner);
//! self.layer
//!     .get_or_populate(&GET_USER, key, move || {
//!         let inner = Arc::clone(&inner);
//!         async move { inner.get_user(id).await }
//!     })
//!     .await
//! ```

pub mod jitter;
pub mod layer;
pub mod traits;

pub use jitter::{jitter_bounds, jittered_ttl, jittered_ttl_with};
pub use layer::{CacheLayer, CacheSettings};
pub use traits::{
    CacheHit, CacheableError, CachedError, CachedPayload, DecoratorCache, KeyLocker, LockGuard,
    RefreshExecutor, RefreshTask,
};
