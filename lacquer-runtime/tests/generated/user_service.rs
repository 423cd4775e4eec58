// Code generated by lacquer. DO NOT EDIT.
// Contract: app::users::UserService

use super::*;
use std::sync::Arc;

const USER_SERVICE_GET_USER_CACHE: ::lacquer_runtime::CacheSettings = ::lacquer_runtime::CacheSettings {
    method: "UserService.get_user",
    ttl: ::std::time::Duration::from_millis(300000),
    jitter_percent: 10.0,
    refresh_threshold_percent: 20.0,
};

const USER_SERVICE_LIST_USERS_CACHE: ::lacquer_runtime::CacheSettings = ::lacquer_runtime::CacheSettings {
    method: "UserService.list_users",
    ttl: ::std::time::Duration::from_millis(30000),
    jitter_percent: 0.0,
    refresh_threshold_percent: 0.0,
};

/// Caching decorator for [`UserService`].
pub struct UserServiceCache {
    inner: Arc<dyn UserService>,
    layer: ::lacquer_runtime::CacheLayer,
}

impl UserServiceCache {
    pub fn new(inner: Arc<dyn UserService>, layer: ::lacquer_runtime::CacheLayer) -> Self {
        Self { inner, layer }
    }
}

#[::async_trait::async_trait]
impl UserService for UserServiceCache {
    async fn get_user(&self, ctx: &Context, id: &str) -> Result<User, UserError> {
        let __key = format!("users:{}", ::lacquer_runtime::keys::segment(&id));
        let __inner = Arc::clone(&self.inner);
        let ctx = ctx.to_owned();
        let id = id.to_owned();
        self
            .layer
            .get_or_populate(&USER_SERVICE_GET_USER_CACHE, __key, move || {
                let __inner = Arc::clone(&__inner);
                let ctx = ctx.clone();
                let id = id.clone();
                async move { __inner.get_user(&ctx, &id).await }
            })
            .await
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, UserError> {
        let __key = format!("users:list:list_users:{}", ::lacquer_runtime::keys::base64_json(&filter));
        let __inner = Arc::clone(&self.inner);
        self
            .layer
            .get_or_populate(&USER_SERVICE_LIST_USERS_CACHE, __key, move || {
                let __inner = Arc::clone(&__inner);
                let filter = filter.clone();
                async move { __inner.list_users(filter).await }
            })
            .await
    }

    async fn update_user(&self, ctx: &Context, user: User) -> Result<User, UserError> {
        let __evict = vec![
            format!("users:{}", ::lacquer_runtime::keys::segment(&user.id)),
            String::from("users:list:*"),
        ];
        let __result = self.inner.update_user(ctx, user).await;
        self.layer
            .evict_on_success("UserService.update_user", __evict, __result)
            .await
    }

    async fn ping(&self) -> Result<(), UserError> {
        self.inner.ping().await
    }
}

/// Tracing decorator for [`UserService`].
pub struct UserServiceTrace {
    inner: Arc<dyn UserService>,
}

impl UserServiceTrace {
    pub fn new(inner: Arc<dyn UserService>) -> Self {
        Self { inner }
    }
}

#[::async_trait::async_trait]
impl UserService for UserServiceTrace {
    async fn get_user(&self, ctx: &Context, id: &str) -> Result<User, UserError> {
        let __span = ::lacquer_runtime::tracing::info_span!(
            "UserService.get_user",
            id = ?id,
            otel.status_code = ::lacquer_runtime::tracing::field::Empty
        );
        ::lacquer_runtime::trace::traced(__span, self.inner.get_user(ctx, id)).await
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, UserError> {
        self.inner.list_users(filter).await
    }

    async fn update_user(&self, ctx: &Context, user: User) -> Result<User, UserError> {
        let __span = ::lacquer_runtime::tracing::info_span!(
            "users.update",
            user = ?user,
            otel.status_code = ::lacquer_runtime::tracing::field::Empty
        );
        ::lacquer_runtime::trace::traced(__span, self.inner.update_user(ctx, user)).await
    }

    async fn ping(&self) -> Result<(), UserError> {
        self.inner.ping().await
    }
}

/// Ordered decorator stack for [`UserService`]. The first factory registered is the outermost layer.
pub type UserServiceDelegator = ::lacquer_runtime::DelegatorBuilder<dyn UserService>;

pub fn user_service_delegator(base: Arc<dyn UserService>) -> UserServiceDelegator {
    ::lacquer_runtime::DelegatorBuilder::new(base)
}

pub fn user_service_cache(layer: ::lacquer_runtime::CacheLayer) -> impl Fn(Arc<dyn UserService>) -> Arc<dyn UserService> + Send + Sync + 'static {
    move |inner: Arc<dyn UserService>| -> Arc<dyn UserService> {
        Arc::new(UserServiceCache::new(inner, layer.clone()))
    }
}

pub fn user_service_trace() -> impl Fn(Arc<dyn UserService>) -> Arc<dyn UserService> + Send + Sync + 'static {
    |inner: Arc<dyn UserService>| -> Arc<dyn UserService> {
        Arc::new(UserServiceTrace::new(inner))
    }
}
