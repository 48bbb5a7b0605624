//! Shared handler state and its construction from [`Settings`].

use std::net::IpAddr;
use std::sync::Arc;

use thiserror::Error;

use nexgen_auth::{JwtService, RouteAccessTable};
use nexgen_infra::{
    db,
    seed::{self, BootstrapError},
    CachedUsers, InMemoryUserCache, Settings, StoreError, Stores, UserCache,
};

use crate::rate_limit::{RateLimit, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub users: CachedUsers,
    pub jwt: Arc<JwtService>,
    pub route_access: Arc<RouteAccessTable>,
    pub rate_limiter: RateLimiter,
    pub login_limit: RateLimit,
    pub trusted_proxies: Arc<[IpAddr]>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database setup failed: {0}")]
    Database(#[from] StoreError),

    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("user cache setup failed: {0}")]
    Cache(String),
}

impl AppState {
    /// Wire state around already-built stores (tests pass in-memory ones).
    pub fn new(settings: &Settings, stores: Stores, cache: Arc<dyn UserCache>) -> Self {
        let ttl = chrono::Duration::minutes(settings.access_token_expire_minutes);
        Self {
            users: CachedUsers::new(cache, stores.users.clone()),
            stores,
            jwt: Arc::new(JwtService::new(settings.secret_key.as_bytes(), ttl)),
            route_access: Arc::new(RouteAccessTable::default_table()),
            rate_limiter: RateLimiter::new(),
            login_limit: RateLimit {
                max_requests: settings.login_rate_limit,
                window: settings.login_rate_window,
            },
            trusted_proxies: settings.trusted_proxies.clone().into(),
        }
    }
}

/// Pick store and cache backends, apply the schema, seed roles and the first
/// superadmin.
pub async fn build_state(settings: &Settings) -> Result<AppState, StartupError> {
    let stores = if settings.use_persistent_stores {
        let pool = db::connect(&settings.database_url).await?;
        db::migrate(&pool).await?;
        tracing::info!("using postgres stores");
        Stores::postgres(pool)
    } else {
        tracing::warn!("USE_PERSISTENT_STORES is off; data lives in memory only");
        Stores::in_memory()
    };

    let cache = user_cache(settings)?;
    seed::bootstrap(&stores, &settings.superadmin_email, &settings.superadmin_password).await?;

    Ok(AppState::new(settings, stores, cache))
}

#[cfg(feature = "redis")]
fn user_cache(settings: &Settings) -> Result<Arc<dyn UserCache>, StartupError> {
    match &settings.redis_url {
        Some(url) => {
            let cache = nexgen_infra::cache::RedisUserCache::new(url, settings.user_cache_ttl)
                .map_err(|e| StartupError::Cache(e.to_string()))?;
            tracing::info!("using redis user cache");
            Ok(Arc::new(cache))
        }
        None => Ok(Arc::new(InMemoryUserCache::new(settings.user_cache_ttl))),
    }
}

#[cfg(not(feature = "redis"))]
fn user_cache(settings: &Settings) -> Result<Arc<dyn UserCache>, StartupError> {
    if settings.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but the redis feature is disabled; using in-memory user cache");
    }
    Ok(Arc::new(InMemoryUserCache::new(settings.user_cache_ttl)))
}
