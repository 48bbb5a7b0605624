//! Fixed-TTL cache for the per-request user lookup.
//!
//! Expired entries read as absent. Cache failures never fail a request:
//! [`CachedUsers`] logs them and falls through to the store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;

use nexgen_auth::User;
use nexgen_core::{RoleId, UserId};

use crate::store::{StoreError, UserStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache entry could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserCache: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>, CacheError>;
    async fn put(&self, user: &User) -> Result<(), CacheError>;
    async fn invalidate(&self, id: UserId) -> Result<(), CacheError>;
}

/// Cached representation. Kept separate from [`User`] so the record type
/// never grows a `Serialize` impl that could leak the hash to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedUser {
    id: UserId,
    email: String,
    name: String,
    hashed_password: String,
    role: RoleId,
    is_active: bool,
    is_superadmin: bool,
}

impl From<&User> for CachedUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            name: u.name.clone(),
            hashed_password: u.hashed_password.clone(),
            role: u.role,
            is_active: u.is_active,
            is_superadmin: u.is_superadmin,
        }
    }
}

impl From<CachedUser> for User {
    fn from(c: CachedUser) -> Self {
        Self {
            id: c.id,
            email: c.email,
            name: c.name,
            hashed_password: c.hashed_password,
            role: c.role,
            is_active: c.is_active,
            is_superadmin: c.is_superadmin,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct InMemoryUserCache {
    ttl: Duration,
    entries: RwLock<HashMap<UserId, (Instant, User)>>,
}

impl InMemoryUserCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn poisoned() -> CacheError {
        CacheError::Backend("user cache lock poisoned".into())
    }
}

#[async_trait]
impl UserCache for InMemoryUserCache {
    async fn get(&self, id: UserId) -> Result<Option<User>, CacheError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries
            .get(&id)
            .filter(|(stored_at, _)| stored_at.elapsed() < self.ttl)
            .map(|(_, user)| user.clone()))
    }

    async fn put(&self, user: &User) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let now = Instant::now();
        entries.retain(|_, (stored_at, _)| now.duration_since(*stored_at) < self.ttl);
        entries.insert(user.id, (now, user.clone()));
        Ok(())
    }

    async fn invalidate(&self, id: UserId) -> Result<(), CacheError> {
        self.entries.write().map_err(|_| Self::poisoned())?.remove(&id);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Redis (optional)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "redis")]
pub use self::redis_cache::RedisUserCache;

#[cfg(feature = "redis")]
mod redis_cache {
    use super::*;
    use redis::AsyncCommands;

    /// JSON values under `user:{id}` with `SET EX`.
    #[derive(Debug, Clone)]
    pub struct RedisUserCache {
        client: redis::Client,
        ttl: Duration,
    }

    impl RedisUserCache {
        pub fn new(redis_url: impl AsRef<str>, ttl: Duration) -> Result<Self, CacheError> {
            let client = redis::Client::open(redis_url.as_ref()).map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(Self { client, ttl })
        }

        fn key(id: UserId) -> String {
            format!("user:{id}")
        }

        async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))
        }
    }

    #[async_trait]
    impl UserCache for RedisUserCache {
        async fn get(&self, id: UserId) -> Result<Option<User>, CacheError> {
            let mut conn = self.connection().await?;
            let raw: Option<String> = conn
                .get(Self::key(id))
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            raw.map(|json| {
                serde_json::from_str::<CachedUser>(&json)
                    .map(User::from)
                    .map_err(|e| CacheError::Decode(e.to_string()))
            })
            .transpose()
        }

        async fn put(&self, user: &User) -> Result<(), CacheError> {
            let json = serde_json::to_string(&CachedUser::from(user)).map_err(|e| CacheError::Decode(e.to_string()))?;
            let mut conn = self.connection().await?;
            let _: () = conn
                .set_ex(Self::key(user.id), json, self.ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(())
        }

        async fn invalidate(&self, id: UserId) -> Result<(), CacheError> {
            let mut conn = self.connection().await?;
            let _: () = conn
                .del(Self::key(id))
                .await
                .map_err(|e| CacheError::Backend(e.to_string()))?;
            Ok(())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Read-through
// ─────────────────────────────────────────────────────────────────────────────

/// Read-through user lookup: cache first, then store.
#[derive(Clone)]
pub struct CachedUsers {
    cache: Arc<dyn UserCache>,
    store: Arc<dyn UserStore>,
}

impl CachedUsers {
    pub fn new(cache: Arc<dyn UserCache>, store: Arc<dyn UserStore>) -> Self {
        Self { cache, store }
    }

    pub async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        match self.cache.get(id).await {
            Ok(Some(user)) => return Ok(Some(user)),
            Ok(None) => {}
            Err(e) => tracing::warn!(user_id = %id, error = %e, "user cache read failed"),
        }

        let user = self.store.get(id).await?;
        if let Some(user) = &user {
            if let Err(e) = self.cache.put(user).await {
                tracing::warn!(user_id = %id, error = %e, "user cache write failed");
            }
        }
        Ok(user)
    }

    pub async fn invalidate(&self, id: UserId) {
        if let Err(e) = self.cache.invalidate(id).await {
            tracing::warn!(user_id = %id, error = %e, "user cache invalidation failed");
        }
    }
}
