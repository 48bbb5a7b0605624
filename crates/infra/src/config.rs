//! Configuration loading and representation.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read once at startup.
#[derive(Clone)]
pub struct Settings {
    /// HS256 signing secret.
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub database_url: String,
    /// `false` runs everything on in-memory stores (dev/test).
    pub use_persistent_stores: bool,
    pub redis_url: Option<String>,
    pub user_cache_ttl: Duration,
    pub bind_addr: SocketAddr,
    pub login_rate_limit: u32,
    pub login_rate_window: Duration,
    /// Peers whose `X-Forwarded-For` header is believed. Empty: use the socket address only.
    pub trusted_proxies: Vec<IpAddr>,
    pub superadmin_email: String,
    pub superadmin_password: String,
}

impl core::fmt::Debug for Settings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Settings")
            .field("access_token_expire_minutes", &self.access_token_expire_minutes)
            .field("use_persistent_stores", &self.use_persistent_stores)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<set>"))
            .field("user_cache_ttl", &self.user_cache_ttl)
            .field("bind_addr", &self.bind_addr)
            .field("login_rate_limit", &self.login_rate_limit)
            .field("login_rate_window", &self.login_rate_window)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("superadmin_email", &self.superadmin_email)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Load `.env` (if present) and then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to read .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret_key = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let user = get("POSTGRES_USER").unwrap_or_else(|| "postgres".into());
                let password = get("POSTGRES_PASSWORD").unwrap_or_default();
                let db = get("POSTGRES_DB").unwrap_or_else(|| "nexgen".into());
                let host = get("POSTGRES_HOST").unwrap_or_else(|| "localhost".into());
                let port: u16 = parse_or(&get, "POSTGRES_PORT", 5432)?;
                format!("postgresql://{user}:{password}@{host}:{port}/{db}")
            }
        };

        let access_token_expire_minutes: i64 = parse_or(&get, "ACCESS_TOKEN_EXPIRE_MINUTES", 60)?;
        if access_token_expire_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: access_token_expire_minutes.to_string(),
                reason: "must be positive".into(),
            });
        }

        let login_rate_limit: u32 = parse_or(&get, "LOGIN_RATE_LIMIT", 5)?;
        if login_rate_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "LOGIN_RATE_LIMIT",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            secret_key,
            access_token_expire_minutes,
            database_url,
            use_persistent_stores: parse_bool(&get, "USE_PERSISTENT_STORES")?,
            redis_url: get("REDIS_URL"),
            user_cache_ttl: Duration::from_secs(parse_or(&get, "USER_CACHE_TTL_SECS", 300)?),
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            login_rate_limit,
            login_rate_window: Duration::from_secs(parse_or(&get, "LOGIN_RATE_WINDOW_SECS", 60)?),
            trusted_proxies: parse_list(&get, "TRUSTED_PROXIES")?,
            superadmin_email: get("SUPERADMIN_EMAIL").unwrap_or_else(|| "superadmin@example.com".into()),
            superadmin_password: get("SUPERADMIN_PASSWORD").unwrap_or_else(|| "ChangeMe123!".into()),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

/// Comma-separated list; blank entries are ignored.
fn parse_list<T, G>(get: &G, key: &'static str) -> Result<Vec<T>, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                value: v.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn parse_bool<G>(get: &G, key: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            key,
            value: v,
            reason: "expected a boolean".into(),
        }),
    }
}
