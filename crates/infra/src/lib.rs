//! Infrastructure layer: config, Postgres/in-memory stores, user cache, bootstrap.

pub mod cache;
pub mod config;
pub mod db;
pub mod seed;
pub mod store;

pub use cache::{CacheError, CachedUsers, InMemoryUserCache, UserCache};
pub use config::{ConfigError, Settings};
pub use store::{Page, StoreError, Stores};
