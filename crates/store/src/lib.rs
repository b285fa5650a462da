#![deny(unused)]
//! Cache and history storage backends for the enhancement service.
//!
//! In-memory implementations serve single-instance deployments and tests;
//! Redis implementations are used when a connection string is configured.

pub mod memory;
pub mod redis;

pub use memory::{CacheStats, InMemoryCache, InMemoryHistoryStore};
pub use self::redis::{RedisCache, RedisHistoryStore};
